//! Reference search engine: uniform random sampling of expression trees.
//!
//! This is deliberately not a genetic algorithm - no selection, crossover,
//! or mutation. It exists so the session layer has a real collaborator to
//! drive in the CLI and in tests, with the same fitness shapes and seed
//! semantics a full evolutionary engine would have.

use std::sync::Arc;

use rand::prelude::*;
use rayon::prelude::*;

use crate::schema::{Dataset, SearchConfig};

use super::{
    EngineError, Expr, Fitness, RawGeneration, SearchEngine, SolutionCandidate, model_complexity,
};

/// Random-sampling engine over the configured operator set.
pub struct RandomSearchEngine {
    dataset: Arc<Dataset>,
    config: SearchConfig,
    rng: StdRng,
    /// Seeded runs evaluate sequentially for reproducibility; unseeded
    /// runs fan out across the rayon pool.
    deterministic: bool,
}

impl RandomSearchEngine {
    /// Create an engine for `dataset` using the seed semantics of
    /// `config`.
    pub fn new(config: SearchConfig, dataset: Arc<Dataset>) -> Self {
        let (rng, deterministic) = match config.seed {
            Some(seed) => (StdRng::seed_from_u64(seed), true),
            None => (StdRng::from_entropy(), false),
        };
        Self {
            dataset,
            config,
            rng,
            deterministic,
        }
    }

    fn random_expr(&mut self, depth: usize) -> Expr {
        if depth == 0 || self.rng.gen_bool(0.3) {
            return self.random_leaf();
        }
        let op = self.config.operators[self.rng.gen_range(0..self.config.operators.len())];
        let args = (0..op.arity())
            .map(|_| self.random_expr(depth - 1))
            .collect();
        Expr::Call(op, args)
    }

    fn random_leaf(&mut self) -> Expr {
        let variables = self.dataset.input_labels().len();
        if variables > 0 && self.rng.gen_bool(0.5) {
            return Expr::Var(self.rng.gen_range(0..variables));
        }

        let ranges = &self.config.constants;
        if self.rng.gen_bool(0.5) {
            Expr::Const(self.rng.gen_range(ranges.integers.0..=ranges.integers.1) as f64)
        } else {
            let value = self.rng.gen_range(ranges.decimals.0..=ranges.decimals.1);
            let scale = 10f64.powi(ranges.decimal_places as i32);
            Expr::Const((value * scale).round() / scale)
        }
    }

    fn fitness_of(&self, expr: &Expr) -> Fitness {
        let predictions: Vec<f64> = self
            .dataset
            .inputs()
            .iter()
            .map(|row| expr.eval(row))
            .collect();
        let error = self
            .config
            .error_function
            .compute(&predictions, self.dataset.targets());

        if self.config.multi_objective {
            Fitness::Vector {
                error,
                complexity: model_complexity(expr.node_count(), self.config.max_nodes),
            }
        } else {
            Fitness::Scalar(error)
        }
    }
}

/// Lexicographic `(error, complexity)` sort key; scalars compare on the
/// error alone.
fn fitness_key(candidate: &SolutionCandidate) -> (f64, f64) {
    match candidate.fitness {
        Fitness::Scalar(v) => (v, 0.0),
        Fitness::Vector { error, complexity } => (error, complexity),
    }
}

impl SearchEngine for RandomSearchEngine {
    fn next_generation(&mut self) -> Result<RawGeneration, EngineError> {
        let exprs: Vec<Expr> = (0..self.config.population_size)
            .map(|_| self.random_expr(self.config.initial_depth))
            .collect();

        let labels = self.dataset.input_labels();
        let population: Vec<SolutionCandidate> = if self.deterministic {
            exprs
                .into_iter()
                .map(|expr| {
                    let fitness = self.fitness_of(&expr);
                    SolutionCandidate::new(expr, labels, fitness)
                })
                .collect()
        } else {
            exprs
                .into_par_iter()
                .map(|expr| {
                    let fitness = self.fitness_of(&expr);
                    SolutionCandidate::new(expr, labels, fitness)
                })
                .collect()
        };

        let best = population
            .iter()
            .min_by(|a, b| {
                let (ae, ac) = fitness_key(a);
                let (be, bc) = fitness_key(b);
                ae.total_cmp(&be).then(ac.total_cmp(&bc))
            })
            .cloned()
            .ok_or_else(|| EngineError("population is empty".to_string()))?;

        Ok(RawGeneration { population, best })
    }

    fn apply_config(&mut self, config: &SearchConfig) {
        if config.seed != self.config.seed {
            match config.seed {
                Some(seed) => {
                    self.rng = StdRng::seed_from_u64(seed);
                    self.deterministic = true;
                }
                None => {
                    self.rng = StdRng::from_entropy();
                    self.deterministic = false;
                }
            }
        }
        self.config = config.clone();
    }
}
