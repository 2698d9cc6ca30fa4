//! Search configuration types.
//!
//! A [`SearchConfig`] is the explicit, typed replacement for a flat
//! key/value parameter file: every field is validated up front by
//! [`SearchConfig::validate`], and edits made to a paused session are
//! merged field-by-field through [`SearchConfigOverride`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::engine::{ErrorFunction, Op};

fn default_max_generations() -> u64 {
    100
}
fn default_population_size() -> usize {
    500
}
fn default_initial_depth() -> usize {
    4
}
fn default_max_nodes() -> usize {
    64
}
fn default_operators() -> Vec<Op> {
    vec![Op::Add, Op::Sub, Op::Mul, Op::Div]
}
fn default_error_function() -> ErrorFunction {
    ErrorFunction::MeanSquared
}
fn default_offspring_fraction() -> f64 {
    0.6
}
fn default_mutation_rate() -> f64 {
    0.1
}
fn default_crossover_rate() -> f64 {
    0.8
}
fn default_sample_size() -> usize {
    3
}

/// Top-level search configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Hard cap on the number of generations.
    #[serde(default = "default_max_generations")]
    pub max_generations: u64,
    /// Candidates per generation.
    #[serde(default = "default_population_size")]
    pub population_size: usize,
    /// Depth of freshly generated expression trees.
    #[serde(default = "default_initial_depth")]
    pub initial_depth: usize,
    /// Maximum node count a solution may reach; also the normalization
    /// point of the complexity objective.
    #[serde(default = "default_max_nodes")]
    pub max_nodes: usize,
    /// Operators the search may use.
    #[serde(default = "default_operators")]
    pub operators: Vec<Op>,
    /// Error measure between predictions and targets.
    #[serde(default = "default_error_function")]
    pub error_function: ErrorFunction,
    /// Ranges for generated numeric constants.
    #[serde(default)]
    pub constants: ConstantRanges,
    /// Fraction of each generation produced as offspring.
    #[serde(default = "default_offspring_fraction")]
    pub offspring_fraction: f64,
    /// Mutation probability (0.0-1.0).
    #[serde(default = "default_mutation_rate")]
    pub mutation_rate: f64,
    /// Crossover probability (0.0-1.0).
    #[serde(default = "default_crossover_rate")]
    pub crossover_rate: f64,
    /// Tournament sample size for offspring selection.
    #[serde(default = "default_sample_size")]
    pub offspring_sample_size: usize,
    /// Tournament sample size for survivor selection.
    #[serde(default = "default_sample_size")]
    pub survivors_sample_size: usize,
    /// End the search after this many consecutive generations without a
    /// new best. `None` disables the limit.
    #[serde(default)]
    pub steady_fitness_limit: Option<u64>,
    /// Running-time limit in seconds (time spent paused is excluded).
    #[serde(default)]
    pub time_limit_secs: Option<u64>,
    /// RNG seed. Present: deterministic single-threaded evaluation.
    /// Absent: non-deterministic parallel evaluation.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Optimize `{error, complexity}` vectors instead of the error alone.
    #[serde(default)]
    pub multi_objective: bool,
    /// Partially fixed expression template for engines that support one.
    #[serde(default)]
    pub skeleton: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_generations: default_max_generations(),
            population_size: default_population_size(),
            initial_depth: default_initial_depth(),
            max_nodes: default_max_nodes(),
            operators: default_operators(),
            error_function: default_error_function(),
            constants: ConstantRanges::default(),
            offspring_fraction: default_offspring_fraction(),
            mutation_rate: default_mutation_rate(),
            crossover_rate: default_crossover_rate(),
            offspring_sample_size: default_sample_size(),
            survivors_sample_size: default_sample_size(),
            steady_fitness_limit: None,
            time_limit_secs: None,
            seed: None,
            multi_objective: false,
            skeleton: None,
        }
    }
}

/// Ranges for generated numeric constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstantRanges {
    /// Inclusive integer constant range.
    pub integers: (i64, i64),
    /// Inclusive decimal constant range.
    pub decimals: (f64, f64),
    /// Decimal places generated constants are rounded to.
    pub decimal_places: u32,
}

impl Default for ConstantRanges {
    fn default() -> Self {
        Self {
            integers: (-5, 5),
            decimals: (-5.0, 5.0),
            decimal_places: 2,
        }
    }
}

impl SearchConfig {
    /// The time limit as a [`Duration`], if one is set.
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_secs.map(Duration::from_secs)
    }

    /// Validate parameter ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_generations == 0 {
            return Err(ConfigError::ZeroGenerations);
        }
        if self.population_size < 2 {
            return Err(ConfigError::PopulationTooSmall(self.population_size));
        }
        if self.operators.is_empty() {
            return Err(ConfigError::NoOperators);
        }
        if self.initial_depth == 0 || self.max_nodes == 0 {
            return Err(ConfigError::InvalidTreeShape);
        }
        for (name, value) in [
            ("offspring_fraction", self.offspring_fraction),
            ("mutation_rate", self.mutation_rate),
            ("crossover_rate", self.crossover_rate),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::RateOutOfRange { name, value });
            }
        }
        if self.offspring_sample_size == 0 || self.survivors_sample_size == 0 {
            return Err(ConfigError::ZeroSampleSize);
        }
        if self.constants.integers.0 > self.constants.integers.1
            || self.constants.decimals.0 > self.constants.decimals.1
        {
            return Err(ConfigError::BadConstantRange);
        }
        Ok(())
    }
}

/// Configuration validation errors, surfaced before `start()`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("maximum generations must be non-zero")]
    ZeroGenerations,
    #[error("population size must be at least 2 (got {0})")]
    PopulationTooSmall(usize),
    #[error("operator set must not be empty")]
    NoOperators,
    #[error("initial depth and maximum solution nodes must be non-zero")]
    InvalidTreeShape,
    #[error("{name} must lie in [0, 1] (got {value})")]
    RateOutOfRange { name: &'static str, value: f64 },
    #[error("selection sample sizes must be non-zero")]
    ZeroSampleSize,
    #[error("constant range lower bound exceeds upper bound")]
    BadConstantRange,
}

/// Field-by-field configuration override; only populated fields are
/// applied.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchConfigOverride {
    pub max_generations: Option<u64>,
    pub population_size: Option<usize>,
    pub initial_depth: Option<usize>,
    pub max_nodes: Option<usize>,
    pub operators: Option<Vec<Op>>,
    pub error_function: Option<ErrorFunction>,
    pub constants: Option<ConstantRanges>,
    pub offspring_fraction: Option<f64>,
    pub mutation_rate: Option<f64>,
    pub crossover_rate: Option<f64>,
    pub offspring_sample_size: Option<usize>,
    pub survivors_sample_size: Option<usize>,
    pub steady_fitness_limit: Option<u64>,
    pub time_limit_secs: Option<u64>,
    pub seed: Option<u64>,
    pub multi_objective: Option<bool>,
    pub skeleton: Option<String>,
}

impl SearchConfigOverride {
    /// Merge the populated fields into `config`.
    pub fn apply(&self, config: &mut SearchConfig) {
        if let Some(v) = self.max_generations {
            config.max_generations = v;
        }
        if let Some(v) = self.population_size {
            config.population_size = v;
        }
        if let Some(v) = self.initial_depth {
            config.initial_depth = v;
        }
        if let Some(v) = self.max_nodes {
            config.max_nodes = v;
        }
        if let Some(v) = &self.operators {
            config.operators = v.clone();
        }
        if let Some(v) = self.error_function {
            config.error_function = v;
        }
        if let Some(v) = &self.constants {
            config.constants = v.clone();
        }
        if let Some(v) = self.offspring_fraction {
            config.offspring_fraction = v;
        }
        if let Some(v) = self.mutation_rate {
            config.mutation_rate = v;
        }
        if let Some(v) = self.crossover_rate {
            config.crossover_rate = v;
        }
        if let Some(v) = self.offspring_sample_size {
            config.offspring_sample_size = v;
        }
        if let Some(v) = self.survivors_sample_size {
            config.survivors_sample_size = v;
        }
        if let Some(v) = self.steady_fitness_limit {
            config.steady_fitness_limit = Some(v);
        }
        if let Some(v) = self.time_limit_secs {
            config.time_limit_secs = Some(v);
        }
        if let Some(v) = self.seed {
            config.seed = Some(v);
        }
        if let Some(v) = self.multi_objective {
            config.multi_objective = v;
        }
        if let Some(v) = &self.skeleton {
            config.skeleton = Some(v.clone());
        }
    }
}
