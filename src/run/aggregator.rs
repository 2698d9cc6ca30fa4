//! Per-generation statistics computation.
//!
//! The aggregator turns a raw population + fitness report from the
//! engine into a [`GenerationRecord`], screening out candidates whose
//! fitness went non-finite (degenerate formulas, e.g. division by zero)
//! and tracking the all-time best across generations.

use log::debug;

use crate::engine::{Fitness, RawGeneration, SolutionCandidate};

use super::record::GenerationRecord;

/// Median complexity has no meaning under a partial order; downstream
/// consumers special-case this sentinel.
pub const COMPLEXITY_MEDIAN_SENTINEL: f64 = -1.0;

/// Builds [`GenerationRecord`]s and owns the all-time-best tracking.
pub struct GenerationAggregator {
    multi_objective: bool,
    input_labels: Vec<String>,
    next_index: u64,
    best_scalar: f64,
    /// All-time best `{error, complexity}` under dominance.
    best_vector: (f64, f64),
    best_candidate: Option<SolutionCandidate>,
}

impl GenerationAggregator {
    pub fn new(multi_objective: bool, input_labels: Vec<String>) -> Self {
        Self {
            multi_objective,
            input_labels,
            next_index: 0,
            best_scalar: f64::INFINITY,
            best_vector: (f64::INFINITY, f64::INFINITY),
            best_candidate: None,
        }
    }

    /// All-time best candidate seen so far, distinct from any
    /// per-generation best.
    pub fn best_candidate(&self) -> Option<&SolutionCandidate> {
        self.best_candidate.as_ref()
    }

    /// Build the record for the next generation.
    pub fn aggregate(&mut self, raw: RawGeneration) -> GenerationRecord {
        self.next_index += 1;
        if self.multi_objective {
            self.aggregate_vector(raw)
        } else {
            self.aggregate_scalar(raw)
        }
    }

    fn aggregate_scalar(&mut self, raw: RawGeneration) -> GenerationRecord {
        let finite: Vec<f64> = raw
            .population
            .iter()
            .filter_map(|candidate| match candidate.fitness {
                Fitness::Scalar(v) if v.is_finite() => Some(v),
                _ => None,
            })
            .collect();
        let stats = ScalarStats::of(&finite);
        if stats.count == 0 {
            debug!(
                "generation {}: every candidate produced a non-finite fitness",
                self.next_index
            );
        }

        // NaN compares false, so an all-degenerate generation is never a
        // new best.
        let is_new_best = stats.min < self.best_scalar;
        if is_new_best {
            self.best_scalar = stats.min;
            self.best_candidate = Some(raw.best.clone());
        }
        let best_candidate = self.best_candidate.clone().unwrap_or(raw.best);

        GenerationRecord {
            index: self.next_index,
            best: Fitness::Scalar(self.best_scalar),
            average: Fitness::Scalar(stats.average),
            median: Fitness::Scalar(stats.median),
            worst: Fitness::Scalar(stats.max),
            std_dev: Fitness::Scalar(stats.std_dev),
            best_candidate,
            is_new_best,
            input_labels: self.input_labels.clone(),
            pareto_front: None,
        }
    }

    fn aggregate_vector(&mut self, raw: RawGeneration) -> GenerationRecord {
        let finite: Vec<(f64, f64)> = raw
            .population
            .iter()
            .filter_map(|candidate| match candidate.fitness {
                Fitness::Vector { error, complexity }
                    if error.is_finite() && complexity.is_finite() =>
                {
                    Some((error, complexity))
                }
                _ => None,
            })
            .collect();

        let errors: Vec<f64> = finite.iter().map(|(error, _)| *error).collect();
        let complexities: Vec<f64> = finite.iter().map(|(_, complexity)| *complexity).collect();
        let error_stats = ScalarStats::of(&errors);
        let complexity_stats = ScalarStats::of(&complexities);
        if error_stats.count == 0 {
            debug!(
                "generation {}: every candidate produced a non-finite fitness",
                self.next_index
            );
        }

        let all_time_best = Fitness::Vector {
            error: self.best_vector.0,
            complexity: self.best_vector.1,
        };
        let is_new_best = raw.best.fitness.dominates(&all_time_best);
        if is_new_best {
            if let Fitness::Vector { error, complexity } = raw.best.fitness {
                self.best_vector = (error, complexity);
            }
            self.best_candidate = Some(raw.best.clone());
        }

        let front: Vec<Fitness> = {
            let fitnesses: Vec<Fitness> = finite
                .iter()
                .map(|&(error, complexity)| Fitness::Vector { error, complexity })
                .collect();
            pareto_front(&fitnesses)
                .into_iter()
                .map(|i| fitnesses[i])
                .collect()
        };

        GenerationRecord {
            index: self.next_index,
            best: raw.best.fitness,
            average: Fitness::Vector {
                error: error_stats.average,
                complexity: complexity_stats.average,
            },
            median: Fitness::Vector {
                error: error_stats.median,
                complexity: COMPLEXITY_MEDIAN_SENTINEL,
            },
            worst: Fitness::Vector {
                error: error_stats.max,
                complexity: complexity_stats.max,
            },
            std_dev: Fitness::Vector {
                error: error_stats.std_dev,
                complexity: complexity_stats.std_dev,
            },
            best_candidate: raw.best,
            is_new_best,
            input_labels: self.input_labels.clone(),
            pareto_front: Some(front),
        }
    }
}

/// Indices of the non-dominated members of `points`.
pub fn pareto_front(points: &[Fitness]) -> Vec<usize> {
    (0..points.len())
        .filter(|&i| {
            !points
                .iter()
                .enumerate()
                .any(|(j, other)| j != i && other.dominates(&points[i]))
        })
        .collect()
}

/// Aggregate statistics over a finite-valued sample.
struct ScalarStats {
    count: usize,
    average: f64,
    /// Element at `count / 2` of the ascending sort - even-sized samples
    /// take the upper middle element, never the midpoint average.
    median: f64,
    std_dev: f64,
    min: f64,
    max: f64,
}

impl ScalarStats {
    fn of(values: &[f64]) -> Self {
        let count = values.len();
        if count == 0 {
            return Self {
                count,
                average: f64::NAN,
                median: f64::NAN,
                std_dev: f64::NAN,
                min: f64::NAN,
                max: f64::NAN,
            };
        }

        let average = values.iter().sum::<f64>() / count as f64;
        let variance = values
            .iter()
            .map(|v| (v - average) * (v - average))
            .sum::<f64>()
            / count as f64;

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        Self {
            count,
            average,
            median: sorted[count / 2],
            std_dev: variance.sqrt(),
            min: sorted[0],
            max: sorted[count - 1],
        }
    }
}
