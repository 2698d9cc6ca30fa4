//! Optimization-engine interface.
//!
//! The run controller drives an external evolutionary engine through the
//! [`SearchEngine`] trait: one call per generation, yielding the full
//! evaluated population plus the engine's pick for the generation best.
//! The engine is an unbounded generation source; generation, time, and
//! steady-fitness limits are enforced by the controller loop.
//!
//! This module also hosts the pieces both sides of that boundary share:
//!
//! - [`Fitness`]: scalar or `{error, complexity}` vector, lower is better
//! - [`ErrorFunction`]: the injected error measure between predictions
//!   and targets
//! - [`model_complexity`]: the node-count penalty used as the second
//!   objective in multi-objective runs
//! - [`RandomSearchEngine`]: a reference engine for the CLI and tests

mod expr;
mod random;

pub use expr::{Expr, Op, SolutionCandidate};
pub use random::RandomSearchEngine;

use serde::{Deserialize, Serialize};

use crate::schema::SearchConfig;

/// Fitness of a candidate. Lower is better in both shapes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Fitness {
    /// Single-objective: the error measure alone.
    Scalar(f64),
    /// Multi-objective: error plus a normalized complexity penalty.
    Vector { error: f64, complexity: f64 },
}

impl Fitness {
    /// True when every component is a usable number.
    pub fn is_finite(&self) -> bool {
        match self {
            Fitness::Scalar(v) => v.is_finite(),
            Fitness::Vector { error, complexity } => error.is_finite() && complexity.is_finite(),
        }
    }

    /// Pareto dominance: no worse in every objective and strictly better
    /// in at least one. Scalars degenerate to `<`. Mixed shapes never
    /// dominate each other.
    pub fn dominates(&self, other: &Fitness) -> bool {
        match (self, other) {
            (Fitness::Scalar(a), Fitness::Scalar(b)) => a < b,
            (
                Fitness::Vector {
                    error: ae,
                    complexity: ac,
                },
                Fitness::Vector {
                    error: be,
                    complexity: bc,
                },
            ) => ae <= be && ac <= bc && (ae < be || ac < bc),
            _ => false,
        }
    }
}

/// Concave node-count penalty: 0.0 for an empty tree, 1.0 once the tree
/// reaches `max_nodes`. Counts above the maximum saturate at 1.0.
pub fn model_complexity(nodes: usize, max_nodes: usize) -> f64 {
    if max_nodes == 0 {
        return 1.0;
    }
    let n = nodes.min(max_nodes) as f64;
    let max = max_nodes as f64;
    1.0 - (1.0 - (n * n) / (max * max)).sqrt()
}

/// Error measure between predicted and expected target values.
///
/// Injected into engines explicitly so sessions never share
/// error-function state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorFunction {
    MeanAbsolute,
    MeanSquared,
    RootMeanSquared,
    WorstCase,
    MedianAbsolute,
}

impl ErrorFunction {
    /// Compute the error of `predicted` against `expected`.
    ///
    /// Returns NaN for empty inputs; NaN predictions flow through and are
    /// screened out downstream.
    pub fn compute(&self, predicted: &[f64], expected: &[f64]) -> f64 {
        debug_assert_eq!(predicted.len(), expected.len());
        let n = expected.len();
        if n == 0 {
            return f64::NAN;
        }
        match self {
            ErrorFunction::MeanAbsolute => {
                predicted
                    .iter()
                    .zip(expected)
                    .map(|(p, e)| (p - e).abs())
                    .sum::<f64>()
                    / n as f64
            }
            ErrorFunction::MeanSquared => {
                predicted
                    .iter()
                    .zip(expected)
                    .map(|(p, e)| (p - e) * (p - e))
                    .sum::<f64>()
                    / n as f64
            }
            ErrorFunction::RootMeanSquared => {
                ErrorFunction::MeanSquared.compute(predicted, expected).sqrt()
            }
            ErrorFunction::WorstCase => predicted
                .iter()
                .zip(expected)
                .map(|(p, e)| (p - e).abs())
                .fold(0.0, f64::max),
            ErrorFunction::MedianAbsolute => {
                let mut errors: Vec<f64> = predicted
                    .iter()
                    .zip(expected)
                    .map(|(p, e)| (p - e).abs())
                    .collect();
                errors.sort_by(f64::total_cmp);
                errors[n / 2]
            }
        }
    }
}

/// One completed generation as produced by an engine.
#[derive(Debug, Clone)]
pub struct RawGeneration {
    /// Every evaluated candidate in the population.
    pub population: Vec<SolutionCandidate>,
    /// The engine's pick for this generation's best candidate.
    pub best: SolutionCandidate,
}

/// Engine-side failure, caught at the worker boundary and turned into a
/// terminal state instead of a dead thread.
#[derive(Debug, Clone, thiserror::Error)]
#[error("optimization engine failure: {0}")]
pub struct EngineError(pub String);

/// The evolutionary collaborator driven by the run controller.
pub trait SearchEngine: Send {
    /// Produce the next generation.
    fn next_generation(&mut self) -> Result<RawGeneration, EngineError>;

    /// Adopt parameters edited while the session was paused.
    fn apply_config(&mut self, config: &SearchConfig);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dominance() {
        let a = Fitness::Vector {
            error: 1.0,
            complexity: 2.0,
        };
        let b = Fitness::Vector {
            error: 1.0,
            complexity: 3.0,
        };
        let c = Fitness::Vector {
            error: 2.0,
            complexity: 1.0,
        };

        assert!(a.dominates(&b));
        assert!(!b.dominates(&a));
        // never dominates itself
        assert!(!a.dominates(&a));
        // trade-offs dominate in neither direction
        assert!(!a.dominates(&c));
        assert!(!c.dominates(&a));
    }

    #[test]
    fn test_scalar_dominance_is_strict_less_than() {
        assert!(Fitness::Scalar(1.0).dominates(&Fitness::Scalar(2.0)));
        assert!(!Fitness::Scalar(2.0).dominates(&Fitness::Scalar(2.0)));
    }

    #[test]
    fn test_finiteness() {
        assert!(Fitness::Scalar(1.0).is_finite());
        assert!(!Fitness::Scalar(f64::NAN).is_finite());
        assert!(!Fitness::Scalar(f64::INFINITY).is_finite());
        assert!(
            !Fitness::Vector {
                error: 1.0,
                complexity: f64::NAN
            }
            .is_finite()
        );
    }

    #[test]
    fn test_model_complexity_endpoints() {
        assert_eq!(model_complexity(0, 64), 0.0);
        assert_eq!(model_complexity(64, 64), 1.0);
        // saturates above the maximum
        assert_eq!(model_complexity(100, 64), 1.0);
    }

    #[test]
    fn test_model_complexity_is_monotone() {
        let mut last = 0.0;
        for n in 0..=32 {
            let c = model_complexity(n, 32);
            assert!(c >= last);
            assert!((0.0..=1.0).contains(&c));
            last = c;
        }
    }

    #[test]
    fn test_error_functions() {
        let predicted = [1.0, 2.0, 3.0];
        let expected = [1.0, 4.0, 7.0];

        assert_eq!(
            ErrorFunction::MeanAbsolute.compute(&predicted, &expected),
            2.0
        );
        assert!(
            (ErrorFunction::MeanSquared.compute(&predicted, &expected) - 20.0 / 3.0).abs() < 1e-12
        );
        assert_eq!(ErrorFunction::WorstCase.compute(&predicted, &expected), 4.0);
        assert_eq!(
            ErrorFunction::MedianAbsolute.compute(&predicted, &expected),
            2.0
        );
    }

    #[test]
    fn test_error_function_empty_input_is_nan() {
        assert!(ErrorFunction::MeanSquared.compute(&[], &[]).is_nan());
    }
}
