//! Immutable snapshot of one completed generation.

use serde::{Deserialize, Serialize};

use crate::engine::{Fitness, SolutionCandidate};

/// Statistics and best-so-far solution for one generation.
///
/// Records are created by the aggregator, appended to the controller's
/// sequence, and read-only from then on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRecord {
    /// Generation number, starting at 1.
    pub index: u64,
    /// Best fitness: the all-time best in single-objective mode, this
    /// generation's best in multi-objective mode.
    pub best: Fitness,
    /// Mean of the finite fitness values.
    pub average: Fitness,
    /// Median of the finite fitness values. In multi-objective mode only
    /// the error component is a median; the complexity slot carries the
    /// -1 sentinel.
    pub median: Fitness,
    /// Worst (largest) finite fitness.
    pub worst: Fitness,
    /// Population standard deviation of the finite fitness values.
    pub std_dev: Fitness,
    /// Best-so-far candidate, with the same all-time/per-generation
    /// split as `best`.
    pub best_candidate: SolutionCandidate,
    /// True when this generation strictly improved the all-time best.
    pub is_new_best: bool,
    /// Input-variable labels the candidate renderings refer to.
    pub input_labels: Vec<String>,
    /// Non-dominated fitness vectors of this generation
    /// (multi-objective runs only).
    pub pareto_front: Option<Vec<Fitness>>,
}

impl GenerationRecord {
    /// The best solution's formula.
    pub fn formula(&self) -> &str {
        &self.best_candidate.rendering
    }

    /// Feed one row of input values through the best solution.
    pub fn predict(&self, inputs: &[f64]) -> f64 {
        self.best_candidate.evaluate(inputs)
    }
}
