#![deny(unsafe_code)]
//! # evo-fitness
//!
//! Compares two benchmark snapshots of the same target and classifies the
//! change as improved, neutral, or regressed.
//!
//! The score is a weighted sum of relative improvements; positive means the
//! rewrite is better. A metric with a zero or missing "before" value
//! contributes nothing rather than dividing by zero.

use evo_core::benchmark::{BenchmarkSnapshot, CODE_SIZE_LINES, EXECUTION_TIME_US, MEMORY_BYTES};
use serde::{Deserialize, Serialize};

/// Metric weights for the composite score.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct FitnessWeights {
    pub execution_time: f64,
    pub memory: f64,
    pub code_size: f64,
}

impl Default for FitnessWeights {
    fn default() -> Self {
        Self {
            execution_time: 0.6,
            memory: 0.3,
            code_size: 0.1,
        }
    }
}

/// Classification of a before/after comparison.
///
/// `Neutral` always carries a score of exactly `0.0`, even when the
/// underlying score is a tiny non-zero inside the threshold band.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", content = "score", rename_all = "snake_case")]
pub enum FitnessVerdict {
    Improved(f64),
    Neutral(f64),
    Regressed(f64),
}

impl FitnessVerdict {
    pub fn score(&self) -> f64 {
        match self {
            FitnessVerdict::Improved(s)
            | FitnessVerdict::Neutral(s)
            | FitnessVerdict::Regressed(s) => *s,
        }
    }

    pub fn is_improved(&self) -> bool {
        matches!(self, FitnessVerdict::Improved(_))
    }

    pub fn is_regressed(&self) -> bool {
        matches!(self, FitnessVerdict::Regressed(_))
    }
}

/// Scores snapshot pairs and renders verdicts.
#[derive(Clone, Debug)]
pub struct FitnessEvaluator {
    weights: FitnessWeights,
    /// Half-width of the neutral band around zero.
    threshold: f64,
}

impl FitnessEvaluator {
    pub fn new() -> Self {
        Self {
            weights: FitnessWeights::default(),
            threshold: 0.05,
        }
    }

    pub fn with_weights(mut self, weights: FitnessWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Weighted relative-improvement score. Sign positive = better.
    pub fn score(&self, before: &BenchmarkSnapshot, after: &BenchmarkSnapshot) -> f64 {
        self.weights.execution_time * relative_improvement(before, after, EXECUTION_TIME_US)
            + self.weights.memory * relative_improvement(before, after, MEMORY_BYTES)
            + self.weights.code_size * relative_improvement(before, after, CODE_SIZE_LINES)
    }

    /// Score and classify. `Neutral` reports a score of exactly `0.0`.
    pub fn evaluate(&self, before: &BenchmarkSnapshot, after: &BenchmarkSnapshot) -> FitnessVerdict {
        let score = self.score(before, after);
        if score > self.threshold {
            FitnessVerdict::Improved(score)
        } else if score < -self.threshold {
            FitnessVerdict::Regressed(score)
        } else {
            FitnessVerdict::Neutral(0.0)
        }
    }
}

impl Default for FitnessEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

/// `(before - after) / before` when `before > 0`, else `0`.
/// Missing metrics contribute `0`.
fn relative_improvement(before: &BenchmarkSnapshot, after: &BenchmarkSnapshot, key: &str) -> f64 {
    let before_value = before.get(key).unwrap_or(0.0);
    if before_value <= 0.0 {
        return 0.0;
    }
    let after_value = after.get(key).unwrap_or(0.0);
    (before_value - after_value) / before_value
}
