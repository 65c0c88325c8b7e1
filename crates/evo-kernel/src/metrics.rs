use evo_core::GenerationStatus;
use serde::{Deserialize, Serialize};

/// Running totals for the evolution loop.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EvolutionMetrics {
    pub accepted: u64,
    pub accepted_neutral: u64,
    pub rejected_regression: u64,
    pub rejected_validation: u64,
    pub errors: u64,
    pub rollbacks: u64,
    /// Recent fitness scores, oldest first, bounded window.
    pub score_history: Vec<f64>,
    max_history: usize,
}

impl EvolutionMetrics {
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history,
            ..Default::default()
        }
    }

    pub fn record_outcome(&mut self, status: GenerationStatus, score: f64) {
        match status {
            GenerationStatus::Accepted => self.accepted += 1,
            GenerationStatus::AcceptedNeutral => self.accepted_neutral += 1,
            GenerationStatus::RejectedRegression => {
                self.rejected_regression += 1;
                self.rollbacks += 1;
            }
            GenerationStatus::RejectedValidation => self.rejected_validation += 1,
            GenerationStatus::Error => self.errors += 1,
        }
        self.score_history.push(score);
        if self.score_history.len() > self.max_history {
            self.score_history.remove(0);
        }
    }

    pub fn total(&self) -> u64 {
        self.accepted
            + self.accepted_neutral
            + self.rejected_regression
            + self.rejected_validation
            + self.errors
    }

    pub fn accept_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.accepted + self.accepted_neutral) as f64 / total as f64
    }

    pub fn avg_score(&self) -> f64 {
        if self.score_history.is_empty() {
            return 0.0;
        }
        self.score_history.iter().sum::<f64>() / self.score_history.len() as f64
    }
}
