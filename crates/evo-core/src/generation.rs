use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Terminal status of one evolution generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    /// Fitness improved; rewrite kept.
    Accepted,
    /// Fitness neutral; rewrite kept.
    AcceptedNeutral,
    /// Fitness regressed; rewrite rolled back.
    RejectedRegression,
    /// A validator gate rejected the candidate; nothing was applied.
    RejectedValidation,
    /// The cycle failed before a verdict (read, budget, transport, apply).
    Error,
}

impl GenerationStatus {
    pub const ALL: [GenerationStatus; 5] = [
        GenerationStatus::Accepted,
        GenerationStatus::AcceptedNeutral,
        GenerationStatus::RejectedRegression,
        GenerationStatus::RejectedValidation,
        GenerationStatus::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationStatus::Accepted => "accepted",
            GenerationStatus::AcceptedNeutral => "accepted_neutral",
            GenerationStatus::RejectedRegression => "rejected_regression",
            GenerationStatus::RejectedValidation => "rejected_validation",
            GenerationStatus::Error => "error",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.as_str() == value)
    }

    /// Both accepted flavours count as success for router feedback.
    pub fn is_accepted(&self) -> bool {
        matches!(
            self,
            GenerationStatus::Accepted | GenerationStatus::AcceptedNeutral
        )
    }
}

impl fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attributes of a generation about to be persisted.
///
/// The store assigns the surrogate key and creation timestamp; the
/// generation number is assigned by the evolver and must be unique.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewGeneration {
    pub generation_number: u64,
    pub target_name: String,
    pub status: GenerationStatus,
    pub fitness_score: f64,
    pub model_tag: String,
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub reasoning: String,
    pub old_source: String,
    pub new_source: String,
}

/// A persisted generation row.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub id: i64,
    pub generation_number: u64,
    pub target_name: String,
    pub status: GenerationStatus,
    pub fitness_score: f64,
    pub model_tag: String,
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub reasoning: String,
    pub old_source: String,
    pub new_source: String,
    pub created_at: DateTime<Utc>,
}
