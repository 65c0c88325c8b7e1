use std::path::PathBuf;
use thiserror::Error;

/// Everything that can go wrong between "select a target" and "hold a
/// proposal". Nothing here is thrown across component boundaries.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("failed to read source at {path}: {why}")]
    ReadFailed { path: PathBuf, why: String },
    #[error("daily token budget exhausted")]
    BudgetExhausted,
    #[error("no API key configured")]
    MissingApiKey,
    #[error("chat request failed: {0}")]
    RequestFailed(String),
    #[error("chat API error {status}: {body}")]
    ApiError { status: u16, body: String },
    #[error("response contained no fenced code block")]
    NoCodeInResponse,
}

impl SynthesisError {
    /// True for failures that happened before any tokens were spent.
    pub fn pre_flight(&self) -> bool {
        matches!(
            self,
            SynthesisError::ReadFailed { .. }
                | SynthesisError::BudgetExhausted
                | SynthesisError::MissingApiKey
        )
    }
}
