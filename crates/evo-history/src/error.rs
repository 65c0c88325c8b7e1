use thiserror::Error;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("duplicate generation number {0}")]
    DuplicateGeneration(u64),
    #[error("invalid status '{0}' in storage")]
    InvalidStatus(String),
    #[error("store error: {0}")]
    Store(String),
    #[error("git add failed: {0}")]
    GitAddFailed(String),
    #[error("git commit failed: {0}")]
    GitCommitFailed(String),
    #[error("checkpoint process error: {0}")]
    CheckpointProcess(String),
}
