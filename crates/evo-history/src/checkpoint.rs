//! Version-control checkpointing.
//!
//! Two commands: stage the evolvable directory, then commit with
//! `--allow-empty`. Every interpolated fragment is sanitized and the
//! positional arguments always sit behind an explicit `--` so no field can
//! be read as a flag.

use crate::error::HistoryError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Maximum length of a sanitized fragment.
const FRAGMENT_LIMIT: usize = 500;

/// Strip every character outside the safe set, collapse newlines to
/// spaces, and truncate. The safe set is alphanumerics, whitespace and a
/// short list of punctuation.
pub fn sanitize_fragment(fragment: &str) -> String {
    let collapsed: String = fragment
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || c.is_ascii_whitespace() || ".,:;()[]_/+=@#%-".contains(*c))
        .collect();
    collapsed.chars().take(FRAGMENT_LIMIT).collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckpointOutcome {
    Committed,
    /// The tree was already clean; counts as success.
    NothingToCommit,
}

/// Seam for the version-control side effect.
#[async_trait]
pub trait Checkpointer: Send + Sync {
    async fn checkpoint(&self, message: &str) -> Result<CheckpointOutcome, HistoryError>;
}

/// Stages the evolvable directory and commits in the enclosing repository.
pub struct GitCheckpointer {
    repo_dir: PathBuf,
    evolvable_dir: PathBuf,
}

impl GitCheckpointer {
    pub fn new(repo_dir: impl AsRef<Path>, evolvable_dir: impl AsRef<Path>) -> Self {
        Self {
            repo_dir: repo_dir.as_ref().to_path_buf(),
            evolvable_dir: evolvable_dir.as_ref().to_path_buf(),
        }
    }

    async fn git(&self, args: &[&str]) -> Result<std::process::Output, HistoryError> {
        let mut command = tokio::process::Command::new("git");
        command.args(args).current_dir(&self.repo_dir).kill_on_drop(true);
        command
            .output()
            .await
            .map_err(|e| HistoryError::CheckpointProcess(e.to_string()))
    }
}

#[async_trait]
impl Checkpointer for GitCheckpointer {
    async fn checkpoint(&self, message: &str) -> Result<CheckpointOutcome, HistoryError> {
        let message = sanitize_fragment(message);
        let evolvable = self.evolvable_dir.to_string_lossy().to_string();

        let add = self.git(&["add", "--", &evolvable]).await?;
        if !add.status.success() {
            return Err(HistoryError::GitAddFailed(
                String::from_utf8_lossy(&add.stderr).into_owned(),
            ));
        }

        let commit = self
            .git(&["commit", "--allow-empty", "-m", &message, "--"])
            .await?;
        if commit.status.success() {
            tracing::info!(message = %message, "checkpoint committed");
            return Ok(CheckpointOutcome::Committed);
        }
        let stdout = String::from_utf8_lossy(&commit.stdout);
        let stderr = String::from_utf8_lossy(&commit.stderr);
        if stdout.contains("nothing to commit") || stderr.contains("nothing to commit") {
            return Ok(CheckpointOutcome::NothingToCommit);
        }
        Err(HistoryError::GitCommitFailed(format!("{stdout}{stderr}")))
    }
}

/// Checkpointer that records messages; the default for tests and the demo.
#[derive(Clone, Default)]
pub struct SimulatedCheckpointer {
    messages: Arc<Mutex<Vec<String>>>,
    failure: Option<String>,
}

impl SimulatedCheckpointer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            messages: Arc::new(Mutex::new(Vec::new())),
            failure: Some(reason.into()),
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().expect("lock not poisoned").clone()
    }
}

#[async_trait]
impl Checkpointer for SimulatedCheckpointer {
    async fn checkpoint(&self, message: &str) -> Result<CheckpointOutcome, HistoryError> {
        if let Some(reason) = &self.failure {
            return Err(HistoryError::GitCommitFailed(reason.clone()));
        }
        self.messages
            .lock()
            .expect("lock not poisoned")
            .push(sanitize_fragment(message));
        Ok(CheckpointOutcome::Committed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_shell_metacharacters() {
        let out = sanitize_fragment("gen 3 `rm -rf /` $(reboot) && echo");
        assert!(!out.contains('`'));
        assert!(!out.contains('$'));
        assert!(!out.contains('&'));
        assert!(out.contains("gen 3"));
    }

    #[test]
    fn sanitize_collapses_newlines() {
        let out = sanitize_fragment("line one\nline two\r\nline three");
        assert!(!out.contains('\n'));
        assert!(out.contains("line one line two"));
    }

    #[test]
    fn sanitize_truncates_to_limit() {
        let out = sanitize_fragment(&"a".repeat(2_000));
        assert_eq!(out.len(), 500);
    }

    #[test]
    fn sanitize_keeps_safe_punctuation() {
        let out = sanitize_fragment("score: -0.12 (gen #4) [accepted]");
        assert_eq!(out, "score: -0.12 (gen #4) [accepted]");
    }

    #[tokio::test]
    async fn simulated_checkpointer_records_sanitized_message() {
        let cp = SimulatedCheckpointer::new();
        cp.checkpoint("evo gen 1\n`evil`").await.unwrap();
        let messages = cp.messages();
        assert_eq!(messages.len(), 1);
        assert!(!messages[0].contains('`'));
    }

    #[tokio::test]
    async fn simulated_failure_maps_to_commit_error() {
        let cp = SimulatedCheckpointer::failing("no repo");
        let err = cp.checkpoint("msg").await.unwrap_err();
        assert!(matches!(err, HistoryError::GitCommitFailed(_)));
    }
}
