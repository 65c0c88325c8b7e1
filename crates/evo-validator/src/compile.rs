//! Gate 4: in-memory compilation.
//!
//! The candidate is compiled for diagnostics only (metadata emit, scratch
//! output directory); nothing persists and nothing runs.

use crate::error::ValidationError;
use async_trait::async_trait;
use std::time::Duration;

/// How much compiler output to keep in a rejection.
const OUTPUT_LIMIT: usize = 4096;
const COMPILE_TIMEOUT: Duration = Duration::from_secs(120);

/// Compilation backend seam. The real backend shells out to `rustc`;
/// tests use [`SimulatedCompileSandbox`].
#[async_trait]
pub trait CompileSandbox: Send + Sync {
    async fn compile(&self, source: &str) -> Result<(), ValidationError>;
}

/// Compiles the candidate in a scratch directory with `rustc`.
pub struct RustcCompileSandbox {
    timeout: Duration,
}

impl RustcCompileSandbox {
    pub fn new() -> Self {
        Self {
            timeout: COMPILE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for RustcCompileSandbox {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompileSandbox for RustcCompileSandbox {
    async fn compile(&self, source: &str) -> Result<(), ValidationError> {
        let scratch = tempfile::tempdir()
            .map_err(|e| ValidationError::CompilationFailed(format!("scratch dir: {e}")))?;
        let candidate = scratch.path().join("candidate.rs");
        tokio::fs::write(&candidate, source)
            .await
            .map_err(|e| ValidationError::CompilationFailed(format!("write candidate: {e}")))?;

        let mut command = tokio::process::Command::new("rustc");
        command
            .arg("--edition")
            .arg("2021")
            .arg("--crate-type")
            .arg("lib")
            .arg("--emit")
            .arg("metadata")
            .arg("--out-dir")
            .arg(scratch.path())
            .arg(&candidate)
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| ValidationError::CompilationFailed("compiler timed out".into()))?
            .map_err(|e| ValidationError::CompilationFailed(format!("spawn rustc: {e}")))?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(ValidationError::CompilationFailed(truncate(
                &stderr,
                OUTPUT_LIMIT,
            )))
        }
    }
}

/// Scripted backend for tests: passes, or fails with a canned message.
pub struct SimulatedCompileSandbox {
    failure: Option<String>,
}

impl SimulatedCompileSandbox {
    pub fn passing() -> Self {
        Self { failure: None }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
        }
    }
}

#[async_trait]
impl CompileSandbox for SimulatedCompileSandbox {
    async fn compile(&self, _source: &str) -> Result<(), ValidationError> {
        match &self.failure {
            None => Ok(()),
            Some(message) => Err(ValidationError::CompilationFailed(message.clone())),
        }
    }
}

pub(crate) fn truncate(value: &str, limit: usize) -> String {
    let mut chars = value.chars();
    let out: String = chars.by_ref().take(limit).collect();
    if chars.next().is_some() {
        format!("{out}...")
    } else {
        out
    }
}
