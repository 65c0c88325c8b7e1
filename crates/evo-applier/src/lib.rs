#![deny(unsafe_code)]
//! # evo-applier
//!
//! The only component allowed to write into the evolvable directory.
//!
//! Writes go through a hardcoded whitelist table that is built from the
//! fixed target list and the applier's own configured directory; nothing
//! derived from a proposal can redirect a write. Applying swaps the on-disk
//! artifact and notifies the reload seam; rollback is the exact mirror.

use async_trait::async_trait;
use evo_core::registry::TARGET_NAMES;
use evo_core::Proposal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("target '{0}' is not in the writable whitelist")]
    ModuleNotInWhitelist(String),
    #[error("write path {0} failed the traversal check")]
    PathTraversalBlocked(PathBuf),
    #[error("write to {path} failed: {why}")]
    WriteFailed { path: PathBuf, why: String },
    #[error("reload failed: {0}")]
    ReloadFailed(String),
}

/// Result of a successful applier operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyOutcome {
    Applied,
    RolledBack,
}

/// Seam through which "subsequent calls observe new-source semantics".
///
/// The on-disk artifact swap is atomic from the caller's view; this hook
/// lets the executor of the evolvable units restart or re-read them.
#[async_trait]
pub trait ReloadHandle: Send + Sync {
    async fn reload(&self, target_name: &str) -> Result<(), ApplyError>;
}

/// Reload seam that records invocations; the default for tests and the
/// demo, and the correct no-op when targets are executed out of process
/// per invocation.
#[derive(Clone, Default)]
pub struct SimulatedReloader {
    reloads: Arc<Mutex<Vec<String>>>,
    failure: Option<String>,
}

impl SimulatedReloader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            reloads: Arc::new(Mutex::new(Vec::new())),
            failure: Some(reason.into()),
        }
    }

    pub fn reloads(&self) -> Vec<String> {
        self.reloads.lock().expect("lock not poisoned").clone()
    }
}

#[async_trait]
impl ReloadHandle for SimulatedReloader {
    async fn reload(&self, target_name: &str) -> Result<(), ApplyError> {
        if let Some(reason) = &self.failure {
            return Err(ApplyError::ReloadFailed(reason.clone()));
        }
        self.reloads
            .lock()
            .expect("lock not poisoned")
            .push(target_name.to_string());
        Ok(())
    }
}

/// Reload seam for deployments whose targets are executed out of process
/// per invocation: the swapped artifact is picked up on the next read, so
/// reload only logs the swap.
pub struct PassthroughReloader;

#[async_trait]
impl ReloadHandle for PassthroughReloader {
    async fn reload(&self, target_name: &str) -> Result<(), ApplyError> {
        tracing::debug!(target = %target_name, "artifact swapped, next invocation observes it");
        Ok(())
    }
}

/// Writes accepted sources to whitelisted paths and drives the reload seam.
pub struct Applier {
    writable: BTreeMap<String, PathBuf>,
    reloader: Arc<dyn ReloadHandle>,
}

impl Applier {
    /// Build the whitelist from the fixed target list under `evolvable_dir`.
    ///
    /// The table is the sole write authority; the registry's read paths are
    /// never consulted here.
    pub fn new(evolvable_dir: impl AsRef<Path>, reloader: Arc<dyn ReloadHandle>) -> Self {
        let dir = evolvable_dir.as_ref();
        let writable = TARGET_NAMES
            .iter()
            .map(|name| ((*name).to_string(), dir.join(format!("{name}.rs"))))
            .collect();
        Self { writable, reloader }
    }

    /// Write the proposal's candidate source and reload.
    pub async fn apply(&self, proposal: &Proposal) -> Result<ApplyOutcome, ApplyError> {
        self.write(&proposal.target_name, &proposal.new_source)
            .await?;
        self.reloader.reload(&proposal.target_name).await?;
        tracing::info!(target = %proposal.target_name, hash = %proposal.new_hash(), "applied");
        Ok(ApplyOutcome::Applied)
    }

    /// Write back the proposal's pre-call snapshot and reload.
    pub async fn rollback(&self, proposal: &Proposal) -> Result<ApplyOutcome, ApplyError> {
        self.write(&proposal.target_name, &proposal.old_source)
            .await?;
        self.reloader.reload(&proposal.target_name).await?;
        tracing::warn!(target = %proposal.target_name, hash = %proposal.old_hash(), "rolled back");
        Ok(ApplyOutcome::RolledBack)
    }

    async fn write(&self, target_name: &str, source: &str) -> Result<(), ApplyError> {
        let path = self
            .writable
            .get(target_name)
            .ok_or_else(|| ApplyError::ModuleNotInWhitelist(target_name.to_string()))?;

        let resolved = std::path::absolute(path)
            .map_err(|_| ApplyError::PathTraversalBlocked(path.clone()))?;
        if !resolved.to_string_lossy().contains("evolvable") {
            return Err(ApplyError::PathTraversalBlocked(resolved));
        }

        tokio::fs::write(&resolved, source)
            .await
            .map_err(|e| ApplyError::WriteFailed {
                path: resolved.clone(),
                why: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fixture() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let evolvable = dir.path().join("evolvable");
        fs::create_dir_all(&evolvable).unwrap();
        (dir, evolvable)
    }

    fn proposal(target: &str) -> Proposal {
        Proposal {
            target_name: target.into(),
            old_source: "pub fn old() {}\n".into(),
            new_source: "pub fn new() {}\n".into(),
            reasoning: "test".into(),
            model_tag: "sim".into(),
            tokens_in: 0,
            tokens_out: 0,
        }
    }

    #[tokio::test]
    async fn apply_writes_candidate_and_reloads() {
        let (_dir, evolvable) = fixture();
        let reloader = SimulatedReloader::new();
        let applier = Applier::new(&evolvable, Arc::new(reloader.clone()));
        let p = proposal("prompt_builder");
        assert_eq!(applier.apply(&p).await.unwrap(), ApplyOutcome::Applied);
        let written = fs::read_to_string(evolvable.join("prompt_builder.rs")).unwrap();
        assert_eq!(written, p.new_source);
        assert_eq!(reloader.reloads(), vec!["prompt_builder"]);
    }

    #[tokio::test]
    async fn apply_then_rollback_restores_bytes() {
        let (_dir, evolvable) = fixture();
        let applier = Applier::new(&evolvable, Arc::new(SimulatedReloader::new()));
        let p = proposal("token_meter");
        applier.apply(&p).await.unwrap();
        assert_eq!(
            applier.rollback(&p).await.unwrap(),
            ApplyOutcome::RolledBack
        );
        let restored = fs::read_to_string(evolvable.join("token_meter.rs")).unwrap();
        assert_eq!(restored, p.old_source);
    }

    #[tokio::test]
    async fn unknown_target_is_rejected_even_with_registry_paths() {
        let (_dir, evolvable) = fixture();
        let applier = Applier::new(&evolvable, Arc::new(SimulatedReloader::new()));
        let err = applier.apply(&proposal("historian")).await.unwrap_err();
        assert!(matches!(err, ApplyError::ModuleNotInWhitelist(name) if name == "historian"));
    }

    #[tokio::test]
    async fn path_without_evolvable_marker_is_blocked() {
        let dir = tempfile::tempdir().unwrap();
        // Whitelist built over a directory that lacks the marker.
        let applier = Applier::new(dir.path(), Arc::new(SimulatedReloader::new()));
        let err = applier.apply(&proposal("prompt_builder")).await.unwrap_err();
        assert!(matches!(err, ApplyError::PathTraversalBlocked(_)));
    }

    #[tokio::test]
    async fn reload_failure_surfaces_after_write() {
        let (_dir, evolvable) = fixture();
        let applier = Applier::new(&evolvable, Arc::new(SimulatedReloader::failing("no executor")));
        let err = applier.apply(&proposal("prompt_builder")).await.unwrap_err();
        assert!(matches!(err, ApplyError::ReloadFailed(_)));
    }

    #[tokio::test]
    async fn write_failure_is_structured() {
        let (_dir, evolvable) = fixture();
        let applier = Applier::new(evolvable.join("missing_subdir"), Arc::new(SimulatedReloader::new()));
        let err = applier.apply(&proposal("prompt_builder")).await.unwrap_err();
        assert!(matches!(err, ApplyError::WriteFailed { .. }));
    }
}
