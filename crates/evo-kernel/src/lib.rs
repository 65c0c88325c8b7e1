#![deny(unsafe_code)]
//! # evo-kernel
//!
//! The orchestrator: a small state machine that sequences one evolution
//! generation after another. Each cycle measures a target, asks the LLM for
//! a rewrite, runs the candidate through the validator, applies it,
//! re-measures, and either keeps or reverts the change. Every cycle
//! advances the generation counter by exactly one, whatever happens.

pub mod config;
pub mod evolver;
pub mod metrics;
pub mod status;
pub mod workloads;

pub use config::{ConfigError, EvoConfig};
pub use evolver::{CycleResult, Evolver, EvolverDeps, EvolverStatus};
pub use metrics::EvolutionMetrics;
pub use status::EvoStatus;
pub use workloads::default_workloads;
