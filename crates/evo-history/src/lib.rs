#![deny(unsafe_code)]
//! # evo-history
//!
//! Persistence and version-control checkpointing for generation records.
//!
//! The store is a pluggable seam (in-memory for tests and the demo, SQLite
//! for real runs); the checkpointer wraps the two git commands with
//! sanitized arguments. Persistence always happens before the checkpoint.

pub mod checkpoint;
pub mod error;
mod historian;
pub mod sqlite;
pub mod store;

pub use checkpoint::{sanitize_fragment, CheckpointOutcome, Checkpointer, GitCheckpointer, SimulatedCheckpointer};
pub use error::HistoryError;
pub use historian::{Historian, HistorianStatus};
pub use sqlite::SqliteGenerationStore;
pub use store::{GenerationStore, InMemoryGenerationStore};
