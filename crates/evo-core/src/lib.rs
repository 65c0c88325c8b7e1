#![deny(unsafe_code)]
//! # evo-core
//!
//! Shared data model for the Evo self-evolution loop: the evolvable target
//! registry, proposals, benchmark snapshots, and persisted generation
//! records.
//!
//! Every other crate in the workspace builds on these types; none of them
//! perform I/O.

pub mod benchmark;
pub mod generation;
pub mod hash;
pub mod proposal;
pub mod registry;

pub use benchmark::BenchmarkSnapshot;
pub use generation::{GenerationRecord, GenerationStatus, NewGeneration};
pub use hash::ContentHash;
pub use proposal::Proposal;
pub use registry::{EvolvableRegistry, EvolvableTarget};
