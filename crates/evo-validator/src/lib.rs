#![deny(unsafe_code)]
//! # evo-validator
//!
//! The safety core: a five-gate pipeline that decides whether a proposed
//! rewrite may touch the host.
//!
//! Gate order is load-bearing. Parsing and AST inspection (gates 1 to 3)
//! run before anything executes the candidate (gates 4 and 5); a candidate
//! that fails a static gate never reaches a compiler or a test process.

pub mod ast;
pub mod compile;
pub mod error;
pub mod harness;
pub mod shape;
pub mod size;
mod validator;

pub use compile::{CompileSandbox, RustcCompileSandbox, SimulatedCompileSandbox};
pub use error::{ValidationError, Violation};
pub use harness::{ProcessTestHarness, SimulatedTestHarness, TestHarness, TestRun};
pub use validator::{ValidationTelemetry, Validator};
