//! # evo-benchmark
//!
//! Measures one evolvable target with a hardcoded representative workload:
//! mean wall time over a fixed number of invocations, allocation delta of a
//! single invocation, and on-disk source line count.
//!
//! The representative workload is what makes fitness comparable across
//! rewrites even when the target's internals change completely.

pub mod alloc_meter;
mod benchmarker;
mod simulated;

pub use benchmarker::{BenchmarkError, BenchmarkRunner, Benchmarker, WorkloadTable, BENCH_ITERATIONS};
pub use simulated::SimulatedBenchmarkRunner;
