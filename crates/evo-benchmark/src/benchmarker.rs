use crate::alloc_meter;
use evo_core::{BenchmarkSnapshot, EvolvableTarget};
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Number of timed invocations; the mean averages out host jitter without
/// making a cycle expensive.
pub const BENCH_ITERATIONS: u32 = 100;

type Workload = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Error)]
pub enum BenchmarkError {
    #[error("no representative workload registered for target '{0}'")]
    NoWorkload(String),
    #[error("failed to read source at {path}: {why}")]
    ReadFailed { path: PathBuf, why: String },
    #[error("representative workload for '{0}' panicked")]
    WorkloadPanicked(String),
}

/// Maps each target name to its hardcoded representative call.
#[derive(Clone, Default)]
pub struct WorkloadTable {
    workloads: BTreeMap<String, Workload>,
}

impl WorkloadTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, name: impl Into<String>, workload: impl Fn() + Send + Sync + 'static) -> Self {
        self.workloads.insert(name.into(), Arc::new(workload));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Workload> {
        self.workloads.get(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.workloads.keys().cloned().collect()
    }
}

/// Measurement seam. The real runner times representative workloads;
/// tests script snapshots with [`crate::SimulatedBenchmarkRunner`].
pub trait BenchmarkRunner: Send + Sync {
    fn run(&self, target: &EvolvableTarget) -> Result<BenchmarkSnapshot, BenchmarkError>;
}

/// Runs the representative workload against a target and produces a
/// [`BenchmarkSnapshot`]. Errors are returned, never raised.
#[derive(Clone)]
pub struct Benchmarker {
    workloads: WorkloadTable,
}

impl Benchmarker {
    pub fn new(workloads: WorkloadTable) -> Self {
        Self { workloads }
    }
}

impl BenchmarkRunner for Benchmarker {
    fn run(&self, target: &EvolvableTarget) -> Result<BenchmarkSnapshot, BenchmarkError> {
        let workload = self
            .workloads
            .get(&target.name)
            .ok_or_else(|| BenchmarkError::NoWorkload(target.name.clone()))?
            .clone();

        let execution_time_us = self.time_mean_us(&target.name, &workload)?;
        let memory_bytes = self.allocation_delta(&target.name, &workload)?;
        let code_size_lines = self.count_source_lines(target)?;

        tracing::debug!(
            target = %target.name,
            execution_time_us,
            memory_bytes,
            code_size_lines,
            "benchmark complete"
        );
        Ok(BenchmarkSnapshot::with_required(
            execution_time_us,
            memory_bytes,
            code_size_lines,
        ))
    }
}

impl Benchmarker {
    fn time_mean_us(&self, name: &str, workload: &Workload) -> Result<f64, BenchmarkError> {
        let workload = workload.clone();
        let result = catch_unwind(AssertUnwindSafe(|| {
            let mut total_us = 0.0;
            for _ in 0..BENCH_ITERATIONS {
                let started = Instant::now();
                workload();
                total_us += started.elapsed().as_secs_f64() * 1_000_000.0;
            }
            total_us / BENCH_ITERATIONS as f64
        }));
        result.map_err(|_| BenchmarkError::WorkloadPanicked(name.to_string()))
    }

    fn allocation_delta(&self, name: &str, workload: &Workload) -> Result<u64, BenchmarkError> {
        let workload = workload.clone();
        let before = alloc_meter::allocated_bytes();
        catch_unwind(AssertUnwindSafe(|| workload()))
            .map_err(|_| BenchmarkError::WorkloadPanicked(name.to_string()))?;
        let after = alloc_meter::allocated_bytes();
        Ok(after.saturating_sub(before))
    }

    fn count_source_lines(&self, target: &EvolvableTarget) -> Result<u64, BenchmarkError> {
        let source =
            std::fs::read_to_string(&target.source_path).map_err(|e| BenchmarkError::ReadFailed {
                path: target.source_path.clone(),
                why: e.to_string(),
            })?;
        Ok(source.lines().count() as u64)
    }
}
