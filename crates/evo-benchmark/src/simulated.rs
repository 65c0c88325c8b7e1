use crate::benchmarker::{BenchmarkError, BenchmarkRunner};
use evo_core::{BenchmarkSnapshot, EvolvableTarget};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Scripted runner for tests and demos: snapshots are served in FIFO order
/// and the last one repeats once the script runs out.
#[derive(Clone, Default)]
pub struct SimulatedBenchmarkRunner {
    snapshots: Arc<Mutex<VecDeque<BenchmarkSnapshot>>>,
    last: Arc<Mutex<Option<BenchmarkSnapshot>>>,
    failure: Option<String>,
}

impl SimulatedBenchmarkRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(self, snapshot: BenchmarkSnapshot) -> Self {
        self.snapshots
            .lock()
            .expect("lock not poisoned")
            .push_back(snapshot);
        self
    }

    /// Runner that always fails, for error-path tests.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            snapshots: Arc::new(Mutex::new(VecDeque::new())),
            last: Arc::new(Mutex::new(None)),
            failure: Some(reason.into()),
        }
    }
}

impl BenchmarkRunner for SimulatedBenchmarkRunner {
    fn run(&self, target: &EvolvableTarget) -> Result<BenchmarkSnapshot, BenchmarkError> {
        if let Some(reason) = &self.failure {
            return Err(BenchmarkError::WorkloadPanicked(format!(
                "{}: {reason}",
                target.name
            )));
        }
        let next = self
            .snapshots
            .lock()
            .expect("lock not poisoned")
            .pop_front();
        match next {
            Some(snapshot) => {
                *self.last.lock().expect("lock not poisoned") = Some(snapshot.clone());
                Ok(snapshot)
            }
            None => self
                .last
                .lock()
                .expect("lock not poisoned")
                .clone()
                .ok_or_else(|| BenchmarkError::NoWorkload(target.name.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evo_core::EvolvableRegistry;

    fn target() -> EvolvableTarget {
        EvolvableRegistry::standard("/tmp/evolvable")
            .get("prompt_builder")
            .unwrap()
            .clone()
    }

    #[test]
    fn serves_script_in_order_then_repeats() {
        let runner = SimulatedBenchmarkRunner::new()
            .with_snapshot(BenchmarkSnapshot::with_required(100.0, 10, 5))
            .with_snapshot(BenchmarkSnapshot::with_required(80.0, 10, 5));
        assert_eq!(runner.run(&target()).unwrap().execution_time_us(), Some(100.0));
        assert_eq!(runner.run(&target()).unwrap().execution_time_us(), Some(80.0));
        assert_eq!(runner.run(&target()).unwrap().execution_time_us(), Some(80.0));
    }

    #[test]
    fn empty_script_is_an_error() {
        let runner = SimulatedBenchmarkRunner::new();
        assert!(runner.run(&target()).is_err());
    }

    #[test]
    fn failing_runner_reports_the_target() {
        let runner = SimulatedBenchmarkRunner::failing("disk on fire");
        let err = runner.run(&target()).unwrap_err();
        assert!(err.to_string().contains("prompt_builder"));
    }
}
