use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metric key: mean wall time of one representative invocation, in
/// microseconds.
pub const EXECUTION_TIME_US: &str = "execution_time_us";
/// Metric key: heap delta of one representative invocation, in bytes.
pub const MEMORY_BYTES: &str = "memory_bytes";
/// Metric key: newline-delimited lines of the on-disk source.
pub const CODE_SIZE_LINES: &str = "code_size_lines";

/// A point-in-time measurement of one target.
///
/// The map holds metric name to numeric value; fitness math iterates the
/// keys and treats missing metrics as contributing zero. The timestamp is
/// observability only and never enters fitness math.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkSnapshot {
    pub metrics: BTreeMap<String, f64>,
    pub captured_at: DateTime<Utc>,
}

impl BenchmarkSnapshot {
    pub fn new(metrics: BTreeMap<String, f64>) -> Self {
        Self {
            metrics,
            captured_at: Utc::now(),
        }
    }

    /// Snapshot with the three required metrics set.
    pub fn with_required(execution_time_us: f64, memory_bytes: u64, code_size_lines: u64) -> Self {
        let mut metrics = BTreeMap::new();
        metrics.insert(EXECUTION_TIME_US.to_string(), execution_time_us.max(0.0));
        metrics.insert(MEMORY_BYTES.to_string(), memory_bytes as f64);
        metrics.insert(CODE_SIZE_LINES.to_string(), code_size_lines as f64);
        Self::new(metrics)
    }

    /// Empty snapshot (no metrics). Fitness against another empty snapshot
    /// scores exactly zero.
    pub fn empty() -> Self {
        Self::new(BTreeMap::new())
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.metrics.get(key).copied()
    }

    pub fn execution_time_us(&self) -> Option<f64> {
        self.get(EXECUTION_TIME_US)
    }

    pub fn memory_bytes(&self) -> Option<f64> {
        self.get(MEMORY_BYTES)
    }

    pub fn code_size_lines(&self) -> Option<f64> {
        self.get(CODE_SIZE_LINES)
    }
}
