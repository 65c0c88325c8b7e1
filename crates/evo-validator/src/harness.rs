//! Gate 5: test execution in a child process.
//!
//! The harness materializes the candidate source and the target's test file
//! into a scratch tree, compiles the test file with `rustc --test`, and
//! runs the resulting binary with clean output capture. Exit zero passes;
//! any other exit fails with the captured output; a spawn failure is its
//! own error so a broken toolchain is distinguishable from a failing suite.

use crate::compile::truncate;
use crate::error::ValidationError;
use async_trait::async_trait;
use evo_core::EvolvableTarget;
use std::time::Duration;

const OUTPUT_LIMIT: usize = 8192;
const TEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Outcome of one test run.
#[derive(Clone, Debug)]
pub struct TestRun {
    pub passed: bool,
    pub output: String,
}

/// Test-execution seam. The real backend spawns processes; tests use
/// [`SimulatedTestHarness`].
#[async_trait]
pub trait TestHarness: Send + Sync {
    /// Run the target's test file against the candidate source.
    async fn run_tests(
        &self,
        target: &EvolvableTarget,
        candidate: &str,
    ) -> Result<TestRun, ValidationError>;
}

/// Builds a scratch copy of the evolvable layout with the candidate in
/// place of the current source, then compiles and runs the test file.
///
/// Test files reach their target with `include!("../<name>.rs")`, so the
/// scratch tree mirrors the `<root>/<name>.rs` + `<root>/tests/` layout.
pub struct ProcessTestHarness {
    timeout: Duration,
}

impl ProcessTestHarness {
    pub fn new() -> Self {
        Self {
            timeout: TEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for ProcessTestHarness {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TestHarness for ProcessTestHarness {
    async fn run_tests(
        &self,
        target: &EvolvableTarget,
        candidate: &str,
    ) -> Result<TestRun, ValidationError> {
        let scratch = tempfile::tempdir()
            .map_err(|e| ValidationError::TestExecutionFailed(format!("scratch dir: {e}")))?;
        let tests_dir = scratch.path().join("tests");
        tokio::fs::create_dir_all(&tests_dir)
            .await
            .map_err(|e| ValidationError::TestExecutionFailed(format!("scratch tests dir: {e}")))?;

        let candidate_path = scratch.path().join(format!("{}.rs", target.name));
        tokio::fs::write(&candidate_path, candidate)
            .await
            .map_err(|e| ValidationError::TestExecutionFailed(format!("write candidate: {e}")))?;

        let test_source = tokio::fs::read_to_string(&target.test_path)
            .await
            .map_err(|e| ValidationError::TestExecutionFailed(format!("read test file: {e}")))?;
        let test_path = tests_dir.join(format!("{}_test.rs", target.name));
        tokio::fs::write(&test_path, test_source)
            .await
            .map_err(|e| ValidationError::TestExecutionFailed(format!("write test file: {e}")))?;

        let runner = scratch.path().join("test_runner");
        let mut compile = tokio::process::Command::new("rustc");
        compile
            .arg("--edition")
            .arg("2021")
            .arg("--test")
            .arg(&test_path)
            .arg("-o")
            .arg(&runner)
            .kill_on_drop(true);

        let compiled = tokio::time::timeout(self.timeout, compile.output())
            .await
            .map_err(|_| ValidationError::TestExecutionFailed("test compile timed out".into()))?
            .map_err(|e| ValidationError::TestExecutionFailed(format!("spawn rustc: {e}")))?;
        if !compiled.status.success() {
            let stderr = String::from_utf8_lossy(&compiled.stderr);
            return Err(ValidationError::TestsFailed(truncate(&stderr, OUTPUT_LIMIT)));
        }

        let mut run = tokio::process::Command::new(&runner);
        run.kill_on_drop(true);
        let output = tokio::time::timeout(self.timeout, run.output())
            .await
            .map_err(|_| ValidationError::TestExecutionFailed("test run timed out".into()))?
            .map_err(|e| ValidationError::TestExecutionFailed(format!("spawn runner: {e}")))?;

        let mut captured = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.is_empty() {
            captured.push('\n');
            captured.push_str(&stderr);
        }
        let captured = truncate(&captured, OUTPUT_LIMIT);

        if output.status.success() {
            Ok(TestRun {
                passed: true,
                output: captured,
            })
        } else {
            Err(ValidationError::TestsFailed(captured))
        }
    }
}

/// Scripted harness for tests: pass, fail with output, or refuse to spawn.
pub struct SimulatedTestHarness {
    outcome: SimulatedOutcome,
}

enum SimulatedOutcome {
    Pass(String),
    Fail(String),
    SpawnFailure(String),
}

impl SimulatedTestHarness {
    pub fn passing() -> Self {
        Self {
            outcome: SimulatedOutcome::Pass("test result: ok".into()),
        }
    }

    pub fn failing(output: impl Into<String>) -> Self {
        Self {
            outcome: SimulatedOutcome::Fail(output.into()),
        }
    }

    pub fn broken(reason: impl Into<String>) -> Self {
        Self {
            outcome: SimulatedOutcome::SpawnFailure(reason.into()),
        }
    }
}

#[async_trait]
impl TestHarness for SimulatedTestHarness {
    async fn run_tests(
        &self,
        _target: &EvolvableTarget,
        _candidate: &str,
    ) -> Result<TestRun, ValidationError> {
        match &self.outcome {
            SimulatedOutcome::Pass(output) => Ok(TestRun {
                passed: true,
                output: output.clone(),
            }),
            SimulatedOutcome::Fail(output) => Err(ValidationError::TestsFailed(output.clone())),
            SimulatedOutcome::SpawnFailure(reason) => {
                Err(ValidationError::TestExecutionFailed(reason.clone()))
            }
        }
    }
}
