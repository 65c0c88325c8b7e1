use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// One finding from the AST allowlist walk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Violation {
    /// Qualified call into a namespace outside the allowlist.
    DisallowedModule(String),
    /// Call, qualified or bare, whose short name is banned.
    BannedFunction(String),
    /// Reference to a banned runtime facility (shell, filesystem,
    /// networking, unsafe, FFI).
    BannedRuntime(String),
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::DisallowedModule(name) => write!(f, "disallowed module `{name}`"),
            Violation::BannedFunction(name) => write!(f, "banned function `{name}`"),
            Violation::BannedRuntime(name) => write!(f, "banned runtime facility `{name}`"),
        }
    }
}

/// Structured rejection from the gate pipeline. The first failing gate
/// short-circuits, so exactly one of these describes any rejection.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("change of {changed} lines exceeds cap of {cap}")]
    TooManyChanges { changed: usize, cap: usize },
    #[error("candidate does not parse: {0}")]
    AstParseFailed(String),
    #[error("unsafe code: {}", format_violations(.0))]
    UnsafeCode(Vec<Violation>),
    #[error("candidate is not a module")]
    NotAModule,
    #[error("{0} module-level side-effecting item(s)")]
    ModuleLevelSideEffects(usize),
    #[error("compilation failed: {0}")]
    CompilationFailed(String),
    #[error("tests failed: {0}")]
    TestsFailed(String),
    #[error("test execution failed: {0}")]
    TestExecutionFailed(String),
}

fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
