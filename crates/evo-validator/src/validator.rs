use crate::ast;
use crate::compile::CompileSandbox;
use crate::error::ValidationError;
use crate::harness::TestHarness;
use crate::shape;
use crate::size;
use evo_core::{EvolvableTarget, Proposal};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What the validator observed for one proposal, emitted on every outcome.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ValidationTelemetry {
    pub target: String,
    pub compiled: bool,
    pub tests_passed: bool,
    /// Rendered rejection, when the pipeline rejected.
    pub rejection: Option<String>,
}

/// The five-gate pipeline. Gates run in order and the first failure
/// short-circuits; the static gates (1 to 3) always precede the executing
/// gates (4 and 5).
pub struct Validator {
    compiler: Arc<dyn CompileSandbox>,
    harness: Arc<dyn TestHarness>,
}

impl Validator {
    pub fn new(compiler: Arc<dyn CompileSandbox>, harness: Arc<dyn TestHarness>) -> Self {
        Self { compiler, harness }
    }

    pub async fn validate(
        &self,
        target: &EvolvableTarget,
        proposal: &Proposal,
    ) -> Result<ValidationTelemetry, ValidationError> {
        // Gate 1: size limit.
        if let Err(e) = size::size_gate(&proposal.old_source, &proposal.new_source) {
            return Err(self.reject(target, false, false, e));
        }

        // Gate 2: AST allowlist walk. Parsing happens here, before any
        // execution of the candidate.
        //
        // Scoped in a block: `syn::File` is not `Send`, so it must be
        // dropped before the `.await` points below or the futures in this
        // function become non-`Send`.
        {
            let parsed = match syn::parse_file(&proposal.new_source) {
                Ok(file) => file,
                Err(e) => {
                    return Err(self.reject(
                        target,
                        false,
                        false,
                        ValidationError::AstParseFailed(e.to_string()),
                    ))
                }
            };
            let violations = ast::walk(&parsed);
            if !violations.is_empty() {
                return Err(self.reject(
                    target,
                    false,
                    false,
                    ValidationError::UnsafeCode(violations),
                ));
            }

            // Gate 3: module-level side-effect scan.
            if let Err(e) = shape::shape_gate(&parsed) {
                return Err(self.reject(target, false, false, e));
            }
        }

        // Gate 4: compilation.
        if let Err(e) = self.compiler.compile(&proposal.new_source).await {
            return Err(self.reject(target, false, false, e));
        }

        // Gate 5: test execution against the candidate.
        if let Err(e) = self.harness.run_tests(target, &proposal.new_source).await {
            return Err(self.reject(target, true, false, e));
        }

        let telemetry = ValidationTelemetry {
            target: target.name.clone(),
            compiled: true,
            tests_passed: true,
            rejection: None,
        };
        tracing::info!(
            target = %telemetry.target,
            compiled = telemetry.compiled,
            tests_passed = telemetry.tests_passed,
            "validation passed"
        );
        Ok(telemetry)
    }

    fn reject(
        &self,
        target: &EvolvableTarget,
        compiled: bool,
        tests_passed: bool,
        error: ValidationError,
    ) -> ValidationError {
        tracing::warn!(
            target = %target.name,
            compiled,
            tests_passed,
            rejection = %error,
            "validation rejected"
        );
        error
    }
}
