//! Representative workloads for the fixed evolvable surface.
//!
//! Each closure invokes a target's public surface with canned arguments,
//! which keeps fitness comparable across rewrites even when the target's
//! internal code path changes completely.

use evo_benchmark::WorkloadTable;
use evo_core::BenchmarkSnapshot;
use evo_fitness::FitnessEvaluator;
use evo_synthesis::{token_estimate, PromptBuilder};

const SAMPLE_SOURCE: &str = "pub fn shape(input: &str) -> String {\n    input.trim().to_string()\n}\n";
const SAMPLE_TEXT: &str = "The evolution loop measures, proposes, validates, applies, and decides.";

/// The standard workload table covering every registry target.
pub fn default_workloads() -> WorkloadTable {
    WorkloadTable::new()
        .register("prompt_builder", || {
            let snapshot = BenchmarkSnapshot::with_required(120.0, 4096, 24);
            let prompt = PromptBuilder::build("prompt_builder", SAMPLE_SOURCE, Some(&snapshot));
            assert!(!prompt.is_empty());
        })
        .register("fitness_evaluator", || {
            let evaluator = FitnessEvaluator::new();
            let before = BenchmarkSnapshot::with_required(100.0, 2048, 40);
            let after = BenchmarkSnapshot::with_required(90.0, 2048, 38);
            let verdict = evaluator.evaluate(&before, &after);
            assert!(verdict.score() >= 0.0);
        })
        .register("token_meter", || {
            let estimate = token_estimate(SAMPLE_TEXT);
            assert!(estimate > 0);
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use evo_core::registry::TARGET_NAMES;

    #[test]
    fn every_registry_target_has_a_workload() {
        let table = default_workloads();
        for name in TARGET_NAMES {
            assert!(table.get(name).is_some(), "missing workload for {name}");
        }
    }

    #[test]
    fn workloads_run_without_panicking() {
        let table = default_workloads();
        for name in table.names() {
            (table.get(&name).unwrap())();
        }
    }
}
