//! Shared fixtures for the end-to-end scenarios.

use evo_applier::{Applier, SimulatedReloader};
use evo_benchmark::SimulatedBenchmarkRunner;
use evo_budget::TokenBudget;
use evo_core::{BenchmarkSnapshot, EvolvableRegistry};
use evo_fitness::FitnessEvaluator;
use evo_history::{Historian, InMemoryGenerationStore, SimulatedCheckpointer};
use evo_kernel::{Evolver, EvolverDeps};
use evo_router::{ModelRouter, RouterConfig};
use evo_synthesis::{Proposer, SimulatedChatModel};
use evo_validator::{SimulatedCompileSandbox, SimulatedTestHarness, Validator};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const SEED_SOURCE: &str =
    "pub fn estimate(text: &str) -> u64 {\n    (text.len() as u64 + 3) / 4\n}\n";

/// Handles the scenarios poke at after driving the evolver.
pub struct Fixture {
    pub evolver: Evolver,
    pub budget: TokenBudget,
    pub router: ModelRouter,
    pub store: Arc<InMemoryGenerationStore>,
    pub evolvable_dir: std::path::PathBuf,
}

impl Fixture {
    /// The persisted record for one generation; panics when absent.
    pub async fn store_record(&self, generation_number: u64) -> evo_core::GenerationRecord {
        use evo_history::GenerationStore;
        self.store
            .get(generation_number)
            .await
            .unwrap()
            .expect("generation persisted")
    }
}

/// Seed every registry target with the standard source.
pub fn seed_tree(dir: &Path) -> std::path::PathBuf {
    let evolvable = dir.join("evolvable");
    fs::create_dir_all(evolvable.join("tests")).unwrap();
    for name in evo_core::registry::TARGET_NAMES {
        fs::write(evolvable.join(format!("{name}.rs")), SEED_SOURCE).unwrap();
        fs::write(
            evolvable.join("tests").join(format!("{name}_test.rs")),
            "#[test]\nfn holds() { assert!(true); }\n",
        )
        .unwrap();
    }
    evolvable
}

/// Build an evolver with simulated seams, scripted chat replies, and
/// scripted benchmark snapshots.
pub fn fixture(
    dir: &Path,
    chat: SimulatedChatModel,
    benchmarks: SimulatedBenchmarkRunner,
    daily_budget: u64,
) -> Fixture {
    let evolvable = seed_tree(dir);
    let budget = TokenBudget::new(daily_budget);
    let router = ModelRouter::new(RouterConfig::default());
    let store = Arc::new(InMemoryGenerationStore::new());
    let deps = EvolverDeps {
        registry: EvolvableRegistry::standard(&evolvable),
        benchmarker: Arc::new(benchmarks),
        proposer: Proposer::new(Arc::new(chat), budget.clone(), router.clone()),
        validator: Validator::new(
            Arc::new(SimulatedCompileSandbox::passing()),
            Arc::new(SimulatedTestHarness::passing()),
        ),
        applier: Applier::new(&evolvable, Arc::new(SimulatedReloader::new())),
        historian: Historian::new(store.clone(), Arc::new(SimulatedCheckpointer::new())),
        fitness: FitnessEvaluator::new(),
        budget: budget.clone(),
        router: router.clone(),
    };
    Fixture {
        evolver: Evolver::new(deps, Duration::from_secs(300)),
        budget,
        router,
        store,
        evolvable_dir: evolvable,
    }
}

/// A reply whose fenced block carries `source`.
pub fn reply_with(source: &str) -> String {
    format!("```rust\n{source}```\nReasoning: adjusted.")
}

/// Steady benchmark script: every measurement identical.
pub fn steady_benchmarks() -> SimulatedBenchmarkRunner {
    SimulatedBenchmarkRunner::new()
        .with_snapshot(BenchmarkSnapshot::with_required(100.0, 2048, 3))
}
