//! Evo demo binary: the full evolution loop against a temporary evolvable
//! tree, with simulated LLM / compile / test / checkpoint seams.
//!
//! Walks through:
//! 1. An accepted neutral rewrite
//! 2. A validator rejection (unsafe candidate)
//! 3. Escalation to the capable model after repeated failures
//! 4. De-escalation on the next success
//!
//! No network, no toolchain, no git repository required.

use anyhow::Result;
use evo_applier::{Applier, SimulatedReloader};
use evo_benchmark::SimulatedBenchmarkRunner;
use evo_budget::TokenBudget;
use evo_core::{BenchmarkSnapshot, EvolvableRegistry, GenerationStatus};
use evo_fitness::FitnessEvaluator;
use evo_history::{Historian, InMemoryGenerationStore, SimulatedCheckpointer};
use evo_kernel::{EvoConfig, EvoStatus, Evolver, EvolverDeps};
use evo_router::{ModelRouter, RouterConfig};
use evo_synthesis::{Proposer, SimulatedChatModel};
use evo_validator::{SimulatedCompileSandbox, SimulatedTestHarness, Validator};
use std::fs;
use std::sync::Arc;
use std::time::Duration;

const BANNER: &str = r#"
 =====================================================
  Evo  --  self-rewriting loop, simulated end to end
 =====================================================
"#;

const SEED: &str = "pub fn estimate(text: &str) -> u64 {\n    (text.len() as u64 + 3) / 4\n}\n";

fn section(title: &str) {
    println!();
    println!(" --- {title} ---");
}

fn outcome(result: &evo_kernel::CycleResult) {
    println!(
        "   gen {:>2}  {:<20} {:<20} score {:>7.4}  {}",
        result.generation_number,
        result.target_name,
        result.status.to_string(),
        result.fitness_score,
        result.detail
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(tracing::Level::WARN)
        .init();

    println!("{BANNER}");

    let workspace = tempfile::tempdir()?;
    let evolvable = workspace.path().join("evolvable");
    fs::create_dir_all(evolvable.join("tests"))?;
    for name in evo_core::registry::TARGET_NAMES {
        fs::write(evolvable.join(format!("{name}.rs")), SEED)?;
    }

    let config = EvoConfig::demo();
    config.validate()?;

    // Scripted replies: a clean rewrite, an unsafe one, two broken ones,
    // then a clean rewrite again. With the default threshold of 3 the
    // fourth cycle runs on the capable model.
    let chat = SimulatedChatModel::new()
        .with_reply(format!("```rust\n{SEED}```\nReasoning: already minimal."), 640, 48)
        .with_reply(
            "```rust\npub fn estimate(_t: &str) -> u64 {\n    std::process::Command::new(\"nproc\");\n    0\n}\n```\nReasoning: hardware aware.",
            650,
            52,
        )
        .with_reply("no code here, sorry", 630, 12)
        .with_reply("still no code", 630, 12)
        .with_reply(format!("```rust\n{SEED}```\nReasoning: back to the known-good shape."), 900, 60);

    let budget = TokenBudget::new(config.daily_budget);
    let router = ModelRouter::new(RouterConfig {
        cheap_tag: config.cheap_model_tag.clone(),
        capable_tag: config.capable_model_tag.clone(),
        escalation_threshold: config.escalation_threshold,
    });

    let deps = EvolverDeps {
        registry: EvolvableRegistry::standard(&evolvable),
        benchmarker: Arc::new(
            SimulatedBenchmarkRunner::new()
                .with_snapshot(BenchmarkSnapshot::with_required(118.0, 3072, 3)),
        ),
        proposer: Proposer::new(Arc::new(chat), budget.clone(), router.clone()),
        validator: Validator::new(
            Arc::new(SimulatedCompileSandbox::passing()),
            Arc::new(SimulatedTestHarness::passing()),
        ),
        applier: Applier::new(&evolvable, Arc::new(SimulatedReloader::new())),
        historian: Historian::new(
            Arc::new(InMemoryGenerationStore::new()),
            Arc::new(SimulatedCheckpointer::new()),
        ),
        fitness: FitnessEvaluator::new(),
        budget: budget.clone(),
        router: router.clone(),
    };
    let evolver = Evolver::new(deps, Duration::from_millis(config.interval_ms));

    section("Phase A: accepted rewrite");
    let first = evolver.run_once().await;
    outcome(&first);
    assert_eq!(first.status, GenerationStatus::AcceptedNeutral);

    section("Phase B: unsafe candidate rejected");
    let second = evolver.run_once().await;
    outcome(&second);
    assert_eq!(second.status, GenerationStatus::RejectedValidation);

    section("Phase C: repeated failures escalate the model");
    for _ in 0..2 {
        let result = evolver.run_once().await;
        outcome(&result);
    }
    println!("   router now on: {}", router.current());
    assert_eq!(router.current(), config.capable_model_tag);

    section("Phase D: success de-escalates");
    let recovered = evolver.run_once().await;
    outcome(&recovered);
    println!("   router back on: {}", router.current());
    assert_eq!(router.current(), config.cheap_model_tag);

    section("Final status");
    let status = EvoStatus::gather(&evolver).await;
    println!(
        "   generations: {}   accept rate: {:.2}   escalations: {}",
        status.evolver.generation, status.evolver.accept_rate, status.router.escalations
    );
    println!(
        "   tokens today: {} / {} ({:.1}%)   api calls: {}",
        status.budget.tokens_used_today,
        status.budget.daily_cap,
        status.budget.percent_used,
        status.budget.api_calls_today
    );
    println!(
        "   history: {} rows, latest gen {:?}",
        status.historian.total_generations, status.historian.latest
    );

    println!();
    println!(" Demo complete.");
    Ok(())
}
