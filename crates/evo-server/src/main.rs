//! Production assembly: real transports, real gates, SQLite persistence,
//! git checkpointing.

use anyhow::Result;
use evo_applier::{Applier, PassthroughReloader};
use evo_benchmark::Benchmarker;
use evo_budget::TokenBudget;
use evo_core::EvolvableRegistry;
use evo_fitness::FitnessEvaluator;
use evo_history::{GitCheckpointer, Historian, SqliteGenerationStore};
use evo_kernel::{default_workloads, EvoConfig, Evolver, EvolverDeps};
use evo_router::{ModelRouter, RouterConfig};
use evo_server::{build_router, AppState};
use evo_synthesis::{AnthropicClient, Proposer};
use evo_validator::{ProcessTestHarness, RustcCompileSandbox, Validator};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static ALLOC: evo_benchmark::alloc_meter::CountingAllocator =
    evo_benchmark::alloc_meter::CountingAllocator;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = EvoConfig::from_env()?;
    config.validate()?;
    let api_key = config.api_key.clone().expect("validated above");

    let budget = TokenBudget::new(config.daily_budget);
    let budget_tick = budget.spawn_refresh_task();
    let router = ModelRouter::new(RouterConfig {
        cheap_tag: config.cheap_model_tag.clone(),
        capable_tag: config.capable_model_tag.clone(),
        escalation_threshold: config.escalation_threshold,
    });

    let chat = Arc::new(AnthropicClient::new(api_key)?);
    let store = Arc::new(SqliteGenerationStore::open("evo.db")?);
    let checkpointer = Arc::new(GitCheckpointer::new(".", &config.evolvable_dir));

    let deps = EvolverDeps {
        registry: EvolvableRegistry::standard(&config.evolvable_dir),
        benchmarker: Arc::new(Benchmarker::new(default_workloads())),
        proposer: Proposer::new(chat, budget.clone(), router.clone()),
        validator: Validator::new(
            Arc::new(RustcCompileSandbox::new()),
            Arc::new(ProcessTestHarness::new()),
        ),
        applier: Applier::new(&config.evolvable_dir, Arc::new(PassthroughReloader)),
        historian: Historian::new(store, checkpointer),
        fitness: FitnessEvaluator::new(),
        budget,
        router,
    };

    let evolver = Evolver::new(deps, Duration::from_millis(config.interval_ms));
    if config.auto_start {
        evolver.resume();
    }

    let addr = std::env::var("EVO_SERVER_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("evo control surface listening on http://{}", addr);
    axum::serve(listener, build_router(AppState::new(evolver.clone()))).await?;

    evolver.shutdown();
    budget_tick.abort();
    Ok(())
}
