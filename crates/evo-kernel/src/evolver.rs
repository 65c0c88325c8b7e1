use crate::metrics::EvolutionMetrics;
use evo_applier::Applier;
use evo_benchmark::BenchmarkRunner;
use evo_budget::TokenBudget;
use evo_core::{EvolvableRegistry, EvolvableTarget, GenerationStatus, NewGeneration, Proposal};
use evo_fitness::{FitnessEvaluator, FitnessVerdict};
use evo_history::Historian;
use evo_router::ModelRouter;
use evo_synthesis::Proposer;
use evo_validator::Validator;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

const SCORE_HISTORY_WINDOW: usize = 100;

/// What one cycle concluded.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CycleResult {
    pub generation_number: u64,
    pub target_name: String,
    pub status: GenerationStatus,
    pub fitness_score: f64,
    /// Human-readable detail: the verdict, or the failure rendering.
    pub detail: String,
}

/// Evolver snapshot for the control surface.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvolverStatus {
    pub generation: u64,
    pub running: bool,
    pub interval_ms: u64,
    pub accept_rate: f64,
    pub metrics: EvolutionMetrics,
    pub last_result: Option<CycleResult>,
}

/// Everything a cycle touches, injected once at construction.
pub struct EvolverDeps {
    pub registry: EvolvableRegistry,
    pub benchmarker: Arc<dyn BenchmarkRunner>,
    pub proposer: Proposer,
    pub validator: Validator,
    pub applier: Applier,
    pub historian: Historian,
    pub fitness: FitnessEvaluator,
    pub budget: TokenBudget,
    pub router: ModelRouter,
}

struct MutableState {
    generation: u64,
    running: bool,
    last_result: Option<CycleResult>,
    metrics: EvolutionMetrics,
}

struct EvolverInner {
    deps: EvolverDeps,
    interval: Duration,
    state: Mutex<MutableState>,
    /// Serializes cycles: the schedule never re-enters while one runs.
    cycle_lock: tokio::sync::Mutex<()>,
    /// Wakes the scheduler on pause/resume, cancelling an armed tick.
    control: Notify,
    timer: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

/// The orchestrator. Cloning shares the underlying state machine.
#[derive(Clone)]
pub struct Evolver {
    inner: Arc<EvolverInner>,
}

impl Evolver {
    pub fn new(deps: EvolverDeps, interval: Duration) -> Self {
        Self {
            inner: Arc::new(EvolverInner {
                deps,
                interval,
                state: Mutex::new(MutableState {
                    generation: 0,
                    running: false,
                    last_result: None,
                    metrics: EvolutionMetrics::new(SCORE_HISTORY_WINDOW),
                }),
                cycle_lock: tokio::sync::Mutex::new(()),
                control: Notify::new(),
                timer: Mutex::new(None),
            }),
        }
    }

    /// Execute one cycle now, regardless of the running flag. Blocks the
    /// caller until the cycle completes; concurrent callers serialize.
    pub async fn run_once(&self) -> CycleResult {
        let _guard = self.inner.cycle_lock.lock().await;
        self.inner.run_cycle().await
    }

    /// Stop the schedule. Cancels the armed tick only; an in-flight cycle
    /// always runs to completion.
    pub fn pause(&self) {
        self.inner.set_running(false);
        self.inner.control.notify_waiters();
        tracing::info!("evolver paused");
    }

    /// Start (or restart) the schedule.
    pub fn resume(&self) {
        self.inner.set_running(true);
        let mut timer = self.inner.timer.lock().expect("lock not poisoned");
        let needs_spawn = timer.as_ref().map(|h| h.is_finished()).unwrap_or(true);
        if needs_spawn {
            let inner = self.inner.clone();
            *timer = Some(tokio::spawn(async move { inner.scheduler_loop().await }));
        }
        self.inner.control.notify_waiters();
        tracing::info!("evolver resumed");
    }

    /// Tear down the scheduler task.
    pub fn shutdown(&self) {
        self.inner.set_running(false);
        if let Some(handle) = self.inner.timer.lock().expect("lock not poisoned").take() {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.is_running()
    }

    pub fn generation(&self) -> u64 {
        self.inner.state.lock().expect("lock not poisoned").generation
    }

    pub fn status(&self) -> EvolverStatus {
        let state = self.inner.state.lock().expect("lock not poisoned");
        EvolverStatus {
            generation: state.generation,
            running: state.running,
            interval_ms: self.inner.interval.as_millis() as u64,
            accept_rate: state.metrics.accept_rate(),
            metrics: state.metrics.clone(),
            last_result: state.last_result.clone(),
        }
    }

    pub fn budget(&self) -> &TokenBudget {
        &self.inner.deps.budget
    }

    pub fn router(&self) -> &ModelRouter {
        &self.inner.deps.router
    }

    pub fn historian(&self) -> &Historian {
        &self.inner.deps.historian
    }
}

impl EvolverInner {
    fn is_running(&self) -> bool {
        self.state.lock().expect("lock not poisoned").running
    }

    fn set_running(&self, running: bool) {
        self.state.lock().expect("lock not poisoned").running = running;
    }

    async fn scheduler_loop(self: Arc<Self>) {
        loop {
            if self.is_running() {
                tokio::select! {
                    _ = tokio::time::sleep(self.interval) => {
                        if !self.is_running() {
                            continue;
                        }
                        // Skip the tick when a run_once cycle is in flight.
                        match self.cycle_lock.try_lock() {
                            Ok(_guard) => {
                                self.run_cycle().await;
                            }
                            Err(_) => {
                                tracing::debug!("tick skipped, cycle in progress");
                            }
                        }
                    }
                    _ = self.control.notified() => {}
                }
            } else {
                self.control.notified().await;
            }
        }
    }

    /// One full generation. Callers hold the cycle lock.
    async fn run_cycle(&self) -> CycleResult {
        let generation_number = {
            let state = self.state.lock().expect("lock not poisoned");
            state.generation + 1
        };
        let target = self.deps.registry.select(generation_number - 1).clone();
        tracing::info!(generation = generation_number, target = %target.name, "cycle start");

        let conclusion = self.execute(&target).await;

        // Router feedback: either accepted flavour is a success.
        if conclusion.status.is_accepted() {
            self.deps.router.report_success();
        } else {
            self.deps.router.report_failure();
        }

        // Persist. A historian failure is logged, never fatal: on the
        // accepted paths the new code is already live.
        let record = NewGeneration {
            generation_number,
            target_name: target.name.clone(),
            status: conclusion.status,
            fitness_score: conclusion.fitness_score,
            model_tag: conclusion.model_tag.clone(),
            tokens_in: conclusion.tokens_in,
            tokens_out: conclusion.tokens_out,
            reasoning: conclusion.reasoning.clone(),
            old_source: conclusion.old_source.clone(),
            new_source: conclusion.new_source.clone(),
        };
        if let Err(e) = self.deps.historian.record(record).await {
            tracing::error!(error = %e, generation = generation_number, "historian failed");
        }

        let result = CycleResult {
            generation_number,
            target_name: target.name,
            status: conclusion.status,
            fitness_score: conclusion.fitness_score,
            detail: conclusion.detail,
        };

        let mut state = self.state.lock().expect("lock not poisoned");
        state.generation = generation_number;
        state
            .metrics
            .record_outcome(result.status, result.fitness_score);
        state.last_result = Some(result.clone());
        tracing::info!(
            generation = result.generation_number,
            status = %result.status,
            score = result.fitness_score,
            "cycle complete"
        );
        result
    }

    async fn execute(&self, target: &EvolvableTarget) -> CycleConclusion {
        let before = match self.deps.benchmarker.run(target) {
            Ok(snapshot) => snapshot,
            Err(e) => return CycleConclusion::pre_proposal(&self.deps.router, e.to_string()),
        };

        let proposal = match self.deps.proposer.propose(target, Some(&before)).await {
            Ok(proposal) => proposal,
            Err(e) => return CycleConclusion::pre_proposal(&self.deps.router, e.to_string()),
        };

        if let Err(e) = self.deps.validator.validate(target, &proposal).await {
            return CycleConclusion::of(
                GenerationStatus::RejectedValidation,
                0.0,
                &proposal,
                e.to_string(),
            );
        }

        if let Err(e) = self.deps.applier.apply(&proposal).await {
            return CycleConclusion::of(GenerationStatus::Error, 0.0, &proposal, e.to_string());
        }

        let after = match self.deps.benchmarker.run(target) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                // The rewrite is live but unmeasurable; revert to the known
                // state before recording the error.
                if let Err(rollback_err) = self.deps.applier.rollback(&proposal).await {
                    tracing::error!(error = %rollback_err, "rollback after benchmark failure");
                }
                return CycleConclusion::of(GenerationStatus::Error, 0.0, &proposal, e.to_string());
            }
        };

        let verdict = self.deps.fitness.evaluate(&before, &after);
        match verdict {
            FitnessVerdict::Improved(score) => CycleConclusion::of(
                GenerationStatus::Accepted,
                score,
                &proposal,
                format!("improved ({score:.4})"),
            ),
            FitnessVerdict::Neutral(score) => CycleConclusion::of(
                GenerationStatus::AcceptedNeutral,
                score,
                &proposal,
                "neutral".into(),
            ),
            FitnessVerdict::Regressed(score) => {
                if let Err(e) = self.deps.applier.rollback(&proposal).await {
                    tracing::error!(error = %e, "rollback after regression");
                }
                CycleConclusion::of(
                    GenerationStatus::RejectedRegression,
                    score,
                    &proposal,
                    format!("regressed ({score:.4})"),
                )
            }
        }
    }
}

/// Internal summary of one executed cycle, pre-persistence.
struct CycleConclusion {
    status: GenerationStatus,
    fitness_score: f64,
    model_tag: String,
    tokens_in: u64,
    tokens_out: u64,
    reasoning: String,
    old_source: String,
    new_source: String,
    detail: String,
}

impl CycleConclusion {
    fn of(status: GenerationStatus, fitness_score: f64, proposal: &Proposal, detail: String) -> Self {
        Self {
            status,
            fitness_score,
            model_tag: proposal.model_tag.clone(),
            tokens_in: proposal.tokens_in,
            tokens_out: proposal.tokens_out,
            reasoning: proposal.reasoning.clone(),
            old_source: proposal.old_source.clone(),
            new_source: proposal.new_source.clone(),
            detail,
        }
    }

    /// Failure before a proposal existed: no sources, no usage.
    fn pre_proposal(router: &ModelRouter, detail: String) -> Self {
        Self {
            status: GenerationStatus::Error,
            fitness_score: 0.0,
            model_tag: router.current(),
            tokens_in: 0,
            tokens_out: 0,
            reasoning: String::new(),
            old_source: String::new(),
            new_source: String::new(),
            detail,
        }
    }
}
