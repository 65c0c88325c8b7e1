#![deny(unsafe_code)]
//! # evo-server
//!
//! The thin dashboard control surface: status aggregation, pause, resume,
//! and a rate-limited run-once. The evolver owns all semantics; this crate
//! only pins the HTTP contracts.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use evo_kernel::{CycleResult, EvoStatus, Evolver};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Minimum spacing between manual run-once triggers.
const RUN_ONCE_MIN_INTERVAL: Duration = Duration::from_secs(30);
/// Deadline for one manual cycle.
const RUN_ONCE_DEADLINE: Duration = Duration::from_secs(5 * 60);

#[derive(Clone)]
pub struct AppState {
    evolver: Evolver,
    last_manual_run: Arc<Mutex<Option<Instant>>>,
}

impl AppState {
    pub fn new(evolver: Evolver) -> Self {
        Self {
            evolver,
            last_manual_run: Arc::new(Mutex::new(None)),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/status", get(status))
        .route("/pause", post(pause))
        .route("/resume", post(resume))
        .route("/run-once", post(run_once))
        .with_state(state)
}

async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn status(State(state): State<AppState>) -> Json<EvoStatus> {
    Json(EvoStatus::gather(&state.evolver).await)
}

async fn pause(State(state): State<AppState>) -> Json<Value> {
    state.evolver.pause();
    Json(json!({ "running": false }))
}

async fn resume(State(state): State<AppState>) -> Json<Value> {
    state.evolver.resume();
    Json(json!({ "running": true }))
}

async fn run_once(
    State(state): State<AppState>,
) -> Result<Json<CycleResult>, (StatusCode, Json<Value>)> {
    {
        let mut last = state.last_manual_run.lock().expect("lock not poisoned");
        if let Some(at) = *last {
            let since = at.elapsed();
            if since < RUN_ONCE_MIN_INTERVAL {
                let wait = (RUN_ONCE_MIN_INTERVAL - since).as_secs();
                return Err((
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(json!({ "error": "run-once rate limited", "retry_in_secs": wait })),
                ));
            }
        }
        *last = Some(Instant::now());
    }

    match tokio::time::timeout(RUN_ONCE_DEADLINE, state.evolver.run_once()).await {
        Ok(result) => Ok(Json(result)),
        Err(_) => Err((
            StatusCode::GATEWAY_TIMEOUT,
            Json(json!({ "error": "cycle exceeded deadline" })),
        )),
    }
}
