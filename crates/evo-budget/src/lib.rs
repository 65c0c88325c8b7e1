#![deny(unsafe_code)]
//! # evo-budget
//!
//! Token-budget accounting for the evolution loop. A single budget handle is
//! shared across the system; the proposer queries it before every LLM call
//! and records attributed usage afterwards.
//!
//! The daily window resets lazily at UTC midnight: the first query of a new
//! day performs the reset before answering. A periodic refresh task keeps
//! dashboards fresh even when nothing queries.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Interval of the background refresh tick.
const REFRESH_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[derive(Clone, Debug, Serialize, Deserialize)]
struct BudgetState {
    daily_cap: u64,
    tokens_used_today: u64,
    api_calls_today: u64,
    total_tokens_in: u64,
    total_tokens_out: u64,
    last_reset_date: NaiveDate,
}

/// Snapshot of the budget for dashboards and the control surface.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BudgetStatus {
    pub daily_cap: u64,
    pub tokens_used_today: u64,
    pub tokens_remaining_today: u64,
    /// Percentage of the daily cap consumed, rounded to one decimal.
    pub percent_used: f64,
    pub api_calls_today: u64,
    pub total_tokens_in: u64,
    pub total_tokens_out: u64,
    pub last_reset_date: NaiveDate,
}

/// Shared token-budget handle. Cloning shares the underlying state.
///
/// All mutation happens behind the internal lock; callers only see the
/// operations below.
#[derive(Clone)]
pub struct TokenBudget {
    state: Arc<Mutex<BudgetState>>,
}

impl TokenBudget {
    pub fn new(daily_cap: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(BudgetState {
                daily_cap,
                tokens_used_today: 0,
                api_calls_today: 0,
                total_tokens_in: 0,
                total_tokens_out: 0,
                last_reset_date: Utc::now().date_naive(),
            })),
        }
    }

    /// Whether another LLM call fits in today's window.
    ///
    /// Applies the lazy midnight reset first, so the answer is always
    /// relative to the current UTC date.
    pub fn has_budget(&self) -> bool {
        let mut state = self.state.lock().expect("lock not poisoned");
        Self::reset_if_stale(&mut state);
        state.tokens_used_today < state.daily_cap
    }

    /// Record attributed usage for a completed call.
    pub fn record(&self, tokens_in: u64, tokens_out: u64) {
        let mut state = self.state.lock().expect("lock not poisoned");
        Self::reset_if_stale(&mut state);
        state.tokens_used_today += tokens_in + tokens_out;
        state.total_tokens_in += tokens_in;
        state.total_tokens_out += tokens_out;
        state.api_calls_today += 1;
        tracing::debug!(
            tokens_in,
            tokens_out,
            used_today = state.tokens_used_today,
            "recorded token usage"
        );
    }

    /// Point-in-time status, post lazy reset.
    pub fn status(&self) -> BudgetStatus {
        let mut state = self.state.lock().expect("lock not poisoned");
        Self::reset_if_stale(&mut state);
        let remaining = state.daily_cap.saturating_sub(state.tokens_used_today);
        let percent_used = if state.daily_cap == 0 {
            100.0
        } else {
            let raw = state.tokens_used_today as f64 / state.daily_cap as f64 * 100.0;
            (raw * 10.0).round() / 10.0
        };
        BudgetStatus {
            daily_cap: state.daily_cap,
            tokens_used_today: state.tokens_used_today,
            tokens_remaining_today: remaining,
            percent_used,
            api_calls_today: state.api_calls_today,
            total_tokens_in: state.total_tokens_in,
            total_tokens_out: state.total_tokens_out,
            last_reset_date: state.last_reset_date,
        }
    }

    /// Explicit daily reset. Idempotent: two resets equal one.
    pub fn reset(&self) {
        let mut state = self.state.lock().expect("lock not poisoned");
        Self::reset_daily(&mut state);
    }

    /// Spawn the hourly refresh task so the lazy reset fires even without
    /// queries. Aborting the returned handle stops the tick.
    pub fn spawn_refresh_task(&self) -> tokio::task::JoinHandle<()> {
        let budget = self.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(REFRESH_INTERVAL);
            tick.tick().await; // first tick completes immediately
            loop {
                tick.tick().await;
                let mut state = budget.state.lock().expect("lock not poisoned");
                Self::reset_if_stale(&mut state);
            }
        })
    }

    fn reset_if_stale(state: &mut BudgetState) {
        if state.last_reset_date != Utc::now().date_naive() {
            tracing::info!(date = %Utc::now().date_naive(), "daily token budget reset");
            Self::reset_daily(state);
        }
    }

    fn reset_daily(state: &mut BudgetState) {
        state.tokens_used_today = 0;
        state.api_calls_today = 0;
        state.last_reset_date = Utc::now().date_naive();
    }
}
