#![deny(unsafe_code)]
//! # evo-router
//!
//! Model escalation for the evolution loop. The router starts on the cheap
//! model and escalates to the capable one after a run of consecutive
//! failures; any success de-escalates immediately.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// The two routable model classes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    Cheap,
    Capable,
}

/// Router configuration: the fixed tag strings and the escalation threshold.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RouterConfig {
    pub cheap_tag: String,
    pub capable_tag: String,
    /// Consecutive failures on the cheap model required to escalate.
    pub escalation_threshold: u32,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            cheap_tag: "claude-3-5-haiku-latest".into(),
            capable_tag: "claude-sonnet-4-5".into(),
            escalation_threshold: 3,
        }
    }
}

#[derive(Clone, Debug)]
struct RouterState {
    current: ModelTier,
    consecutive_failures: u32,
    cheap_calls: u64,
    capable_calls: u64,
    escalations: u64,
}

/// Full router snapshot for dashboards.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RouterStatus {
    pub current: ModelTier,
    pub current_tag: String,
    pub consecutive_failures: u32,
    pub cheap_calls: u64,
    pub capable_calls: u64,
    pub escalations: u64,
    pub escalation_threshold: u32,
}

/// Shared model-router handle. Cloning shares the underlying state.
#[derive(Clone)]
pub struct ModelRouter {
    config: Arc<RouterConfig>,
    state: Arc<Mutex<RouterState>>,
}

impl ModelRouter {
    pub fn new(config: RouterConfig) -> Self {
        Self {
            config: Arc::new(config),
            state: Arc::new(Mutex::new(RouterState {
                current: ModelTier::Cheap,
                consecutive_failures: 0,
                cheap_calls: 0,
                capable_calls: 0,
                escalations: 0,
            })),
        }
    }

    /// The tag string the proposer should use for the next call.
    pub fn current(&self) -> String {
        let state = self.state.lock().expect("lock not poisoned");
        self.tag_for(state.current)
    }

    /// Report a successful generation.
    ///
    /// Resets the failure streak and de-escalates. The call counter of the
    /// tier that served the completed call is bumped before any switch.
    pub fn report_success(&self) {
        let mut state = self.state.lock().expect("lock not poisoned");
        Self::count_call(&mut state);
        state.consecutive_failures = 0;
        if state.current == ModelTier::Capable {
            tracing::info!(
                from = %self.tag_for(ModelTier::Capable),
                to = %self.tag_for(ModelTier::Cheap),
                "de-escalating after success"
            );
        }
        state.current = ModelTier::Cheap;
    }

    /// Report a failed generation.
    ///
    /// Increments the failure streak; once the streak reaches the threshold
    /// while on the cheap model, escalates to the capable one.
    pub fn report_failure(&self) {
        let mut state = self.state.lock().expect("lock not poisoned");
        Self::count_call(&mut state);
        state.consecutive_failures += 1;
        if state.current == ModelTier::Cheap
            && state.consecutive_failures >= self.config.escalation_threshold
        {
            state.current = ModelTier::Capable;
            state.escalations += 1;
            tracing::warn!(
                consecutive_failures = state.consecutive_failures,
                to = %self.tag_for(ModelTier::Capable),
                "escalating model after repeated failures"
            );
        }
    }

    pub fn status(&self) -> RouterStatus {
        let state = self.state.lock().expect("lock not poisoned");
        RouterStatus {
            current: state.current,
            current_tag: self.tag_for(state.current),
            consecutive_failures: state.consecutive_failures,
            cheap_calls: state.cheap_calls,
            capable_calls: state.capable_calls,
            escalations: state.escalations,
            escalation_threshold: self.config.escalation_threshold,
        }
    }

    fn tag_for(&self, tier: ModelTier) -> String {
        match tier {
            ModelTier::Cheap => self.config.cheap_tag.clone(),
            ModelTier::Capable => self.config.capable_tag.clone(),
        }
    }

    fn count_call(state: &mut RouterState) {
        match state.current {
            ModelTier::Cheap => state.cheap_calls += 1,
            ModelTier::Capable => state.capable_calls += 1,
        }
    }
}

impl Default for ModelRouter {
    fn default() -> Self {
        Self::new(RouterConfig::default())
    }
}
