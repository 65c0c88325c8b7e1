use crate::evolver::{Evolver, EvolverStatus};
use evo_budget::BudgetStatus;
use evo_history::HistorianStatus;
use evo_router::RouterStatus;
use serde::{Deserialize, Serialize};

/// The aggregate status document served by the control surface.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvoStatus {
    pub evolver: EvolverStatus,
    pub budget: BudgetStatus,
    pub router: RouterStatus,
    pub historian: HistorianStatus,
}

impl EvoStatus {
    pub async fn gather(evolver: &Evolver) -> Self {
        let historian = match evolver.historian().status().await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(error = %e, "historian status unavailable");
                HistorianStatus {
                    total_generations: 0,
                    counts_by_status: Default::default(),
                    latest: None,
                }
            }
        };
        Self {
            evolver: evolver.status(),
            budget: evolver.budget().status(),
            router: evolver.router().status(),
            historian,
        }
    }
}
