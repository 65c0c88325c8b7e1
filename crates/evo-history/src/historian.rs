use crate::checkpoint::{CheckpointOutcome, Checkpointer};
use crate::error::HistoryError;
use crate::store::GenerationStore;
use evo_core::{GenerationRecord, GenerationStatus, NewGeneration};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Historian status for the control surface.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistorianStatus {
    pub total_generations: u64,
    pub counts_by_status: BTreeMap<GenerationStatus, u64>,
    pub latest: Option<u64>,
}

/// Persists generation records and emits the version-control checkpoint.
///
/// Persistence comes first: a failed checkpoint leaves the database row in
/// place, which describes a change that is already live.
#[derive(Clone)]
pub struct Historian {
    store: Arc<dyn GenerationStore>,
    checkpointer: Arc<dyn Checkpointer>,
}

impl Historian {
    pub fn new(store: Arc<dyn GenerationStore>, checkpointer: Arc<dyn Checkpointer>) -> Self {
        Self {
            store,
            checkpointer,
        }
    }

    /// Persist the record, then checkpoint. The row survives a checkpoint
    /// failure; the error is surfaced for the caller to log.
    pub async fn record(&self, attrs: NewGeneration) -> Result<GenerationRecord, HistoryError> {
        let record = self.store.insert(attrs).await?;
        let message = format!(
            "evo gen {}: {} {} (score {:.4})",
            record.generation_number, record.status, record.target_name, record.fitness_score
        );
        match self.checkpointer.checkpoint(&message).await? {
            CheckpointOutcome::Committed => {}
            CheckpointOutcome::NothingToCommit => {
                tracing::debug!(generation = record.generation_number, "nothing to commit");
            }
        }
        Ok(record)
    }

    pub async fn status(&self) -> Result<HistorianStatus, HistoryError> {
        let counts = self.store.count_by_status().await?;
        let latest = self
            .store
            .recent(1)
            .await?
            .first()
            .map(|r| r.generation_number);
        Ok(HistorianStatus {
            total_generations: self.store.count().await?,
            counts_by_status: counts,
            latest,
        })
    }

    pub async fn recent(&self, limit: usize) -> Result<Vec<GenerationRecord>, HistoryError> {
        self.store.recent(limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::SimulatedCheckpointer;
    use crate::store::InMemoryGenerationStore;

    fn attrs(generation_number: u64) -> NewGeneration {
        NewGeneration {
            generation_number,
            target_name: "token_meter".into(),
            status: GenerationStatus::Accepted,
            fitness_score: 0.2,
            model_tag: "sim".into(),
            tokens_in: 50,
            tokens_out: 10,
            reasoning: "tightened loop".into(),
            old_source: "old".into(),
            new_source: "new".into(),
        }
    }

    #[tokio::test]
    async fn record_persists_then_checkpoints() {
        let store = Arc::new(InMemoryGenerationStore::new());
        let cp = SimulatedCheckpointer::new();
        let historian = Historian::new(store.clone(), Arc::new(cp.clone()));
        let record = historian.record(attrs(1)).await.unwrap();
        assert_eq!(record.generation_number, 1);
        let messages = cp.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("evo gen 1"));
        assert!(messages[0].contains("accepted"));
    }

    #[tokio::test]
    async fn checkpoint_failure_leaves_the_row() {
        let store = Arc::new(InMemoryGenerationStore::new());
        let historian = Historian::new(store.clone(), Arc::new(SimulatedCheckpointer::failing("no repo")));
        let err = historian.record(attrs(1)).await.unwrap_err();
        assert!(matches!(err, HistoryError::GitCommitFailed(_)));
        // Persistence happened before the checkpoint attempt.
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn status_aggregates_counts() {
        let store = Arc::new(InMemoryGenerationStore::new());
        let historian = Historian::new(store, Arc::new(SimulatedCheckpointer::new()));
        historian.record(attrs(1)).await.unwrap();
        historian.record(attrs(2)).await.unwrap();
        let status = historian.status().await.unwrap();
        assert_eq!(status.total_generations, 2);
        assert_eq!(status.latest, Some(2));
        assert_eq!(
            status.counts_by_status.get(&GenerationStatus::Accepted),
            Some(&2)
        );
    }
}
