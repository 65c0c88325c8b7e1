use crate::error::HistoryError;
use async_trait::async_trait;
use chrono::Utc;
use evo_core::{GenerationRecord, GenerationStatus, NewGeneration};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// Pluggable persistence backend for generation records.
///
/// Implementations must enforce the uniqueness of `generation_number` and
/// only ever hold statuses from the enumerated set.
#[async_trait]
pub trait GenerationStore: Send + Sync {
    /// Persist a record, assigning the surrogate key and timestamp.
    async fn insert(&self, attrs: NewGeneration) -> Result<GenerationRecord, HistoryError>;

    /// Fetch by generation number.
    async fn get(&self, generation_number: u64) -> Result<Option<GenerationRecord>, HistoryError>;

    /// Most recent records, newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<GenerationRecord>, HistoryError>;

    /// Row count per status.
    async fn count_by_status(&self) -> Result<BTreeMap<GenerationStatus, u64>, HistoryError>;

    /// Total row count.
    async fn count(&self) -> Result<u64, HistoryError>;
}

/// In-memory store for tests and the demo.
#[derive(Clone, Default)]
pub struct InMemoryGenerationStore {
    rows: Arc<RwLock<Vec<GenerationRecord>>>,
}

impl InMemoryGenerationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GenerationStore for InMemoryGenerationStore {
    async fn insert(&self, attrs: NewGeneration) -> Result<GenerationRecord, HistoryError> {
        let mut rows = self.rows.write().expect("lock not poisoned");
        if rows
            .iter()
            .any(|r| r.generation_number == attrs.generation_number)
        {
            return Err(HistoryError::DuplicateGeneration(attrs.generation_number));
        }
        let record = GenerationRecord {
            id: rows.len() as i64 + 1,
            generation_number: attrs.generation_number,
            target_name: attrs.target_name,
            status: attrs.status,
            fitness_score: attrs.fitness_score,
            model_tag: attrs.model_tag,
            tokens_in: attrs.tokens_in,
            tokens_out: attrs.tokens_out,
            reasoning: attrs.reasoning,
            old_source: attrs.old_source,
            new_source: attrs.new_source,
            created_at: Utc::now(),
        };
        rows.push(record.clone());
        Ok(record)
    }

    async fn get(&self, generation_number: u64) -> Result<Option<GenerationRecord>, HistoryError> {
        let rows = self.rows.read().expect("lock not poisoned");
        Ok(rows
            .iter()
            .find(|r| r.generation_number == generation_number)
            .cloned())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<GenerationRecord>, HistoryError> {
        let rows = self.rows.read().expect("lock not poisoned");
        let mut out: Vec<GenerationRecord> = rows.clone();
        out.sort_by(|a, b| b.generation_number.cmp(&a.generation_number));
        out.truncate(limit);
        Ok(out)
    }

    async fn count_by_status(&self) -> Result<BTreeMap<GenerationStatus, u64>, HistoryError> {
        let rows = self.rows.read().expect("lock not poisoned");
        let mut counts = BTreeMap::new();
        for row in rows.iter() {
            *counts.entry(row.status).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn count(&self) -> Result<u64, HistoryError> {
        Ok(self.rows.read().expect("lock not poisoned").len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn sample(generation_number: u64, status: GenerationStatus) -> NewGeneration {
        NewGeneration {
            generation_number,
            target_name: "prompt_builder".into(),
            status,
            fitness_score: 0.12,
            model_tag: "sim".into(),
            tokens_in: 100,
            tokens_out: 20,
            reasoning: "r".into(),
            old_source: "old".into(),
            new_source: "new".into(),
        }
    }

    #[tokio::test]
    async fn insert_assigns_ids_and_timestamps() {
        let store = InMemoryGenerationStore::new();
        let record = store
            .insert(sample(1, GenerationStatus::Accepted))
            .await
            .unwrap();
        assert_eq!(record.id, 1);
        assert_eq!(record.generation_number, 1);
    }

    #[tokio::test]
    async fn duplicate_generation_number_rejected() {
        let store = InMemoryGenerationStore::new();
        store
            .insert(sample(1, GenerationStatus::Accepted))
            .await
            .unwrap();
        let err = store
            .insert(sample(1, GenerationStatus::Error))
            .await
            .unwrap_err();
        assert!(matches!(err, HistoryError::DuplicateGeneration(1)));
    }

    #[tokio::test]
    async fn recent_is_newest_first() {
        let store = InMemoryGenerationStore::new();
        for n in 1..=5 {
            store
                .insert(sample(n, GenerationStatus::AcceptedNeutral))
                .await
                .unwrap();
        }
        let recent = store.recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].generation_number, 5);
        assert_eq!(recent[1].generation_number, 4);
    }

    #[tokio::test]
    async fn counts_grouped_by_status() {
        let store = InMemoryGenerationStore::new();
        store
            .insert(sample(1, GenerationStatus::Accepted))
            .await
            .unwrap();
        store
            .insert(sample(2, GenerationStatus::Accepted))
            .await
            .unwrap();
        store
            .insert(sample(3, GenerationStatus::RejectedValidation))
            .await
            .unwrap();
        let counts = store.count_by_status().await.unwrap();
        assert_eq!(counts.get(&GenerationStatus::Accepted), Some(&2));
        assert_eq!(counts.get(&GenerationStatus::RejectedValidation), Some(&1));
        assert_eq!(store.count().await.unwrap(), 3);
    }
}
