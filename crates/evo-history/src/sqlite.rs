//! SQLite-backed generation store.

use crate::error::HistoryError;
use crate::store::GenerationStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use evo_core::{GenerationRecord, GenerationStatus, NewGeneration};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

const SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS generations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    generation_number INTEGER NOT NULL,
    target_name TEXT NOT NULL,
    status TEXT NOT NULL CHECK (status IN (
        'accepted', 'accepted_neutral', 'rejected_regression',
        'rejected_validation', 'error'
    )),
    fitness_score REAL NOT NULL,
    model_tag TEXT NOT NULL,
    tokens_in INTEGER NOT NULL,
    tokens_out INTEGER NOT NULL,
    reasoning TEXT NOT NULL,
    old_source TEXT NOT NULL,
    new_source TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_generations_number
    ON generations (generation_number);
CREATE INDEX IF NOT EXISTS idx_generations_status
    ON generations (status);
";

/// Generation store over a single SQLite database file.
#[derive(Clone)]
pub struct SqliteGenerationStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteGenerationStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, HistoryError> {
        let conn = Connection::open(path).map_err(store_err)?;
        conn.execute_batch(SCHEMA).map_err(store_err)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self, HistoryError> {
        let conn = Connection::open_in_memory().map_err(store_err)?;
        conn.execute_batch(SCHEMA).map_err(store_err)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<GenerationRecord> {
        let status_text: String = row.get("status")?;
        let status = GenerationStatus::from_str(&status_text).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                format!("invalid status '{status_text}'").into(),
            )
        })?;
        let created_at_text: String = row.get("created_at")?;
        let created_at = DateTime::parse_from_rfc3339(&created_at_text)
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    0,
                    rusqlite::types::Type::Text,
                    e.to_string().into(),
                )
            })?
            .with_timezone(&Utc);
        Ok(GenerationRecord {
            id: row.get("id")?,
            generation_number: row.get::<_, i64>("generation_number")? as u64,
            target_name: row.get("target_name")?,
            status,
            fitness_score: row.get("fitness_score")?,
            model_tag: row.get("model_tag")?,
            tokens_in: row.get::<_, i64>("tokens_in")? as u64,
            tokens_out: row.get::<_, i64>("tokens_out")? as u64,
            reasoning: row.get("reasoning")?,
            old_source: row.get("old_source")?,
            new_source: row.get("new_source")?,
            created_at,
        })
    }
}

#[async_trait]
impl GenerationStore for SqliteGenerationStore {
    async fn insert(&self, attrs: NewGeneration) -> Result<GenerationRecord, HistoryError> {
        let conn = self.conn.lock().expect("lock not poisoned");
        let created_at = Utc::now();
        let inserted = conn.execute(
            "INSERT INTO generations (
                generation_number, target_name, status, fitness_score,
                model_tag, tokens_in, tokens_out, reasoning,
                old_source, new_source, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                attrs.generation_number as i64,
                attrs.target_name,
                attrs.status.as_str(),
                attrs.fitness_score,
                attrs.model_tag,
                attrs.tokens_in as i64,
                attrs.tokens_out as i64,
                attrs.reasoning,
                attrs.old_source,
                attrs.new_source,
                created_at.to_rfc3339(),
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                return Err(HistoryError::DuplicateGeneration(attrs.generation_number));
            }
            Err(e) => return Err(store_err(e)),
        }
        let id = conn.last_insert_rowid();
        Ok(GenerationRecord {
            id,
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
            created_at,
        })
    }

    async fn get(&self, generation_number: u64) -> Result<Option<GenerationRecord>, HistoryError> {
        let conn = self.conn.lock().expect("lock not poisoned");
        conn.query_row(
            "SELECT * FROM generations WHERE generation_number = ?1",
            params![generation_number as i64],
            Self::row_to_record,
        )
        .optional()
        .map_err(store_err)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<GenerationRecord>, HistoryError> {
        let conn = self.conn.lock().expect("lock not poisoned");
        let mut statement = conn
            .prepare("SELECT * FROM generations ORDER BY generation_number DESC LIMIT ?1")
            .map_err(store_err)?;
        let rows = statement
            .query_map(params![limit as i64], Self::row_to_record)
            .map_err(store_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(store_err)
    }

    async fn count_by_status(&self) -> Result<BTreeMap<GenerationStatus, u64>, HistoryError> {
        let conn = self.conn.lock().expect("lock not poisoned");
        let mut statement = conn
            .prepare("SELECT status, COUNT(*) FROM generations GROUP BY status")
            .map_err(store_err)?;
        let rows = statement
            .query_map([], |row| {
                let status: String = row.get(0)?;
                let count: i64 = row.get(1)?;
                Ok((status, count))
            })
            .map_err(store_err)?;
        let mut counts = BTreeMap::new();
        for row in rows {
            let (status_text, count) = row.map_err(store_err)?;
            let status = GenerationStatus::from_str(&status_text)
                .ok_or(HistoryError::InvalidStatus(status_text))?;
            counts.insert(status, count as u64);
        }
        Ok(counts)
    }

    async fn count(&self) -> Result<u64, HistoryError> {
        let conn = self.conn.lock().expect("lock not poisoned");
        conn.query_row("SELECT COUNT(*) FROM generations", [], |row| {
            row.get::<_, i64>(0)
        })
        .map(|n| n as u64)
        .map_err(store_err)
    }
}

fn store_err(e: rusqlite::Error) -> HistoryError {
    HistoryError::Store(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(generation_number: u64, status: GenerationStatus) -> NewGeneration {
        NewGeneration {
            generation_number,
            target_name: "fitness_evaluator".into(),
            status,
            fitness_score: -0.2,
            model_tag: "sim".into(),
            tokens_in: 10,
            tokens_out: 5,
            reasoning: "r".into(),
            old_source: "old".into(),
            new_source: "new".into(),
        }
    }

    #[tokio::test]
    async fn insert_and_get_round_trip() {
        let store = SqliteGenerationStore::open_in_memory().unwrap();
        let record = store
            .insert(sample(1, GenerationStatus::RejectedRegression))
            .await
            .unwrap();
        assert_eq!(record.id, 1);
        let fetched = store.get(1).await.unwrap().unwrap();
        assert_eq!(fetched.status, GenerationStatus::RejectedRegression);
        assert_eq!(fetched.fitness_score, -0.2);
    }

    #[tokio::test]
    async fn unique_index_enforced() {
        let store = SqliteGenerationStore::open_in_memory().unwrap();
        store
            .insert(sample(7, GenerationStatus::Accepted))
            .await
            .unwrap();
        let err = store
            .insert(sample(7, GenerationStatus::Error))
            .await
            .unwrap_err();
        assert!(matches!(err, HistoryError::DuplicateGeneration(7)));
    }

    #[tokio::test]
    async fn status_check_constraint_holds() {
        let store = SqliteGenerationStore::open_in_memory().unwrap();
        let conn = store.conn.lock().unwrap();
        let result = conn.execute(
            "INSERT INTO generations (
                generation_number, target_name, status, fitness_score,
                model_tag, tokens_in, tokens_out, reasoning,
                old_source, new_source, created_at
            ) VALUES (99, 't', 'shipped', 0.0, 'm', 0, 0, 'r', 'o', 'n', 'now')",
            [],
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn recent_and_counts() {
        let store = SqliteGenerationStore::open_in_memory().unwrap();
        store
            .insert(sample(1, GenerationStatus::Accepted))
            .await
            .unwrap();
        store
            .insert(sample(2, GenerationStatus::Error))
            .await
            .unwrap();
        store
            .insert(sample(3, GenerationStatus::Accepted))
            .await
            .unwrap();
        let recent = store.recent(2).await.unwrap();
        assert_eq!(recent[0].generation_number, 3);
        let counts = store.count_by_status().await.unwrap();
        assert_eq!(counts.get(&GenerationStatus::Accepted), Some(&2));
        assert_eq!(store.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn file_backed_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("evo.db");
        {
            let store = SqliteGenerationStore::open(&path).unwrap();
            store
                .insert(sample(1, GenerationStatus::AcceptedNeutral))
                .await
                .unwrap();
        }
        let store = SqliteGenerationStore::open(&path).unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
