//! SQLite slot store
//!
//! Classifier slot record 를 SQLite 에 저장한다. 여러 프로세스가 같은 DB 파일을
//! 공유할 수 있도록 WAL 모드를 사용한다.

use super::slot::{ClassifierSlotRecord, SlotStore};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Current schema version
const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Database file name inside the data directory
pub const SLOT_DB_FILE: &str = "hotswap.db";

/// SQLite-backed slot store
#[derive(Clone)]
pub struct SqliteSlotStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSlotStore {
    /// Open (or create) `<data_dir>/hotswap.db`
    pub fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .map_err(|e| Error::storage("Failed to create data directory", e))?;

        let db_path = data_dir.join(SLOT_DB_FILE);
        let conn =
            Connection::open(&db_path).map_err(|e| Error::storage("Failed to open database", e))?;

        // Enable WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| Error::storage("Failed to set pragmas", e))?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.initialize_schema()?;
        debug!(path = %db_path.display(), "Opened slot store");
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::storage("Failed to create in-memory database", e))?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Internal("Lock poisoned".to_string()))
    }

    /// Get current schema version from database
    pub fn schema_version(&self) -> Result<i32> {
        self.conn()?
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                [],
                |row| row.get(0),
            )
            .map_err(|e| Error::storage("Failed to get schema version", e))
    }

    fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- Schema version tracking
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            -- Reader / writer role assignment per classifier
            CREATE TABLE IF NOT EXISTS classifier_slots (
                id TEXT PRIMARY KEY,
                job_id INTEGER NOT NULL,
                kind TEXT NOT NULL,
                reader_ref TEXT NOT NULL,
                writer_ref TEXT NOT NULL,
                trained INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL,
                CHECK (reader_ref <> writer_ref)
            );

            CREATE INDEX IF NOT EXISTS idx_classifier_slots_job
                ON classifier_slots(job_id);
            "#,
        )
        .map_err(|e| Error::storage("Failed to initialize schema", e))?;

        conn.execute(
            "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
            params![CURRENT_SCHEMA_VERSION],
        )
        .map_err(|e| Error::storage("Failed to record schema version", e))?;

        Ok(())
    }

    fn row_to_record(row: &Row<'_>) -> rusqlite::Result<(ClassifierSlotRecord, String)> {
        let job_id: i64 = row.get(1)?;
        let trained: i64 = row.get(5)?;
        let updated_at: String = row.get(6)?;
        Ok((
            ClassifierSlotRecord {
                id: row.get(0)?,
                job_id: job_id as u64,
                kind: row.get(2)?,
                reader_ref: row.get(3)?,
                writer_ref: row.get(4)?,
                trained: trained != 0,
                updated_at: Utc::now(),
            },
            updated_at,
        ))
    }

    fn with_timestamp((mut record, raw): (ClassifierSlotRecord, String)) -> Result<ClassifierSlotRecord> {
        record.updated_at = DateTime::parse_from_rfc3339(&raw)
            .map_err(|e| Error::storage("Invalid updated_at", e))?
            .with_timezone(&Utc);
        Ok(record)
    }
}

const SELECT_COLUMNS: &str =
    "SELECT id, job_id, kind, reader_ref, writer_ref, trained, updated_at FROM classifier_slots";

impl SlotStore for SqliteSlotStore {
    fn find(&self, id: &str) -> Result<Option<ClassifierSlotRecord>> {
        let row = self
            .conn()?
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_COLUMNS),
                params![id],
                Self::row_to_record,
            )
            .optional()
            .map_err(|e| Error::storage("Failed to load slot record", e))?;

        row.map(Self::with_timestamp).transpose()
    }

    fn save(&self, record: &ClassifierSlotRecord) -> Result<()> {
        record.validate()?;

        // 두 참조를 한 statement 로 기록하므로 반쯤 교체된 레코드는 존재할 수 없다
        self.conn()?
            .execute(
                r#"
                INSERT INTO classifier_slots (id, job_id, kind, reader_ref, writer_ref, trained, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(id) DO UPDATE SET
                    job_id = excluded.job_id,
                    kind = excluded.kind,
                    reader_ref = excluded.reader_ref,
                    writer_ref = excluded.writer_ref,
                    trained = excluded.trained,
                    updated_at = excluded.updated_at
                "#,
                params![
                    record.id,
                    record.job_id as i64,
                    record.kind,
                    record.reader_ref,
                    record.writer_ref,
                    record.trained as i64,
                    record.updated_at.to_rfc3339(),
                ],
            )
            .map_err(|e| Error::storage("Failed to save slot record", e))?;

        Ok(())
    }

    fn list(&self) -> Result<Vec<ClassifierSlotRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!("{} ORDER BY id", SELECT_COLUMNS))
            .map_err(|e| Error::storage("Failed to prepare query", e))?;

        let rows = stmt
            .query_map([], Self::row_to_record)
            .map_err(|e| Error::storage("Failed to list slot records", e))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| Error::storage("Failed to read slot record", e))?;

        rows.into_iter().map(Self::with_timestamp).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_in_memory_round_trip() {
        let store = SqliteSlotStore::in_memory().expect("Failed to create store");
        assert_eq!(store.schema_version().unwrap(), CURRENT_SCHEMA_VERSION);

        let record = ClassifierSlotRecord::new("job-1", 1, "keyword", "r", "w").unwrap();
        store.save(&record).expect("Failed to save");

        let loaded = store.get("job-1").expect("Failed to load");
        assert_eq!(loaded.reader_ref, "r");
        assert_eq!(loaded.writer_ref, "w");
        assert!(!loaded.trained);
        assert_eq!(loaded.updated_at.timestamp(), record.updated_at.timestamp());
    }

    #[test]
    fn test_swap_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let record = ClassifierSlotRecord::new("job-2", 2, "keyword", "r", "w").unwrap();

        {
            let store = SqliteSlotStore::open(dir.path()).unwrap();
            store.save(&record).unwrap();
            store.save(&record.swapped().with_trained(true)).unwrap();
        }

        let store = SqliteSlotStore::open(dir.path()).unwrap();
        let loaded = store.get("job-2").unwrap();
        assert_eq!(loaded.reader_ref, "w");
        assert_eq!(loaded.writer_ref, "r");
        assert!(loaded.trained);
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_record() {
        let store = SqliteSlotStore::in_memory().unwrap();
        assert!(store.find("nope").unwrap().is_none());
        assert!(store.get("nope").unwrap_err().is_not_found());
    }
}
