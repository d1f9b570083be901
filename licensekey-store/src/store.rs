//! SQLite-backed store for issued license records.
//!
//! Records are created once and only ever removed by the expiry sweep.

use crate::error::{StoreError, StoreResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

/// A persisted license token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseRecord {
    /// Generated record id.
    pub id: Uuid,
    /// The opaque license token.
    pub license_key: String,
    /// When the record becomes eligible for the sweep.
    pub expiry_date: DateTime<Utc>,
}

/// Persistent store for license records backed by SQLite.
#[derive(Clone, Debug)]
pub struct LicenseStore {
    conn: Arc<Mutex<Connection>>,
}

impl LicenseStore {
    /// Opens (or creates) a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn init_schema(&self) -> StoreResult<()> {
        self.lock()?.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS license_keys (
                id TEXT PRIMARY KEY,
                license_key TEXT NOT NULL,
                expiry_date INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS license_keys_expiry ON license_keys(expiry_date);
            ",
        )?;
        Ok(())
    }

    /// Persists a token under a fresh v4 id.
    pub fn insert(&self, license_key: &str, expiry_date: DateTime<Utc>) -> StoreResult<LicenseRecord> {
        let record = LicenseRecord {
            id: Uuid::new_v4(),
            license_key: license_key.to_string(),
            expiry_date,
        };
        self.lock()?.execute(
            "INSERT INTO license_keys (id, license_key, expiry_date) VALUES (?1, ?2, ?3)",
            params![
                record.id.to_string(),
                record.license_key,
                record.expiry_date.timestamp_millis()
            ],
        )?;
        debug!("Stored license record {}", record.id);
        Ok(record)
    }

    /// Returns every record, oldest expiry first.
    pub fn list(&self) -> StoreResult<Vec<LicenseRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, license_key, expiry_date FROM license_keys ORDER BY expiry_date, id",
        )?;
        let rows = stmt.query_map([], raw_record)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(into_record(row?)?);
        }
        Ok(records)
    }

    /// Looks up one record.
    pub fn get(&self, id: Uuid) -> StoreResult<Option<LicenseRecord>> {
        let raw = self
            .lock()?
            .query_row(
                "SELECT id, license_key, expiry_date FROM license_keys WHERE id = ?1",
                params![id.to_string()],
                raw_record,
            )
            .optional()?;
        raw.map(into_record).transpose()
    }

    /// Deletes every record whose expiry is at or before `now`.
    ///
    /// Returns the number of records removed.
    pub fn remove_expired(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        let removed = self.lock()?.execute(
            "DELETE FROM license_keys WHERE expiry_date <= ?1",
            params![now.timestamp_millis()],
        )?;
        Ok(removed)
    }

    /// Number of stored records.
    pub fn count(&self) -> StoreResult<usize> {
        let count: i64 = self
            .lock()?
            .query_row("SELECT COUNT(*) FROM license_keys", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

type RawRecord = (String, String, i64);

fn raw_record(row: &Row<'_>) -> rusqlite::Result<RawRecord> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn into_record((id, license_key, expiry): RawRecord) -> StoreResult<LicenseRecord> {
    let id = Uuid::parse_str(&id).map_err(|e| StoreError::Corrupt(format!("record id {id:?}: {e}")))?;
    let expiry_date = DateTime::from_timestamp_millis(expiry)
        .ok_or_else(|| StoreError::Corrupt(format!("record {id}: expiry {expiry} out of range")))?;
    Ok(LicenseRecord {
        id,
        license_key,
        expiry_date,
    })
}
