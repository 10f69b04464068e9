//! SQLite implementations of the record and profile stores

use std::path::Path;
use std::sync::{Arc, Mutex};

use actix_web::error::{ErrorBadRequest, ErrorInternalServerError, ErrorNotFound};
use actix_web::Error;
use chrono::Utc;
use log::{info, warn};
use rusqlite::{params, Connection};
use serde_json::Value;

use crate::record::StoredRecord;
use crate::store::{MemberId, ProfileStore, RecordStore};

fn open_connection(db_path: &str) -> Result<Connection, Error> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(ErrorInternalServerError)?;
        }
    }
    Connection::open(db_path).map_err(ErrorInternalServerError)
}

/// Translate a dotted size path into the SQLite JSON path syntax,
/// e.g. "file.size" -> "$.file.size"
fn json_path(size_path: &str) -> String {
    format!("$.{}", size_path)
}

/// SQLite implementation of RecordStore
pub struct SqliteRecordStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRecordStore {
    /// Open (and bootstrap) the record table at the given path
    pub fn open(db_path: &str) -> Result<Self, Error> {
        let conn = open_connection(db_path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS record (
                id TEXT PRIMARY KEY,
                owner TEXT NOT NULL,
                type TEXT NOT NULL,
                metadata TEXT NOT NULL
            )",
            [],
        )
        .map_err(ErrorInternalServerError)?;
        info!("Opened record store at {}", db_path);
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, String, String, String)> {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
    }

    fn parse_record(
        (id, owner, record_type, metadata): (String, String, String, String),
    ) -> Result<StoredRecord, Error> {
        let metadata: Value = serde_json::from_str(&metadata).map_err(ErrorInternalServerError)?;
        Ok(StoredRecord::new(id, owner, record_type, metadata))
    }
}

impl RecordStore for SqliteRecordStore {
    fn insert(&self, record: &StoredRecord) -> Result<(), Error> {
        let metadata = serde_json::to_string(&record.metadata).map_err(ErrorInternalServerError)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO record (id, owner, type, metadata) VALUES (?1, ?2, ?3, ?4)",
            params![record.id, record.owner_id, record.record_type, metadata],
        )
        .map_err(|e| {
            warn!("Failed to insert record {}: {}", record.id, e);
            ErrorBadRequest("Record id already exists")
        })?;
        Ok(())
    }

    fn get(&self, id: &str) -> Result<StoredRecord, Error> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT id, owner, type, metadata FROM record WHERE id = ?1")
            .map_err(ErrorInternalServerError)?;

        let row = stmt
            .query_row(params![id], Self::row_to_record)
            .map_err(|e| {
                warn!("Record does not exist or database error: {}", e);
                ErrorNotFound(format!("No record found for id: {}", id))
            })?;

        Self::parse_record(row)
    }

    fn update_metadata(&self, id: &str, metadata: &Value) -> Result<(), Error> {
        let metadata = serde_json::to_string(metadata).map_err(ErrorInternalServerError)?;
        let conn = self.conn.lock().unwrap();
        let changed = conn
            .execute(
                "UPDATE record SET metadata = ?1 WHERE id = ?2",
                params![metadata, id],
            )
            .map_err(ErrorInternalServerError)?;

        if changed == 0 {
            return Err(ErrorNotFound(format!("No record found for id: {}", id)));
        }
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<(), Error> {
        let conn = self.conn.lock().unwrap();
        let changed = conn
            .execute("DELETE FROM record WHERE id = ?1", params![id])
            .map_err(ErrorInternalServerError)?;

        if changed == 0 {
            return Err(ErrorNotFound(format!("No record found for id: {}", id)));
        }
        Ok(())
    }

    fn records_for_owner(
        &self,
        owner_id: &str,
        record_type: &str,
    ) -> Result<Vec<StoredRecord>, Error> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT id, owner, type, metadata FROM record WHERE owner = ?1 AND type = ?2")
            .map_err(ErrorInternalServerError)?;

        let rows = stmt
            .query_map(params![owner_id, record_type], Self::row_to_record)
            .map_err(ErrorInternalServerError)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(Self::parse_record(
                row.map_err(ErrorInternalServerError)?,
            )?);
        }
        Ok(records)
    }

    fn storage_total(
        &self,
        owner_id: &str,
        record_type: &str,
        size_path: &str,
    ) -> Result<Option<u64>, Error> {
        let path = json_path(size_path);
        let conn = self.conn.lock().unwrap();
        // Sum the sizes in the database, counting only integer terminals and
        // clamping negatives to zero, the same arithmetic the extractor scan
        // applies record by record.
        let mut stmt = conn
            .prepare(
                "SELECT SUM(CASE WHEN json_type(metadata, ?1) = 'integer'
                            THEN MAX(json_extract(metadata, ?1), 0) ELSE 0 END)
                 FROM record WHERE owner = ?2 AND type = ?3",
            )
            .map_err(ErrorInternalServerError)?;

        let sum: Option<i64> = stmt
            .query_row(params![path, owner_id, record_type], |row| row.get(0))
            .map_err(ErrorInternalServerError)?;

        // SUM over no rows is NULL; an owner with no records holds 0 bytes
        Ok(Some(sum.unwrap_or(0).max(0) as u64))
    }

    fn list_owners(&self, record_type: &str) -> Result<Vec<MemberId>, Error> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT DISTINCT owner FROM record WHERE type = ?1")
            .map_err(ErrorInternalServerError)?;

        let rows = stmt
            .query_map(params![record_type], |row| row.get::<_, String>(0))
            .map_err(ErrorInternalServerError)?;

        let mut owners = Vec::new();
        for row in rows {
            owners.push(row.map_err(ErrorInternalServerError)?);
        }
        Ok(owners)
    }
}

/// SQLite implementation of ProfileStore
pub struct SqliteProfileStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteProfileStore {
    /// Open (and bootstrap) the member table at the given path
    pub fn open(db_path: &str) -> Result<Self, Error> {
        let conn = open_connection(db_path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS member (
                id TEXT PRIMARY KEY,
                storage_total INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(ErrorInternalServerError)?;
        info!("Opened profile store at {}", db_path);
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

impl ProfileStore for SqliteProfileStore {
    fn storage_total(&self, member_id: &str) -> Result<u64, Error> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT storage_total FROM member WHERE id = ?1")
            .map_err(ErrorInternalServerError)?;

        let total: Option<i64> = stmt
            .query_row(params![member_id], |row| row.get(0))
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(ErrorInternalServerError(other)),
            })?;

        Ok(total.unwrap_or(0).max(0) as u64)
    }

    fn set_storage_total(&self, member_id: &str, total: u64) -> Result<(), Error> {
        let updated_at = Utc::now().to_rfc3339();
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO member (id, storage_total, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET storage_total = ?2, updated_at = ?3",
            params![member_id, total as i64, updated_at],
        )
        .map_err(ErrorInternalServerError)?;
        Ok(())
    }
}
