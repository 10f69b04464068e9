//! Persistence layer abstraction
//!
//! This module provides an abstraction over the authoritative record store
//! and the member profile store, allowing the system to use different
//! implementations (SQLite, in-memory, ...) without affecting the
//! accounting layers above.

pub mod mock_store;
pub mod sqlite_store;

use actix_web::Error;
use serde_json::Value;

use crate::record::StoredRecord;

/// Member identifier type
pub type MemberId = String;

/// Trait defining access to the authoritative content records.
pub trait RecordStore: Send + Sync {
    /// Store a new record; the id must not already exist
    fn insert(&self, record: &StoredRecord) -> Result<(), Error>;

    /// Retrieve a record by id
    fn get(&self, id: &str) -> Result<StoredRecord, Error>;

    /// Replace the metadata document of an existing record
    fn update_metadata(&self, id: &str, metadata: &Value) -> Result<(), Error>;

    /// Remove a record
    fn delete(&self, id: &str) -> Result<(), Error>;

    /// All records of the given type owned by the given member
    fn records_for_owner(
        &self,
        owner_id: &str,
        record_type: &str,
    ) -> Result<Vec<StoredRecord>, Error>;

    /// Backend-computed total of the sizes at `size_path` across the owner's
    /// records of the given type. Backends without an aggregate path return
    /// `None` and the accountant falls back to scanning the records.
    fn storage_total(
        &self,
        _owner_id: &str,
        _record_type: &str,
        _size_path: &str,
    ) -> Result<Option<u64>, Error> {
        Ok(None)
    }

    /// Distinct owners holding records of the given type
    fn list_owners(&self, record_type: &str) -> Result<Vec<MemberId>, Error>;
}

/// Trait defining access to the member profiles that carry the tracked
/// storage counter. Only the counter accounting strategy writes here.
pub trait ProfileStore: Send + Sync {
    /// Tracked total for a member; members without a profile row report 0
    fn storage_total(&self, member_id: &str) -> Result<u64, Error>;

    /// Overwrite the tracked total for a member
    fn set_storage_total(&self, member_id: &str, total: u64) -> Result<(), Error>;
}
