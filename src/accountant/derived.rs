//! Derived-sum accounting: the total is recomputed from the record store

use std::sync::Arc;

use actix_web::Error;
use log::debug;

use crate::accountant::StorageAccountant;
use crate::size::extract_size;
use crate::store::RecordStore;

/// Accountant that derives the total from the authoritative records on
/// every read. Source of truth for reconciliation.
pub struct DerivedAccountant {
    records: Arc<dyn RecordStore>,
    record_type: String,
    size_path: String,
}

impl DerivedAccountant {
    pub fn new(records: Arc<dyn RecordStore>, record_type: String, size_path: String) -> Self {
        Self {
            records,
            record_type,
            size_path,
        }
    }
}

impl StorageAccountant for DerivedAccountant {
    fn get_user_storage(&self, owner_id: &str) -> Result<u64, Error> {
        // Prefer the backend aggregate when the store can compute one
        if let Some(total) =
            self.records
                .storage_total(owner_id, &self.record_type, &self.size_path)?
        {
            debug!("Aggregate storage total for {}: {} bytes", owner_id, total);
            return Ok(total);
        }

        // Fallback: scan the owner's records and sum resolvable sizes.
        // Records whose size cannot be resolved are presumed mid-upload and
        // contribute 0.
        let records = self
            .records
            .records_for_owner(owner_id, &self.record_type)?;
        let total = records
            .iter()
            .filter_map(|r| extract_size(&r.metadata, &self.size_path).positive())
            .sum();
        debug!("Scanned storage total for {}: {} bytes", owner_id, total);
        Ok(total)
    }

    // The total is recomputed from the record store on every read, so there
    // is no state to adjust.
    fn increase(&self, _owner_id: &str, _delta: u64) -> Result<(), Error> {
        Ok(())
    }

    fn decrease(&self, _owner_id: &str, _delta: u64) -> Result<(), Error> {
        Ok(())
    }
}
