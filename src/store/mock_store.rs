//! In-memory implementations of the record and profile stores for testing

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use actix_web::error::{ErrorBadRequest, ErrorNotFound};
use actix_web::Error;
use serde_json::Value;

use crate::record::StoredRecord;
use crate::store::{MemberId, ProfileStore, RecordStore};

/// Mock implementation of RecordStore
pub struct MockRecordStore {
    records: Arc<Mutex<HashMap<String, StoredRecord>>>,
}

impl MockRecordStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Clear all records (useful for test cleanup)
    pub fn clear(&self) {
        let mut records = self.records.lock().unwrap();
        records.clear();
    }

    /// Number of stored records
    pub fn record_count(&self) -> usize {
        let records = self.records.lock().unwrap();
        records.len()
    }
}

impl Default for MockRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore for MockRecordStore {
    fn insert(&self, record: &StoredRecord) -> Result<(), Error> {
        let mut records = self.records.lock().unwrap();
        if records.contains_key(&record.id) {
            return Err(ErrorBadRequest("Record id already exists"));
        }
        records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn get(&self, id: &str) -> Result<StoredRecord, Error> {
        let records = self.records.lock().unwrap();
        records
            .get(id)
            .cloned()
            .ok_or_else(|| ErrorNotFound(format!("No record found for id: {}", id)))
    }

    fn update_metadata(&self, id: &str, metadata: &Value) -> Result<(), Error> {
        let mut records = self.records.lock().unwrap();
        match records.get_mut(id) {
            Some(record) => {
                record.metadata = metadata.clone();
                Ok(())
            }
            None => Err(ErrorNotFound(format!("No record found for id: {}", id))),
        }
    }

    fn delete(&self, id: &str) -> Result<(), Error> {
        let mut records = self.records.lock().unwrap();
        if records.remove(id).is_none() {
            return Err(ErrorNotFound(format!("No record found for id: {}", id)));
        }
        Ok(())
    }

    fn records_for_owner(
        &self,
        owner_id: &str,
        record_type: &str,
    ) -> Result<Vec<StoredRecord>, Error> {
        let records = self.records.lock().unwrap();
        Ok(records
            .values()
            .filter(|r| r.owner_id == owner_id && r.record_type == record_type)
            .cloned()
            .collect())
    }

    fn list_owners(&self, record_type: &str) -> Result<Vec<MemberId>, Error> {
        let records = self.records.lock().unwrap();
        let mut owners: Vec<MemberId> = records
            .values()
            .filter(|r| r.record_type == record_type)
            .map(|r| r.owner_id.clone())
            .collect();
        owners.sort();
        owners.dedup();
        Ok(owners)
    }
}

/// Mock implementation of ProfileStore
pub struct MockProfileStore {
    totals: Arc<Mutex<HashMap<String, u64>>>,
}

impl MockProfileStore {
    pub fn new() -> Self {
        Self {
            totals: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Clear all profiles (useful for test cleanup)
    pub fn clear(&self) {
        let mut totals = self.totals.lock().unwrap();
        totals.clear();
    }
}

impl Default for MockProfileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileStore for MockProfileStore {
    fn storage_total(&self, member_id: &str) -> Result<u64, Error> {
        let totals = self.totals.lock().unwrap();
        Ok(totals.get(member_id).copied().unwrap_or(0))
    }

    fn set_storage_total(&self, member_id: &str, total: u64) -> Result<(), Error> {
        let mut totals = self.totals.lock().unwrap();
        totals.insert(member_id.to_string(), total);
        Ok(())
    }
}
