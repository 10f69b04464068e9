//! Record and actor types shared across the quota layers

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One file-bearing content record as the platform stores it.
///
/// The byte size of the backing file, when known, lives somewhere inside
/// `metadata` at the configured dotted path. Remote-storage uploads create
/// the record first and patch the size in once the upload completes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredRecord {
    /// Record ID
    pub id: String,
    /// Owning member; immutable after creation
    pub owner_id: String,
    /// Discriminator, e.g. "file" or "s3File"
    pub record_type: String,
    /// Open nested document holding file properties
    pub metadata: Value,
}

impl StoredRecord {
    pub fn new(id: String, owner_id: String, record_type: String, metadata: Value) -> Self {
        Self {
            id,
            owner_id,
            record_type,
            metadata,
        }
    }

    /// Record state after applying a partial metadata document, patch keys
    /// winning at the top level.
    pub fn merged_with(&self, patch: &Value) -> Self {
        let mut merged = self.clone();
        merged.metadata = merge_metadata(&self.metadata, patch);
        merged
    }
}

/// The member performing an operation, resolved from the request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Actor {
    pub id: String,
}

impl Actor {
    pub fn new(id: String) -> Self {
        Self { id }
    }
}

/// Top-level key merge of two metadata documents, patch keys winning.
pub fn merge_metadata(base: &Value, patch: &Value) -> Value {
    match (base, patch) {
        (Value::Object(base_map), Value::Object(patch_map)) => {
            let mut merged = base_map.clone();
            for (key, value) in patch_map {
                merged.insert(key.clone(), value.clone());
            }
            Value::Object(merged)
        }
        // A non-object patch replaces the document wholesale
        _ => patch.clone(),
    }
}
