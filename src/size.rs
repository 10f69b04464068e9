//! File size extraction from record metadata
//!
//! The byte size lives at a configured dotted path inside the record's open
//! metadata document ("file.size", "s3File.size", ...). Resolution is pure
//! and never fails the caller: the outcome says whether a size was found,
//! is simply not there yet, or is present but unusable, and each call site
//! picks its own policy.

use serde_json::Value;

/// Outcome of resolving a size path against a metadata document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeOutcome {
    /// The path terminates in an integer. Zero and negative values are
    /// reported as found; callers treat `size <= 0` as "no size yet".
    Found(i64),
    /// Some key along the path is absent, null, or not an object. Expected
    /// for records whose upload has not completed.
    NotYetKnown,
    /// The path terminates in a value that exists but is not an integer.
    /// A schema or size-path configuration defect.
    Malformed,
}

impl SizeOutcome {
    /// The found size when positive, `None` otherwise.
    pub fn positive(self) -> Option<u64> {
        match self {
            SizeOutcome::Found(size) if size > 0 => Some(size as u64),
            _ => None,
        }
    }
}

/// Walk `path` ("a.b.c") through `metadata` key by key.
pub fn extract_size(metadata: &Value, path: &str) -> SizeOutcome {
    let mut current = metadata;
    for key in path.split('.') {
        current = match current.get(key) {
            Some(value) => value,
            None => return SizeOutcome::NotYetKnown,
        };
    }

    if current.is_null() {
        return SizeOutcome::NotYetKnown;
    }

    match current.as_i64() {
        Some(size) => SizeOutcome::Found(size),
        None => SizeOutcome::Malformed,
    }
}
