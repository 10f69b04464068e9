//! Storage accounting strategies
//!
//! Two interchangeable ways to answer "how many bytes does this member
//! hold": recompute the total from the authoritative records on every read
//! (always consistent), or keep a running counter on the member profile
//! (cheaper reads, subject to drift, kept honest by reconciliation).

pub mod counter;
pub mod derived;

use actix_web::Error;

pub use counter::CounterAccountant;
pub use derived::DerivedAccountant;

/// Accounting interface the quota gate works against.
///
/// Implementations must be thread-safe; they are called concurrently from
/// request handlers.
pub trait StorageAccountant: Send + Sync {
    /// Total accounted bytes for a member. Never negative; members with no
    /// accounted records report 0.
    fn get_user_storage(&self, owner_id: &str) -> Result<u64, Error>;

    /// Record `delta` additional bytes for a member.
    fn increase(&self, owner_id: &str, delta: u64) -> Result<(), Error>;

    /// Release `delta` bytes for a member, clamping at zero.
    fn decrease(&self, owner_id: &str, delta: u64) -> Result<(), Error>;
}
