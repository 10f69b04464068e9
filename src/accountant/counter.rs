//! Counter accounting: a running total on the member profile

use std::sync::Arc;

use actix_web::Error;
use log::debug;

use crate::accountant::StorageAccountant;
use crate::store::ProfileStore;

/// Accountant that keeps the total as a counter on the member profile.
///
/// Reads are cheap but the counter drifts if an adjustment is lost; it is
/// a cache over the derived sum, not a source of truth. The reconcile
/// worker rewrites it from the record store periodically.
pub struct CounterAccountant {
    profiles: Arc<dyn ProfileStore>,
}

impl CounterAccountant {
    pub fn new(profiles: Arc<dyn ProfileStore>) -> Self {
        Self { profiles }
    }
}

impl StorageAccountant for CounterAccountant {
    fn get_user_storage(&self, owner_id: &str) -> Result<u64, Error> {
        self.profiles.storage_total(owner_id)
    }

    fn increase(&self, owner_id: &str, delta: u64) -> Result<(), Error> {
        let current = self.profiles.storage_total(owner_id)?;
        let total = current.saturating_add(delta);
        debug!("Increasing storage for {}: {} -> {}", owner_id, current, total);
        self.profiles.set_storage_total(owner_id, total)
    }

    fn decrease(&self, owner_id: &str, delta: u64) -> Result<(), Error> {
        let current = self.profiles.storage_total(owner_id)?;
        // Clamp at zero; a double-decrement or reordered adjustment must not
        // drive the counter negative
        let total = current.saturating_sub(delta);
        debug!("Decreasing storage for {}: {} -> {}", owner_id, current, total);
        self.profiles.set_storage_total(owner_id, total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::mock_store::MockProfileStore;

    fn counter() -> CounterAccountant {
        CounterAccountant::new(Arc::new(MockProfileStore::new()))
    }

    #[test]
    fn test_increase_accumulates() {
        let accountant = counter();
        accountant.increase("alice", 50).unwrap();
        accountant.increase("alice", 25).unwrap();
        assert_eq!(accountant.get_user_storage("alice").unwrap(), 75);
    }

    #[test]
    fn test_decrease_clamps_at_zero() {
        let accountant = counter();
        accountant.increase("alice", 50).unwrap();
        accountant.decrease("alice", 50).unwrap();
        assert_eq!(accountant.get_user_storage("alice").unwrap(), 0);

        // Erroneous second decrease clamps instead of underflowing
        accountant.decrease("alice", 50).unwrap();
        assert_eq!(accountant.get_user_storage("alice").unwrap(), 0);
    }

    #[test]
    fn test_decrease_before_increase_clamps() {
        let accountant = counter();
        accountant.decrease("alice", 30).unwrap();
        accountant.increase("alice", 10).unwrap();
        assert_eq!(accountant.get_user_storage("alice").unwrap(), 10);
    }

    #[test]
    fn test_members_are_independent() {
        let accountant = counter();
        accountant.increase("alice", 40).unwrap();
        assert_eq!(accountant.get_user_storage("bob").unwrap(), 0);
    }
}
