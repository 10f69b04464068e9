//! Background reconciliation worker for the counter accounting strategy
//!
//! Counters drift when a post-operation adjustment is lost (the adjustment
//! is best-effort by design). This worker runs periodically and rewrites
//! each member's counter from the derived sum, which is always correct.

use std::sync::Arc;
use std::time::Duration;

use log::{error, info};
use tokio::time;

use crate::accountant::{DerivedAccountant, StorageAccountant};
use crate::config::QuotaConfig;
use crate::store::{ProfileStore, RecordStore};

/// Background reconciliation worker
pub struct ReconcileWorker {
    records: Arc<dyn RecordStore>,
    profiles: Arc<dyn ProfileStore>,
    derived: DerivedAccountant,
    record_type: String,
    interval: Duration,
}

impl ReconcileWorker {
    pub fn new(
        quota: &QuotaConfig,
        interval_secs: u64,
        records: Arc<dyn RecordStore>,
        profiles: Arc<dyn ProfileStore>,
    ) -> Self {
        let derived = DerivedAccountant::new(
            Arc::clone(&records),
            quota.record_type.clone(),
            quota.size_path.clone(),
        );
        Self {
            records,
            profiles,
            derived,
            record_type: quota.record_type.clone(),
            interval: Duration::from_secs(interval_secs),
        }
    }

    /// Start the reconciliation worker as a background task (non-blocking)
    pub fn start_background(self) -> tokio::task::JoinHandle<()> {
        info!(
            "Starting reconcile worker with {}s interval",
            self.interval.as_secs()
        );

        tokio::spawn(async move {
            let mut interval = time::interval(self.interval);

            loop {
                interval.tick().await;

                if let Err(e) = self.reconcile_all() {
                    error!("Error reconciling member counters: {}", e);
                }
            }
        })
    }

    /// Rewrite every member's counter from the derived sum.
    pub fn reconcile_all(&self) -> Result<(), actix_web::Error> {
        let owners = self.records.list_owners(&self.record_type)?;
        if owners.is_empty() {
            return Ok(());
        }

        info!("Reconciling counters for {} member(s)", owners.len());
        for owner in owners {
            if let Err(e) = self.reconcile_member(&owner) {
                error!("Failed to reconcile counter for member {}: {}", owner, e);
                // Continue with other members even if one fails
            }
        }
        Ok(())
    }

    fn reconcile_member(&self, owner_id: &str) -> Result<(), actix_web::Error> {
        let ground_truth = self.derived.get_user_storage(owner_id)?;
        let tracked = self.profiles.storage_total(owner_id)?;

        if tracked != ground_truth {
            info!(
                "Counter for member {} drifted: {} tracked, {} derived",
                owner_id, tracked, ground_truth
            );
            self.profiles.set_storage_total(owner_id, ground_truth)?;
        }
        Ok(())
    }
}
