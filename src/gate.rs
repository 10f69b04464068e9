//! Quota gate
//!
//! The enforcement core: interposed before creating/copying operations to
//! reject them when the projected total would pass the configured ceiling,
//! and after create/update/copy/delete to keep the active accountant in
//! step. Registered on the hook registry once at startup.

use std::sync::Arc;

use actix_web::Error;
use log::{debug, info, warn};

use crate::accountant::StorageAccountant;
use crate::config::QuotaConfig;
use crate::error::QuotaError;
use crate::hooks::{HookContext, HookRegistry, OperationKind};
use crate::record::StoredRecord;
use crate::size::{extract_size, SizeOutcome};

pub struct QuotaGate {
    record_type: String,
    size_path: String,
    max_member_storage: u64,
    tolerate_missing_size_on_create: bool,
    accountant: Arc<dyn StorageAccountant>,
}

impl QuotaGate {
    pub fn new(quota: &QuotaConfig, accountant: Arc<dyn StorageAccountant>) -> Self {
        Self {
            record_type: quota.record_type.clone(),
            size_path: quota.size_path.clone(),
            max_member_storage: quota.max_member_storage,
            tolerate_missing_size_on_create: quota.tolerate_missing_size_on_create,
            accountant,
        }
    }

    /// Wire the gate onto the host operation lifecycle.
    pub fn register(gate: &Arc<Self>, hooks: &HookRegistry) {
        // Reject creations that would exceed the ceiling, then account for
        // the ones that commit
        let this = Arc::clone(gate);
        hooks.before_operation(
            OperationKind::Create,
            Box::new(move |ctx| this.check_remaining_storage(ctx)),
        );
        let this = Arc::clone(gate);
        hooks.after_operation(
            OperationKind::Create,
            Box::new(move |ctx| this.increase_storage(ctx)),
        );

        // Remote uploads receive their size after the upload completes, so
        // the accounting for them happens on update
        let this = Arc::clone(gate);
        hooks.after_operation(
            OperationKind::Update,
            Box::new(move |ctx| this.adjust_after_update(ctx)),
        );

        // A copy duplicates an already-sized record; the pre-check always
        // has a real size to test
        let this = Arc::clone(gate);
        hooks.before_operation(
            OperationKind::Copy,
            Box::new(move |ctx| this.check_remaining_storage(ctx)),
        );
        let this = Arc::clone(gate);
        hooks.after_operation(
            OperationKind::Copy,
            Box::new(move |ctx| this.increase_storage(ctx)),
        );

        let this = Arc::clone(gate);
        hooks.after_operation(
            OperationKind::Delete,
            Box::new(move |ctx| this.decrease_storage(ctx)),
        );

        info!(
            "Quota gate registered for record type '{}' with ceiling {} bytes",
            gate.record_type, gate.max_member_storage
        );
    }

    fn is_target(&self, record: &StoredRecord) -> bool {
        record.record_type == self.record_type
    }

    /// Candidate size of a record about to be created or copied.
    fn candidate_size(&self, record: &StoredRecord) -> Result<u64, Error> {
        match extract_size(&record.metadata, &self.size_path) {
            SizeOutcome::Found(size) => Ok(size.max(0) as u64),
            SizeOutcome::NotYetKnown => {
                if self.tolerate_missing_size_on_create {
                    // Upload pending; enforcement is deferred to the update
                    // that supplies the size
                    Ok(0)
                } else {
                    Err(QuotaError::FileSizeNotFound.into())
                }
            }
            SizeOutcome::Malformed => {
                warn!(
                    "Size path '{}' resolves to a non-integer on record {}",
                    self.size_path, record.id
                );
                Err(QuotaError::FileSizeNotFound.into())
            }
        }
    }

    /// Pre-check: admit iff the member's current total plus the candidate
    /// size stays within the ceiling.
    pub fn check_remaining_storage(&self, ctx: &HookContext) -> Result<(), Error> {
        if !self.is_target(&ctx.record) {
            return Ok(());
        }

        let candidate = self.candidate_size(&ctx.record)?;
        let current = self.accountant.get_user_storage(&ctx.record.owner_id)?;

        if current.saturating_add(candidate) > self.max_member_storage {
            warn!(
                "Rejecting {} for member {}: {} + {} exceeds {} bytes",
                ctx.record.id, ctx.record.owner_id, current, candidate, self.max_member_storage
            );
            return Err(QuotaError::StorageExceeded.into());
        }

        debug!(
            "Admitting {} for member {}: {} + {} within {} bytes",
            ctx.record.id, ctx.record.owner_id, current, candidate, self.max_member_storage
        );
        Ok(())
    }

    /// Size a committed record contributes to the total, if any.
    fn settled_size(&self, record: &StoredRecord) -> Option<u64> {
        match extract_size(&record.metadata, &self.size_path) {
            SizeOutcome::Malformed => {
                warn!(
                    "Size path '{}' resolves to a non-integer on record {}; skipping adjustment",
                    self.size_path, record.id
                );
                None
            }
            outcome => outcome.positive(),
        }
    }

    /// Post-adjust after create/copy: record the committed size.
    pub fn increase_storage(&self, ctx: &HookContext) -> Result<(), Error> {
        if !self.is_target(&ctx.record) {
            return Ok(());
        }
        match self.settled_size(&ctx.record) {
            Some(size) => self.accountant.increase(&ctx.record.owner_id, size),
            // The file size is not available yet
            None => Ok(()),
        }
    }

    /// Post-adjust after delete: release the record's size, clamped at zero
    /// by the accountant.
    pub fn decrease_storage(&self, ctx: &HookContext) -> Result<(), Error> {
        if !self.is_target(&ctx.record) {
            return Ok(());
        }
        match self.settled_size(&ctx.record) {
            Some(size) => self.accountant.decrease(&ctx.record.owner_id, size),
            None => Ok(()),
        }
    }

    /// Post-adjust after update: account only when this update newly
    /// supplied a size, which is how a pending upload reports completion.
    /// Ordinary metadata edits of an already-sized record change nothing.
    pub fn adjust_after_update(&self, ctx: &HookContext) -> Result<(), Error> {
        if !self.is_target(&ctx.record) {
            return Ok(());
        }
        let patch = match &ctx.patch {
            Some(patch) => patch,
            None => return Ok(()),
        };

        if extract_size(patch, &self.size_path).positive().is_none() {
            return Ok(());
        }
        if self.settled_size(&ctx.record).is_some() {
            // The record was already sized before this update
            return Ok(());
        }

        let merged = ctx.record.merged_with(patch);
        match self.settled_size(&merged) {
            Some(size) => self.accountant.increase(&ctx.record.owner_id, size),
            None => Ok(()),
        }
    }
}
