//! Operation lifecycle hook registry
//!
//! The host platform runs content-mutating operations; the quota layer only
//! needs to be called before and after them. This registry is that
//! boundary: handlers are registered by operation kind, pre-hook failures
//! abort the operation, post-hook failures are logged and swallowed so
//! bookkeeping can never fail an already-committed operation.

use std::collections::HashMap;
use std::sync::RwLock;

use actix_web::Error;
use log::{debug, error};
use serde_json::Value;

use crate::record::{Actor, StoredRecord};

/// The four content-mutating operations the quota layer intercepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Create,
    Update,
    Copy,
    Delete,
}

impl OperationKind {
    /// Task name used in log lines, matching the host platform's naming
    pub fn task_name(&self) -> &'static str {
        match self {
            OperationKind::Create => "create-record",
            OperationKind::Update => "update-record",
            OperationKind::Copy => "copy-record",
            OperationKind::Delete => "delete-record",
        }
    }
}

/// Everything a hook handler gets to see about the operation.
#[derive(Debug, Clone)]
pub struct HookContext {
    /// The record the operation targets. For updates this is the
    /// pre-update state; the patch is carried separately.
    pub record: StoredRecord,
    /// The member performing the operation
    pub actor: Actor,
    /// The partial metadata document of an update, absent for other kinds
    pub patch: Option<Value>,
}

impl HookContext {
    pub fn new(record: StoredRecord, actor: Actor) -> Self {
        Self {
            record,
            actor,
            patch: None,
        }
    }

    pub fn with_patch(record: StoredRecord, actor: Actor, patch: Value) -> Self {
        Self {
            record,
            actor,
            patch: Some(patch),
        }
    }
}

pub type HookHandler = Box<dyn Fn(&HookContext) -> Result<(), Error> + Send + Sync>;

/// Registry of pre- and post-operation handlers keyed by operation kind.
pub struct HookRegistry {
    pre: RwLock<HashMap<OperationKind, Vec<HookHandler>>>,
    post: RwLock<HashMap<OperationKind, Vec<HookHandler>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self {
            pre: RwLock::new(HashMap::new()),
            post: RwLock::new(HashMap::new()),
        }
    }

    /// Register a handler to run before the operation commits
    pub fn before_operation(&self, kind: OperationKind, handler: HookHandler) {
        let mut pre = self.pre.write().unwrap();
        pre.entry(kind).or_default().push(handler);
    }

    /// Register a handler to run after the operation commits
    pub fn after_operation(&self, kind: OperationKind, handler: HookHandler) {
        let mut post = self.post.write().unwrap();
        post.entry(kind).or_default().push(handler);
    }

    /// Run the pre-hooks for an operation. The first failure propagates and
    /// must abort the operation before any write happens.
    pub fn run_pre(&self, kind: OperationKind, ctx: &HookContext) -> Result<(), Error> {
        let pre = self.pre.read().unwrap();
        if let Some(handlers) = pre.get(&kind) {
            debug!(
                "Running {} pre-hook(s) for {}",
                handlers.len(),
                kind.task_name()
            );
            for handler in handlers {
                handler(ctx)?;
            }
        }
        Ok(())
    }

    /// Run the post-hooks for an operation. Failures are logged and
    /// swallowed; the triggering operation has already committed.
    pub fn run_post(&self, kind: OperationKind, ctx: &HookContext) {
        let post = self.post.read().unwrap();
        if let Some(handlers) = post.get(&kind) {
            debug!(
                "Running {} post-hook(s) for {}",
                handlers.len(),
                kind.task_name()
            );
            for handler in handlers {
                if let Err(e) = handler(ctx) {
                    error!("Post-hook for {} failed: {}", kind.task_name(), e);
                }
            }
        }
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}
