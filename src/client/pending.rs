// src/client/pending.rs
//! Single-flight guards for user-triggered operations
//!
//! While an operation is pending for a collection, a second submission of
//! the same kind for that collection is refused instead of queued. Other
//! collections are unaffected.

use crate::{EditorError, Operation};
use ahash::HashSet;
use std::sync::{Mutex, PoisonError};

type PendingKey = (Operation, &'static str);

#[derive(Default)]
pub(crate) struct PendingSet {
    pending: Mutex<HashSet<PendingKey>>,
}

pub(crate) struct PendingGuard<'a> {
    set: &'a PendingSet,
    key: PendingKey,
}

impl PendingSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Mark `op` on `collection` pending until the guard drops
    pub(crate) fn try_begin(
        &self,
        op: Operation,
        collection: &'static str,
    ) -> Result<PendingGuard<'_>, EditorError> {
        let key = (op, collection);
        if self.lock().insert(key) {
            Ok(PendingGuard { set: self, key })
        } else {
            Err(EditorError::Busy { op })
        }
    }

    pub(crate) fn is_pending(&self, op: Operation, collection: &'static str) -> bool {
        self.lock().contains(&(op, collection))
    }

    // The set stays consistent even if a holder panicked
    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<PendingKey>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.set.lock().remove(&self.key);
    }
}
