//! Per-owner mutual exclusion.

use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;

use crate::video::OwnerId;

/// Table of locks keyed by owner.
///
/// A lock is created the first time an owner needs it and dropped from the
/// table once no caller holds or waits on it. Callers for different owners
/// never contend on the same lock.
#[derive(Debug, Default)]
pub struct OwnerLocks {
    locks: DashMap<OwnerId, Arc<Mutex<()>>>,
}

impl OwnerLocks {
    /// Create an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding `owner`'s lock.
    ///
    /// `f` must not block on I/O; the lock is a plain mutex.
    pub fn with_lock<R>(&self, owner: OwnerId, f: impl FnOnce() -> R) -> R {
        let lock = Arc::clone(&self.locks.entry(owner).or_default());
        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };
        drop(lock);
        // Clones are only taken under the shard lock, so a count of one
        // means nobody else can reach this mutex.
        self.locks
            .remove_if(&owner, |_, lock| Arc::strong_count(lock) == 1);
        result
    }

    /// Number of owners that currently have a lock allocated.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Returns true if no owner has a lock allocated.
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
