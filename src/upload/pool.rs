//! Bookkeeping of uploads currently in flight.

use std::collections::HashSet;

use dashmap::DashMap;

use crate::video::OwnerId;

/// Default number of uploads one owner may have in flight.
pub const DEFAULT_PARALLEL_LIMIT: usize = 2;

/// One admitted, not yet finished upload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InFlightEntry {
    /// Owner of the upload.
    pub owner: OwnerId,
    /// Video name.
    pub name: String,
}

impl InFlightEntry {
    /// Create a new entry.
    pub fn new(owner: OwnerId, name: impl Into<String>) -> Self {
        Self {
            owner,
            name: name.into(),
        }
    }
}

/// Owner-partitioned set of in-flight uploads.
///
/// Owners with nothing in flight have no key, so the map only grows with
/// current activity. Every method is safe to call from several tasks at
/// once, but a check followed by an [`add`](Self::add) is only atomic when
/// the caller serializes it per owner.
#[derive(Debug)]
pub struct InFlightPool {
    limit: usize,
    entries: DashMap<OwnerId, HashSet<String>>,
}

impl InFlightPool {
    /// Create a pool allowing `limit` uploads per owner.
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            entries: DashMap::new(),
        }
    }

    /// Record `entry` as in flight.
    pub fn add(&self, entry: InFlightEntry) {
        self.entries
            .entry(entry.owner)
            .or_default()
            .insert(entry.name);
    }

    /// Forget `entry`. Returns true if it was recorded.
    pub fn remove(&self, entry: &InFlightEntry) -> bool {
        let (removed, now_empty) = match self.entries.get_mut(&entry.owner) {
            Some(mut names) => {
                let removed = names.remove(&entry.name);
                (removed, names.is_empty())
            }
            None => (false, false),
        };
        if now_empty {
            self.entries.remove_if(&entry.owner, |_, names| names.is_empty());
        }
        removed
    }

    /// Returns true if `owner` is below the limit.
    pub fn can_admit_more(&self, owner: OwnerId) -> bool {
        self.count(owner) < self.limit
    }

    /// Returns true if `owner` has an upload named `name` in flight.
    pub fn has_name(&self, owner: OwnerId, name: &str) -> bool {
        self.entries
            .get(&owner)
            .is_some_and(|names| names.contains(name))
    }

    /// Number of uploads `owner` has in flight.
    pub fn count(&self, owner: OwnerId) -> usize {
        self.entries.get(&owner).map_or(0, |names| names.len())
    }

    /// Per-owner limit.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Number of owners with at least one upload in flight.
    pub fn active_owners(&self) -> usize {
        self.entries.len()
    }
}

impl Default for InFlightPool {
    fn default() -> Self {
        Self::new(DEFAULT_PARALLEL_LIMIT)
    }
}
