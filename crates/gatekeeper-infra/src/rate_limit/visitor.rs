//! Per-client counters.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use gatekeeper_core::domain::{CategoryPolicy, DEFAULT_CATEGORY};

use super::policy::PolicyRegistry;

#[derive(Debug, Clone, Copy)]
struct CategoryCounter {
    count: u32,
    last_seen: DateTime<Utc>,
}

/// Counters of one client, one per category it has used.
///
/// The mutex guards only this client's counters, so requests from different
/// clients never contend with each other.
#[derive(Debug)]
pub struct Visitor {
    created_at: DateTime<Utc>,
    counters: Mutex<HashMap<String, CategoryCounter>>,
}

impl Visitor {
    pub(crate) fn new(created_at: DateTime<Utc>) -> Self {
        Self {
            created_at,
            counters: Mutex::new(HashMap::new()),
        }
    }

    /// Record one request in `category` and return the post-increment count.
    ///
    /// A missing or stale counter restarts from zero first. The whole
    /// read-reset-increment sequence runs under this visitor's lock.
    pub fn check_and_increment(
        &self,
        category: &str,
        now: DateTime<Utc>,
        policy: &CategoryPolicy,
    ) -> u32 {
        let mut counters = self.lock();
        let counter = counters
            .entry(category.to_owned())
            .or_insert(CategoryCounter {
                count: 0,
                last_seen: now,
            });

        if policy.is_stale(counter.last_seen, now) {
            counter.count = 0;
        }
        counter.count = counter.count.saturating_add(1);
        counter.last_seen = now;
        counter.count
    }

    /// Most recent request time across all categories, or the creation time
    /// for a visitor that has not recorded anything yet.
    pub fn last_active(&self) -> DateTime<Utc> {
        self.lock()
            .values()
            .map(|counter| counter.last_seen)
            .max()
            .unwrap_or(self.created_at)
    }

    /// Current count for `category`, ignoring staleness.
    pub fn count(&self, category: &str) -> Option<u32> {
        self.lock().get(category).map(|counter| counter.count)
    }

    pub fn categories(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    /// Drop stale counters. Returns `true` when the visitor is idle and can be
    /// removed: every counter it had went stale, or it never recorded one and
    /// has existed for longer than the default window.
    pub(crate) fn prune_stale(&self, now: DateTime<Utc>, policies: &PolicyRegistry) -> bool {
        let mut counters = self.lock();
        if counters.is_empty() {
            return policies
                .get_policy(DEFAULT_CATEGORY)
                .is_stale(self.created_at, now);
        }

        counters.retain(|category, counter| {
            !policies.get_policy(category).is_stale(counter.last_seen, now)
        });
        counters.is_empty()
    }

    /// Lines of `category: count requests (last seen Ns ago)`, sorted by category.
    pub(crate) fn describe(&self, now: DateTime<Utc>) -> Vec<String> {
        let counters = self.lock();
        let mut lines: Vec<String> = counters
            .iter()
            .map(|(category, counter)| {
                let ago = (now - counter.last_seen).num_seconds().max(0);
                format!(
                    "{category}: {} requests (last seen {ago}s ago)",
                    counter.count
                )
            })
            .collect();
        lines.sort();
        lines
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CategoryCounter>> {
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
