//! Visitor registry with capacity eviction and staleness sweeping.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use gatekeeper_core::PolicyError;
use gatekeeper_core::domain::LimiterStats;

use super::policy::PolicyRegistry;
use super::visitor::Visitor;

type Visitors = HashMap<String, Arc<Visitor>>;

/// Registry of visitors keyed by client key, bounded by `max_visitors`.
///
/// The registry lock covers structural changes and full walks only. Callers
/// get an `Arc<Visitor>` back and update counters after the registry lock is
/// released; lock order is always registry, then visitor.
#[derive(Debug)]
pub struct VisitorStore {
    visitors: RwLock<Visitors>,
    max_visitors: AtomicUsize,
}

impl VisitorStore {
    pub fn new(max_visitors: usize) -> Result<Self, PolicyError> {
        if max_visitors == 0 {
            return Err(PolicyError::ZeroCapacity);
        }

        Ok(Self {
            visitors: RwLock::new(HashMap::new()),
            max_visitors: AtomicUsize::new(max_visitors),
        })
    }

    /// Existing visitor for `client_key`, or a new empty one.
    ///
    /// Inserting into a full registry first evicts the least recently active
    /// visitor.
    pub fn get_or_create(&self, client_key: &str, now: DateTime<Utc>) -> Arc<Visitor> {
        if let Some(visitor) = self.read().get(client_key) {
            return Arc::clone(visitor);
        }

        let mut visitors = self.write();
        // Another request may have inserted it between the two locks.
        if let Some(visitor) = visitors.get(client_key) {
            return Arc::clone(visitor);
        }

        let max = self.max_visitors.load(Ordering::Relaxed);
        while visitors.len() >= max {
            match evict_least_recent(&mut visitors) {
                Some(evicted) => tracing::debug!(
                    client = %evicted,
                    capacity = max,
                    "Visitor evicted at capacity"
                ),
                None => break,
            }
        }

        let visitor = Arc::new(Visitor::new(now));
        visitors.insert(client_key.to_owned(), Arc::clone(&visitor));
        visitor
    }

    pub fn get(&self, client_key: &str) -> Option<Arc<Visitor>> {
        self.read().get(client_key).cloned()
    }

    pub fn contains(&self, client_key: &str) -> bool {
        self.read().contains_key(client_key)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn max_visitors(&self) -> usize {
        self.max_visitors.load(Ordering::Relaxed)
    }

    /// Change the capacity. Shrinking below the current size evicts the least
    /// recently active visitors right away. Returns how many were evicted.
    pub fn set_max_visitors(&self, max_visitors: usize) -> Result<usize, PolicyError> {
        if max_visitors == 0 {
            return Err(PolicyError::ZeroCapacity);
        }

        let mut visitors = self.write();
        self.max_visitors.store(max_visitors, Ordering::Relaxed);

        let mut evicted = 0;
        while visitors.len() > max_visitors && evict_least_recent(&mut visitors).is_some() {
            evicted += 1;
        }

        tracing::info!(max_visitors, evicted, "Visitor capacity updated");
        Ok(evicted)
    }

    /// Drop stale counters from every visitor and remove visitors left idle.
    /// Returns the number of visitors removed.
    pub fn sweep(&self, policies: &PolicyRegistry, now: DateTime<Utc>) -> usize {
        let mut visitors = self.write();
        let before = visitors.len();
        visitors.retain(|_, visitor| !visitor.prune_stale(now, policies));
        before - visitors.len()
    }

    pub fn stats(&self) -> LimiterStats {
        let visitors = self.read();
        let mut categories = BTreeMap::new();
        for visitor in visitors.values() {
            for category in visitor.categories() {
                *categories.entry(category).or_insert(0) += 1;
            }
        }

        LimiterStats {
            total_visitors: visitors.len(),
            max_visitors: self.max_visitors(),
            categories,
        }
    }

    /// Forget one client. Returns whether it was tracked.
    pub fn reset_visitor(&self, client_key: &str) -> bool {
        self.write().remove(client_key).is_some()
    }

    pub fn reset_all(&self) {
        self.write().clear();
    }

    /// Debug listing of every visitor and its counters, sorted by client key.
    pub fn dump(&self, now: DateTime<Utc>) -> String {
        let visitors = self.read();
        let mut keys: Vec<&String> = visitors.keys().collect();
        keys.sort();

        let mut out = format!("=== Current Visitors ({}) ===\n", visitors.len());
        for key in keys {
            let _ = writeln!(out, "IP: {key}");
            for line in visitors[key].describe(now) {
                let _ = writeln!(out, "  {line}");
            }
        }
        out.push_str("===============================");
        out
    }

    fn read(&self) -> RwLockReadGuard<'_, Visitors> {
        self.visitors.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Visitors> {
        self.visitors.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Remove the visitor whose latest activity is the oldest. O(n) over visitors.
fn evict_least_recent(visitors: &mut Visitors) -> Option<String> {
    let oldest = visitors
        .iter()
        .min_by_key(|(_, visitor)| visitor.last_active())
        .map(|(key, _)| key.clone())?;

    visitors.remove(&oldest);
    Some(oldest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use gatekeeper_core::domain::CategoryPolicy;
    use std::time::Duration;

    fn start() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn touch(store: &VisitorStore, key: &str, category: &str, at: DateTime<Utc>) {
        let policy = CategoryPolicy::new(100, Duration::from_secs(60)).unwrap();
        store
            .get_or_create(key, at)
            .check_and_increment(category, at, &policy);
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        assert_eq!(VisitorStore::new(0).unwrap_err(), PolicyError::ZeroCapacity);
    }

    #[test]
    fn test_get_or_create_returns_same_visitor() {
        let store = VisitorStore::new(10).unwrap();

        let first = store.get_or_create("203.0.113.5", start());
        let second = store.get_or_create("203.0.113.5", start());

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_capacity_evicts_least_recently_active() {
        let store = VisitorStore::new(3).unwrap();
        touch(&store, "a", "posts", start());
        touch(&store, "b", "posts", start() + TimeDelta::seconds(1));
        touch(&store, "c", "posts", start() + TimeDelta::seconds(2));
        // "a" becomes the most recent; "b" is now the oldest.
        touch(&store, "a", "auth", start() + TimeDelta::seconds(3));

        touch(&store, "d", "posts", start() + TimeDelta::seconds(4));

        assert_eq!(store.len(), 3);
        assert!(!store.contains("b"));
        assert!(store.contains("a"));
        assert!(store.contains("c"));
        assert!(store.contains("d"));
    }

    #[test]
    fn test_size_never_exceeds_capacity() {
        let store = VisitorStore::new(5).unwrap();
        for i in 0..50 {
            touch(
                &store,
                &format!("198.51.100.{i}"),
                "posts",
                start() + TimeDelta::seconds(i),
            );
            assert!(store.len() <= 5);
        }
        assert_eq!(store.len(), 5);
        assert!(store.contains("198.51.100.49"));
    }

    #[test]
    fn test_shrinking_capacity_evicts_immediately() {
        let store = VisitorStore::new(10).unwrap();
        for i in 0..6 {
            touch(&store, &format!("c{i}"), "posts", start() + TimeDelta::seconds(i));
        }

        assert_eq!(store.set_max_visitors(4), Ok(2));
        assert_eq!(store.len(), 4);
        assert!(!store.contains("c0"));
        assert!(!store.contains("c1"));
        assert_eq!(store.set_max_visitors(0), Err(PolicyError::ZeroCapacity));
    }

    #[test]
    fn test_sweep_removes_idle_visitors_only() {
        let registry = PolicyRegistry::default();
        let store = VisitorStore::new(10).unwrap();
        let auth = registry.get_policy("auth");
        let posts = registry.get_policy("posts");

        store
            .get_or_create("idle", start())
            .check_and_increment("posts", start(), &posts);
        let busy = store.get_or_create("busy", start());
        busy.check_and_increment("posts", start(), &posts);
        busy.check_and_increment("auth", start(), &auth);

        let removed = store.sweep(&registry, start() + TimeDelta::minutes(2));

        assert_eq!(removed, 1);
        assert!(!store.contains("idle"));
        assert_eq!(busy.categories(), vec!["auth".to_owned()]);
    }

    #[test]
    fn test_stats_counts_visitors_per_category() {
        let store = VisitorStore::new(10).unwrap();
        touch(&store, "a", "auth", start());
        touch(&store, "a", "posts", start());
        touch(&store, "b", "posts", start());

        let stats = store.stats();

        assert_eq!(stats.total_visitors, 2);
        assert_eq!(stats.max_visitors, 10);
        assert_eq!(stats.categories.get("posts"), Some(&2));
        assert_eq!(stats.categories.get("auth"), Some(&1));
    }

    #[test]
    fn test_reset_visitor_and_reset_all() {
        let store = VisitorStore::new(10).unwrap();
        touch(&store, "a", "auth", start());
        touch(&store, "b", "auth", start());

        assert!(store.reset_visitor("a"));
        assert!(!store.reset_visitor("a"));
        assert_eq!(store.len(), 1);

        store.reset_all();
        assert!(store.is_empty());
    }

    #[test]
    fn test_dump_lists_visitors() {
        let store = VisitorStore::new(10).unwrap();
        touch(&store, "203.0.113.5", "auth", start());

        let dump = store.dump(start() + TimeDelta::seconds(5));

        assert!(dump.contains("=== Current Visitors (1) ==="));
        assert!(dump.contains("IP: 203.0.113.5"));
        assert!(dump.contains("auth: 1 requests (last seen 5s ago)"));
    }
}
