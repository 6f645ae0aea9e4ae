//! Category policy registry.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use gatekeeper_core::PolicyError;
use gatekeeper_core::domain::{
    CategoryPolicy, DEFAULT_CATEGORY, PolicyProfile, format_window_compact,
};

/// Table of category budgets, mutable at runtime.
///
/// Lookups never fail: unknown categories resolve to the `default` entry, and
/// a table seeded without one falls back to [`CategoryPolicy::default`].
#[derive(Debug)]
pub struct PolicyRegistry {
    policies: RwLock<HashMap<String, CategoryPolicy>>,
}

impl PolicyRegistry {
    pub fn new<I, S>(seed: I) -> Self
    where
        I: IntoIterator<Item = (S, CategoryPolicy)>,
        S: Into<String>,
    {
        let policies = seed
            .into_iter()
            .map(|(category, policy)| (category.into(), policy))
            .collect();

        Self {
            policies: RwLock::new(policies),
        }
    }

    pub fn from_profile(profile: PolicyProfile) -> Self {
        Self::new(profile.policies())
    }

    /// Policy for `category`, or the default policy.
    pub fn get_policy(&self, category: &str) -> CategoryPolicy {
        let policies = self.read();
        policies
            .get(category)
            .or_else(|| policies.get(DEFAULT_CATEGORY))
            .copied()
            .unwrap_or_default()
    }

    /// Insert or replace the policy for `category`.
    ///
    /// Existing counters keep their values and are compared against the new
    /// budget from the next request on.
    pub fn set_policy(
        &self,
        category: &str,
        max_requests: u32,
        window: Duration,
    ) -> Result<CategoryPolicy, PolicyError> {
        let policy = CategoryPolicy::new(max_requests, window)?;
        self.write().insert(category.to_owned(), policy);

        tracing::info!(
            category,
            max_requests,
            window_secs = window.as_secs(),
            "Rate limit policy updated"
        );
        Ok(policy)
    }

    /// Snapshot copy of every configured policy, sorted by category.
    pub fn list_policies(&self) -> BTreeMap<String, CategoryPolicy> {
        self.read()
            .iter()
            .map(|(category, policy)| (category.clone(), *policy))
            .collect()
    }

    /// Operator-facing table of all policies.
    pub fn dump(&self) -> String {
        let mut out = String::from("=== Rate Limit Configuration ===\n");
        for (category, policy) in self.list_policies() {
            let _ = writeln!(
                out,
                "{category:<12}: {:>3} requests per {}",
                policy.max_requests,
                format_window_compact(policy.window)
            );
        }
        out.push_str("================================");
        out
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, CategoryPolicy>> {
        self.policies.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, CategoryPolicy>> {
        self.policies.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for PolicyRegistry {
    fn default() -> Self {
        Self::from_profile(PolicyProfile::default())
    }
}
