use std::collections::BTreeMap;

use serde::Serialize;

/// Point-in-time view of the visitor registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LimiterStats {
    pub total_visitors: usize,
    pub max_visitors: usize,
    /// Number of visitors holding a counter for each category.
    pub categories: BTreeMap<String, usize>,
}
