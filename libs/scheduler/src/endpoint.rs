//! Endpoint pool and tier table.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Tier used when the caller does not ask for one.
pub const DEFAULT_TIER: &str = "large";

/// A scan engine and the number of scans it may run at once.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    /// Base URL of the scan engine.
    pub address: String,

    /// Declared concurrency limit (the capacity tier value).
    pub max_scans: u32,
}

impl Endpoint {
    pub fn new(address: impl Into<String>, max_scans: u32) -> Self {
        Self {
            address: address.into(),
            max_scans,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}

/// Mapping from tier name to concurrency limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierTable {
    limits: BTreeMap<String, u32>,
    default_tier: String,
}

impl TierTable {
    /// Create a tier table whose default tier is [`DEFAULT_TIER`].
    pub fn new(limits: BTreeMap<String, u32>) -> Self {
        Self {
            limits,
            default_tier: DEFAULT_TIER.to_string(),
        }
    }

    /// Replace the default tier name.
    ///
    /// The name is not required to exist in the table.
    pub fn with_default(mut self, tier: impl Into<String>) -> Self {
        self.default_tier = tier.into();
        self
    }

    /// Limit for a tier, or `None` if the tier is not configured.
    pub fn limit(&self, tier: &str) -> Option<u32> {
        self.limits.get(tier).copied()
    }

    pub fn default_tier(&self) -> &str {
        &self.default_tier
    }

    /// Names of every tier whose limit equals `max_scans`.
    pub fn tiers_for(&self, max_scans: u32) -> Vec<&str> {
        self.limits
            .iter()
            .filter(|(_, limit)| **limit == max_scans)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

impl Default for TierTable {
    fn default() -> Self {
        Self::new(BTreeMap::from([
            ("large".to_string(), 2),
            ("medium".to_string(), 1),
        ]))
    }
}

impl<S: Into<String>> FromIterator<(S, u32)> for TierTable {
    fn from_iter<I: IntoIterator<Item = (S, u32)>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|(name, limit)| (name.into(), limit)).collect())
    }
}
