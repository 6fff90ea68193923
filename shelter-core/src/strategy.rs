//! Caching strategies.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How a request is served from the store and the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Serve from the store when present; otherwise fetch and store.
    CacheFirst,
    /// Fetch first and refresh the store; fall back to the store when offline.
    NetworkFirst,
    /// Always fetch; never touch the store.
    NetworkOnly,
    /// Only ever serve from the store.
    CacheOnly,
}

impl Strategy {
    /// Returns the strategy as a string slice.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Strategy::CacheFirst => "cache-first",
            Strategy::NetworkFirst => "network-first",
            Strategy::NetworkOnly => "network-only",
            Strategy::CacheOnly => "cache-only",
        }
    }

    /// Whether this strategy writes successful network responses to the store.
    pub const fn stores_responses(&self) -> bool {
        matches!(self, Strategy::CacheFirst | Strategy::NetworkFirst)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
