//! Cache generation names.
//!
//! A generation is one versioned instance of the persistent store. Its name is
//! `{prefix}-{version}`, so bumping the version is enough to start from an empty
//! store and let activation delete everything the previous version cached.
//!
//! ```
//! use shelter_core::GenerationName;
//!
//! let name = GenerationName::new("app", "v2");
//! assert_eq!(name.as_str(), "app-v2");
//! assert_eq!(name.version_for("app"), Some("v2"));
//! assert_eq!(name.version_for("other"), None);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Name of a cache generation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenerationName(SmolStr);

impl GenerationName {
    /// Builds the generation name for `prefix` and `version`.
    pub fn new(prefix: &str, version: &str) -> Self {
        Self(SmolStr::from(format!("{prefix}-{version}")))
    }

    /// Wraps a name read back from a store without reinterpreting it.
    pub fn from_raw(name: impl Into<SmolStr>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the version part if this generation was created with `prefix`.
    pub fn version_for(&self, prefix: &str) -> Option<&str> {
        self.0
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('-'))
            .filter(|version| !version.is_empty())
    }
}

impl fmt::Display for GenerationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for GenerationName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
