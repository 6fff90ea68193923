//! Request identity used as the store key.
//!
//! A [`RequestKey`] is the method plus the path-and-query of a request. Only
//! same-origin requests are ever keyed, so scheme and authority carry no
//! information and are dropped, as is any fragment.
//!
//! ```
//! use shelter_core::RequestKey;
//!
//! let key = RequestKey::get("https://app.example.com/assets/app.js?v=3#top");
//! assert_eq!(key.to_string(), "GET /assets/app.js?v=3");
//! assert_eq!(RequestKey::get("/assets/app.js?v=3"), key);
//! ```
//!
//! [`RequestKey`] wraps its data in `Arc`, so cloning only bumps a reference count.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use http::{Method, Uri};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
struct RequestKeyInner {
    method: SmolStr,
    target: SmolStr,
}

/// Normalized request identity: `METHOD path?query`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(from = "RequestKeyInner", into = "RequestKeyInner")]
pub struct RequestKey {
    inner: Arc<RequestKeyInner>,
}

impl PartialEq for RequestKey {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.inner == other.inner
    }
}

impl Eq for RequestKey {}

impl Hash for RequestKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.hash(state);
    }
}

impl From<RequestKeyInner> for RequestKey {
    fn from(inner: RequestKeyInner) -> Self {
        RequestKey {
            inner: Arc::new(inner),
        }
    }
}

impl From<RequestKey> for RequestKeyInner {
    fn from(key: RequestKey) -> Self {
        Arc::try_unwrap(key.inner).unwrap_or_else(|arc| (*arc).clone())
    }
}

impl RequestKey {
    /// Builds a key from a method and an already normalized target.
    pub fn new(method: &Method, target: impl Into<SmolStr>) -> Self {
        RequestKeyInner {
            method: SmolStr::new(method.as_str()),
            target: target.into(),
        }
        .into()
    }

    /// Builds a key from a method and a parsed URI.
    pub fn from_uri(method: &Method, uri: &Uri) -> Self {
        let target = match uri.path_and_query() {
            Some(pq) if pq.path().is_empty() => format!("/{}", pq.as_str()),
            Some(pq) => pq.as_str().to_owned(),
            None => "/".to_owned(),
        };
        Self::new(method, target)
    }

    /// Builds a `GET` key from a URL or path string.
    ///
    /// Unparseable input is kept verbatim (minus any fragment) so lookups stay
    /// deterministic.
    pub fn get(url: &str) -> Self {
        let url = strip_fragment(url);
        match url.parse::<Uri>() {
            Ok(uri) => Self::from_uri(&Method::GET, &uri),
            Err(_) => Self::new(&Method::GET, url),
        }
    }

    /// Returns the request method.
    pub fn method(&self) -> &str {
        &self.inner.method
    }

    /// Returns the normalized path and query.
    pub fn target(&self) -> &str {
        &self.inner.target
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.inner.method, self.inner.target)
    }
}

pub(crate) fn strip_fragment(url: &str) -> &str {
    url.split_once('#').map_or(url, |(before, _)| before)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_and_authority_are_dropped() {
        assert_eq!(
            RequestKey::get("http://localhost:8080/api/materials"),
            RequestKey::get("/api/materials")
        );
    }

    #[test]
    fn query_is_part_of_identity() {
        assert_ne!(RequestKey::get("/api/materials?page=1"), RequestKey::get("/api/materials"));
    }

    #[test]
    fn empty_path_normalizes_to_root() {
        assert_eq!(RequestKey::get("https://app.example.com").target(), "/");
    }

    #[test]
    fn method_is_part_of_identity() {
        let uri: Uri = "/form".parse().unwrap();
        assert_ne!(
            RequestKey::from_uri(&Method::GET, &uri),
            RequestKey::from_uri(&Method::POST, &uri)
        );
    }
}
