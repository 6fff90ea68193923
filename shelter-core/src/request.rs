//! Requests as seen by the intercepting layer.

use std::fmt;

use http::header::HeaderName;
use http::uri::{InvalidUri, Scheme};
use http::{HeaderMap, HeaderValue, Method, Uri};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use thiserror::Error;

use crate::key::{RequestKey, strip_fragment};

/// Header carrying the fetch mode of a browser request.
pub const SEC_FETCH_MODE: HeaderName = HeaderName::from_static("sec-fetch-mode");

/// How the request was initiated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Top-level document navigation.
    Navigate,
    /// Any other fetch (subresource, XHR, worker-initiated).
    #[default]
    Other,
}

/// A request intercepted from a client.
#[derive(Debug, Clone)]
pub struct InterceptedRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    mode: RequestMode,
}

impl InterceptedRequest {
    /// Builds a `GET` request for a URL or path, dropping any fragment.
    pub fn get(url: &str) -> Result<Self, InvalidUri> {
        let uri = strip_fragment(url).parse::<Uri>()?;
        Ok(Self::from_parts(Method::GET, uri, HeaderMap::new()))
    }

    /// Builds a navigation `GET` request for a URL or path.
    pub fn navigate(url: &str) -> Result<Self, InvalidUri> {
        Self::get(url).map(|request| request.with_mode(RequestMode::Navigate))
    }

    /// Builds a request from its parts, deriving the mode from `Sec-Fetch-Mode`.
    pub fn from_parts(method: Method, uri: Uri, headers: HeaderMap) -> Self {
        let mode = match headers.get(SEC_FETCH_MODE).and_then(|v| v.to_str().ok()) {
            Some(value) if value.eq_ignore_ascii_case("navigate") => RequestMode::Navigate,
            _ => RequestMode::Other,
        };
        Self {
            method,
            uri,
            headers,
            mode,
        }
    }

    /// Overrides the request mode.
    pub fn with_mode(self, mode: RequestMode) -> Self {
        Self { mode, ..self }
    }

    /// Adds a header to the request.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request URI.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Request mode.
    pub fn mode(&self) -> RequestMode {
        self.mode
    }

    /// Whether this is a top-level navigation.
    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    /// URL path, `/` when the URI has none.
    pub fn path(&self) -> &str {
        match self.uri.path() {
            "" => "/",
            path => path,
        }
    }

    /// Store key for this request.
    pub fn key(&self) -> RequestKey {
        RequestKey::from_uri(&self.method, &self.uri)
    }

    /// Origin of the request URI, `None` for origin-relative requests.
    pub fn origin(&self) -> Option<Origin> {
        Origin::of(&self.uri)
    }

    /// Splits the request into its parts.
    pub fn into_parts(self) -> (Method, Uri, HeaderMap) {
        (self.method, self.uri, self.headers)
    }
}

/// Error returned when an origin string cannot be parsed.
#[derive(Debug, Error)]
#[error("invalid origin `{input}`: {reason}")]
pub struct InvalidOrigin {
    input: String,
    reason: &'static str,
}

/// Scheme, host and port triple identifying the application's origin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Origin {
    scheme: SmolStr,
    host: SmolStr,
    port: u16,
}

impl Origin {
    /// Parses an origin such as `https://app.example.com` or `http://localhost:5173`.
    pub fn parse(input: &str) -> Result<Self, InvalidOrigin> {
        let invalid = |reason| InvalidOrigin {
            input: input.to_owned(),
            reason,
        };
        let uri = input.parse::<Uri>().map_err(|_| invalid("not a URI"))?;
        if uri.path_and_query().is_some_and(|pq| pq.as_str() != "/") {
            return Err(invalid("origin must not have a path"));
        }
        Self::of(&uri).ok_or_else(|| invalid("scheme and host are required"))
    }

    /// Extracts the origin of an absolute URI.
    pub fn of(uri: &Uri) -> Option<Self> {
        let scheme = uri.scheme()?;
        let host = uri.host()?;
        let port = uri.port_u16().or_else(|| default_port(scheme))?;
        Some(Self {
            scheme: SmolStr::new(scheme.as_str().to_ascii_lowercase()),
            host: SmolStr::new(host.to_ascii_lowercase()),
            port,
        })
    }

    /// Whether `uri` belongs to this origin. Origin-relative URIs always do.
    pub fn contains(&self, uri: &Uri) -> bool {
        match Self::of(uri) {
            Some(other) => &other == self,
            None => uri.authority().is_none(),
        }
    }

    /// Scheme, lowercased.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Host, lowercased.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Explicit or scheme-default port.
    pub fn port(&self) -> u16 {
        self.port
    }
}

fn default_port(scheme: &Scheme) -> Option<u16> {
    if *scheme == Scheme::HTTP {
        Some(80)
    } else if *scheme == Scheme::HTTPS {
        Some(443)
    } else {
        None
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let default = match self.scheme.as_str() {
            "http" => 80,
            "https" => 443,
            _ => 0,
        };
        if self.port == default {
            write!(f, "{}://{}", self.scheme, self.host)
        } else {
            write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
        }
    }
}

impl TryFrom<String> for Origin {
    type Error = InvalidOrigin;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Origin::parse(&value)
    }
}

impl From<Origin> for String {
    fn from(origin: Origin) -> Self {
        origin.to_string()
    }
}
