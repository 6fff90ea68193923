//! Fully buffered responses that can be stored and replayed.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderName, InvalidHeaderName, InvalidHeaderValue};
use http::status::InvalidStatusCode;
use http::{HeaderMap, HeaderValue, Response, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error raised when a stored response cannot be rebuilt.
#[derive(Debug, Error)]
pub enum ResponseDecodeError {
    /// Stored status code is out of range.
    #[error("invalid status code: {0}")]
    Status(#[from] InvalidStatusCode),
    /// Stored header name is not a valid token.
    #[error("invalid header name: {0}")]
    HeaderName(#[from] InvalidHeaderName),
    /// Stored header value contains forbidden bytes.
    #[error("invalid header value: {0}")]
    HeaderValue(#[from] InvalidHeaderValue),
}

/// Response with a fully read body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "SerializableResponse", try_from = "SerializableResponse")]
pub struct CapturedResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl CapturedResponse {
    /// Creates a response from its parts.
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Creates a `200 OK` response with no headers.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(StatusCode::OK, HeaderMap::new(), body)
    }

    /// Creates a plain-text response with the given status.
    pub fn text(status: StatusCode, body: impl Into<Bytes>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        Self::new(status, headers, body)
    }

    /// Response status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable response headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Response body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Whether the status is in `200..=299`.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Converts into an [`http::Response`].
    pub fn into_http(self) -> Response<Bytes> {
        let mut response = Response::new(self.body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }

    /// Builds from an [`http::Response`] whose body is already buffered.
    pub fn from_http(response: Response<Bytes>) -> Self {
        let (parts, body) = response.into_parts();
        Self::new(parts.status, parts.headers, body)
    }
}

#[derive(Serialize, Deserialize)]
struct SerializableResponse {
    status: u16,
    headers: Vec<(String, Bytes)>,
    body: Bytes,
}

impl From<CapturedResponse> for SerializableResponse {
    fn from(response: CapturedResponse) -> Self {
        let headers = response
            .headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_owned(),
                    Bytes::copy_from_slice(value.as_bytes()),
                )
            })
            .collect();
        Self {
            status: response.status.as_u16(),
            headers,
            body: response.body,
        }
    }
}

impl TryFrom<SerializableResponse> for CapturedResponse {
    type Error = ResponseDecodeError;

    fn try_from(value: SerializableResponse) -> Result<Self, Self::Error> {
        let status = StatusCode::from_u16(value.status)?;
        let mut headers = HeaderMap::with_capacity(value.headers.len());
        for (name, raw) in value.headers {
            let name = HeaderName::from_bytes(name.as_bytes())?;
            headers.append(name, HeaderValue::from_maybe_shared(raw)?);
        }
        Ok(Self::new(status, headers, value.body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn repeated_headers_survive_serialization() {
        let mut headers = HeaderMap::new();
        headers.append("set-cookie", HeaderValue::from_static("a=1"));
        headers.append("set-cookie", HeaderValue::from_static("b=2"));
        let response = CapturedResponse::new(StatusCode::CREATED, headers, "payload");

        let json = serde_json::to_string(&response).unwrap();
        let decoded: CapturedResponse = serde_json::from_str(&json).unwrap();

        assert_eq!(decoded, response);
        assert_eq!(decoded.headers().get_all("set-cookie").iter().count(), 2);
    }

    #[test]
    fn invalid_status_is_rejected() {
        let json = r#"{"status":42,"headers":[],"body":[]}"#;
        assert!(serde_json::from_str::<CapturedResponse>(json).is_err());
    }

    #[test]
    fn success_range() {
        assert!(CapturedResponse::ok("x").is_success());
        assert!(!CapturedResponse::text(StatusCode::NOT_FOUND, "gone").is_success());
    }
}
