//! The network boundary.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::request::InterceptedRequest;
use crate::response::CapturedResponse;

/// Trait for calling the network with intercepted requests.
///
/// # Examples
///
/// ```rust,ignore
/// use shelter_core::{InterceptedRequest, NetworkResult, Upstream};
/// use std::future::Ready;
///
/// #[derive(Clone)]
/// struct Offline;
///
/// impl Upstream<InterceptedRequest> for Offline {
///     type Response = NetworkResult;
///     type Future = Ready<Self::Response>;
///
///     fn call(&mut self, _req: InterceptedRequest) -> Self::Future {
///         std::future::ready(Err(NetworkError::Aborted))
///     }
/// }
/// ```
pub trait Upstream<Req> {
    /// The response type returned by the upstream service
    type Response;

    /// The future that resolves to the response
    type Future: Future<Output = Self::Response> + Send;

    /// Call the upstream service with the given request
    fn call(&mut self, req: Req) -> Self::Future;
}

/// A network fetch that never produced a response.
///
/// Non-2xx responses are not errors; they come back as [`CapturedResponse`].
#[derive(Debug, Error)]
pub enum NetworkError {
    /// Connection refused, DNS failure, reset and similar transport errors.
    #[error("connection error: {0}")]
    Connection(Box<dyn std::error::Error + Send + Sync>),
    /// No response within the configured timeout.
    #[error("network timeout after {0:?}")]
    Timeout(Duration),
    /// The fetch was cancelled.
    #[error("request aborted")]
    Aborted,
    /// The request could not be sent at all.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl NetworkError {
    /// Wraps any transport error.
    pub fn connection<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        NetworkError::Connection(Box::new(error))
    }
}

/// Outcome of a single network fetch.
pub type NetworkResult = Result<CapturedResponse, NetworkError>;

/// An [`Upstream`] that fetches intercepted requests and can be shared across tasks.
pub trait Network:
    Upstream<InterceptedRequest, Response = NetworkResult> + Clone + Send + Sync + 'static
{
}

impl<T> Network for T where
    T: Upstream<InterceptedRequest, Response = NetworkResult> + Clone + Send + Sync + 'static
{
}
