//! Error types for the caching intermediary.
//!
//! None of these reach the calling application through the request path:
//! strategy failures end in the offline responder, install and activation
//! failures keep the previous worker serving.

use http::StatusCode;
use shelter_backend::BackendError;
use shelter_core::NetworkError;
use thiserror::Error;

use crate::lifecycle::{LifecycleEvent, LifecycleState};

/// A strategy could not produce a response.
#[derive(Debug, Error)]
pub enum StrategyError {
    /// The network call failed and the store had nothing to offer.
    #[error("network request failed: {0}")]
    Network(#[from] NetworkError),
    /// Cache-only lookup missed.
    #[error("no cached response")]
    NotCached,
}

/// Installation of a generation failed. The generation never becomes current.
#[derive(Debug, Error)]
pub enum InstallError {
    /// A manifest URL could not be fetched.
    #[error("failed to fetch `{url}`: {source}")]
    Fetch {
        /// Manifest URL.
        url: String,
        /// Underlying network failure.
        #[source]
        source: NetworkError,
    },
    /// A manifest URL answered outside `200..=299`.
    #[error("`{url}` answered with status {status}")]
    Status {
        /// Manifest URL.
        url: String,
        /// Status received.
        status: StatusCode,
    },
    /// A manifest URL points at another origin.
    #[error("`{url}` is not same-origin")]
    CrossOrigin {
        /// Manifest URL.
        url: String,
    },
    /// A manifest URL is not a valid URI.
    #[error("`{url}` is not a valid URL")]
    InvalidUrl {
        /// Manifest URL.
        url: String,
    },
    /// Writing the generation failed.
    #[error(transparent)]
    Store(#[from] BackendError),
    /// The worker was not in a state that allows installing.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

/// Activation of a generation failed.
#[derive(Debug, Error)]
pub enum ActivateError {
    /// Deleting stale generations failed.
    #[error("generation cleanup failed: {0}")]
    Store(#[from] BackendError),
    /// The worker was not in a state that allows activating.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

/// Registering a new worker failed.
///
/// Whatever the cause, the previously active worker keeps serving.
#[derive(Debug, Error)]
pub enum RegisterError {
    /// The new worker could not be installed.
    #[error(transparent)]
    Install(#[from] InstallError),
    /// The new worker installed but could not be activated.
    #[error(transparent)]
    Activate(#[from] ActivateError),
}

/// Lifecycle state machine violation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    /// `event` is not accepted in state `from`.
    #[error("invalid lifecycle transition: {event:?} in state {from:?}")]
    InvalidTransition {
        /// State the worker was in.
        from: LifecycleState,
        /// Rejected event.
        event: LifecycleEvent,
    },
}

/// A control message could not be handled.
#[derive(Debug, Error)]
pub enum ControlError {
    /// The message is not valid JSON or does not match its declared type.
    #[error("malformed control message: {0}")]
    Parse(#[from] serde_json::Error),
    /// The message declares a type this worker does not handle.
    #[error("unknown control message type `{0}`")]
    UnknownType(String),
    /// No worker is in the state the message needs.
    #[error("no {0} worker to handle the message")]
    NoWorker(&'static str),
    /// Promoting the waiting worker failed.
    #[error(transparent)]
    Activate(#[from] ActivateError),
}

/// Failure reported by a host integration (notification display, window
/// management, client claiming).
#[derive(Debug, Error)]
#[error(transparent)]
pub struct HostError(Box<dyn std::error::Error + Send + Sync>);

impl HostError {
    /// Wraps any error.
    pub fn new<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self(Box::new(error))
    }

    /// Builds an error from a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self(message.into().into())
    }
}
