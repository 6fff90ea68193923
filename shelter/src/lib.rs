#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

/// Request classification.
///
/// [`DefaultClassifier`](classifier::DefaultClassifier) maps each request to
/// a [`Strategy`] by route overrides, then by URL shape.
pub mod classifier;

/// Single-flight fetches.
///
/// [`BroadcastConcurrencyManager`](concurrency::BroadcastConcurrencyManager)
/// lets one caller fetch a key while concurrent callers wait for its
/// response.
pub mod concurrency;

/// Worker configuration loaded from YAML or built in code.
pub mod config;

/// Control messages, bulk pre-cache reports and push notifications.
pub mod control;

/// Error types.
pub mod error;

/// Strategy execution against a single generation.
pub mod executor;

/// Last-resort responses when a strategy fails.
pub mod fallback;

/// Notification and client window host traits.
pub mod host;

/// Worker lifecycle state machine.
pub mod lifecycle;

/// Metrics collection.
///
/// When the `metrics` feature is enabled, counters and histograms record
/// hits, misses, stale reads, offline fallbacks, network failures, store
/// write failures, removed generations and background tasks.
pub mod metrics;

/// Background tasks for push and notification handling.
pub mod offload;

/// Host-side driver installing, promoting and routing to workers.
pub mod registration;

/// One deployed version of the intermediary.
pub mod worker;

pub use classifier::{Classify, DefaultClassifier};
pub use config::{ConfigError, WorkerConfig};
pub use control::{BulkCacheReport, ControlMessage, ControlOutcome, Notification, PushPayload};
pub use error::{
    ActivateError, ControlError, HostError, InstallError, LifecycleError, RegisterError,
    StrategyError,
};
pub use lifecycle::{LifecycleEvent, LifecycleState};
pub use registration::{Registration, RegistrationBuilder};
pub use worker::{FetchOutcome, Worker, WorkerBuilder};

pub use shelter_backend::{Backend, CacheBackend};
pub use shelter_core::{
    CacheContext, CacheStatus, CapturedResponse, GenerationName, InterceptedRequest, Network,
    NetworkError, NetworkResult, Origin, RequestKey, RequestMode, ResponseSource, Strategy,
    Upstream,
};
