#![warn(missing_docs)]
//! # shelter-core
//!
//! Core types shared by every shelter crate.
//!
//! shelter is an offline-capable caching intermediary: it sits between a client
//! application and the network, intercepts outbound requests and answers them
//! from a versioned local store, from the network, or from an offline fallback.
//! This crate holds the vocabulary the other crates speak:
//!
//! - **Identify** requests ([`InterceptedRequest`], [`RequestKey`], [`Origin`])
//! - **Capture** responses so they can be stored and replayed ([`CapturedResponse`])
//! - **Name** cache generations ([`GenerationName`])
//! - **Select** how a request is served ([`Strategy`])
//! - **Call** the network ([`Upstream`], [`Network`])
//! - **Report** where a response came from ([`CacheContext`])
//! - **Execute** background tasks ([`Offload`])

pub mod context;
pub mod generation;
pub mod key;
pub mod offload;
pub mod request;
pub mod response;
pub mod strategy;
pub mod upstream;

pub use context::{CacheContext, CacheStatus, ResponseSource};
pub use generation::GenerationName;
pub use key::RequestKey;
pub use offload::Offload;
pub use request::{InterceptedRequest, InvalidOrigin, Origin, RequestMode, SEC_FETCH_MODE};
pub use response::{CapturedResponse, ResponseDecodeError};
pub use strategy::Strategy;
pub use upstream::{Network, NetworkError, NetworkResult, Upstream};

#[doc(hidden)]
pub use smol_str::SmolStr;

/// Raw byte data type used for serialized store entries.
/// Using `Bytes` provides efficient zero-copy cloning via reference counting.
pub type Raw = bytes::Bytes;
