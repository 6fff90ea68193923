//! Per-request outcome metadata.

use crate::generation::GenerationName;
use crate::strategy::Strategy;

/// How the response relates to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheStatus {
    /// Served from the store without touching the network.
    Hit,
    /// Not in the store, or the store was bypassed.
    #[default]
    Miss,
    /// The network failed and a stored copy was served instead.
    Stale,
    /// Nothing was available; the offline fallback was served.
    Offline,
}

impl CacheStatus {
    /// Returns the status as a string slice.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "hit",
            CacheStatus::Miss => "miss",
            CacheStatus::Stale => "stale",
            CacheStatus::Offline => "offline",
        }
    }
}

/// Where the response body came from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ResponseSource {
    /// Fetched from the network.
    #[default]
    Network,
    /// Read from the given cache generation.
    Generation(GenerationName),
    /// Synthesized by the offline fallback.
    Fallback,
}

impl ResponseSource {
    /// Returns the source as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        match self {
            ResponseSource::Network => "network",
            ResponseSource::Generation(name) => name.as_str(),
            ResponseSource::Fallback => "fallback",
        }
    }
}

/// Outcome of serving one request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CacheContext {
    /// Strategy used, `None` when the request was not handled by a strategy.
    pub strategy: Option<Strategy>,
    /// Relationship to the store.
    pub status: CacheStatus,
    /// Origin of the body.
    pub source: ResponseSource,
}

impl CacheContext {
    /// Starts a context for the given strategy.
    pub fn new(strategy: Strategy) -> Self {
        Self {
            strategy: Some(strategy),
            ..Self::default()
        }
    }

    /// Records a store hit from `generation`.
    pub fn hit(self, generation: GenerationName) -> Self {
        Self {
            status: CacheStatus::Hit,
            source: ResponseSource::Generation(generation),
            ..self
        }
    }

    /// Records a stale store read after a network failure.
    pub fn stale(self, generation: GenerationName) -> Self {
        Self {
            status: CacheStatus::Stale,
            source: ResponseSource::Generation(generation),
            ..self
        }
    }

    /// Records that the offline fallback produced the response.
    pub fn offline(self, source: ResponseSource) -> Self {
        Self {
            status: CacheStatus::Offline,
            source,
            ..self
        }
    }
}
