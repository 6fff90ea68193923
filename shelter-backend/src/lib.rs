//! Traits and structs for shelter generation store interaction.
//!
//! A store holds any number of named *generations*, each a flat map from
//! [`RequestKey`](shelter_core::RequestKey) to a serialized [`CacheEntry`].
//! Implement [`Backend`] for the five raw primitives and get the typed
//! operations of [`CacheBackend`] for free.
mod backend;
mod entry;
mod error;
pub mod format;

pub use backend::{Backend, BackendResult, CacheBackend};
pub use entry::CacheEntry;
pub use error::BackendError;
pub use format::{BincodeFormat, Format, FormatError, JsonFormat};

/// Status of deleting result.
#[derive(Debug, PartialEq, Eq)]
pub enum DeleteStatus {
    /// Generation deleted together with this many entries.
    Deleted(u32),
    /// Generation already missing.
    Missing,
}
