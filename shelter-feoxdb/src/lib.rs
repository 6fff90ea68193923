#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

mod backend;
mod error;
mod layout;

pub use backend::{FeOxDbBackend, FeOxDbBackendBuilder};
pub use error::FeOxDbError;
