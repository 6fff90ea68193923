//! Serialization formats for stored entries.

use shelter_core::Raw;
use thiserror::Error;

use crate::CacheEntry;

mod bincode;
mod json;

pub use self::bincode::BincodeFormat;
pub use self::json::JsonFormat;

#[derive(Error, Debug)]
pub enum FormatError {
    #[error(transparent)]
    Serialize(Box<dyn std::error::Error + Send + Sync>),

    #[error(transparent)]
    Deserialize(Box<dyn std::error::Error + Send + Sync>),
}

/// Turns [`CacheEntry`] values into bytes and back.
///
/// Object safe so backends can pick a format at runtime.
pub trait Format: std::fmt::Debug + Send + Sync {
    fn serialize(&self, entry: &CacheEntry) -> Result<Raw, FormatError>;

    fn deserialize(&self, data: &[u8]) -> Result<CacheEntry, FormatError>;

    /// Short identifier used in logs.
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderMap, HeaderValue, StatusCode};
    use pretty_assertions::assert_eq;
    use shelter_core::CapturedResponse;

    fn entry() -> CacheEntry {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/javascript"));
        CacheEntry::new(CapturedResponse::new(
            StatusCode::OK,
            headers,
            "console.log('shell')",
        ))
    }

    #[test]
    fn json_preserves_entry() {
        let entry = entry();
        let raw = JsonFormat.serialize(&entry).unwrap();
        assert_eq!(JsonFormat.deserialize(&raw).unwrap(), entry);
    }

    #[test]
    fn bincode_preserves_entry() {
        let entry = entry();
        let raw = BincodeFormat.serialize(&entry).unwrap();
        assert_eq!(BincodeFormat.deserialize(&raw).unwrap(), entry);
    }

    #[test]
    fn garbage_is_a_deserialize_error() {
        assert!(matches!(
            JsonFormat.deserialize(b"not json"),
            Err(FormatError::Deserialize(_))
        ));
        assert!(matches!(
            BincodeFormat.deserialize(&[0xff]),
            Err(FormatError::Deserialize(_))
        ));
    }
}
