use bytes::Bytes;
use shelter_core::Raw;

use super::{Format, FormatError};
use crate::CacheEntry;

/// Bincode format
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeFormat;

impl Format for BincodeFormat {
    fn serialize(&self, entry: &CacheEntry) -> Result<Raw, FormatError> {
        ::bincode::serde::encode_to_vec(entry, ::bincode::config::standard())
            .map(Bytes::from)
            .map_err(|e| FormatError::Serialize(Box::new(e)))
    }

    fn deserialize(&self, data: &[u8]) -> Result<CacheEntry, FormatError> {
        ::bincode::serde::decode_from_slice(data, ::bincode::config::standard())
            .map(|(entry, _)| entry)
            .map_err(|e| FormatError::Deserialize(Box::new(e)))
    }

    fn name(&self) -> &'static str {
        "bincode"
    }
}
