use bytes::Bytes;
use shelter_core::Raw;

use super::{Format, FormatError};
use crate::CacheEntry;

/// JSON format (default)
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

impl Format for JsonFormat {
    fn serialize(&self, entry: &CacheEntry) -> Result<Raw, FormatError> {
        serde_json::to_vec(entry)
            .map(Bytes::from)
            .map_err(|e| FormatError::Serialize(Box::new(e)))
    }

    fn deserialize(&self, data: &[u8]) -> Result<CacheEntry, FormatError> {
        serde_json::from_slice(data).map_err(|e| FormatError::Deserialize(Box::new(e)))
    }

    fn name(&self) -> &'static str {
        "json"
    }
}
