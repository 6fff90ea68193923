use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shelter_core::CapturedResponse;

/// A stored response together with its insertion time.
///
/// Entries carry no expiry. They live exactly as long as their generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The captured response.
    pub response: CapturedResponse,
    /// When the entry was written.
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Wraps a response stamped with the current time.
    pub fn new(response: CapturedResponse) -> Self {
        Self {
            response,
            stored_at: Utc::now(),
        }
    }

    /// Returns the response, dropping the metadata.
    pub fn into_response(self) -> CapturedResponse {
        self.response
    }
}
