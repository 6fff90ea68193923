//! Control channel messages and push notifications.
//!
//! Messages arrive as JSON objects tagged by `type`:
//!
//! ```json
//! {"type": "SKIP_WAITING"}
//! {"type": "CACHE_URLS", "urls": ["/reports/q1.html", "/img/chart.png"]}
//! ```

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::config::NotificationDefaults;
use crate::error::ControlError;

/// A message posted to the intermediary by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Promote the waiting worker now.
    SkipWaiting,
    /// Fetch and store these URLs in the current generation.
    CacheUrls {
        /// URLs to store. Each one succeeds or fails on its own. Missing or
        /// `null` means none.
        #[serde(default, deserialize_with = "urls_or_empty")]
        urls: Vec<String>,
    },
}

fn urls_or_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl ControlMessage {
    /// Parses a JSON message.
    ///
    /// A well-formed object with an unrecognised `type` yields
    /// [`ControlError::UnknownType`] so callers can ignore it.
    pub fn from_json(json: &str) -> Result<Self, ControlError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let kind = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .map(str::to_owned);
        match kind {
            Some(kind) if kind != "SKIP_WAITING" && kind != "CACHE_URLS" => {
                Err(ControlError::UnknownType(kind))
            }
            _ => Ok(serde_json::from_value(value)?),
        }
    }
}

/// What handling a control message did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlOutcome {
    /// Skip-waiting was recorded. `promoted` tells whether a waiting worker
    /// became active as a result.
    SkipWaiting {
        /// Whether a worker was promoted.
        promoted: bool,
    },
    /// Result of a bulk pre-cache.
    Cached(BulkCacheReport),
    /// The message was not for us.
    Ignored,
}

/// Per-URL result of a bulk pre-cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkCacheReport {
    /// URLs now present in the store, in request order.
    pub cached: Vec<String>,
    /// URLs that could not be stored, in request order.
    pub failed: Vec<BulkCacheFailure>,
}

impl BulkCacheReport {
    /// Whether every URL was stored.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// One URL a bulk pre-cache could not store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkCacheFailure {
    /// Requested URL.
    pub url: String,
    /// Human readable reason.
    pub reason: String,
}

/// Raw push message data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushPayload {
    data: Option<Bytes>,
}

impl PushPayload {
    /// A push with a body.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: Some(data.into()),
        }
    }

    /// A push without a body.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Payload as text, if present, non-empty and valid UTF-8.
    pub fn text(&self) -> Option<&str> {
        self.data
            .as_deref()
            .and_then(|data| std::str::from_utf8(data).ok())
            .filter(|text| !text.is_empty())
    }
}

/// A notification to display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Title line.
    pub title: String,
    /// Body text.
    pub body: String,
    /// Icon URL.
    pub icon: Option<String>,
    /// Badge URL.
    pub badge: Option<String>,
    /// Vibration pattern in milliseconds.
    pub vibrate: Vec<u32>,
    /// URL opened when the notification is clicked.
    pub open_url: String,
}

impl Notification {
    /// Builds the notification for a push, filling gaps from `defaults`.
    pub fn from_push(payload: &PushPayload, defaults: &NotificationDefaults) -> Self {
        Self {
            title: defaults.title.clone(),
            body: payload
                .text()
                .map_or_else(|| defaults.body.clone(), str::to_owned),
            icon: defaults.icon.clone(),
            badge: defaults.badge.clone(),
            vibrate: defaults.vibrate.clone(),
            open_url: defaults.open_url.clone(),
        }
    }
}
