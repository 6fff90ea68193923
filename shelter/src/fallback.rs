//! Offline fallback.
//!
//! Every intercepted request resolves to a response. When the strategy gives
//! up, navigations get the precached offline page and everything else gets a
//! small synthetic error response.

use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use shelter_backend::{Backend, CacheBackend};
use shelter_core::{CacheContext, CapturedResponse, InterceptedRequest, RequestKey, ResponseSource};
use tracing::{error, warn};

use crate::config::WorkerConfig;

/// Produces the last-resort response for a request.
pub struct FallbackResponder<B: ?Sized> {
    backend: Arc<B>,
    offline_key: RequestKey,
    status: StatusCode,
    body: Bytes,
}

impl<B> FallbackResponder<B>
where
    B: Backend + ?Sized,
{
    /// Creates a responder for the offline page and response in `config`.
    pub fn new(backend: Arc<B>, config: &WorkerConfig) -> Self {
        let status = StatusCode::from_u16(config.offline_response.status)
            .unwrap_or(StatusCode::REQUEST_TIMEOUT);
        Self {
            backend,
            offline_key: config.offline_key(),
            status,
            body: Bytes::from(config.offline_response.body.clone()),
        }
    }

    /// The synthetic "network unavailable" response.
    pub fn offline_response(&self) -> CapturedResponse {
        CapturedResponse::text(self.status, self.body.clone())
    }

    /// Responds to `request` after its strategy failed.
    pub async fn respond(
        &self,
        request: &InterceptedRequest,
        ctx: CacheContext,
    ) -> (CapturedResponse, CacheContext) {
        if request.is_navigation() {
            match self.backend.match_any(&self.offline_key).await {
                Ok(Some((generation, entry))) => {
                    return (
                        entry.into_response(),
                        ctx.offline(ResponseSource::Generation(generation)),
                    );
                }
                Ok(None) => {
                    error!(key = %self.offline_key, "offline page missing from every generation");
                }
                Err(error) => {
                    warn!(key = %self.offline_key, %error, "offline page lookup failed");
                }
            }
        }
        (self.offline_response(), ctx.offline(ResponseSource::Fallback))
    }
}
