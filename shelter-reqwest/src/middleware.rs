//! Interception middleware for reqwest-middleware.

use async_trait::async_trait;
use http::header::{HeaderName, HeaderValue};
use http::{Extensions, Uri};
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next, Result};
use shelter::{CacheStatus, FetchOutcome, Registration};
use shelter_backend::Backend;
use shelter_core::{InterceptedRequest, Network};
use tracing::trace;

/// Header telling how an intercepted response was served.
pub const CACHE_STATUS_HEADER: HeaderName = HeaderName::from_static("x-cache-status");

/// Routes outgoing requests through a [`Registration`].
///
/// Requests the active worker intercepts are answered by it and never reach
/// the rest of the middleware chain; their responses carry
/// [`CACHE_STATUS_HEADER`] (`HIT`, `MISS`, `STALE` or `OFFLINE`). Everything
/// else continues down the chain untouched.
pub struct ShelterMiddleware<B: ?Sized, N> {
    registration: Registration<B, N>,
}

impl<B: ?Sized, N> ShelterMiddleware<B, N> {
    /// Creates a middleware serving from `registration`.
    pub fn new(registration: Registration<B, N>) -> Self {
        Self { registration }
    }
}

impl<B: ?Sized, N> Clone for ShelterMiddleware<B, N> {
    fn clone(&self) -> Self {
        Self {
            registration: self.registration.clone(),
        }
    }
}

fn status_value(status: CacheStatus) -> HeaderValue {
    match status {
        CacheStatus::Hit => HeaderValue::from_static("HIT"),
        CacheStatus::Miss => HeaderValue::from_static("MISS"),
        CacheStatus::Stale => HeaderValue::from_static("STALE"),
        CacheStatus::Offline => HeaderValue::from_static("OFFLINE"),
    }
}

#[async_trait]
impl<B, N> Middleware for ShelterMiddleware<B, N>
where
    B: Backend + ?Sized + 'static,
    N: Network,
{
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> Result<Response> {
        let Ok(uri) = req.url().as_str().parse::<Uri>() else {
            return next.run(req, extensions).await;
        };
        let intercepted =
            InterceptedRequest::from_parts(req.method().clone(), uri, req.headers().clone());

        match self.registration.fetch(intercepted).await {
            FetchOutcome::Passthrough(_) => {
                trace!(url = %req.url(), "passthrough");
                next.run(req, extensions).await
            }
            FetchOutcome::Respond(response, ctx) => {
                let mut http_response = response.into_http();
                http_response
                    .headers_mut()
                    .insert(CACHE_STATUS_HEADER, status_value(ctx.status));
                Ok(Response::from(http_response))
            }
        }
    }
}
