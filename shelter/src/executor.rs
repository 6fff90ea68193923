//! Strategy execution against one generation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use shelter_backend::{Backend, CacheBackend, CacheEntry};
use shelter_core::{
    CacheContext, CapturedResponse, GenerationName, InterceptedRequest, Network, NetworkError,
    RequestKey, Strategy,
};
use tracing::{debug, trace, warn};

use crate::concurrency::{ConcurrencyDecision, ConcurrencyManager, NoopConcurrencyManager};
use crate::error::StrategyError;
use crate::metrics;

/// Serves requests with a given [`Strategy`], reading and writing a single
/// generation.
///
/// Only `2xx` responses are written. Store failures never fail a request:
/// read errors count as misses, write errors are logged and dropped.
pub struct StrategyExecutor<B: ?Sized, N> {
    backend: Arc<B>,
    network: N,
    generation: GenerationName,
    timeout: Option<Duration>,
    concurrency: Arc<dyn ConcurrencyManager<CapturedResponse>>,
    writes_enabled: AtomicBool,
}

/// A network response and whether this caller is responsible for storing it.
struct Fetched {
    response: CapturedResponse,
    store: bool,
}

impl<B, N> StrategyExecutor<B, N>
where
    B: Backend + ?Sized,
    N: Network,
{
    /// Creates an executor writing into `generation`.
    pub fn new(backend: Arc<B>, network: N, generation: GenerationName) -> Self {
        Self {
            backend,
            network,
            generation,
            timeout: None,
            concurrency: Arc::new(NoopConcurrencyManager),
            writes_enabled: AtomicBool::new(true),
        }
    }

    /// Bounds every network call.
    pub fn with_timeout(self, timeout: Option<Duration>) -> Self {
        Self { timeout, ..self }
    }

    /// Coalesces concurrent fetches through `concurrency`.
    pub fn with_concurrency(
        self,
        concurrency: Arc<dyn ConcurrencyManager<CapturedResponse>>,
    ) -> Self {
        Self {
            concurrency,
            ..self
        }
    }

    /// Generation this executor reads and writes.
    pub fn generation(&self) -> &GenerationName {
        &self.generation
    }

    /// Enables or disables writeback. A disabled executor still reads and
    /// fetches but never touches the store, so it cannot recreate a
    /// generation removed under it.
    pub fn set_writes_enabled(&self, enabled: bool) {
        self.writes_enabled.store(enabled, Ordering::Release);
    }

    /// Serves `request` with `strategy`.
    pub async fn execute(
        &self,
        strategy: Strategy,
        request: &InterceptedRequest,
    ) -> Result<(CapturedResponse, CacheContext), StrategyError> {
        let key = request.key();
        let ctx = CacheContext::new(strategy);

        match strategy {
            Strategy::CacheFirst => {
                if let Some(response) = self.lookup(&key).await {
                    trace!(%key, "cache hit");
                    return Ok((response, ctx.hit(self.generation.clone())));
                }
                let fetched = self.fetch_shared(request, &key).await?;
                if fetched.store {
                    self.store(&key, &fetched.response).await;
                }
                Ok((fetched.response, ctx))
            }
            Strategy::NetworkFirst => match self.fetch_shared(request, &key).await {
                Ok(fetched) => {
                    if fetched.store {
                        self.store(&key, &fetched.response).await;
                    }
                    Ok((fetched.response, ctx))
                }
                Err(error) => match self.lookup(&key).await {
                    Some(response) => {
                        debug!(%key, %error, "network failed, serving stored copy");
                        Ok((response, ctx.stale(self.generation.clone())))
                    }
                    None => Err(error.into()),
                },
            },
            Strategy::NetworkOnly => Ok((self.fetch(request).await?, ctx)),
            Strategy::CacheOnly => match self.lookup(&key).await {
                Some(response) => Ok((response, ctx.hit(self.generation.clone()))),
                None => Err(StrategyError::NotCached),
            },
        }
    }

    /// One network call, bounded by the configured timeout.
    pub(crate) async fn fetch(
        &self,
        request: &InterceptedRequest,
    ) -> Result<CapturedResponse, NetworkError> {
        let mut network = self.network.clone();
        let call = network.call(request.clone());
        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or_else(|_| Err(NetworkError::Timeout(limit))),
            None => call.await,
        };
        if let Err(error) = &result {
            debug!(uri = %request.uri(), %error, "network request failed");
            metrics::record_network_failure();
        }
        result
    }

    async fn fetch_shared(
        &self,
        request: &InterceptedRequest,
        key: &RequestKey,
    ) -> Result<Fetched, NetworkError> {
        match self.concurrency.check(key) {
            ConcurrencyDecision::Await(waiter) => match waiter.await {
                Some(response) => {
                    trace!(%key, "received coalesced response");
                    Ok(Fetched {
                        response,
                        store: false,
                    })
                }
                None => self.fetch(request).await.map(|response| Fetched {
                    response,
                    store: true,
                }),
            },
            ConcurrencyDecision::Proceed => {
                let flight = Flight {
                    manager: self.concurrency.as_ref(),
                    key,
                    settled: false,
                };
                let response = self.fetch(request).await?;
                Ok(Fetched {
                    response: flight.complete(response),
                    store: true,
                })
            }
        }
    }

    async fn lookup(&self, key: &RequestKey) -> Option<CapturedResponse> {
        match self.backend.get(&self.generation, key).await {
            Ok(entry) => entry.map(CacheEntry::into_response),
            Err(error) => {
                warn!(%key, generation = %self.generation, %error, "store read failed, treating as miss");
                None
            }
        }
    }

    async fn store(&self, key: &RequestKey, response: &CapturedResponse) {
        if !self.writes_enabled.load(Ordering::Acquire) {
            trace!(%key, generation = %self.generation, "writeback disabled, not storing");
            return;
        }
        if !response.is_success() {
            trace!(%key, status = %response.status(), "not storing non-success response");
            return;
        }
        let entry = CacheEntry::new(response.clone());
        if let Err(error) = self.backend.put(&self.generation, key, &entry).await {
            warn!(%key, generation = %self.generation, %error, "store write failed");
            metrics::record_store_write_error(self.backend.name());
        }
    }
}

/// Leader side of a coalesced fetch. Waiters are released without a response
/// unless [`complete`](Flight::complete) is called.
struct Flight<'a> {
    manager: &'a dyn ConcurrencyManager<CapturedResponse>,
    key: &'a RequestKey,
    settled: bool,
}

impl Flight<'_> {
    fn complete(mut self, response: CapturedResponse) -> CapturedResponse {
        self.settled = true;
        self.manager.complete(self.key, response)
    }
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.manager.abandon(self.key);
        }
    }
}
