//! One deployed version of the intermediary.
//!
//! A [`Worker`] owns the configuration of a single version and everything
//! derived from it: the generation it writes, the classifier, the strategy
//! executor and the offline responder. Its lifecycle is driven from the
//! outside, normally by a [`Registration`](crate::Registration).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use futures::future::{join_all, try_join_all};
use http::{Method, Uri};
use shelter_backend::{Backend, CacheBackend, CacheEntry};
use shelter_core::{
    CacheContext, CapturedResponse, GenerationName, InterceptedRequest, Network, RequestKey,
};
use tokio::sync::watch;
use tracing::{Instrument, debug, debug_span, info, trace, warn};

use crate::classifier::{Classify, DefaultClassifier};
use crate::concurrency::{ConcurrencyManager, NoopConcurrencyManager};
use crate::config::{ConfigError, WorkerConfig};
use crate::control::{BulkCacheFailure, BulkCacheReport};
use crate::error::{ActivateError, InstallError, LifecycleError};
use crate::executor::StrategyExecutor;
use crate::fallback::FallbackResponder;
use crate::lifecycle::{Lifecycle, LifecycleEvent, LifecycleState};
use crate::metrics;

/// Result of offering a request to a worker.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Not intercepted. The caller should send the request itself.
    Passthrough(InterceptedRequest),
    /// Served by the worker.
    Respond(CapturedResponse, CacheContext),
}

impl FetchOutcome {
    /// The response, if the worker served one.
    pub fn response(&self) -> Option<&CapturedResponse> {
        match self {
            FetchOutcome::Respond(response, _) => Some(response),
            FetchOutcome::Passthrough(_) => None,
        }
    }

    /// The response context, if the worker served the request.
    pub fn context(&self) -> Option<&CacheContext> {
        match self {
            FetchOutcome::Respond(_, ctx) => Some(ctx),
            FetchOutcome::Passthrough(_) => None,
        }
    }
}

/// A single deployed version.
pub struct Worker<B: ?Sized, N> {
    config: Arc<WorkerConfig>,
    generation: GenerationName,
    backend: Arc<B>,
    classifier: Arc<dyn Classify>,
    executor: StrategyExecutor<B, N>,
    fallback: FallbackResponder<B>,
    lifecycle: Lifecycle,
    skip_waiting: AtomicBool,
}

impl<B, N> Worker<B, N>
where
    B: Backend + ?Sized,
    N: Network,
{
    /// Starts building a worker.
    pub fn builder(
        config: impl Into<Arc<WorkerConfig>>,
        backend: Arc<B>,
        network: N,
    ) -> WorkerBuilder<B, N> {
        WorkerBuilder {
            config: config.into(),
            backend,
            network,
            classifier: None,
            concurrency: Arc::new(NoopConcurrencyManager),
        }
    }

    /// Worker configuration.
    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Generation this worker writes and serves from.
    pub fn generation(&self) -> &GenerationName {
        &self.generation
    }

    /// Store shared with other workers.
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Receiver following lifecycle changes.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.lifecycle.subscribe()
    }

    /// Precaches the manifest into this worker's generation.
    ///
    /// Every manifest URL is fetched before anything is written. Any failure
    /// deletes the generation and leaves the worker redundant.
    pub async fn install(&self) -> Result<(), InstallError> {
        self.lifecycle.apply(LifecycleEvent::Install)?;
        info!(generation = %self.generation, "installing");

        match self.precache().await {
            Ok(entries) => {
                self.lifecycle.apply(LifecycleEvent::InstallSucceeded)?;
                if self.config.skip_waiting_on_install {
                    self.request_skip_waiting();
                }
                info!(generation = %self.generation, entries, "installed");
                Ok(())
            }
            Err(error) => {
                warn!(generation = %self.generation, %error, "install failed");
                if let Err(cleanup) = self.backend.delete_generation(&self.generation).await {
                    warn!(generation = %self.generation, error = %cleanup, "failed to remove partial generation");
                }
                self.lifecycle.apply(LifecycleEvent::InstallFailed)?;
                Err(error)
            }
        }
    }

    async fn precache(&self) -> Result<usize, InstallError> {
        let fetches = self
            .config
            .precache_urls()
            .map(|url| self.fetch_for_store(url));
        let responses = try_join_all(fetches).await?;

        self.backend.open(&self.generation).await?;
        let entries = responses.len();
        for (key, response) in responses {
            self.backend
                .put(&self.generation, &key, &CacheEntry::new(response))
                .await?;
        }
        Ok(entries)
    }

    /// Fetches a same-origin URL that must answer `2xx` to be stored.
    async fn fetch_for_store(
        &self,
        url: String,
    ) -> Result<(RequestKey, CapturedResponse), InstallError> {
        let request = match InterceptedRequest::get(&url) {
            Ok(request) => request,
            Err(_) => return Err(InstallError::InvalidUrl { url }),
        };
        if !self.is_same_origin(request.uri()) {
            return Err(InstallError::CrossOrigin { url });
        }
        let response = match self.executor.fetch(&request).await {
            Ok(response) => response,
            Err(source) => return Err(InstallError::Fetch { url, source }),
        };
        if !response.is_success() {
            return Err(InstallError::Status {
                url,
                status: response.status(),
            });
        }
        Ok((request.key(), response))
    }

    /// Starts activation: removes every generation but this worker's.
    ///
    /// On success the worker stays [`Activating`](LifecycleState::Activating)
    /// until [`complete_activation`](Self::complete_activation). On failure it
    /// becomes redundant.
    pub async fn activate(&self) -> Result<(), ActivateError> {
        self.lifecycle.apply(LifecycleEvent::Activate)?;
        match self.backend.delete_generations_except(&self.generation).await {
            Ok(deleted) => {
                metrics::record_generations_deleted(deleted.len());
                info!(generation = %self.generation, deleted = deleted.len(), "older generations removed");
                Ok(())
            }
            Err(error) => {
                warn!(generation = %self.generation, %error, "generation cleanup failed");
                self.lifecycle.apply(LifecycleEvent::ActivateFailed)?;
                Err(error.into())
            }
        }
    }

    /// Finishes activation. The worker now serves fetches.
    pub fn complete_activation(&self) -> Result<(), LifecycleError> {
        self.lifecycle.apply(LifecycleEvent::ActivateSucceeded)?;
        info!(generation = %self.generation, "active");
        Ok(())
    }

    /// Stops writing responses into the store while the worker keeps serving.
    ///
    /// Used while a successor deletes this worker's generation.
    pub(crate) fn suspend_writes(&self) {
        self.executor.set_writes_enabled(false);
    }

    pub(crate) fn resume_writes(&self) {
        self.executor.set_writes_enabled(true);
    }

    /// Retires the worker in favour of a newer one.
    pub fn mark_redundant(&self) -> Result<(), LifecycleError> {
        self.suspend_writes();
        self.lifecycle.apply(LifecycleEvent::Replace)?;
        debug!(generation = %self.generation, "redundant");
        Ok(())
    }

    /// Asks to be promoted without waiting for clients to disconnect.
    pub fn request_skip_waiting(&self) {
        self.skip_waiting.store(true, Ordering::Release);
    }

    /// Whether skip-waiting was requested.
    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::Acquire)
    }

    /// Whether the worker handles `request` at all.
    ///
    /// Only same-origin `GET` requests are intercepted.
    pub fn intercepts(&self, request: &InterceptedRequest) -> bool {
        *request.method() == Method::GET && self.is_same_origin(request.uri())
    }

    fn is_same_origin(&self, uri: &Uri) -> bool {
        match &self.config.origin {
            Some(origin) => origin.contains(uri),
            None => uri.authority().is_none(),
        }
    }

    /// Serves an intercepted request.
    ///
    /// Intercepted requests always get a response: strategy failures end in
    /// the offline fallback.
    pub async fn handle_fetch(&self, request: InterceptedRequest) -> FetchOutcome {
        if !self.intercepts(&request) {
            trace!(method = %request.method(), uri = %request.uri(), "passthrough");
            return FetchOutcome::Passthrough(request);
        }

        let strategy = self.classifier.classify(&request);
        let span = debug_span!("shelter.fetch", key = %request.key(), %strategy);

        async move {
            let start = Instant::now();
            let (response, ctx) = match self.executor.execute(strategy, &request).await {
                Ok(served) => served,
                Err(error) => {
                    debug!(%error, "strategy failed, serving fallback");
                    self.fallback
                        .respond(&request, CacheContext::new(strategy))
                        .await
                }
            };
            debug!(
                status = ctx.status.as_str(),
                source = ctx.source.as_str(),
                http_status = response.status().as_u16(),
                "served"
            );
            metrics::record_context(&ctx, start.elapsed());
            FetchOutcome::Respond(response, ctx)
        }
        .instrument(span)
        .await
    }

    /// Fetches and stores each URL independently.
    ///
    /// One failing URL never prevents the others from being stored.
    pub async fn cache_urls(&self, urls: &[String]) -> BulkCacheReport {
        let results = join_all(urls.iter().map(|url| self.cache_url(url.clone()))).await;

        let mut report = BulkCacheReport::default();
        for (url, result) in urls.iter().zip(results) {
            match result {
                Ok(()) => report.cached.push(url.clone()),
                Err(error) => {
                    warn!(%url, %error, "bulk pre-cache failed");
                    report.failed.push(BulkCacheFailure {
                        url: url.clone(),
                        reason: error.to_string(),
                    });
                }
            }
        }
        info!(
            generation = %self.generation,
            cached = report.cached.len(),
            failed = report.failed.len(),
            "bulk pre-cache finished"
        );
        report
    }

    async fn cache_url(&self, url: String) -> Result<(), InstallError> {
        let (key, response) = self.fetch_for_store(url).await?;
        self.backend
            .put(&self.generation, &key, &CacheEntry::new(response))
            .await?;
        Ok(())
    }
}

/// Builder for [`Worker`].
pub struct WorkerBuilder<B: ?Sized, N> {
    config: Arc<WorkerConfig>,
    backend: Arc<B>,
    network: N,
    classifier: Option<Arc<dyn Classify>>,
    concurrency: Arc<dyn ConcurrencyManager<CapturedResponse>>,
}

impl<B, N> WorkerBuilder<B, N>
where
    B: Backend + ?Sized,
    N: Network,
{
    /// Replaces the [`DefaultClassifier`].
    pub fn classifier(mut self, classifier: impl Classify + 'static) -> Self {
        self.classifier = Some(Arc::new(classifier));
        self
    }

    /// Coalesces concurrent fetches of the same key.
    pub fn concurrency(
        mut self,
        concurrency: impl ConcurrencyManager<CapturedResponse> + 'static,
    ) -> Self {
        self.concurrency = Arc::new(concurrency);
        self
    }

    /// Validates the configuration and builds the worker.
    pub fn build(self) -> Result<Worker<B, N>, ConfigError> {
        self.config.validate()?;

        let generation = self.config.generation_name();
        let classifier = self
            .classifier
            .unwrap_or_else(|| Arc::new(DefaultClassifier::from_config(&self.config)));
        let executor =
            StrategyExecutor::new(self.backend.clone(), self.network, generation.clone())
                .with_timeout(self.config.network_timeout)
                .with_concurrency(self.concurrency);
        let fallback = FallbackResponder::new(self.backend.clone(), &self.config);

        Ok(Worker {
            config: self.config,
            generation,
            backend: self.backend,
            classifier,
            executor,
            fallback,
            lifecycle: Lifecycle::new(),
            skip_waiting: AtomicBool::new(false),
        })
    }
}
