//! Store wrapper counting reads and writes and injecting failures.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use shelter_backend::{Backend, BackendError, BackendResult, DeleteStatus};
use shelter_core::{GenerationName, Raw, RequestKey};
use shelter_moka::MokaBackend;

pub struct CountingBackend {
    inner: MokaBackend,
    reads: AtomicUsize,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
    fail_listing: AtomicBool,
}

impl CountingBackend {
    pub fn new(inner: MokaBackend) -> Self {
        Self {
            inner,
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
            fail_writes: AtomicBool::new(false),
            fail_listing: AtomicBool::new(false),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Every write fails with `QuotaExceeded`.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Listing generations fails, which breaks activation cleanup.
    pub fn fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Backend for CountingBackend {
    async fn open(&self, generation: &GenerationName) -> BackendResult<()> {
        self.inner.open(generation).await
    }

    async fn read(
        &self,
        generation: &GenerationName,
        key: &RequestKey,
    ) -> BackendResult<Option<Raw>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read(generation, key).await
    }

    async fn write(
        &self,
        generation: &GenerationName,
        key: &RequestKey,
        value: Raw,
    ) -> BackendResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(BackendError::QuotaExceeded);
        }
        self.inner.write(generation, key, value).await
    }

    async fn generations(&self) -> BackendResult<Vec<GenerationName>> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(BackendError::InternalError(Box::new(std::io::Error::other(
                "listing failed",
            ))));
        }
        self.inner.generations().await
    }

    async fn delete_generation(&self, generation: &GenerationName) -> BackendResult<DeleteStatus> {
        self.inner.delete_generation(generation).await
    }

    fn name(&self) -> &str {
        "counting"
    }
}
