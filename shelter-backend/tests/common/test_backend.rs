//! Simple in-memory test backend implementation using DashMap.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use shelter_backend::{Backend, BackendError, BackendResult, DeleteStatus};
use shelter_core::{GenerationName, Raw, RequestKey};

type Generation = DashMap<RequestKey, Raw>;

/// In-memory backend keeping generations in creation order.
#[derive(Clone, Default)]
pub struct TestBackend {
    generations: Arc<DashMap<GenerationName, (u64, Arc<Generation>)>>,
    counter: Arc<AtomicU64>,
}

impl TestBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries in a generation, `None` when it does not exist.
    pub fn len(&self, generation: &GenerationName) -> Option<usize> {
        self.generations.get(generation).map(|g| g.1.len())
    }

    fn generation(&self, name: &GenerationName) -> Arc<Generation> {
        self.generations
            .entry(name.clone())
            .or_insert_with(|| {
                (
                    self.counter.fetch_add(1, Ordering::SeqCst),
                    Arc::new(DashMap::new()),
                )
            })
            .1
            .clone()
    }
}

#[async_trait]
impl Backend for TestBackend {
    async fn open(&self, generation: &GenerationName) -> BackendResult<()> {
        self.generation(generation);
        Ok(())
    }

    async fn read(
        &self,
        generation: &GenerationName,
        key: &RequestKey,
    ) -> BackendResult<Option<Raw>> {
        Ok(self
            .generations
            .get(generation)
            .and_then(|g| g.1.get(key).map(|v| v.clone())))
    }

    async fn write(
        &self,
        generation: &GenerationName,
        key: &RequestKey,
        value: Raw,
    ) -> BackendResult<()> {
        self.generation(generation).insert(key.clone(), value);
        Ok(())
    }

    async fn generations(&self) -> BackendResult<Vec<GenerationName>> {
        let mut names: Vec<_> = self
            .generations
            .iter()
            .map(|g| (g.value().0, g.key().clone()))
            .collect();
        names.sort();
        Ok(names.into_iter().map(|(_, name)| name).collect())
    }

    async fn delete_generation(&self, generation: &GenerationName) -> BackendResult<DeleteStatus> {
        Ok(match self.generations.remove(generation) {
            Some((_, (_, entries))) => DeleteStatus::Deleted(entries.len() as u32),
            None => DeleteStatus::Missing,
        })
    }

    fn name(&self) -> &str {
        "test"
    }
}

/// Backend that always returns errors (for error testing).
#[derive(Clone, Default)]
pub struct ErrorBackend;

fn simulated() -> BackendError {
    BackendError::InternalError(Box::new(std::io::Error::other("simulated error")))
}

#[async_trait]
impl Backend for ErrorBackend {
    async fn open(&self, _generation: &GenerationName) -> BackendResult<()> {
        Err(simulated())
    }

    async fn read(
        &self,
        _generation: &GenerationName,
        _key: &RequestKey,
    ) -> BackendResult<Option<Raw>> {
        Err(simulated())
    }

    async fn write(
        &self,
        _generation: &GenerationName,
        _key: &RequestKey,
        _value: Raw,
    ) -> BackendResult<()> {
        Err(BackendError::QuotaExceeded)
    }

    async fn generations(&self) -> BackendResult<Vec<GenerationName>> {
        Err(simulated())
    }

    async fn delete_generation(&self, _generation: &GenerationName) -> BackendResult<DeleteStatus> {
        Err(simulated())
    }

    fn name(&self) -> &str {
        "error"
    }
}
