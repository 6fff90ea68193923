//! Moka backend implementation.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use moka::future::{Cache, CacheBuilder};
use moka::policy::EvictionPolicy;
use shelter_backend::format::{Format, JsonFormat};
use shelter_backend::{Backend, BackendResult, DeleteStatus};
use shelter_core::{GenerationName, Raw, RequestKey};
use smol_str::SmolStr;
use tracing::trace;

use crate::builder::{MokaBackendBuilder, NoCapacity};

/// Approximate per-entry overhead added to the key and body sizes.
const ENTRY_OVERHEAD: usize = 64;

#[derive(Debug, Clone, Copy)]
pub(crate) enum Capacity {
    Entries(u64),
    Bytes(u64),
}

#[derive(Clone)]
struct Slot {
    created: u64,
    cache: Cache<RequestKey, Raw>,
}

/// In-memory generation store powered by Moka.
///
/// Each generation is a separate bounded cache, so evictions in one
/// generation never touch another and deleting a generation drops its cache.
///
/// ```
/// use shelter_moka::MokaBackend;
///
/// let backend = MokaBackend::builder().max_entries(1_000).build();
/// ```
///
/// Data is **not persisted**. Everything is lost on process restart.
#[derive(Clone)]
pub struct MokaBackend<S = JsonFormat>
where
    S: Format,
{
    generations: Arc<DashMap<GenerationName, Slot>>,
    sequence: Arc<AtomicU64>,
    capacity: Capacity,
    eviction_policy: Option<EvictionPolicy>,
    serializer: S,
    label: SmolStr,
}

impl<S> std::fmt::Debug for MokaBackend<S>
where
    S: Format,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaBackend")
            .field("label", &self.label)
            .field("generations", &self.generations.len())
            .field("capacity", &self.capacity)
            .field("serializer", &self.serializer)
            .finish()
    }
}

impl MokaBackend<JsonFormat> {
    /// Creates a new builder for `MokaBackend`.
    ///
    /// Capacity must be configured with `max_entries` or `max_bytes` before
    /// the backend can be built.
    pub fn builder() -> MokaBackendBuilder<NoCapacity, JsonFormat> {
        MokaBackendBuilder::new()
    }
}

impl<S> MokaBackend<S>
where
    S: Format,
{
    pub(crate) fn from_parts(
        capacity: Capacity,
        eviction_policy: Option<EvictionPolicy>,
        serializer: S,
        label: SmolStr,
    ) -> Self {
        Self {
            generations: Arc::new(DashMap::new()),
            sequence: Arc::new(AtomicU64::new(0)),
            capacity,
            eviction_policy,
            serializer,
            label,
        }
    }

    /// Flushes Moka's pending maintenance work for every generation.
    ///
    /// Eviction is asynchronous; tests call this before asserting on sizes.
    pub async fn run_pending_tasks(&self) {
        for cache in self.caches() {
            cache.run_pending_tasks().await;
        }
    }

    fn caches(&self) -> Vec<Cache<RequestKey, Raw>> {
        self.generations
            .iter()
            .map(|slot| slot.cache.clone())
            .collect()
    }

    fn slot(&self, generation: &GenerationName) -> Cache<RequestKey, Raw> {
        self.generations
            .entry(generation.clone())
            .or_insert_with(|| {
                trace!(%generation, backend = %self.label, "creating generation");
                Slot {
                    created: self.sequence.fetch_add(1, Ordering::Relaxed),
                    cache: self.new_cache(),
                }
            })
            .cache
            .clone()
    }

    fn new_cache(&self) -> Cache<RequestKey, Raw> {
        match self.capacity {
            Capacity::Entries(entries) => {
                let policy = self
                    .eviction_policy
                    .clone()
                    .unwrap_or_else(EvictionPolicy::tiny_lfu);
                CacheBuilder::new(entries).eviction_policy(policy).build()
            }
            Capacity::Bytes(bytes) => {
                let policy = self.eviction_policy.clone().unwrap_or_else(EvictionPolicy::lru);
                CacheBuilder::new(bytes)
                    .weigher(byte_weigher)
                    .eviction_policy(policy)
                    .build()
            }
        }
    }
}

fn byte_weigher(key: &RequestKey, value: &Raw) -> u32 {
    (key.target().len() + value.len() + ENTRY_OVERHEAD).min(u32::MAX as usize) as u32
}

#[async_trait]
impl<S> Backend for MokaBackend<S>
where
    S: Format,
{
    async fn open(&self, generation: &GenerationName) -> BackendResult<()> {
        self.slot(generation);
        Ok(())
    }

    async fn read(
        &self,
        generation: &GenerationName,
        key: &RequestKey,
    ) -> BackendResult<Option<Raw>> {
        let cache = self.generations.get(generation).map(|slot| slot.cache.clone());
        match cache {
            Some(cache) => Ok(cache.get(key).await),
            None => Ok(None),
        }
    }

    async fn write(
        &self,
        generation: &GenerationName,
        key: &RequestKey,
        value: Raw,
    ) -> BackendResult<()> {
        self.slot(generation).insert(key.clone(), value).await;
        Ok(())
    }

    async fn generations(&self) -> BackendResult<Vec<GenerationName>> {
        let mut names: Vec<(u64, GenerationName)> = self
            .generations
            .iter()
            .map(|slot| (slot.created, slot.key().clone()))
            .collect();
        names.sort_unstable_by_key(|(created, _)| *created);
        Ok(names.into_iter().map(|(_, name)| name).collect())
    }

    async fn delete_generation(&self, generation: &GenerationName) -> BackendResult<DeleteStatus> {
        match self.generations.remove(generation) {
            Some((_, slot)) => {
                slot.cache.run_pending_tasks().await;
                let entries = slot.cache.entry_count().min(u32::MAX as u64) as u32;
                slot.cache.invalidate_all();
                Ok(DeleteStatus::Deleted(entries))
            }
            None => Ok(DeleteStatus::Missing),
        }
    }

    fn name(&self) -> &str {
        &self.label
    }

    fn value_format(&self) -> &dyn Format {
        &self.serializer
    }
}
