use std::{future::Future, sync::Arc};

use async_trait::async_trait;
use shelter_core::{GenerationName, Raw, RequestKey};
use tracing::{debug, warn};

use crate::{
    BackendError, CacheEntry, DeleteStatus,
    format::{Format, JsonFormat},
};

pub type BackendResult<T> = Result<T, BackendError>;

/// Raw store boundary: generations of opaque byte entries.
///
/// Implementations must make single-entry writes atomic. Concurrent writes to
/// the same key resolve last-write-wins.
#[async_trait]
pub trait Backend: Sync + Send {
    /// Creates the generation if absent. Idempotent.
    async fn open(&self, generation: &GenerationName) -> BackendResult<()>;

    /// Reads one entry. A missing generation reads as a miss.
    async fn read(&self, generation: &GenerationName, key: &RequestKey)
    -> BackendResult<Option<Raw>>;

    /// Writes one entry, creating the generation if needed and overwriting any
    /// previous value for `key`.
    async fn write(
        &self,
        generation: &GenerationName,
        key: &RequestKey,
        value: Raw,
    ) -> BackendResult<()>;

    /// Lists generation names in creation order.
    async fn generations(&self) -> BackendResult<Vec<GenerationName>>;

    /// Removes a generation and every entry in it.
    async fn delete_generation(&self, generation: &GenerationName) -> BackendResult<DeleteStatus>;

    /// Returns the name of this backend, used in logs and response sources.
    fn name(&self) -> &str {
        "backend"
    }

    fn value_format(&self) -> &dyn Format {
        &JsonFormat
    }
}

#[async_trait]
impl Backend for &dyn Backend {
    async fn open(&self, generation: &GenerationName) -> BackendResult<()> {
        (*self).open(generation).await
    }

    async fn read(
        &self,
        generation: &GenerationName,
        key: &RequestKey,
    ) -> BackendResult<Option<Raw>> {
        (*self).read(generation, key).await
    }

    async fn write(
        &self,
        generation: &GenerationName,
        key: &RequestKey,
        value: Raw,
    ) -> BackendResult<()> {
        (*self).write(generation, key, value).await
    }

    async fn generations(&self) -> BackendResult<Vec<GenerationName>> {
        (*self).generations().await
    }

    async fn delete_generation(&self, generation: &GenerationName) -> BackendResult<DeleteStatus> {
        (*self).delete_generation(generation).await
    }

    fn name(&self) -> &str {
        (*self).name()
    }

    fn value_format(&self) -> &dyn Format {
        (*self).value_format()
    }
}

#[async_trait]
impl Backend for Box<dyn Backend> {
    async fn open(&self, generation: &GenerationName) -> BackendResult<()> {
        (**self).open(generation).await
    }

    async fn read(
        &self,
        generation: &GenerationName,
        key: &RequestKey,
    ) -> BackendResult<Option<Raw>> {
        (**self).read(generation, key).await
    }

    async fn write(
        &self,
        generation: &GenerationName,
        key: &RequestKey,
        value: Raw,
    ) -> BackendResult<()> {
        (**self).write(generation, key, value).await
    }

    async fn generations(&self) -> BackendResult<Vec<GenerationName>> {
        (**self).generations().await
    }

    async fn delete_generation(&self, generation: &GenerationName) -> BackendResult<DeleteStatus> {
        (**self).delete_generation(generation).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn value_format(&self) -> &dyn Format {
        (**self).value_format()
    }
}

#[async_trait]
impl Backend for Arc<dyn Backend + Send + 'static> {
    async fn open(&self, generation: &GenerationName) -> BackendResult<()> {
        (**self).open(generation).await
    }

    async fn read(
        &self,
        generation: &GenerationName,
        key: &RequestKey,
    ) -> BackendResult<Option<Raw>> {
        (**self).read(generation, key).await
    }

    async fn write(
        &self,
        generation: &GenerationName,
        key: &RequestKey,
        value: Raw,
    ) -> BackendResult<()> {
        (**self).write(generation, key, value).await
    }

    async fn generations(&self) -> BackendResult<Vec<GenerationName>> {
        (**self).generations().await
    }

    async fn delete_generation(&self, generation: &GenerationName) -> BackendResult<DeleteStatus> {
        (**self).delete_generation(generation).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn value_format(&self) -> &dyn Format {
        (**self).value_format()
    }
}

/// Typed generation store operations.
///
/// Serialization goes through [`Backend::value_format`], so the typed methods
/// work unchanged on every backend.
pub trait CacheBackend: Backend {
    /// Looks up `key` in one generation.
    fn get(
        &self,
        generation: &GenerationName,
        key: &RequestKey,
    ) -> impl Future<Output = BackendResult<Option<CacheEntry>>> + Send {
        async move {
            match self.read(generation, key).await? {
                Some(raw) => Ok(Some(self.value_format().deserialize(&raw)?)),
                None => Ok(None),
            }
        }
    }

    /// Stores `entry` under `key`, overwriting any previous entry.
    fn put(
        &self,
        generation: &GenerationName,
        key: &RequestKey,
        entry: &CacheEntry,
    ) -> impl Future<Output = BackendResult<()>> + Send {
        async move {
            let raw = self.value_format().serialize(entry)?;
            self.write(generation, key, raw).await
        }
    }

    /// Looks up `key` across every generation in creation order.
    ///
    /// Unreadable entries in one generation do not stop the search.
    fn match_any(
        &self,
        key: &RequestKey,
    ) -> impl Future<Output = BackendResult<Option<(GenerationName, CacheEntry)>>> + Send {
        async move {
            for generation in self.generations().await? {
                match self.get(&generation, key).await {
                    Ok(Some(entry)) => return Ok(Some((generation, entry))),
                    Ok(None) => {}
                    Err(error) => {
                        warn!(%generation, %key, %error, "skipping unreadable entry");
                    }
                }
            }
            Ok(None)
        }
    }

    /// Deletes every generation except `keep` and returns the deleted names.
    fn delete_generations_except(
        &self,
        keep: &GenerationName,
    ) -> impl Future<Output = BackendResult<Vec<GenerationName>>> + Send {
        async move {
            let mut deleted = Vec::new();
            for generation in self.generations().await? {
                if &generation == keep {
                    continue;
                }
                match self.delete_generation(&generation).await? {
                    DeleteStatus::Deleted(entries) => {
                        debug!(%generation, entries, backend = self.name(), "generation deleted");
                        deleted.push(generation);
                    }
                    DeleteStatus::Missing => {}
                }
            }
            Ok(deleted)
        }
    }
}

impl<T: Backend + ?Sized> CacheBackend for T {}
