use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use feoxdb::{FeoxError, FeoxStore};
use shelter_backend::format::{Format, JsonFormat};
use shelter_backend::{Backend, BackendError, BackendResult, DeleteStatus};
use shelter_core::{GenerationName, Raw, RequestKey};
use smol_str::SmolStr;
use tokio::sync::Mutex;
use tracing::debug;

use crate::{FeOxDbError, layout};

/// Disk-based generation store using FeOxDB.
///
/// ```no_run
/// use shelter_feoxdb::FeOxDbBackend;
///
/// let backend = FeOxDbBackend::builder()
///     .path("/var/cache/myapp")
///     .max_memory(64 * 1024 * 1024)
///     .build()?;
/// # Ok::<(), shelter_feoxdb::FeOxDbError>(())
/// ```
///
/// Cloning is cheap. Clones share the same database and catalog lock.
/// Only catalog changes take the lock; entry writes run concurrently.
#[derive(Clone)]
pub struct FeOxDbBackend<S = JsonFormat>
where
    S: Format,
{
    store: Arc<FeoxStore>,
    catalog: Arc<Mutex<()>>,
    serializer: S,
    label: SmolStr,
}

impl<S> FeOxDbBackend<S>
where
    S: Format,
{
    /// Forces pending writes to disk.
    ///
    /// No-op in memory-only mode.
    pub fn flush(&self) {
        self.store.flush();
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, FeOxDbError>
    where
        T: Send + 'static,
        F: FnOnce(&FeoxStore) -> Result<T, FeOxDbError> + Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || f(&store)).await?
    }
}

impl FeOxDbBackend<JsonFormat> {
    /// Starts building a new backend.
    pub fn builder() -> FeOxDbBackendBuilder<JsonFormat> {
        FeOxDbBackendBuilder::default()
    }

    /// In-memory backend for tests. Data is lost when dropped.
    pub fn in_memory() -> Result<Self, FeOxDbError> {
        Self::builder().build()
    }
}

/// Builder for [`FeOxDbBackend`].
pub struct FeOxDbBackendBuilder<S = JsonFormat>
where
    S: Format,
{
    path: Option<PathBuf>,
    max_file_size: Option<u64>,
    max_memory: Option<usize>,
    serializer: S,
    label: SmolStr,
}

impl Default for FeOxDbBackendBuilder<JsonFormat> {
    fn default() -> Self {
        Self {
            path: None,
            max_file_size: None,
            max_memory: None,
            serializer: JsonFormat,
            label: SmolStr::new_static("feoxdb"),
        }
    }
}

impl<S> FeOxDbBackendBuilder<S>
where
    S: Format,
{
    /// Enables persistent storage at the given path.
    ///
    /// Without this, data lives only in memory. If the path is a directory,
    /// `shelter.db` is created inside it.
    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Pre-allocates disk space and caps maximum storage.
    ///
    /// Default: 1 GB
    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = Some(bytes);
        self
    }

    /// Limits RAM usage.
    ///
    /// FeOxDB has no eviction. Writes past the limit fail and surface as
    /// [`BackendError::QuotaExceeded`].
    pub fn max_memory(mut self, bytes: usize) -> Self {
        self.max_memory = Some(bytes);
        self
    }

    /// Backend name used in logs and response sources.
    pub fn label(mut self, label: impl Into<SmolStr>) -> Self {
        self.label = label.into();
        self
    }

    /// Entry serialization format.
    pub fn value_format<NewS>(self, serializer: NewS) -> FeOxDbBackendBuilder<NewS>
    where
        NewS: Format,
    {
        FeOxDbBackendBuilder {
            path: self.path,
            max_file_size: self.max_file_size,
            max_memory: self.max_memory,
            serializer,
            label: self.label,
        }
    }

    /// Creates the backend.
    ///
    /// Fails if the database file can't be opened or created.
    pub fn build(self) -> Result<FeOxDbBackend<S>, FeOxDbError> {
        let mut builder = FeoxStore::builder();

        if let Some(mut path) = self.path {
            if path.is_dir() {
                path.push("shelter.db");
            }
            builder = builder.device_path(path.to_string_lossy().to_string());
        }

        if let Some(file_size) = self.max_file_size {
            builder = builder.file_size(file_size);
        }

        if let Some(memory) = self.max_memory {
            builder = builder.max_memory(memory);
        }

        Ok(FeOxDbBackend {
            store: Arc::new(builder.build()?),
            catalog: Arc::new(Mutex::new(())),
            serializer: self.serializer,
            label: self.label,
        })
    }
}

#[async_trait]
impl<S> Backend for FeOxDbBackend<S>
where
    S: Format,
{
    async fn open(&self, generation: &GenerationName) -> BackendResult<()> {
        let _guard = self.catalog.lock().await;
        let generation = generation.clone();
        let created = self
            .blocking(move |store| layout::register(store, &generation))
            .await?;
        if created {
            debug!(backend = %self.label, "generation created");
        }
        Ok(())
    }

    async fn read(
        &self,
        generation: &GenerationName,
        key: &RequestKey,
    ) -> BackendResult<Option<Raw>> {
        let entry_key = layout::entry_key(generation, key);
        let value = self
            .blocking(move |store| match store.get(&entry_key) {
                Ok(bytes) => Ok(Some(Raw::from(bytes))),
                Err(FeoxError::KeyNotFound) => Ok(None),
                Err(e) => Err(e.into()),
            })
            .await?;
        Ok(value)
    }

    async fn write(
        &self,
        generation: &GenerationName,
        key: &RequestKey,
        value: Raw,
    ) -> BackendResult<()> {
        let entry_key = layout::entry_key(generation, key);
        let known = {
            let generation = generation.clone();
            self.blocking(move |store| {
                store.insert(&entry_key, &value)?;
                layout::is_registered(store, &generation)
            })
            .await?
        };
        if !known {
            self.open(generation).await?;
        }
        Ok(())
    }

    async fn generations(&self) -> BackendResult<Vec<GenerationName>> {
        let names = self.blocking(layout::catalog).await?;
        Ok(names.into_iter().map(GenerationName::from_raw).collect())
    }

    async fn delete_generation(&self, generation: &GenerationName) -> BackendResult<DeleteStatus> {
        let _guard = self.catalog.lock().await;
        let generation = generation.clone();
        let removed = self
            .blocking(move |store| layout::remove(store, &generation))
            .await?;
        Ok(match removed {
            Some(entries) => DeleteStatus::Deleted(entries),
            None => DeleteStatus::Missing,
        })
    }

    fn name(&self) -> &str {
        &self.label
    }

    fn value_format(&self) -> &dyn Format {
        &self.serializer
    }
}
