use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use feoxdb::{FeoxError, FeoxStore};
use tracing::trace;

use crate::{DeleteStatus, Store, StoreError, StoreKey, StoreResult, StoredResponse};

const DATABASE_FILE: &str = "http-cache.db";

/// Disk-backed response store using FeOxDB.
///
/// Use this to keep responses across restarts. Without a path the database
/// lives in memory only, which is what tests want.
///
/// ```no_run
/// use cachecall_store::DiskStore;
///
/// // Persistent store inside the application's cache directory
/// let store = DiskStore::builder()
///     .path("/var/cache/myapp")
///     .max_file_size(10 * 1024 * 1024)
///     .build()?;
/// # Ok::<(), cachecall_store::StoreError>(())
/// ```
///
/// Cloning is cheap: clones share the same underlying database.
#[derive(Clone)]
pub struct DiskStore {
    store: Arc<FeoxStore>,
    label: String,
}

impl DiskStore {
    /// Starts building a new store.
    pub fn builder() -> DiskStoreBuilder {
        DiskStoreBuilder::default()
    }

    /// In-memory store for tests.
    ///
    /// Data is lost when dropped. Equivalent to `builder().build()`.
    ///
    /// ```
    /// use cachecall_store::DiskStore;
    ///
    /// let store = DiskStore::in_memory().expect("Failed to create in-memory store");
    /// ```
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::builder().build()
    }

    /// Forces pending writes to disk.
    ///
    /// FeOxDB buffers writes and flushes them periodically. No-op in
    /// memory-only mode.
    pub fn flush(&self) -> StoreResult<()> {
        self.store.flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for DiskStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskStore")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Builder for [`DiskStore`].
#[derive(Debug)]
pub struct DiskStoreBuilder {
    path: Option<PathBuf>,
    max_file_size: Option<u64>,
    max_memory: Option<usize>,
    label: String,
}

impl Default for DiskStoreBuilder {
    fn default() -> Self {
        Self {
            path: None,
            max_file_size: None,
            max_memory: None,
            label: "disk".to_owned(),
        }
    }
}

impl DiskStoreBuilder {
    /// Enables persistent storage at the given path.
    ///
    /// If the path is a directory, the database file is created inside it.
    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Caps the size of the database file in bytes.
    ///
    /// FeOxDB doesn't evict to make room. Once the file is full of unexpired
    /// entries, writes fail with `OutOfSpace` until TTLs free space; each
    /// failure is reported per write and never poisons the store.
    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = Some(bytes);
        self
    }

    /// Limits RAM used for the read cache (or for everything in memory-only mode).
    pub fn max_memory(mut self, bytes: usize) -> Self {
        self.max_memory = Some(bytes);
        self
    }

    /// Name used in log fields.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Creates the store.
    ///
    /// Fails if the database file can't be opened or created.
    pub fn build(self) -> Result<DiskStore, StoreError> {
        let mut builder = FeoxStore::builder().enable_ttl(true);

        if let Some(mut path) = self.path {
            if path.is_dir() {
                path.push(DATABASE_FILE);
            }
            let path_str = path
                .to_str()
                .ok_or_else(|| {
                    StoreError::InvalidConfig(format!(
                        "cache path is not valid UTF-8: {}",
                        path.display()
                    ))
                })?
                .to_owned();
            builder = builder.device_path(path_str);
        }

        if let Some(file_size) = self.max_file_size {
            builder = builder.file_size(file_size);
        }

        if let Some(memory) = self.max_memory {
            builder = builder.max_memory(memory);
        }

        let store = builder.build()?;

        Ok(DiskStore {
            store: Arc::new(store),
            label: self.label,
        })
    }
}

#[async_trait]
impl Store for DiskStore {
    async fn read(&self, key: &StoreKey) -> StoreResult<Option<StoredResponse>> {
        let store = self.store.clone();
        let key_bytes = key.as_bytes().to_vec();

        tokio::task::spawn_blocking(move || match store.get(&key_bytes) {
            Ok(encoded) => StoredResponse::decode(&encoded).map(Some),
            Err(FeoxError::KeyNotFound) => Ok(None),
            Err(e) => Err(StoreError::from(e)),
        })
        .await?
    }

    async fn write(
        &self,
        key: &StoreKey,
        value: StoredResponse,
        ttl: Option<Duration>,
    ) -> StoreResult<()> {
        let store = self.store.clone();
        let key_bytes = key.as_bytes().to_vec();
        let value_bytes = value.encode()?;
        trace!(key = %key, bytes = value_bytes.len(), ?ttl, "writing stored response");

        tokio::task::spawn_blocking(move || {
            ttl.map(|ttl| ttl.as_secs())
                .filter(|secs| *secs > 0)
                .map(|secs| store.insert_with_ttl(&key_bytes, &value_bytes, secs))
                .unwrap_or_else(|| store.insert(&key_bytes, &value_bytes))?;
            Ok(())
        })
        .await?
    }

    async fn remove(&self, key: &StoreKey) -> StoreResult<DeleteStatus> {
        let store = self.store.clone();
        let key_bytes = key.as_bytes().to_vec();

        tokio::task::spawn_blocking(move || {
            if store.contains_key(&key_bytes) {
                store.delete(&key_bytes)?;
                Ok(DeleteStatus::Deleted(1))
            } else {
                Ok(DeleteStatus::Missing)
            }
        })
        .await?
    }

    fn label(&self) -> &str {
        &self.label
    }
}
