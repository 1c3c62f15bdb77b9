//! Artifact storage abstraction.
//!
//! Uploaded documents and generated e-books go through an [`ArtifactStore`]
//! instead of touching fixed directories directly. The HTTP layer only knows
//! the trait; [`LocalStore`] keeps the on-disk `uploads/` + `output/` layout
//! and [`MemoryStore`] lets tests run without real disk I/O.
//!
//! Keys are generated by the caller from a per-request id, never from the
//! client's filename. Backends still reject keys that could escape their
//! root.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Artifact not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Which of the two artifact areas a key lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageArea {
    /// Raw uploaded documents.
    Uploads,
    /// Generated EPUB / PDF files.
    Output,
}

impl fmt::Display for StorageArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageArea::Uploads => f.write_str("uploads"),
            StorageArea::Output => f.write_str("output"),
        }
    }
}

/// Opaque reference to a stored artifact, returned by [`ArtifactStore::save`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactHandle {
    pub area: StorageArea,
    pub key: String,
}

impl fmt::Display for ArtifactHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.area, self.key)
    }
}

/// Storage backend for uploads and generated artifacts.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store `data` under `key` in `area`, replacing any previous content.
    async fn save(&self, area: StorageArea, key: &str, data: &[u8])
        -> StorageResult<ArtifactHandle>;

    /// Read back a previously saved artifact.
    async fn load(&self, handle: &ArtifactHandle) -> StorageResult<Vec<u8>>;

    /// Remove an artifact. Removing a missing artifact is not an error.
    async fn delete(&self, handle: &ArtifactHandle) -> StorageResult<()>;
}

fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty()
        || key.contains("..")
        || key.contains('/')
        || key.contains('\\')
        || key.starts_with('.')
    {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

// ── Local filesystem ─────────────────────────────────────────────────────────

/// Two directories on local disk, one per [`StorageArea`].
#[derive(Debug, Clone)]
pub struct LocalStore {
    upload_dir: PathBuf,
    output_dir: PathBuf,
}

impl LocalStore {
    /// Create the store, creating both directories if they are absent.
    pub async fn new(
        upload_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> StorageResult<Self> {
        let upload_dir = upload_dir.into();
        let output_dir = output_dir.into();

        for dir in [&upload_dir, &output_dir] {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                StorageError::ConfigError(format!(
                    "Failed to create storage directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        Ok(Self {
            upload_dir,
            output_dir,
        })
    }

    pub fn dir(&self, area: StorageArea) -> &Path {
        match area {
            StorageArea::Uploads => &self.upload_dir,
            StorageArea::Output => &self.output_dir,
        }
    }

    fn path_for(&self, area: StorageArea, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        Ok(self.dir(area).join(key))
    }
}

#[async_trait]
impl ArtifactStore for LocalStore {
    async fn save(
        &self,
        area: StorageArea,
        key: &str,
        data: &[u8],
    ) -> StorageResult<ArtifactHandle> {
        let path = self.path_for(area, key)?;
        let dir = self.dir(area).to_path_buf();
        let data = data.to_vec();

        // Write to a temp file in the same directory, then rename over the
        // target, so readers never observe a half-written artifact.
        let target = path.clone();
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
            tmp.write_all(&data)?;
            tmp.flush()?;
            tmp.persist(&target).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| StorageError::Io {
            path: path.clone(),
            source: std::io::Error::other(e),
        })?
        .map_err(|e| StorageError::Io {
            path: path.clone(),
            source: e,
        })?;

        debug!("Stored {}", path.display());
        Ok(ArtifactHandle {
            area,
            key: key.to_string(),
        })
    }

    async fn load(&self, handle: &ArtifactHandle) -> StorageResult<Vec<u8>> {
        let path = self.path_for(handle.area, &handle.key)?;
        tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(handle.to_string())
            } else {
                StorageError::Io { path, source: e }
            }
        })
    }

    async fn delete(&self, handle: &ArtifactHandle) -> StorageResult<()> {
        let path = self.path_for(handle.area, &handle.key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io { path, source: e }),
        }
    }
}

// ── In-memory ────────────────────────────────────────────────────────────────

/// Process-local store backed by a map. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<(StorageArea, String), Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of artifacts currently held in `area`.
    pub async fn len(&self, area: StorageArea) -> usize {
        self.entries
            .read()
            .await
            .keys()
            .filter(|(a, _)| *a == area)
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    async fn save(
        &self,
        area: StorageArea,
        key: &str,
        data: &[u8],
    ) -> StorageResult<ArtifactHandle> {
        validate_key(key)?;
        self.entries
            .write()
            .await
            .insert((area, key.to_string()), data.to_vec());
        Ok(ArtifactHandle {
            area,
            key: key.to_string(),
        })
    }

    async fn load(&self, handle: &ArtifactHandle) -> StorageResult<Vec<u8>> {
        self.entries
            .read()
            .await
            .get(&(handle.area, handle.key.clone()))
            .cloned()
            .ok_or_else(|| StorageError::NotFound(handle.to_string()))
    }

    async fn delete(&self, handle: &ArtifactHandle) -> StorageResult<()> {
        self.entries
            .write()
            .await
            .remove(&(handle.area, handle.key.clone()));
        Ok(())
    }
}
