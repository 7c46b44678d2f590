//! Named blob storage for import state
//!
//! The importer keeps its checkpoint and counters as small named JSON blobs.
//! [`FsBlobStore`] keeps them as files in a state directory, writing through a
//! temporary file and a rename so a crash never leaves a half-written blob.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use catalog_common::{CatalogError, Result};
use tracing::debug;

/// Read/write/delete access to named blobs
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Contents of `name`, or `None` if it was never written or was deleted
    async fn read(&self, name: &str) -> Result<Option<Vec<u8>>>;

    /// Replace the contents of `name`
    async fn write(&self, name: &str, bytes: &[u8]) -> Result<()>;

    /// Remove `name`; deleting a missing blob is not an error
    async fn delete(&self, name: &str) -> Result<()>;
}

fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        && !name.starts_with('.');

    if valid {
        Ok(())
    } else {
        Err(CatalogError::InvalidBlobName(name.to_string()))
    }
}

/// Blobs stored as `<root>/<name>.json`
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.root.join(format!("{}.json", name)))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(name)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path_for(name)?;
        tokio::fs::create_dir_all(&self.root).await?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!(blob = name, path = %path.display(), bytes = bytes.len(), "Wrote blob");
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let path = self.path_for(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(blob = name, "Deleted blob");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Process-local blob store
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().contains_key(name)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        // A poisoned map is still a consistent map of complete blobs.
        self.blobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        validate_name(name)?;
        Ok(self.lock().get(name).cloned())
    }

    async fn write(&self, name: &str, bytes: &[u8]) -> Result<()> {
        validate_name(name)?;
        self.lock().insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        self.lock().remove(name);
        Ok(())
    }
}
