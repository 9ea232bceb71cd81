//! Upload storage: raw presentation bytes kept on local disk.
//!
//! DESIGN
//! ======
//! Each upload moves through `received -> stored -> servable`. The store
//! assigns a generated filename (32 lowercase hex chars from a v4 UUID),
//! writes the bytes under that name, and later serves them back by the same
//! name. Only well-formed generated names are ever mapped to a path, so a
//! retrieval request cannot escape the upload directory.
//!
//! Files are created with `create_new`, so a name collision surfaces as an
//! I/O error instead of silently replacing an earlier upload.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use uuid::Uuid;

const GENERATED_NAME_LEN: usize = 32;

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("upload not found: {0}")]
    NotFound(String),
    #[error("not a generated upload name: {0}")]
    InvalidName(String),
    #[error("storage i/o failed: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// STORE
// =============================================================================

/// Result of persisting one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    pub generated: String,
    pub size: usize,
}

#[derive(Clone, Debug)]
pub struct UploadStore {
    dir: Arc<PathBuf>,
}

impl UploadStore {
    /// Point a store at `dir` without touching the filesystem.
    #[must_use]
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: Arc::new(dir.into()) }
    }

    /// Create the upload directory if needed and return a store rooted there.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub async fn open(dir: &Path) -> Result<Self, StorageError> {
        tokio::fs::create_dir_all(dir).await?;
        Ok(Self::at(dir))
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist `bytes` under a freshly generated name.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    pub async fn store(&self, bytes: &[u8]) -> Result<StoredUpload, StorageError> {
        let generated = generate_name();
        let path = self.dir.join(&generated);

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        file.write_all(bytes).await?;
        file.flush().await?;

        Ok(StoredUpload { generated, size: bytes.len() })
    }

    /// Read back a stored upload by its generated name.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when no such upload exists, `InvalidName` when the
    /// name could not have been generated by this store.
    pub async fn read(&self, generated: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(generated)?;
        if !tokio::fs::try_exists(&path).await? {
            return Err(StorageError::NotFound(generated.to_owned()));
        }
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound(generated.to_owned())),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    fn path_for(&self, generated: &str) -> Result<PathBuf, StorageError> {
        if !is_generated_name(generated) {
            return Err(StorageError::InvalidName(generated.to_owned()));
        }
        Ok(self.dir.join(generated))
    }
}

/// Produce a new upload filename.
#[must_use]
pub fn generate_name() -> String {
    Uuid::new_v4().simple().to_string()
}

/// True when `name` has the shape produced by [`generate_name`].
#[must_use]
pub fn is_generated_name(name: &str) -> bool {
    name.len() == GENERATED_NAME_LEN && name.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

#[cfg(test)]
#[path = "storage_test.rs"]
mod tests;
