#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Local asset storage for provmirror
//!
//! This crate manages the storage root where upstream assets are kept
//! under their upstream URL path, and where provisioned signing keys live.
//! Files are written once through a temp file and rename, so readers never
//! observe a partial file. Nothing is ever evicted.

mod mirror;

pub use mirror::AssetMirror;

use provmirror_errors::{Error, StorageError};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;

static STAGING_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Relative store path of a provider's ASCII-armored public key
#[must_use]
pub fn gpg_key_path(namespace: &str, provider_type: &str) -> String {
    format!("gpg/{namespace}/{provider_type}/ascii_armor")
}

/// File-by-path store rooted at a directory
#[derive(Clone, Debug)]
pub struct LocalStore {
    base_path: PathBuf,
}

impl LocalStore {
    /// Create a new store instance
    #[must_use]
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Map a store-relative path to a location under the root
    ///
    /// Leading slashes are ignored so upstream URL paths can be used as-is.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidPath`] for empty paths and paths that
    /// would escape the root (`..`, drive prefixes).
    pub fn resolve(&self, rel: &str) -> Result<PathBuf, Error> {
        let trimmed = rel.trim_start_matches('/');
        let candidate = Path::new(trimmed);

        let escapes = candidate
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if trimmed.is_empty() || escapes || trimmed.contains('\\') {
            return Err(StorageError::InvalidPath {
                path: rel.to_string(),
            }
            .into());
        }

        Ok(self.base_path.join(candidate))
    }

    /// Check whether a file is present at `rel`
    pub async fn exists(&self, rel: &str) -> bool {
        match self.resolve(rel) {
            Ok(path) => fs::metadata(&path).await.is_ok_and(|m| m.is_file()),
            Err(_) => false,
        }
    }

    /// Read the file stored at `rel`
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::PathNotFound`] if nothing is stored there, or
    /// [`StorageError::InvalidPath`] if the path is not acceptable.
    pub async fn read(&self, rel: &str) -> Result<Vec<u8>, Error> {
        let path = self.resolve(rel)?;
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => {
                return Err(StorageError::PathNotFound {
                    path: rel.to_string(),
                }
                .into())
            }
            Err(e) => return Err(StorageError::from_io_with_path(&e, Path::new(rel)).into()),
        }
        fs::read(&path)
            .await
            .map_err(|e| StorageError::from_io_with_path(&e, Path::new(rel)).into())
    }

    /// Read the file stored at `rel` as UTF-8 text
    ///
    /// # Errors
    ///
    /// Same as [`LocalStore::read`], plus [`StorageError::CorruptedData`]
    /// when the content is not valid UTF-8.
    pub async fn read_to_string(&self, rel: &str) -> Result<String, Error> {
        let bytes = self.read(rel).await?;
        String::from_utf8(bytes).map_err(|e| {
            StorageError::CorruptedData {
                message: format!("{rel}: {e}"),
            }
            .into()
        })
    }

    /// Write `content` to `rel`, creating parent directories
    ///
    /// # Errors
    ///
    /// Returns an error if the path is invalid or the file cannot be written.
    pub async fn write(&self, rel: &str, content: &[u8]) -> Result<(), Error> {
        let staging = self.staging_path(rel).await?;
        if let Err(e) = fs::write(&staging, content).await {
            let _ = fs::remove_file(&staging).await;
            return Err(StorageError::from_io_with_path(&e, &staging).into());
        }
        self.commit(&staging, rel).await
    }

    /// Reserve a unique temp file next to `rel`, creating parent directories
    ///
    /// # Errors
    ///
    /// Returns an error if the path is invalid or the parent directory cannot
    /// be created.
    pub async fn staging_path(&self, rel: &str) -> Result<PathBuf, Error> {
        let path = self.resolve(rel)?;
        let parent = path.parent().unwrap_or(&self.base_path);
        fs::create_dir_all(parent)
            .await
            .map_err(|e| StorageError::from_io_with_path(&e, parent))?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(parent.join(format!(
            ".{name}.{}.{}.part",
            std::process::id(),
            STAGING_COUNTER.fetch_add(1, Ordering::Relaxed)
        )))
    }

    /// Move a staged file into place at `rel`
    ///
    /// # Errors
    ///
    /// Returns an error if the rename fails; the staged file is removed.
    pub async fn commit(&self, staging: &Path, rel: &str) -> Result<(), Error> {
        let path = self.resolve(rel)?;
        if let Err(e) = fs::rename(staging, &path).await {
            let _ = fs::remove_file(staging).await;
            return Err(StorageError::IoError {
                message: format!("failed to move {} into place: {e}", path.display()),
            }
            .into());
        }
        Ok(())
    }
}
