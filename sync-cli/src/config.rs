//! File-backed storage for clipsync.
//!
//! Each key is one JSON file in the data directory, readable only by the
//! owner since settings may hold the shared secret.

use anyhow::{Context, Result};
use async_trait::async_trait;
use clipsync_client::store::{KeyValueStore, StoreError, SETTINGS_KEY};
use std::path::{Path, PathBuf};

/// [`KeyValueStore`] writing `<data_dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open a store in `dir`, creating it (mode 0700) if needed.
    pub async fn open(dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(dir)
            .await
            .context("Failed to create data directory")?;
        set_dir_permissions_0700(dir).await?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// Directory holding the files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether `clipsync init` has run here.
    pub fn is_initialized(&self) -> bool {
        self.path_for(SETTINGS_KEY).exists()
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e.to_string())),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        tokio::fs::write(&path, value)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))?;
        set_file_permissions_0600(&path)
            .await
            .map_err(|e| StoreError::Io(e.to_string()))
    }
}

/// Set file permissions to 0600 (owner read/write only) on Unix.
/// No-op on non-Unix platforms.
async fn set_file_permissions_0600(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .await
            .context("Failed to set file permissions")?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}

/// Set directory permissions to 0700 (owner only) on Unix.
/// No-op on non-Unix platforms.
async fn set_dir_permissions_0700(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
            .await
            .context("Failed to set directory permissions")?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}
