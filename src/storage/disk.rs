use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use super::keys::validate_key;
use super::{ObjectStore, PutOptions};
use crate::{PortalError, Result};

/// Object store backed by one flat directory of files.
pub struct DiskObjectStore {
    objects_path: PathBuf,
}

impl DiskObjectStore {
    pub async fn new<P: AsRef<Path>>(base_path: P) -> Result<Self> {
        let objects_path = base_path.as_ref().join("objects");
        fs::create_dir_all(&objects_path).await?;
        Ok(Self { objects_path })
    }

    fn object_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.objects_path.join(key))
    }
}

#[async_trait]
impl ObjectStore for DiskObjectStore {
    async fn upload(&self, key: &str, data: &[u8], options: &PutOptions) -> Result<()> {
        let path = self.object_path(key)?;

        if !options.overwrite && fs::try_exists(&path).await? {
            return Err(PortalError::StorageWrite(format!("object {} already exists", key)));
        }

        // Keys never start with '.', so staging files cannot collide with objects.
        let staging = self.objects_path.join(format!(".{}.{}.tmp", key, Uuid::new_v4().simple()));
        let written = match fs::write(&staging, data).await {
            Ok(()) => fs::rename(&staging, &path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_file(&staging).await {
                if cleanup.kind() != ErrorKind::NotFound {
                    warn!(key, error = %cleanup, "failed to remove staging file");
                }
            }
            return Err(PortalError::StorageWrite(format!("writing {}: {}", key, e)));
        }

        debug!(key, size_bytes = data.len(), content_type = %options.content_type, "stored object");
        Ok(())
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.object_path(key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(PortalError::StorageRead(format!("object {} not found", key)))
            }
            Err(e) => Err(PortalError::StorageRead(format!("reading {}: {}", key, e))),
        }
    }

    async fn remove(&self, keys: &[String]) -> Result<()> {
        for key in keys {
            let path = match self.object_path(key) {
                Ok(path) => path,
                Err(e) => {
                    warn!(key = %key, error = %e, "skipping removal of invalid key");
                    continue;
                }
            };

            match fs::remove_file(&path).await {
                Ok(()) => debug!(key = %key, "removed object"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!(key = %key, error = %e, "failed to remove object"),
            }
        }
        Ok(())
    }

    async fn list(&self, search: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut entries = fs::read_dir(&self.objects_path).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with('.') && name.contains(search) {
                    keys.push(name.to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}
