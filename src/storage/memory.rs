use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

use super::keys::validate_key;
use super::{ObjectStore, PutOptions};
use crate::{PortalError, Result};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    content_type: String,
}

/// Object store kept entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<String, StoredObject>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.objects.lock().await.contains_key(key)
    }

    pub async fn keys(&self) -> Vec<String> {
        self.objects.lock().await.keys().cloned().collect()
    }

    pub async fn content_type(&self, key: &str) -> Option<String> {
        self.objects.lock().await.get(key).map(|o| o.content_type.clone())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn upload(&self, key: &str, data: &[u8], options: &PutOptions) -> Result<()> {
        validate_key(key)?;
        let mut objects = self.objects.lock().await;
        if !options.overwrite && objects.contains_key(key) {
            return Err(PortalError::StorageWrite(format!("object {} already exists", key)));
        }
        objects.insert(
            key.to_string(),
            StoredObject {
                data: data.to_vec(),
                content_type: options.content_type.clone(),
            },
        );
        Ok(())
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>> {
        let objects = self.objects.lock().await;
        objects
            .get(key)
            .map(|o| o.data.clone())
            .ok_or_else(|| PortalError::StorageRead(format!("object {} not found", key)))
    }

    async fn remove(&self, keys: &[String]) -> Result<()> {
        let mut objects = self.objects.lock().await;
        for key in keys {
            objects.remove(key);
        }
        Ok(())
    }

    async fn list(&self, search: &str) -> Result<Vec<String>> {
        let objects = self.objects.lock().await;
        Ok(objects.keys().filter(|k| k.contains(search)).cloned().collect())
    }
}
