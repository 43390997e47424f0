use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// A reconstructed video held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    pub data: Vec<u8>,
    pub content_type: String,
}

impl Blob {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Handle to a registered blob. Stays valid until revoked.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobUrl(String);

impl BlobUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Table of in-memory objects handed out by URL. Entries have no expiry; whoever created a
/// handle revokes it.
#[derive(Debug, Default)]
pub struct BlobRegistry {
    blobs: Mutex<HashMap<BlobUrl, Arc<Blob>>>,
}

impl BlobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, blob: Blob) -> BlobUrl {
        let url = BlobUrl(format!("blob:{}", Uuid::new_v4()));
        let mut blobs = self.blobs.lock().await;
        blobs.insert(url.clone(), Arc::new(blob));
        url
    }

    pub async fn resolve(&self, url: &BlobUrl) -> Option<Arc<Blob>> {
        let blobs = self.blobs.lock().await;
        blobs.get(url).cloned()
    }

    /// Returns whether the handle was still live.
    pub async fn revoke(&self, url: &BlobUrl) -> bool {
        let mut blobs = self.blobs.lock().await;
        blobs.remove(url).is_some()
    }

    pub async fn len(&self) -> usize {
        self.blobs.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.lock().await.is_empty()
    }
}
