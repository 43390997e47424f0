use async_trait::async_trait;

use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutOptions {
    pub content_type: String,
    /// Replace an existing object at the same key instead of failing.
    pub overwrite: bool,
}

impl PutOptions {
    pub fn new(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            overwrite: true,
        }
    }
}

/// Remote object storage as the pipelines see it.
///
/// Upload failures surface as `StorageWrite`, download failures as `StorageRead`. `remove` is
/// best-effort: implementations log per-key failures and still return `Ok`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(&self, key: &str, data: &[u8], options: &PutOptions) -> Result<()>;
    async fn download(&self, key: &str) -> Result<Vec<u8>>;
    async fn remove(&self, keys: &[String]) -> Result<()>;
    /// Keys containing `search`, sorted.
    async fn list(&self, search: &str) -> Result<Vec<String>>;
}
