#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use video_portal::db::{MemoryVideoRepository, VideoRepository};
use video_portal::storage::{MemoryObjectStore, ObjectStore, PutOptions};
use video_portal::{NewVideo, PortalError, Result, VideoId, VideoRecord, VideoSettings};

pub const MIB: usize = 1024 * 1024;

/// Deterministic, non-repeating-looking bytes so misordered parts are caught.
pub fn sample_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| ((i * 31 + i / 251) % 256) as u8).collect()
}

/// Memory store with injectable failures and a log of every download.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryObjectStore,
    upload_calls: AtomicUsize,
    fail_upload_call: Mutex<Option<usize>>,
    partial_writes: AtomicBool,
    download_failures: Mutex<HashMap<String, u32>>,
    fail_all_downloads: AtomicBool,
    downloads: Mutex<Vec<String>>,
}

impl FlakyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inner(&self) -> &MemoryObjectStore {
        &self.inner
    }

    /// Fails the upload call with this 0-based index.
    pub fn fail_upload_call(&self, index: usize) {
        *self.fail_upload_call.lock().unwrap() = Some(index);
    }

    /// Fails the next `times` downloads of `key`.
    pub fn fail_downloads_of(&self, key: &str, times: u32) {
        self.download_failures.lock().unwrap().insert(key.to_string(), times);
    }

    /// Injected upload failures first store a truncated copy of the data.
    pub fn leave_partial_writes(&self) {
        self.partial_writes.store(true, Ordering::SeqCst);
    }

    pub fn fail_all_downloads(&self) {
        self.fail_all_downloads.store(true, Ordering::SeqCst);
    }

    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub fn downloads(&self) -> Vec<String> {
        self.downloads.lock().unwrap().clone()
    }

    pub fn download_count(&self) -> usize {
        self.downloads.lock().unwrap().len()
    }

    /// Puts an object directly, bypassing failure injection.
    pub async fn seed(&self, key: &str, data: &[u8]) {
        self.inner
            .upload(key, data, &PutOptions::new("video/mp4"))
            .await
            .unwrap();
    }
}

#[async_trait]
impl ObjectStore for FlakyStore {
    async fn upload(&self, key: &str, data: &[u8], options: &PutOptions) -> Result<()> {
        let call = self.upload_calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail_upload_call.lock().unwrap() == Some(call) {
            if self.partial_writes.load(Ordering::SeqCst) {
                self.inner.upload(key, &data[..data.len() / 2], options).await?;
            }
            return Err(PortalError::StorageWrite(format!("injected failure for {}", key)));
        }
        self.inner.upload(key, data, options).await
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>> {
        self.downloads.lock().unwrap().push(key.to_string());
        if self.fail_all_downloads.load(Ordering::SeqCst) {
            return Err(PortalError::StorageRead(format!("injected failure for {}", key)));
        }
        let inject = {
            let mut failures = self.download_failures.lock().unwrap();
            match failures.get_mut(key) {
                Some(remaining) if *remaining > 0 => {
                    *remaining -= 1;
                    true
                }
                _ => false,
            }
        };
        if inject {
            return Err(PortalError::StorageRead(format!("injected failure for {}", key)));
        }
        self.inner.download(key).await
    }

    async fn remove(&self, keys: &[String]) -> Result<()> {
        self.inner.remove(keys).await
    }

    async fn list(&self, search: &str) -> Result<Vec<String>> {
        self.inner.list(search).await
    }
}

/// Memory repository whose writes can be switched to fail.
#[derive(Default)]
pub struct FailingRepository {
    inner: MemoryVideoRepository,
    fail_inserts: AtomicBool,
    fail_updates: AtomicBool,
}

impl FailingRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inner(&self) -> &MemoryVideoRepository {
        &self.inner
    }

    pub fn fail_inserts(&self) {
        self.fail_inserts.store(true, Ordering::SeqCst);
    }

    pub fn fail_updates(&self) {
        self.fail_updates.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl VideoRepository for FailingRepository {
    async fn insert(&self, video: NewVideo) -> Result<VideoRecord> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(PortalError::Persistence("insert rejected".to_string()));
        }
        self.inner.insert(video).await
    }

    async fn update(&self, id: &VideoId, settings: &VideoSettings) -> Result<VideoRecord> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(PortalError::Persistence("update rejected".to_string()));
        }
        self.inner.update(id, settings).await
    }

    async fn select_by_id(&self, id: &VideoId) -> Result<Option<VideoRecord>> {
        self.inner.select_by_id(id).await
    }

    async fn delete(&self, id: &VideoId) -> Result<()> {
        self.inner.delete(id).await
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<VideoRecord>> {
        self.inner.list_by_owner(owner_id).await
    }
}
