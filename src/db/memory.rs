use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::VideoRepository;
use crate::{NewVideo, PortalError, Result, VideoId, VideoRecord, VideoSettings};

#[derive(Debug, Default)]
pub struct MemoryVideoRepository {
    records: Mutex<HashMap<VideoId, VideoRecord>>,
}

impl MemoryVideoRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    /// Stores a record as-is, bypassing the insert path.
    pub async fn put(&self, record: VideoRecord) {
        self.records.lock().await.insert(record.id, record);
    }
}

#[async_trait]
impl VideoRepository for MemoryVideoRepository {
    async fn insert(&self, video: NewVideo) -> Result<VideoRecord> {
        let record = VideoRecord::from_new(VideoId::new(), Utc::now(), video);
        self.records.lock().await.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update(&self, id: &VideoId, settings: &VideoSettings) -> Result<VideoRecord> {
        let mut records = self.records.lock().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| PortalError::NotFound(format!("video {}", id)))?;
        settings.apply(record);
        Ok(record.clone())
    }

    async fn select_by_id(&self, id: &VideoId) -> Result<Option<VideoRecord>> {
        Ok(self.records.lock().await.get(id).cloned())
    }

    async fn delete(&self, id: &VideoId) -> Result<()> {
        self.records
            .lock()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| PortalError::NotFound(format!("video {}", id)))
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<VideoRecord>> {
        let records = self.records.lock().await;
        let mut videos: Vec<_> = records
            .values()
            .filter(|v| v.owner_id == owner_id)
            .cloned()
            .collect();
        videos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(videos)
    }
}
