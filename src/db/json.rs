use async_trait::async_trait;
use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use super::VideoRepository;
use crate::{NewVideo, PortalError, Result, VideoId, VideoRecord, VideoSettings};

/// Repository storing one JSON document per video under `<base>/videos`.
pub struct JsonVideoRepository {
    records_path: PathBuf,
}

impl JsonVideoRepository {
    pub async fn new<P: AsRef<Path>>(base_path: P) -> Result<Self> {
        let records_path = base_path.as_ref().join("videos");
        fs::create_dir_all(&records_path).await?;
        Ok(Self { records_path })
    }

    fn record_path(&self, id: &VideoId) -> PathBuf {
        self.records_path.join(format!("{}.json", id))
    }

    async fn write_record(&self, record: &VideoRecord) -> Result<()> {
        let json = serde_json::to_string_pretty(record)
            .map_err(|e| PortalError::Persistence(format!("encoding video {}: {}", record.id, e)))?;
        fs::write(self.record_path(&record.id), json)
            .await
            .map_err(|e| PortalError::Persistence(format!("writing video {}: {}", record.id, e)))
    }

    async fn read_record(path: &Path) -> Result<Option<VideoRecord>> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(PortalError::Persistence(format!(
                    "reading {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| PortalError::Persistence(format!("Failed to parse {}: {}", path.display(), e)))
    }
}

#[async_trait]
impl VideoRepository for JsonVideoRepository {
    async fn insert(&self, video: NewVideo) -> Result<VideoRecord> {
        let record = VideoRecord::from_new(VideoId::new(), Utc::now(), video);
        self.write_record(&record).await?;
        debug!(video_id = %record.id, "inserted video record");
        Ok(record)
    }

    async fn update(&self, id: &VideoId, settings: &VideoSettings) -> Result<VideoRecord> {
        let mut record = Self::read_record(&self.record_path(id))
            .await?
            .ok_or_else(|| PortalError::NotFound(format!("video {}", id)))?;
        settings.apply(&mut record);
        self.write_record(&record).await?;
        Ok(record)
    }

    async fn select_by_id(&self, id: &VideoId) -> Result<Option<VideoRecord>> {
        Self::read_record(&self.record_path(id)).await
    }

    async fn delete(&self, id: &VideoId) -> Result<()> {
        match fs::remove_file(self.record_path(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(PortalError::NotFound(format!("video {}", id)))
            }
            Err(e) => Err(PortalError::Persistence(format!("deleting video {}: {}", id, e))),
        }
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<VideoRecord>> {
        let mut videos = Vec::new();
        let mut entries = fs::read_dir(&self.records_path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }
            match Self::read_record(&path).await {
                Ok(Some(record)) if record.owner_id == owner_id => videos.push(record),
                Ok(_) => {}
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable record"),
            }
        }

        videos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(videos)
    }
}
