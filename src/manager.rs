use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::chunk::ChunkPolicy;
use crate::config::PortalConfig;
use crate::db::{JsonVideoRepository, VideoRepository};
use crate::fetch::ChunkedFetcher;
use crate::session::ViewSession;
use crate::storage::progress::ProgressStats;
use crate::storage::validation::{ManifestReport, ManifestValidator};
use crate::storage::{BlobRegistry, DiskObjectStore, ObjectStore};
use crate::upload::{ChunkedUploader, FileSource, UploadFile, UploadRequest};
use crate::{PortalError, Result, VideoId, VideoRecord, VideoSettings};

/// Entry point tying the store, the repository and both pipelines together.
#[derive(Clone)]
pub struct VideoManager {
    store: Arc<dyn ObjectStore>,
    repo: Arc<dyn VideoRepository>,
    uploader: Arc<ChunkedUploader>,
    fetcher: Arc<ChunkedFetcher>,
    blobs: Arc<BlobRegistry>,
    origin: String,
}

impl VideoManager {
    /// Opens the on-disk store and repository under `config.data_dir`.
    pub async fn open(config: &PortalConfig) -> Result<Self> {
        config.validate()?;
        let store = DiskObjectStore::new(&config.data_dir).await?;
        let repo = JsonVideoRepository::new(&config.data_dir).await?;
        info!(data_dir = %config.data_dir.display(), "opened video store");

        Ok(Self::new(
            Arc::new(store),
            Arc::new(repo),
            config.chunking,
            config.origin.clone(),
        ))
    }

    pub fn new(
        store: Arc<dyn ObjectStore>,
        repo: Arc<dyn VideoRepository>,
        policy: ChunkPolicy,
        origin: impl Into<String>,
    ) -> Self {
        let uploader = ChunkedUploader::new(store.clone(), repo.clone(), policy);
        let fetcher = ChunkedFetcher::new(store.clone());
        Self::with_pipelines(store, repo, uploader, fetcher, origin)
    }

    pub fn with_pipelines(
        store: Arc<dyn ObjectStore>,
        repo: Arc<dyn VideoRepository>,
        uploader: ChunkedUploader,
        fetcher: ChunkedFetcher,
        origin: impl Into<String>,
    ) -> Self {
        Self {
            store,
            repo,
            uploader: Arc::new(uploader),
            fetcher: Arc::new(fetcher),
            blobs: Arc::new(BlobRegistry::new()),
            origin: origin.into(),
        }
    }

    pub fn uploader(&self) -> &ChunkedUploader {
        &self.uploader
    }

    pub fn fetcher(&self) -> &ChunkedFetcher {
        &self.fetcher
    }

    pub fn blobs(&self) -> &Arc<BlobRegistry> {
        &self.blobs
    }

    pub async fn upload_path(
        &self,
        path: &Path,
        request: UploadRequest,
        on_progress: &(dyn Fn(&ProgressStats) + Send + Sync),
    ) -> Result<VideoRecord> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| PortalError::InvalidInput(format!("invalid file name: {}", path.display())))?;
        let source = FileSource::open(path).await?;
        let file = UploadFile::new(name, source);
        self.uploader.upload_with_progress(file, request, on_progress).await
    }

    pub async fn list(&self, owner_id: &str) -> Result<Vec<VideoRecord>> {
        self.repo.list_by_owner(owner_id).await
    }

    pub async fn get(&self, id: &VideoId) -> Result<VideoRecord> {
        self.repo
            .select_by_id(id)
            .await?
            .ok_or_else(|| PortalError::NotFound(format!("video {}", id)))
    }

    /// Storage keys are never touched here, and a rejected update leaves the record as it was.
    pub async fn update_settings(&self, id: &VideoId, settings: &VideoSettings) -> Result<VideoRecord> {
        settings.validate()?;
        let record = self.repo.update(id, settings).await?;
        info!(video_id = %id, "updated video settings");
        Ok(record)
    }

    pub async fn set_enabled(&self, id: &VideoId, enabled: bool) -> Result<VideoRecord> {
        let settings = VideoSettings {
            is_enabled: Some(enabled),
            ..Default::default()
        };
        self.update_settings(id, &settings).await
    }

    /// Removes every stored object (best-effort), then the record.
    pub async fn delete(&self, id: &VideoId) -> Result<()> {
        let video = self.get(id).await?;
        let keys = video.storage_keys();
        if let Err(e) = self.store.remove(&keys).await {
            warn!(video_id = %id, error = %e, "removing stored objects failed");
        }
        self.repo.delete(id).await?;
        info!(video_id = %id, objects = keys.len(), "deleted video");
        Ok(())
    }

    pub fn share_link(&self, id: &VideoId) -> String {
        format!("{}/watch/{}", self.origin.trim_end_matches('/'), id)
    }

    pub fn watch(&self, video_id: impl Into<String>) -> ViewSession {
        ViewSession::new(video_id, self.repo.clone(), self.fetcher.clone(), self.blobs.clone())
    }

    pub async fn check(&self, id: &VideoId) -> Result<ManifestReport> {
        let video = self.get(id).await?;
        ManifestValidator::new(self.store.clone()).validate(&video).await
    }
}
