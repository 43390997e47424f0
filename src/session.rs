//! Per-view state machine.
//!
//! ```text
//! Idle -> LoadingMetadata -> NeedsPassword -> LoadingContent -> Ready
//!                         \-----------------/               \-> Failed
//! ```
//!
//! `Failed` is terminal for the session; [`ViewSession::restart`] goes back through `Idle`.

use std::sync::Arc;
use tracing::{info, warn};

use crate::db::VideoRepository;
use crate::fetch::{ChunkedFetcher, FetchProgress};
use crate::storage::{Blob, BlobRegistry, BlobUrl};
use crate::{ErrorKind, PortalError, Result, VideoId, VideoRecord};

#[derive(Debug, Clone, PartialEq)]
pub enum ViewState {
    Idle,
    LoadingMetadata,
    NeedsPassword {
        video: VideoRecord,
        error: Option<String>,
    },
    LoadingContent {
        video: VideoRecord,
    },
    Ready {
        video: VideoRecord,
        url: BlobUrl,
    },
    Failed {
        kind: ErrorKind,
        message: String,
    },
}

impl ViewState {
    pub fn video(&self) -> Option<&VideoRecord> {
        match self {
            ViewState::NeedsPassword { video, .. }
            | ViewState::LoadingContent { video }
            | ViewState::Ready { video, .. } => Some(video),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ViewState::Idle => "idle",
            ViewState::LoadingMetadata => "loading_metadata",
            ViewState::NeedsPassword { .. } => "needs_password",
            ViewState::LoadingContent { .. } => "loading_content",
            ViewState::Ready { .. } => "ready",
            ViewState::Failed { .. } => "failed",
        }
    }
}

/// A reconstructed video ready to be saved by the viewer.
#[derive(Debug, Clone, PartialEq)]
pub struct Download {
    pub file_name: String,
    pub blob: Blob,
}

pub struct ViewSession {
    video_id: String,
    repo: Arc<dyn VideoRepository>,
    fetcher: Arc<ChunkedFetcher>,
    blobs: Arc<BlobRegistry>,
    state: ViewState,
}

impl ViewSession {
    pub fn new(
        video_id: impl Into<String>,
        repo: Arc<dyn VideoRepository>,
        fetcher: Arc<ChunkedFetcher>,
        blobs: Arc<BlobRegistry>,
    ) -> Self {
        Self {
            video_id: video_id.into(),
            repo,
            fetcher,
            blobs,
            state: ViewState::Idle,
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub async fn open(&mut self) -> Result<&ViewState> {
        self.open_with_progress(&|_: &FetchProgress| {}).await
    }

    /// Loads the record and, for public videos, the content.
    pub async fn open_with_progress(
        &mut self,
        on_progress: &(dyn Fn(&FetchProgress) + Send + Sync),
    ) -> Result<&ViewState> {
        if !matches!(self.state, ViewState::Idle) {
            return Err(PortalError::InvalidInput(format!(
                "cannot open a session in state {}",
                self.state.name()
            )));
        }

        self.transition(ViewState::LoadingMetadata);
        let video = match self.load_metadata().await {
            Ok(video) => video,
            Err(e) => {
                self.fail(e);
                return Ok(&self.state);
            }
        };

        if !video.is_enabled {
            self.fail(PortalError::Authorization("sharing is disabled for this video".to_string()));
            return Ok(&self.state);
        }

        if video.required_password().is_some() {
            self.transition(ViewState::NeedsPassword { video, error: None });
            return Ok(&self.state);
        }

        self.load_content(video, on_progress).await;
        Ok(&self.state)
    }

    pub async fn submit_password(&mut self, candidate: &str) -> Result<&ViewState> {
        self.submit_password_with_progress(candidate, &|_: &FetchProgress| {}).await
    }

    /// Plaintext, case-sensitive comparison. A mismatch keeps the session waiting for another
    /// try and reads nothing from storage.
    pub async fn submit_password_with_progress(
        &mut self,
        candidate: &str,
        on_progress: &(dyn Fn(&FetchProgress) + Send + Sync),
    ) -> Result<&ViewState> {
        let video = match &self.state {
            ViewState::NeedsPassword { video, .. } => video.clone(),
            other => {
                return Err(PortalError::InvalidInput(format!(
                    "no password requested in state {}",
                    other.name()
                )))
            }
        };

        if video.required_password() != Some(candidate) {
            warn!(video_id = %video.id, "wrong access password");
            self.transition(ViewState::NeedsPassword {
                video,
                error: Some("wrong password, please try again".to_string()),
            });
            return Ok(&self.state);
        }

        self.load_content(video, on_progress).await;
        Ok(&self.state)
    }

    /// Downloads and reassembles the video again for saving. Only allowed once playback is
    /// ready and the owner permits downloads.
    pub async fn download(&self) -> Result<Download> {
        let video = match &self.state {
            ViewState::Ready { video, .. } => video,
            other => {
                return Err(PortalError::InvalidInput(format!(
                    "cannot download in state {}",
                    other.name()
                )))
            }
        };

        if !video.downloadable {
            return Err(PortalError::Authorization("downloads are disabled for this video".to_string()));
        }

        let blob = self.fetcher.fetch(video).await?;
        Ok(Download {
            file_name: video.download_file_name(),
            blob,
        })
    }

    /// Playback bytes behind the current handle, if ready.
    pub async fn playback(&self) -> Option<Arc<Blob>> {
        match &self.state {
            ViewState::Ready { url, .. } => self.blobs.resolve(url).await,
            _ => None,
        }
    }

    /// Releases the playback handle and returns to `Idle`.
    pub async fn close(&mut self) {
        if let ViewState::Ready { url, .. } = &self.state {
            self.blobs.revoke(url).await;
        }
        self.transition(ViewState::Idle);
    }

    pub async fn restart(&mut self) -> Result<&ViewState> {
        self.close().await;
        self.open().await
    }

    async fn load_metadata(&self) -> Result<VideoRecord> {
        let id: VideoId = self.video_id.parse()?;
        self.repo
            .select_by_id(&id)
            .await?
            .ok_or_else(|| PortalError::NotFound(format!("video {} does not exist or was deleted", id)))
    }

    async fn load_content(
        &mut self,
        video: VideoRecord,
        on_progress: &(dyn Fn(&FetchProgress) + Send + Sync),
    ) {
        self.transition(ViewState::LoadingContent { video: video.clone() });

        match self.fetcher.fetch_with_progress(&video, on_progress).await {
            Ok(blob) => {
                let url = self.blobs.register(blob).await;
                self.transition(ViewState::Ready { video, url });
            }
            Err(e) => self.fail(e),
        }
    }

    fn fail(&mut self, error: PortalError) {
        warn!(video_id = %self.video_id, error = %error, "view failed");
        self.transition(ViewState::Failed {
            kind: error.kind(),
            message: error.to_string(),
        });
    }

    fn transition(&mut self, next: ViewState) {
        info!(video_id = %self.video_id, from = self.state.name(), to = next.name(), "view state");
        self.state = next;
    }
}
