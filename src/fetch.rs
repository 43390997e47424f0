//! Rebuilds a playable object from a video record.
//!
//! Single files are downloaded with per-attempt retry. Chunked videos are downloaded part by
//! part; any part failure aborts the attempt and the next attempt starts again from part 0.
//! A chunked record with no listed parts is fetched as a single file. A `chunk_count` that
//! disagrees with the listed parts is logged and otherwise ignored.
//! Nothing is cached: every call downloads everything again.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::storage::retry::{with_retry, RetryConfig};
use crate::storage::{Blob, ObjectStore};
use crate::{PortalError, Result, VideoRecord, DEFAULT_VIDEO_MIME};

/// Loading progress as shown to a viewer.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchProgress {
    pub percent: f32,
    /// 1-based attempt number.
    pub attempt: u32,
    /// `(parts done, parts total)` for chunked videos.
    pub parts: Option<(usize, usize)>,
}

pub struct ChunkedFetcher {
    store: Arc<dyn ObjectStore>,
    single_retry: RetryConfig,
    chunked_retry: RetryConfig,
}

impl ChunkedFetcher {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            single_retry: RetryConfig::single_object(),
            chunked_retry: RetryConfig::chunked_manifest(),
        }
    }

    pub fn with_retry_configs(mut self, single: RetryConfig, chunked: RetryConfig) -> Self {
        self.single_retry = single;
        self.chunked_retry = chunked;
        self
    }

    pub async fn fetch(&self, video: &VideoRecord) -> Result<Blob> {
        self.fetch_with_progress(video, &|_: &FetchProgress| {}).await
    }

    pub async fn fetch_with_progress(
        &self,
        video: &VideoRecord,
        on_progress: &(dyn Fn(&FetchProgress) + Send + Sync),
    ) -> Result<Blob> {
        let blob = match video.manifest() {
            Some(manifest) => {
                if !manifest.count_matches(video.chunk_count) {
                    warn!(
                        video_id = %video.id,
                        chunk_count = ?video.chunk_count,
                        listed_paths = manifest.len(),
                        "chunk count disagrees with manifest, fetching listed parts"
                    );
                }
                self.fetch_parts(manifest.chunk_paths, on_progress).await?
            }
            None => self.fetch_single(&video.file_path, on_progress).await?,
        };

        info!(video_id = %video.id, size_bytes = blob.len(), "video reconstructed");
        Ok(blob)
    }

    async fn fetch_single(
        &self,
        key: &str,
        on_progress: &(dyn Fn(&FetchProgress) + Send + Sync),
    ) -> Result<Blob> {
        let store = self.store.as_ref();
        let (data, attempt) = with_retry(&self.single_retry, |attempt| async move {
            on_progress(&FetchProgress {
                percent: 20.0 + (attempt - 1) as f32 * 20.0,
                attempt,
                parts: None,
            });
            let data = download_non_empty(store, key, "object").await?;
            Ok((data, attempt))
        })
        .await?;

        on_progress(&FetchProgress {
            percent: 80.0,
            attempt,
            parts: None,
        });
        debug!(key, size_bytes = data.len(), "downloaded object");

        let blob = Blob {
            data,
            content_type: DEFAULT_VIDEO_MIME.to_string(),
        };
        on_progress(&FetchProgress {
            percent: 100.0,
            attempt,
            parts: None,
        });
        Ok(blob)
    }

    async fn fetch_parts(
        &self,
        chunk_paths: &[String],
        on_progress: &(dyn Fn(&FetchProgress) + Send + Sync),
    ) -> Result<Blob> {
        let store = self.store.as_ref();
        let total = chunk_paths.len();

        let (parts, attempts) = with_retry(&self.chunked_retry, |attempt| async move {
            let mut parts = Vec::with_capacity(total);
            for (index, key) in chunk_paths.iter().enumerate() {
                let label = format!("part {}/{}", index + 1, total);
                let data = download_non_empty(store, key, &label).await?;
                parts.push(data);

                on_progress(&FetchProgress {
                    percent: (index + 1) as f32 / total as f32 * 90.0,
                    attempt,
                    parts: Some((index + 1, total)),
                });
                debug!(key = %key, part = index + 1, total, "downloaded part");
            }
            Ok((parts, attempt))
        })
        .await?;

        let data = parts.concat();
        on_progress(&FetchProgress {
            percent: 100.0,
            attempt: attempts,
            parts: Some((total, total)),
        });

        Ok(Blob {
            data,
            content_type: DEFAULT_VIDEO_MIME.to_string(),
        })
    }
}

async fn download_non_empty(store: &dyn ObjectStore, key: &str, label: &str) -> Result<Vec<u8>> {
    let data = store.download(key).await.map_err(|e| match e {
        PortalError::StorageRead(msg) => PortalError::StorageRead(format!("{}: {}", label, msg)),
        other => PortalError::StorageRead(format!("{}: {}", label, other)),
    })?;
    if data.is_empty() {
        return Err(PortalError::StorageRead(format!("{} returned no data", label)));
    }
    Ok(data)
}
