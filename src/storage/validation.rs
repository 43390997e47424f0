use std::sync::Arc;
use tracing::{info, warn};

use super::ObjectStore;
use crate::{Result, VideoRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingPart {
    pub index: usize,
    pub key: String,
}

/// What the store actually holds for a record's manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestReport {
    pub title: String,
    pub is_chunked: bool,
    pub chunk_count: Option<u32>,
    pub listed_paths: usize,
    pub found: usize,
    pub missing: Vec<MissingPart>,
}

impl ManifestReport {
    /// `chunk_paths.len()` agrees with `chunk_count` (trivially true for single files).
    pub fn count_consistent(&self) -> bool {
        !self.is_chunked || self.chunk_count == Some(self.listed_paths as u32)
    }

    pub fn is_healthy(&self) -> bool {
        self.missing.is_empty() && self.count_consistent()
    }
}

pub struct ManifestValidator {
    store: Arc<dyn ObjectStore>,
}

impl ManifestValidator {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    pub async fn validate(&self, video: &VideoRecord) -> Result<ManifestReport> {
        let keys = video.storage_keys();
        let mut missing = Vec::new();

        for (index, key) in keys.iter().enumerate() {
            let listed = self.store.list(key).await?;
            if !listed.iter().any(|k| k == key) {
                warn!(video_id = %video.id, index, key = %key, "stored object missing");
                missing.push(MissingPart {
                    index,
                    key: key.clone(),
                });
            }
        }

        let listed_paths = if video.is_chunked {
            video.chunk_paths.as_ref().map_or(0, Vec::len)
        } else {
            0
        };

        let report = ManifestReport {
            title: video.title.clone(),
            is_chunked: video.is_chunked,
            chunk_count: video.chunk_count,
            listed_paths,
            found: keys.len() - missing.len(),
            missing,
        };

        info!(
            video_id = %video.id,
            found = report.found,
            missing = report.missing.len(),
            consistent = report.count_consistent(),
            "checked manifest"
        );
        Ok(report)
    }
}
