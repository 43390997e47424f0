use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ChunkManifest;
use crate::{PortalError, Result};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct VideoId(pub Uuid);

impl VideoId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for VideoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for VideoId {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s.trim())
            .map(VideoId)
            .map_err(|_| PortalError::NotFound(format!("no video with id {:?}", s)))
    }
}

/// A stored video as the repository persists it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: VideoId,
    pub owner_id: String,
    pub title: String,
    pub file_path: String,
    pub is_chunked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_paths: Option<Vec<String>>,
    pub file_size: u64,
    #[serde(default)]
    pub access_password: Option<String>,
    pub is_enabled: bool,
    #[serde(default = "default_downloadable")]
    pub downloadable: bool,
    pub created_at: DateTime<Utc>,
}

fn default_downloadable() -> bool {
    true
}

impl VideoRecord {
    pub fn from_new(id: VideoId, created_at: DateTime<Utc>, video: NewVideo) -> Self {
        Self {
            id,
            owner_id: video.owner_id,
            title: video.title,
            file_path: video.file_path,
            is_chunked: video.is_chunked,
            chunk_count: video.chunk_count,
            chunk_paths: video.chunk_paths,
            file_size: video.file_size,
            access_password: None,
            is_enabled: true,
            downloadable: video.downloadable,
            created_at,
        }
    }

    /// The part manifest, if the record describes a chunked upload with at least one part.
    pub fn manifest(&self) -> Option<ChunkManifest<'_>> {
        match self.chunk_paths.as_deref() {
            Some(paths) if self.is_chunked && !paths.is_empty() => Some(ChunkManifest {
                base_key: &self.file_path,
                chunk_paths: paths,
            }),
            _ => None,
        }
    }

    /// An empty password counts as no password.
    pub fn required_password(&self) -> Option<&str> {
        self.access_password.as_deref().filter(|p| !p.is_empty())
    }

    /// Every storage key this record references.
    pub fn storage_keys(&self) -> Vec<String> {
        match &self.chunk_paths {
            Some(paths) if self.is_chunked && !paths.is_empty() => paths.clone(),
            _ => vec![self.file_path.clone()],
        }
    }

    /// `{title}.mp4` reduced to a single path component. Separators and control characters
    /// become `_` and leading dots are dropped; a title with nothing left falls back to the id.
    pub fn download_file_name(&self) -> String {
        let cleaned: String = self
            .title
            .chars()
            .map(|c| if matches!(c, '/' | '\\') || c.is_control() { '_' } else { c })
            .collect();
        let stem = cleaned.trim().trim_start_matches('.').trim();
        if stem.is_empty() || stem.chars().all(|c| c == '_' || c == '.') {
            format!("{}.mp4", self.id)
        } else {
            format!("{}.mp4", stem)
        }
    }
}

/// Fields the uploader hands to the repository on insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewVideo {
    pub owner_id: String,
    pub title: String,
    pub file_path: String,
    pub is_chunked: bool,
    pub chunk_count: Option<u32>,
    pub chunk_paths: Option<Vec<String>>,
    pub file_size: u64,
    pub downloadable: bool,
}

/// Partial update of the user-editable fields. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoSettings {
    pub title: Option<String>,
    /// `Some(None)` or `Some(Some(""))` clears the password.
    pub access_password: Option<Option<String>>,
    pub is_enabled: Option<bool>,
    pub downloadable: Option<bool>,
}

impl VideoSettings {
    pub fn validate(&self) -> Result<()> {
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(PortalError::InvalidInput("title cannot be blank".to_string()));
            }
        }
        Ok(())
    }

    pub fn apply(&self, record: &mut VideoRecord) {
        if let Some(title) = &self.title {
            record.title = title.trim().to_string();
        }
        if let Some(password) = &self.access_password {
            record.access_password = password.clone().filter(|p| !p.is_empty());
        }
        if let Some(enabled) = self.is_enabled {
            record.is_enabled = enabled;
        }
        if let Some(downloadable) = self.downloadable {
            record.downloadable = downloadable;
        }
    }
}
