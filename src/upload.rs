//! Upload pipeline: one local source becomes either a single stored object or a chunk
//! manifest, plus exactly one video record.
//!
//! Nothing is left behind on failure. If a part upload or the record insert fails, every object
//! written by this attempt is removed before the error is returned.

use async_trait::async_trait;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, SeekFrom};
use tracing::{debug, error, info};

use crate::chunk::{part_key, ChunkPolicy};
use crate::db::VideoRepository;
use crate::storage::keys::{generate_base_key, title_from_file_name};
use crate::storage::progress::{ProgressStats, TransferSession};
use crate::storage::{ObjectStore, PutOptions};
use crate::{MediaTypeDetector, NewVideo, PortalError, Result, VideoRecord};

const SNIFF_LEN: u64 = 8192;

/// Random-access bytes with a known length.
#[async_trait]
pub trait ByteSource: Send + Sync {
    fn len(&self) -> u64;

    async fn read_range(&self, range: Range<u64>) -> Result<Vec<u8>>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ByteSource for Vec<u8> {
    fn len(&self) -> u64 {
        self.as_slice().len() as u64
    }

    async fn read_range(&self, range: Range<u64>) -> Result<Vec<u8>> {
        let slice = self
            .get(range.start as usize..range.end as usize)
            .ok_or_else(|| PortalError::InvalidInput(format!("range {:?} is out of bounds", range)))?;
        Ok(slice.to_vec())
    }
}

/// A file on local disk, read part by part.
pub struct FileSource {
    path: PathBuf,
    len: u64,
}

impl FileSource {
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_owned();
        let metadata = tokio::fs::metadata(&path).await?;
        if !metadata.is_file() {
            return Err(PortalError::InvalidInput(format!("{} is not a file", path.display())));
        }
        Ok(Self {
            path,
            len: metadata.len(),
        })
    }
}

#[async_trait]
impl ByteSource for FileSource {
    fn len(&self) -> u64 {
        self.len
    }

    async fn read_range(&self, range: Range<u64>) -> Result<Vec<u8>> {
        let mut file = File::open(&self.path).await?;
        file.seek(SeekFrom::Start(range.start)).await?;
        let mut buffer = vec![0u8; (range.end - range.start) as usize];
        file.read_exact(&mut buffer).await?;
        Ok(buffer)
    }
}

/// The file being uploaded.
pub struct UploadFile {
    pub name: String,
    pub content_type: Option<String>,
    pub source: Box<dyn ByteSource>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, source: impl ByteSource + 'static) -> Self {
        Self {
            name: name.into(),
            content_type: None,
            source: Box::new(source),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Who uploads and how the record starts out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub owner_id: String,
    pub downloadable: bool,
    /// Overrides the title derived from the file name.
    pub title: Option<String>,
}

impl UploadRequest {
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            downloadable: true,
            title: None,
        }
    }
}

pub struct ChunkedUploader {
    store: Arc<dyn ObjectStore>,
    repo: Arc<dyn VideoRepository>,
    policy: ChunkPolicy,
}

impl ChunkedUploader {
    pub fn new(store: Arc<dyn ObjectStore>, repo: Arc<dyn VideoRepository>, policy: ChunkPolicy) -> Self {
        Self { store, repo, policy }
    }

    pub fn policy(&self) -> ChunkPolicy {
        self.policy
    }

    pub async fn upload(&self, file: UploadFile, request: UploadRequest) -> Result<VideoRecord> {
        self.upload_with_progress(file, request, &|_: &ProgressStats| {}).await
    }

    pub async fn upload_with_progress(
        &self,
        file: UploadFile,
        request: UploadRequest,
        on_progress: &(dyn Fn(&ProgressStats) + Send + Sync),
    ) -> Result<VideoRecord> {
        let total_size = file.source.len();
        if total_size == 0 {
            return Err(PortalError::InvalidInput(format!("{} is empty", file.name)));
        }

        let head = file.source.read_range(0..total_size.min(SNIFF_LEN)).await?;
        let content_type = MediaTypeDetector::resolve(file.content_type.as_deref(), &head);
        let base_key = generate_base_key(&file.name);
        let title = request
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| title_from_file_name(&file.name));

        let draft = Draft {
            owner_id: request.owner_id,
            title,
            base_key,
            content_type,
            total_size,
            downloadable: request.downloadable,
        };

        if self.policy.is_chunked(total_size) {
            info!(
                file = %file.name,
                size_bytes = total_size,
                parts = self.policy.total_parts(total_size),
                "starting chunked upload"
            );
            self.upload_chunked(file.source.as_ref(), draft, on_progress).await
        } else {
            info!(file = %file.name, size_bytes = total_size, "starting single-shot upload");
            self.upload_single(file.source.as_ref(), draft, on_progress).await
        }
    }

    async fn upload_single(
        &self,
        source: &dyn ByteSource,
        draft: Draft,
        on_progress: &(dyn Fn(&ProgressStats) + Send + Sync),
    ) -> Result<VideoRecord> {
        let mut session = TransferSession::start(draft.total_size);
        let data = source.read_range(0..draft.total_size).await?;
        let options = PutOptions::new(draft.content_type.as_str());

        if let Err(e) = self.store.upload(&draft.base_key, &data, &options).await {
            error!(key = %draft.base_key, error = %e, "upload failed, removing object");
            self.cleanup(std::slice::from_ref(&draft.base_key)).await;
            return Err(e);
        }
        on_progress(&session.record(draft.total_size));

        let new_video = NewVideo {
            owner_id: draft.owner_id,
            title: draft.title,
            file_path: draft.base_key.clone(),
            is_chunked: false,
            chunk_count: None,
            chunk_paths: None,
            file_size: draft.total_size,
            downloadable: draft.downloadable,
        };

        self.insert_or_rollback(new_video, vec![draft.base_key]).await
    }

    async fn upload_chunked(
        &self,
        source: &dyn ByteSource,
        draft: Draft,
        on_progress: &(dyn Fn(&ProgressStats) + Send + Sync),
    ) -> Result<VideoRecord> {
        let parts = self.policy.plan(draft.total_size);
        let total_parts = parts.len();
        let options = PutOptions::new(draft.content_type.as_str());
        let mut session = TransferSession::start(draft.total_size);
        let mut chunk_paths = Vec::with_capacity(total_parts);

        for part in parts {
            let key = part_key(&draft.base_key, part.index);
            let written = match source.read_range(part.range.clone()).await {
                Ok(data) => self.store.upload(&key, &data, &options).await,
                Err(e) => Err(e),
            };

            if let Err(e) = written {
                error!(
                    key = %key,
                    part = part.index + 1,
                    total_parts,
                    error = %e,
                    "part upload failed, removing uploaded parts"
                );
                // The failed write may have left a truncated object behind.
                chunk_paths.push(key);
                self.cleanup(&chunk_paths).await;
                return Err(PortalError::StorageWrite(format!(
                    "part {}/{} failed: {}",
                    part.index + 1,
                    total_parts,
                    e
                )));
            }

            chunk_paths.push(key);
            let stats = session.record(part.len());
            debug!(
                part = part.index + 1,
                total_parts,
                bytes = stats.bytes_transferred,
                "uploaded part"
            );
            on_progress(&stats);
        }

        let new_video = NewVideo {
            owner_id: draft.owner_id,
            title: draft.title,
            file_path: draft.base_key,
            is_chunked: true,
            chunk_count: Some(total_parts as u32),
            chunk_paths: Some(chunk_paths.clone()),
            file_size: draft.total_size,
            downloadable: draft.downloadable,
        };

        self.insert_or_rollback(new_video, chunk_paths).await
    }

    async fn insert_or_rollback(&self, video: NewVideo, uploaded: Vec<String>) -> Result<VideoRecord> {
        match self.repo.insert(video).await {
            Ok(record) => {
                info!(video_id = %record.id, objects = uploaded.len(), "upload complete");
                Ok(record)
            }
            Err(e) => {
                error!(error = %e, "saving video record failed, removing uploaded objects");
                self.cleanup(&uploaded).await;
                Err(e)
            }
        }
    }

    async fn cleanup(&self, keys: &[String]) {
        if keys.is_empty() {
            return;
        }
        if let Err(e) = self.store.remove(keys).await {
            error!(error = %e, objects = keys.len(), "cleanup of uploaded objects failed");
        }
    }
}

/// Everything decided about an upload before the first byte is sent.
struct Draft {
    owner_id: String,
    title: String,
    base_key: String,
    content_type: String,
    total_size: u64,
    downloadable: bool,
}
