mod json;
mod memory;

pub use json::JsonVideoRepository;
pub use memory::MemoryVideoRepository;

use async_trait::async_trait;

use crate::{NewVideo, Result, VideoId, VideoRecord, VideoSettings};

/// The relational store holding video records.
///
/// Failures surface as `Persistence`; a missing row on `update`/`delete` is `NotFound`.
#[async_trait]
pub trait VideoRepository: Send + Sync {
    async fn insert(&self, video: NewVideo) -> Result<VideoRecord>;
    async fn update(&self, id: &VideoId, settings: &VideoSettings) -> Result<VideoRecord>;
    async fn select_by_id(&self, id: &VideoId) -> Result<Option<VideoRecord>>;
    async fn delete(&self, id: &VideoId) -> Result<()>;
    /// Newest first.
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<VideoRecord>>;
}
