mod video;
mod chunk;
mod file;

pub use chunk::{ChunkManifest, PartSpan};
pub use file::{MediaTypeDetector, VideoType, DEFAULT_VIDEO_MIME};
pub use video::{NewVideo, VideoId, VideoRecord, VideoSettings};
