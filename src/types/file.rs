use serde::{Deserialize, Serialize};

/// Content type used when the caller gives none and sniffing finds nothing video-like.
pub const DEFAULT_VIDEO_MIME: &str = "video/mp4";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VideoType {
    Mp4,
    Mkv,
    Avi,
    Webm,
    QuickTime,
    Other(String),
}

impl VideoType {
    pub fn mime_type(&self) -> &str {
        match self {
            VideoType::Mp4 => "video/mp4",
            VideoType::Mkv => "video/x-matroska",
            VideoType::Avi => "video/x-msvideo",
            VideoType::Webm => "video/webm",
            VideoType::QuickTime => "video/quicktime",
            VideoType::Other(mime) => mime,
        }
    }
}

pub struct MediaTypeDetector;

impl MediaTypeDetector {
    /// Sniffs the leading bytes of a file. Only video signatures are reported.
    pub fn detect(data: &[u8]) -> Option<VideoType> {
        let kind = infer::get(data)?;
        match kind.mime_type() {
            "video/mp4" => Some(VideoType::Mp4),
            "video/x-matroska" => Some(VideoType::Mkv),
            "video/x-msvideo" => Some(VideoType::Avi),
            "video/webm" => Some(VideoType::Webm),
            "video/quicktime" => Some(VideoType::QuickTime),
            mime if mime.starts_with("video/") => Some(VideoType::Other(mime.to_string())),
            _ => None,
        }
    }

    /// Picks the content type for an upload: the declared one if present, else a sniffed
    /// video type, else [`DEFAULT_VIDEO_MIME`].
    pub fn resolve(declared: Option<&str>, head: &[u8]) -> String {
        match declared.map(str::trim).filter(|mime| !mime.is_empty()) {
            Some(mime) => mime.to_string(),
            None => Self::detect(head)
                .map(|video| video.mime_type().to_string())
                .unwrap_or_else(|| DEFAULT_VIDEO_MIME.to_string()),
        }
    }
}
