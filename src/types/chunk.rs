use serde::{Deserialize, Serialize};
use std::ops::Range;


/// One contiguous byte range of a source file, stored as its own object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartSpan {
    pub index: usize,
    pub range: Range<u64>,
}

impl PartSpan {
    pub fn len(&self) -> u64 {
        self.range.end - self.range.start
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

/// Ordered part keys describing how to rebuild a chunked video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkManifest<'a> {
    pub base_key: &'a str,
    pub chunk_paths: &'a [String],
}

impl<'a> ChunkManifest<'a> {
    pub fn len(&self) -> usize {
        self.chunk_paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunk_paths.is_empty()
    }

    /// Whether the recorded `chunk_count` agrees with the listed parts.
    pub fn count_matches(&self, chunk_count: Option<u32>) -> bool {
        chunk_count == Some(self.chunk_paths.len() as u32)
    }
}
