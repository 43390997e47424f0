use serde::{Deserialize, Serialize};

use crate::{PartSpan, PortalError, Result};

pub const MIB: u64 = 1024 * 1024;
pub const DEFAULT_PART_SIZE: u64 = 5 * MIB;
pub const DEFAULT_CHUNK_THRESHOLD: u64 = 40 * MIB;

/// Decides between single-shot and chunked uploads and sizes the parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkPolicy {
    /// Sources at or below this many bytes go up in one request.
    pub threshold: u64,
    pub part_size: u64,
}

impl Default for ChunkPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_CHUNK_THRESHOLD,
            part_size: DEFAULT_PART_SIZE,
        }
    }
}

impl ChunkPolicy {
    pub fn new(threshold: u64, part_size: u64) -> Result<Self> {
        let policy = Self { threshold, part_size };
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<()> {
        if self.part_size == 0 {
            return Err(PortalError::Config("part_size must be greater than zero".to_string()));
        }
        Ok(())
    }

    pub fn is_chunked(&self, total_size: u64) -> bool {
        total_size > self.threshold
    }

    pub fn total_parts(&self, total_size: u64) -> usize {
        total_size.div_ceil(self.part_size) as usize
    }

    /// Splits `[0, total_size)` into consecutive spans of `part_size` bytes; the last span may
    /// be shorter.
    pub fn plan(&self, total_size: u64) -> Vec<PartSpan> {
        let mut parts = Vec::with_capacity(self.total_parts(total_size));
        let mut position = 0;

        while position < total_size {
            let end = (position + self.part_size).min(total_size);
            parts.push(PartSpan {
                index: parts.len(),
                range: position..end,
            });
            position = end;
        }

        parts
    }
}

/// Storage key of part `index` under `base_key`.
pub fn part_key(base_key: &str, index: usize) -> String {
    format!("{}.part{}", base_key, index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_inclusive_for_single_shot() {
        let policy = ChunkPolicy::default();
        assert!(!policy.is_chunked(40 * MIB));
        assert!(policy.is_chunked(40 * MIB + 1));
    }

    #[test]
    fn plan_covers_range_with_short_tail() {
        let policy = ChunkPolicy::new(0, 4).unwrap();
        let parts = policy.plan(10);
        let ranges: Vec<_> = parts.iter().map(|p| p.range.clone()).collect();
        assert_eq!(ranges, vec![0..4, 4..8, 8..10]);
        assert_eq!(parts.last().unwrap().index, 2);
    }

    #[test]
    fn empty_source_has_no_parts() {
        assert!(ChunkPolicy::default().plan(0).is_empty());
        assert_eq!(ChunkPolicy::default().total_parts(0), 0);
    }

    #[test]
    fn zero_part_size_is_rejected() {
        assert!(ChunkPolicy::new(10, 0).is_err());
    }

    #[test]
    fn part_keys_are_suffixed_by_index() {
        assert_eq!(part_key("1700000000000-abc123.mp4", 3), "1700000000000-abc123.mp4.part3");
    }
}
