use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::Level;

use crate::chunk::ChunkPolicy;
use crate::{PortalError, Result};

pub const DEFAULT_ORIGIN: &str = "http://localhost:5173";
pub const DEFAULT_OWNER: &str = "local";

/// Settings for a local portal. Every field has a default, so a config file only needs the keys
/// it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Root for stored objects and video records.
    pub data_dir: PathBuf,
    /// Prefix of share links.
    pub origin: String,
    pub owner_id: String,
    pub chunking: ChunkPolicy,
    /// One of `error`, `warn`, `info`, `debug`, `trace`.
    pub log_level: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            origin: DEFAULT_ORIGIN.to_string(),
            owner_id: DEFAULT_OWNER.to_string(),
            chunking: ChunkPolicy::default(),
            log_level: "warn".to_string(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("video-portal")
}

impl PortalConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| PortalError::Config(format!("reading {}: {}", path.display(), e)))?;
        let config: PortalConfig = serde_json::from_str(&content)
            .map_err(|e| PortalError::Config(format!("parsing {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;
        self.level()?;
        if self.owner_id.trim().is_empty() {
            return Err(PortalError::Config("owner_id cannot be empty".to_string()));
        }
        Ok(())
    }

    pub fn level(&self) -> Result<Level> {
        self.log_level
            .parse()
            .map_err(|_| PortalError::Config(format!("unknown log level {:?}", self.log_level)))
    }
}
