//! Storage key generation and validation.
//!
//! Keys look like `{timestamp_ms}-{suffix}{.ext}`; chunk parts append `.part{index}`.
//! Only the extension is taken from the user's file name, and only when it is short ASCII
//! alphanumeric text.

use chrono::Utc;
use uuid::Uuid;

use crate::{PortalError, Result};

const SUFFIX_LEN: usize = 6;
const MAX_EXTENSION_LEN: usize = 10;

/// Generates a fresh base key for an upload of `file_name`.
pub fn generate_base_key(file_name: &str) -> String {
    let timestamp = Utc::now().timestamp_millis();
    let suffix = Uuid::new_v4().simple().to_string();
    let extension = sanitized_extension(file_name)
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default();

    format!("{}-{}{}", timestamp, &suffix[..SUFFIX_LEN], extension)
}

/// The last extension of `file_name`, lowercased, if it is safe to embed in a key.
pub fn sanitized_extension(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    if ext.is_empty() || ext.len() > MAX_EXTENSION_LEN || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Display title for an upload: the file name minus its last extension.
pub fn title_from_file_name(file_name: &str) -> String {
    let name = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => stem.to_string(),
        _ => name.to_string(),
    }
}

/// Rejects keys that could escape a backend's namespace.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(PortalError::InvalidInput("storage key is empty".to_string()));
    }
    if key.starts_with('.') || key.contains("..") {
        return Err(PortalError::InvalidInput(format!("storage key {:?} is not allowed", key)));
    }
    if !key.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')) {
        return Err(PortalError::InvalidInput(format!(
            "storage key {:?} contains invalid characters",
            key
        )));
    }
    Ok(())
}
