//! Upload configuration: built-in defaults, optional TOML file, CLI overrides

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU64;
use std::path::Path;
use std::time::Duration;

use crate::graph::GRAPH_BASE;

/// Below this size a file goes through a single-request upload. Kept under
/// the API's 4 MiB ceiling for non-chunked uploads.
pub const SIMPLE_UPLOAD_THRESHOLD: u64 = 4_100_000;

/// Upload sessions want chunk sizes in multiples of 320 KiB
pub const CHUNK_ALIGNMENT: u64 = 320 * 1024;

/// Largest byte range one chunk PUT may carry
pub const MAX_CHUNK_SIZE: u64 = 60 * 1024 * 1024;

/// 60 MiB (192 x 320 KiB). Lower it if memory is tight: one chunk is
/// buffered in memory while it is sent.
pub const DEFAULT_CHUNK_SIZE: u64 = MAX_CHUNK_SIZE;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub graph_base_url: String,
    pub chunk_size: NonZeroU64,
    pub simple_upload_threshold: u64,
    /// `None` lets a request block indefinitely
    pub request_timeout_secs: Option<u64>,
    /// Mirror local sub-directories under the remote folder
    pub preserve_tree: bool,
    pub exclude_files: Vec<String>,
    pub exclude_dirs: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            graph_base_url: GRAPH_BASE.to_string(),
            chunk_size: NonZeroU64::new(DEFAULT_CHUNK_SIZE).unwrap_or(NonZeroU64::MIN),
            simple_upload_threshold: SIMPLE_UPLOAD_THRESHOLD,
            request_timeout_secs: None,
            preserve_tree: false,
            exclude_files: Vec::new(),
            exclude_dirs: Vec::new(),
        }
    }
}

impl UploadConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml(&data).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_toml(data: &str) -> Result<Self> {
        let config: UploadConfig = toml::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.graph_base_url.trim().is_empty() {
            anyhow::bail!("graph_base_url must not be empty");
        }
        if self.simple_upload_threshold == 0 {
            anyhow::bail!("simple_upload_threshold must be greater than zero");
        }
        if usize::try_from(self.chunk_size.get()).is_err() {
            anyhow::bail!("chunk_size {} does not fit in memory", self.chunk_size);
        }
        Ok(())
    }

    /// Advisory message when the chunk size breaks the session constraints
    pub fn chunk_size_warning(&self) -> Option<String> {
        let size = self.chunk_size.get();
        if size > MAX_CHUNK_SIZE {
            Some(format!(
                "chunk size {size} exceeds the {MAX_CHUNK_SIZE}-byte per-request limit"
            ))
        } else if size % CHUNK_ALIGNMENT != 0 {
            Some(format!(
                "chunk size {size} is not a multiple of 320 KiB ({CHUNK_ALIGNMENT} bytes)"
            ))
        } else {
            None
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
