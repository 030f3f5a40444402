//! Per-file upload errors
//!
//! Every variant is scoped to one file. The orchestrator records it and moves
//! on; none of them ends the run.

use std::path::PathBuf;

use crate::transport::TransportError;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// Local file could not be opened or read
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The request never produced an HTTP response
    #[error("network error: {0}")]
    Network(#[from] TransportError),

    /// Session creation was rejected with 401, also after reauthorization
    #[error("access token rejected (HTTP 401): {reason}")]
    Auth { reason: String },

    /// Any other non-success status from the API
    #[error("API returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    /// A chunk PUT failed; the remaining chunks were not sent
    #[error("chunk {index} (bytes {range}) failed: {reason}")]
    ChunkTransmission {
        index: u64,
        range: String,
        status: Option<u16>,
        reason: String,
    },

    /// Session creation succeeded but the body had no usable `uploadUrl`
    #[error("malformed upload session response: {0}")]
    MalformedResponse(String),
}

impl UploadError {
    /// Short, stable name for logs and reports
    pub fn kind(&self) -> &'static str {
        match self {
            UploadError::Io { .. } => "io",
            UploadError::Network(_) => "network",
            UploadError::Auth { .. } => "auth",
            UploadError::Api { .. } => "api",
            UploadError::ChunkTransmission { .. } => "chunk_transmission",
            UploadError::MalformedResponse(_) => "malformed_response",
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        UploadError::Io {
            path: path.into(),
            source,
        }
    }
}
