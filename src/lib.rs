//! driveup library
//!
//! Uploads a local directory tree to OneDrive: small files in one request,
//! large files through a chunked upload session.

pub mod chunk_plan;
pub mod cli;
pub mod config;
pub mod credential;
pub mod error;
pub mod fs_enum;
pub mod graph;
pub mod logger;
pub mod orchestrator;
pub mod progress;
pub mod report;
pub mod session;
pub mod simple;
pub mod transport;

pub use cli::Args;
pub use error::UploadError;
