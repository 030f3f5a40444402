//! Command-line arguments and how they fold into [`UploadConfig`]

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use std::num::NonZeroU64;
use std::path::{Path, PathBuf};

use crate::config::UploadConfig;

/// Command-line arguments
#[derive(Clone, Debug, Parser)]
#[command(
    author,
    version,
    about = "driveup - upload a directory tree to OneDrive (simple + chunked session uploads)"
)]
pub struct Args {
    /// Local directory to upload
    pub source: PathBuf,

    /// Remote folder under the drive root (default: source directory name)
    #[arg(short = 'r', long)]
    pub remote_folder: Option<String>,

    /// Bearer access token
    #[arg(long, env = "DRIVEUP_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Read the bearer access token from a file
    #[arg(long)]
    pub token_file: Option<PathBuf>,

    /// TOML config file
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Bytes per chunk for session uploads (multiple of 327680 recommended)
    #[arg(long)]
    pub chunk_size: Option<NonZeroU64>,

    /// Files below this many bytes use a single-request upload
    #[arg(long)]
    pub threshold: Option<u64>,

    /// Per-request timeout in seconds (default: none)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Recreate local sub-directories under the remote folder
    #[arg(long)]
    pub preserve_tree: bool,

    /// Exclude files matching patterns
    #[arg(long = "xf", action = ArgAction::Append)]
    pub exclude_files: Vec<String>,

    /// Exclude directories matching patterns
    #[arg(long = "xd", action = ArgAction::Append)]
    pub exclude_dirs: Vec<String>,

    /// List what would be uploaded without sending anything
    #[arg(short = 'l', long, alias = "list-only")]
    pub dry_run: bool,

    /// Fail files on 401 instead of prompting for a new token
    #[arg(long)]
    pub no_prompt: bool,

    /// Append a timestamped text log to this file
    #[arg(long = "log-file")]
    pub log_file: Option<PathBuf>,

    /// Append a JSON Lines record per file to this file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Print every file, not only session uploads
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Defaults, then the config file, then flags
    pub fn upload_config(&self) -> Result<UploadConfig> {
        let mut config = match &self.config {
            Some(path) => UploadConfig::load(path)?,
            None => UploadConfig::default(),
        };
        if let Some(size) = self.chunk_size {
            config.chunk_size = size;
        }
        if let Some(threshold) = self.threshold {
            config.simple_upload_threshold = threshold;
        }
        if let Some(secs) = self.timeout {
            config.request_timeout_secs = Some(secs);
        }
        if self.preserve_tree {
            config.preserve_tree = true;
        }
        config.exclude_files.extend(self.exclude_files.iter().cloned());
        config.exclude_dirs.extend(self.exclude_dirs.iter().cloned());
        config.validate()?;
        Ok(config)
    }

    pub fn remote_folder(&self) -> String {
        match &self.remote_folder {
            Some(folder) => folder.trim_matches('/').to_string(),
            None => default_remote_folder(&self.source),
        }
    }

    /// `--token` / `DRIVEUP_TOKEN`, then `--token-file`
    pub fn resolve_token(&self) -> Result<String> {
        if let Some(token) = &self.token {
            let token = token.trim();
            if !token.is_empty() {
                return Ok(token.to_string());
            }
        }
        if let Some(path) = &self.token_file {
            let data = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read token file {}", path.display()))?;
            let token = data.trim();
            if !token.is_empty() {
                return Ok(token.to_string());
            }
            anyhow::bail!("token file {} is empty", path.display());
        }
        anyhow::bail!("no access token: pass --token, set DRIVEUP_TOKEN, or use --token-file")
    }
}

fn default_remote_folder(source: &Path) -> String {
    let resolved = source.canonicalize().unwrap_or_else(|_| source.to_path_buf());
    resolved
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("driveup").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn flags_override_defaults() {
        let args = parse(&[
            "/data/photos",
            "--chunk-size",
            "655360",
            "--threshold",
            "1000",
            "--xf",
            "*.tmp",
            "--xf",
            "*.bak",
            "--preserve-tree",
        ]);
        let config = args.upload_config().unwrap();
        assert_eq!(config.chunk_size.get(), 655_360);
        assert_eq!(config.simple_upload_threshold, 1000);
        assert!(config.preserve_tree);
        assert_eq!(config.exclude_files, vec!["*.tmp", "*.bak"]);
    }

    #[test]
    fn zero_chunk_size_is_rejected_by_the_parser() {
        let result = Args::try_parse_from(["driveup", "/data", "--chunk-size", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn remote_folder_defaults_to_source_name() {
        assert_eq!(parse(&["/data/photos"]).remote_folder(), "photos");
        assert_eq!(
            parse(&["/data/photos", "-r", "/Backups/2024/"]).remote_folder(),
            "Backups/2024"
        );
    }

    #[test]
    fn token_file_is_trimmed() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("token");
        std::fs::write(&path, "abc123\n").unwrap();
        let mut args = parse(&["/data", "--token-file", path.to_str().unwrap()]);
        args.token = None;
        assert_eq!(args.resolve_token().unwrap(), "abc123");
    }

    #[test]
    fn missing_token_is_an_error() {
        let mut args = parse(&["/data"]);
        args.token = None;
        assert!(args.resolve_token().is_err());
    }
}
