//! Directory-level driver: walk, classify, dispatch, collect outcomes
//!
//! Files are processed one at a time in walk order. A failed file never stops
//! the run; the only run-level error is failing to enumerate the root.

use anyhow::{Context, Result};
use std::path::Path;
use std::time::{Duration, Instant};

use crate::chunk_plan;
use crate::config::UploadConfig;
use crate::credential::{Credential, Reauthorize};
use crate::error::UploadError;
use crate::fs_enum::{
    build_target, enumerate_directory_filtered, FileFilter, UploadKind, UploadTarget,
};
use crate::graph::DriveEndpoints;
use crate::progress::{EventSink, UploadEvent};
use crate::session::SessionUploadClient;
use crate::simple::SimpleUploadClient;
use crate::transport::Transport;

#[derive(Debug)]
pub struct FileOutcome {
    pub target: UploadTarget,
    pub kind: UploadKind,
    /// Upload duration on success
    pub result: Result<Duration, UploadError>,
}

impl FileOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub outcomes: Vec<FileOutcome>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn uploaded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.uploaded()
    }

    pub fn bytes_uploaded(&self) -> u64 {
        self.outcomes
            .iter()
            .filter(|o| o.is_success())
            .map(|o| o.target.file_size)
            .sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&UploadTarget, &UploadError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (&o.target, e)))
    }
}

/// What a run would do for one file, without touching the network
#[derive(Debug, Clone)]
pub struct PlannedUpload {
    pub target: UploadTarget,
    pub kind: UploadKind,
    /// Chunk PUTs for a session upload, 0 for a simple upload
    pub chunks: u64,
}

pub struct Orchestrator<'a> {
    config: &'a UploadConfig,
    endpoints: DriveEndpoints,
    transport: &'a dyn Transport,
    reauth: &'a dyn Reauthorize,
    events: &'a dyn EventSink,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        config: &'a UploadConfig,
        transport: &'a dyn Transport,
        reauth: &'a dyn Reauthorize,
        events: &'a dyn EventSink,
    ) -> Self {
        Self {
            config,
            endpoints: DriveEndpoints::new(&config.graph_base_url),
            transport,
            reauth,
            events,
        }
    }

    /// Walk `root` and build one target per regular file
    pub fn targets(&self, root: &Path, remote_folder: &str) -> Result<Vec<UploadTarget>> {
        collect_targets(self.config, root, remote_folder)
    }

    pub fn classify(&self, target: &UploadTarget) -> UploadKind {
        UploadKind::classify(target.file_size, self.config.simple_upload_threshold)
    }

    pub fn plan(&self, root: &Path, remote_folder: &str) -> Result<Vec<PlannedUpload>> {
        plan_uploads(self.config, root, remote_folder)
    }

    /// Upload every file under `root` into `remote_folder`
    pub fn run(
        &self,
        root: &Path,
        credential: &Credential,
        remote_folder: &str,
    ) -> Result<RunSummary> {
        let targets = self.targets(root, remote_folder)?;
        self.events.event(&UploadEvent::RunStarted {
            root: root.to_path_buf(),
            remote_folder: remote_folder.trim_matches('/').to_string(),
            files: targets.len(),
            bytes: targets.iter().map(|t| t.file_size).sum(),
        });
        Ok(self.upload_all(targets, credential))
    }

    pub fn upload_all(&self, targets: Vec<UploadTarget>, credential: &Credential) -> RunSummary {
        let start = Instant::now();
        let mut summary = RunSummary::default();

        for target in targets {
            summary.outcomes.push(self.upload_one(target, credential));
        }

        summary.elapsed = start.elapsed();
        self.events.event(&UploadEvent::RunFinished {
            uploaded: summary.uploaded(),
            failed: summary.failed(),
            bytes: summary.bytes_uploaded(),
            elapsed: summary.elapsed,
        });
        summary
    }

    pub fn upload_one(&self, target: UploadTarget, credential: &Credential) -> FileOutcome {
        let kind = self.classify(&target);
        self.events.event(&UploadEvent::FileStarted {
            target: target.clone(),
            kind,
        });

        let result = match kind {
            UploadKind::Simple => {
                let start = Instant::now();
                SimpleUploadClient::new(self.transport, &self.endpoints)
                    .upload(&target, credential)
                    .map(|()| start.elapsed())
            }
            UploadKind::Session => SessionUploadClient::new(
                self.transport,
                &self.endpoints,
                self.config.chunk_size,
                self.reauth,
                self.events,
            )
            .upload(&target, credential)
            .map(|outcome| outcome.elapsed),
        };

        match &result {
            Ok(elapsed) => self.events.event(&UploadEvent::FileCompleted {
                target: target.clone(),
                kind,
                elapsed: *elapsed,
            }),
            Err(e) => self.events.event(&UploadEvent::FileFailed {
                target: target.clone(),
                kind,
                error_kind: e.kind(),
                message: format_error(e),
            }),
        }

        FileOutcome {
            target,
            kind,
            result,
        }
    }
}

pub fn collect_targets(
    config: &UploadConfig,
    root: &Path,
    remote_folder: &str,
) -> Result<Vec<UploadTarget>> {
    let filter = FileFilter {
        exclude_files: config.exclude_files.clone(),
        exclude_dirs: config.exclude_dirs.clone(),
    };
    let entries = enumerate_directory_filtered(root, &filter)
        .with_context(|| format!("Failed to enumerate {}", root.display()))?;
    Ok(entries
        .iter()
        .map(|e| build_target(e, root, remote_folder, config.preserve_tree))
        .collect())
}

/// Classify every file and count its chunks, without any network access
pub fn plan_uploads(
    config: &UploadConfig,
    root: &Path,
    remote_folder: &str,
) -> Result<Vec<PlannedUpload>> {
    Ok(collect_targets(config, root, remote_folder)?
        .into_iter()
        .map(|target| {
            let kind = UploadKind::classify(target.file_size, config.simple_upload_threshold);
            let chunks = match kind {
                UploadKind::Simple => 0,
                UploadKind::Session => {
                    chunk_plan::plan(target.file_size, config.chunk_size).chunk_count()
                }
            };
            PlannedUpload {
                target,
                kind,
                chunks,
            }
        })
        .collect())
}

/// Error text with its source chain, e.g. `failed to read x: permission denied`
fn format_error(e: &UploadError) -> String {
    let mut message = e.to_string();
    let mut source = std::error::Error::source(e);
    while let Some(inner) = source {
        let text = inner.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = inner.source();
    }
    message
}
