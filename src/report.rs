use anyhow::{Context, Result};
use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::progress::{EventSink, UploadEvent};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    Completed,
    Failed,
}

/// One JSON line per finished file
#[derive(Serialize, Deserialize, Debug)]
pub struct UploadRecord {
    pub timestamp: String,
    pub run_id: Uuid,
    pub source: PathBuf,
    pub remote_path: String,
    pub kind: String,
    pub bytes: u64,
    pub status: UploadStatus,
    pub seconds: Option<f64>,
    pub error_kind: Option<String>,
    pub error: Option<String>,
}

/// JSON Lines report of per-file outcomes
pub struct JsonReport {
    path: PathBuf,
    run_id: Uuid,
    writer: Mutex<BufWriter<File>>,
}

impl JsonReport {
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .context("Failed to open report file")?;
        Ok(Self {
            path: path.to_path_buf(),
            run_id: Uuid::new_v4(),
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn add_record(&self, record: &UploadRecord) -> Result<()> {
        let mut writer = self.writer.lock();
        serde_json::to_writer(&mut *writer, record)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    pub fn read_records(path: &Path) -> Result<Vec<UploadRecord>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(path).context("Failed to open report file for reading")?;
        let reader = BufReader::new(file);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
        Ok(records)
    }

    fn record(&self, event: &UploadEvent) -> Option<UploadRecord> {
        let (target, kind, status, seconds, error_kind, error) = match event {
            UploadEvent::FileCompleted {
                target,
                kind,
                elapsed,
            } => (
                target,
                kind,
                UploadStatus::Completed,
                Some(elapsed.as_secs_f64()),
                None,
                None,
            ),
            UploadEvent::FileFailed {
                target,
                kind,
                error_kind,
                message,
            } => (
                target,
                kind,
                UploadStatus::Failed,
                None,
                Some(error_kind.to_string()),
                Some(message.clone()),
            ),
            _ => return None,
        };
        Some(UploadRecord {
            timestamp: Utc::now().to_rfc3339(),
            run_id: self.run_id,
            source: target.local_path.clone(),
            remote_path: format!("/{}/{}", target.remote_folder, target.file_name)
                .replace("//", "/"),
            kind: kind.as_str().to_string(),
            bytes: target.file_size,
            status,
            seconds,
            error_kind,
            error,
        })
    }
}

impl EventSink for JsonReport {
    fn event(&self, event: &UploadEvent) {
        if let Some(record) = self.record(event) {
            if let Err(e) = self.add_record(&record) {
                eprintln!("Failed to write report {}: {e}", self.path.display());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs_enum::{UploadKind, UploadTarget};
    use std::time::Duration;

    fn target(name: &str, folder: &str) -> UploadTarget {
        UploadTarget {
            local_path: PathBuf::from(format!("/src/{name}")),
            remote_folder: folder.into(),
            file_name: name.into(),
            file_size: 5_000_000,
        }
    }

    #[test]
    fn records_finished_files_only() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("report.jsonl");
        let report = JsonReport::new(&path).unwrap();

        report.event(&UploadEvent::Reauthorized {
            file_name: "a.iso".into(),
        });
        report.event(&UploadEvent::FileCompleted {
            target: target("a.iso", "Backups"),
            kind: UploadKind::Session,
            elapsed: Duration::from_secs(2),
        });
        report.event(&UploadEvent::FileFailed {
            target: target("b.iso", ""),
            kind: UploadKind::Session,
            error_kind: "api",
            message: "API returned HTTP 507: quota".into(),
        });

        let records = JsonReport::read_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].status, UploadStatus::Completed);
        assert_eq!(records[0].remote_path, "/Backups/a.iso");
        assert_eq!(records[0].run_id, report.run_id());
        assert_eq!(records[1].status, UploadStatus::Failed);
        assert_eq!(records[1].remote_path, "/b.iso");
        assert_eq!(records[1].error_kind.as_deref(), Some("api"));
    }

    #[test]
    fn missing_report_reads_empty() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(JsonReport::read_records(&tmp.path().join("none.jsonl"))
            .unwrap()
            .is_empty());
    }
}
