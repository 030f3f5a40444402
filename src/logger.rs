use anyhow::Result;
use chrono::Utc;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use crate::progress::{minutes, EventSink, UploadEvent};

/// Append-only text log, one timestamped line per event
pub struct TextLogger {
    file: Mutex<File>,
}

impl TextLogger {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let f = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(f),
        })
    }

    fn line(&self, s: &str) {
        if let Ok(mut f) = self.file.lock() {
            let _ = writeln!(f, "[{}] {}", Utc::now().to_rfc3339(), s);
        }
    }
}

impl EventSink for TextLogger {
    fn event(&self, event: &UploadEvent) {
        match event {
            UploadEvent::RunStarted {
                root,
                remote_folder,
                files,
                bytes,
            } => self.line(&format!(
                "START root={} remote=/{} files={} bytes={}",
                root.display(),
                remote_folder,
                files,
                bytes
            )),
            UploadEvent::FileStarted { target, kind } => self.line(&format!(
                "FILE path={} remote=/{}/{} kind={} bytes={}",
                target.local_path.display(),
                target.remote_folder,
                target.file_name,
                kind.as_str(),
                target.file_size
            )),
            UploadEvent::SessionCreated { file_name, chunks } => {
                self.line(&format!("SESSION file={file_name} chunks={chunks}"))
            }
            UploadEvent::ChunkSent {
                file_name,
                index,
                chunks,
                bytes_sent,
                file_size,
            } => self.line(&format!(
                "CHUNK file={} chunk={}/{} sent={}/{}",
                file_name,
                index + 1,
                chunks,
                bytes_sent,
                file_size
            )),
            UploadEvent::Reauthorized { file_name } => {
                self.line(&format!("REAUTH file={file_name}"))
            }
            UploadEvent::FileCompleted {
                target,
                kind,
                elapsed,
            } => self.line(&format!(
                "DONE file={} kind={} bytes={} minutes={:.3}",
                target.file_name,
                kind.as_str(),
                target.file_size,
                minutes(*elapsed)
            )),
            UploadEvent::FileFailed {
                target,
                kind,
                error_kind,
                message,
            } => self.line(&format!(
                "ERROR file={} path={} kind={} error={} msg={}",
                target.file_name,
                target.local_path.display(),
                kind.as_str(),
                error_kind,
                message
            )),
            UploadEvent::RunFinished {
                uploaded,
                failed,
                bytes,
                elapsed,
            } => self.line(&format!(
                "FINISH uploaded={uploaded} failed={failed} bytes={bytes} seconds={:.3}",
                elapsed.as_secs_f64()
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs_enum::{UploadKind, UploadTarget};
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn writes_one_line_per_event() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("logs/run.log");
        let logger = TextLogger::new(&path).unwrap();
        let target = UploadTarget {
            local_path: PathBuf::from("/src/a.bin"),
            remote_folder: "Backups".into(),
            file_name: "a.bin".into(),
            file_size: 10,
        };
        logger.event(&UploadEvent::FileStarted {
            target: target.clone(),
            kind: UploadKind::Simple,
        });
        logger.event(&UploadEvent::FileCompleted {
            target,
            kind: UploadKind::Simple,
            elapsed: Duration::from_secs(3),
        });

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("FILE path=/src/a.bin remote=/Backups/a.bin kind=simple"));
        assert!(lines[1].contains("DONE file=a.bin"));
    }
}
