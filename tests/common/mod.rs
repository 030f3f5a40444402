#![allow(dead_code)]

use driveup::config::UploadConfig;
use driveup::fs_enum::UploadTarget;
use driveup::progress::UploadEvent;
use driveup::transport::{Body, HttpRequest, HttpResponse, Method, Transport, TransportError};
use parking_lot::Mutex;
use std::io::{Read, Write};
use std::num::NonZeroU64;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const BASE: &str = "https://graph.test/v1.0";

/// A request as the mock saw it, body fully read
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub url: String,
    pub bearer: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub json: Option<serde_json::Value>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_create_session(&self) -> bool {
        self.method == Method::Post && self.url.ends_with(":/createUploadSession")
    }

    pub fn is_simple_upload(&self) -> bool {
        self.method == Method::Put && self.url.ends_with(":/content")
    }

    pub fn is_chunk(&self) -> bool {
        self.method == Method::Put && self.url.starts_with("https://upload.test/")
    }

    /// Start byte from `Content-Range: bytes S-E/T`
    pub fn range_start(&self) -> Option<u64> {
        let value = self.header("Content-Range")?.strip_prefix("bytes ")?;
        value.split('-').next()?.parse().ok()
    }

    /// Request identity used to compare runs
    pub fn signature(&self) -> String {
        format!(
            "{:?} {} {}",
            self.method,
            self.url,
            self.header("Content-Range").unwrap_or("-")
        )
    }
}

type Handler = dyn Fn(&RecordedRequest) -> Result<HttpResponse, TransportError> + Send + Sync;

/// Scripted transport: a handler decides each response, every request is kept
pub struct MockTransport {
    handler: Box<Handler>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockTransport {
    pub fn new(
        handler: impl Fn(&RecordedRequest) -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Behaves like a healthy drive: sessions open, every PUT succeeds
    pub fn healthy() -> Self {
        Self::new(healthy_response)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    pub fn creates(&self) -> Vec<RecordedRequest> {
        self.requests().into_iter().filter(|r| r.is_create_session()).collect()
    }

    pub fn chunks(&self) -> Vec<RecordedRequest> {
        self.requests().into_iter().filter(|r| r.is_chunk()).collect()
    }

    pub fn simple_uploads(&self) -> Vec<RecordedRequest> {
        self.requests().into_iter().filter(|r| r.is_simple_upload()).collect()
    }

    pub fn clear(&self) {
        self.requests.lock().clear();
    }
}

impl Transport for MockTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let (body, json) = match request.body {
            Body::Empty => (Vec::new(), None),
            Body::Json(value) => (serde_json::to_vec(&value).unwrap(), Some(value)),
            Body::Bytes(bytes) => (bytes, None),
            Body::File { mut file, .. } => {
                let mut buf = Vec::new();
                file.read_to_end(&mut buf)
                    .map_err(|e| TransportError(e.to_string()))?;
                (buf, None)
            }
        };
        let recorded = RecordedRequest {
            method: request.method,
            url: request.url,
            bearer: request.bearer,
            headers: request.headers,
            body,
            json,
        };
        self.requests.lock().push(recorded.clone());
        (self.handler)(&recorded)
    }
}

/// Default responses of a drive that accepts everything
pub fn healthy_response(req: &RecordedRequest) -> Result<HttpResponse, TransportError> {
    if req.is_create_session() {
        let name = req.json.as_ref().and_then(|j| j["item"]["name"].as_str()).unwrap_or("x");
        Ok(session_created(name))
    } else if req.is_chunk() {
        Ok(HttpResponse::new(202, r#"{"nextExpectedRanges":[]}"#))
    } else {
        Ok(HttpResponse::new(201, r#"{"id":"item"}"#))
    }
}

pub fn session_created(name: &str) -> HttpResponse {
    HttpResponse::new(
        200,
        format!(
            r#"{{"uploadUrl":"https://upload.test/session/{name}","expirationDateTime":"2030-01-01T00:00:00Z"}}"#
        ),
    )
}

/// Collects every event for later assertions
#[derive(Default, Clone)]
pub struct EventLog {
    events: Arc<Mutex<Vec<UploadEvent>>>,
}

impl EventLog {
    pub fn sink(&self) -> impl Fn(&UploadEvent) + Send + Sync + 'static {
        let events = self.events.clone();
        move |e: &UploadEvent| events.lock().push(e.clone())
    }

    pub fn events(&self) -> Vec<UploadEvent> {
        self.events.lock().clone()
    }
}

pub fn config(chunk_size: u64, threshold: u64) -> UploadConfig {
    UploadConfig {
        graph_base_url: BASE.to_string(),
        chunk_size: NonZeroU64::new(chunk_size).unwrap(),
        simple_upload_threshold: threshold,
        ..UploadConfig::default()
    }
}

/// Write a file whose byte at offset `i` is `i % 251`
pub fn write_patterned(path: &Path, size: usize) -> PathBuf {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let data: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
    let mut f = std::fs::File::create(path).unwrap();
    f.write_all(&data).unwrap();
    path.to_path_buf()
}

/// Zero-filled sparse file, cheap even at several megabytes
pub fn write_sparse(path: &Path, size: u64) -> PathBuf {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::File::create(path).unwrap().set_len(size).unwrap();
    path.to_path_buf()
}

pub fn target_for(path: &Path, remote_folder: &str) -> UploadTarget {
    UploadTarget {
        local_path: path.to_path_buf(),
        remote_folder: remote_folder.to_string(),
        file_name: path.file_name().unwrap().to_string_lossy().into_owned(),
        file_size: std::fs::metadata(path).unwrap().len(),
    }
}
