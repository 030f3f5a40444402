//! Chunked upload through a resumable upload session
//!
//! Lifecycle of one file:
//! 1. create the session (`POST ...:/createUploadSession`); a 401 asks the
//!    reauthorizer for a new token and retries creation once
//! 2. PUT every planned byte range to the session URL, in order
//! 3. stop at the first failed chunk; the remote session is left to expire
//!
//! Nothing is kept between runs: a rerun opens a new session and starts
//! again from byte 0.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::num::NonZeroU64;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::chunk_plan::{self, ChunkRange};
use crate::credential::{Credential, Reauthorize};
use crate::error::UploadError;
use crate::fs_enum::UploadTarget;
use crate::graph::{CreateSessionRequest, CreateSessionResponse, DriveEndpoints};
use crate::progress::{EventSink, UploadEvent};
use crate::transport::{Body, HttpRequest, HttpResponse, Method, Transport};

/// A server-side upload context, valid for one file's transfer
#[derive(Debug, Clone)]
pub struct UploadSession {
    pub upload_url: String,
    pub target: UploadTarget,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SessionOutcome {
    /// Time spent sending chunks, excluding session creation
    pub elapsed: Duration,
    pub chunks: u64,
    pub bytes: u64,
    pub reauthorized: bool,
}

pub struct SessionUploadClient<'a> {
    transport: &'a dyn Transport,
    endpoints: &'a DriveEndpoints,
    chunk_size: NonZeroU64,
    reauth: &'a dyn Reauthorize,
    events: &'a dyn EventSink,
}

impl<'a> SessionUploadClient<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        endpoints: &'a DriveEndpoints,
        chunk_size: NonZeroU64,
        reauth: &'a dyn Reauthorize,
        events: &'a dyn EventSink,
    ) -> Self {
        Self {
            transport,
            endpoints,
            chunk_size,
            reauth,
            events,
        }
    }

    pub fn upload(
        &self,
        target: &UploadTarget,
        credential: &Credential,
    ) -> Result<SessionOutcome, UploadError> {
        if target.file_size == 0 {
            return Err(UploadError::io(
                &target.local_path,
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "an upload session needs at least one byte",
                ),
            ));
        }

        let (session, reauthorized) = self.create_session(target, credential)?;
        let mut outcome = self.send_chunks(&session)?;
        outcome.reauthorized = reauthorized;
        Ok(outcome)
    }

    /// Open a session; returns whether the token had to be replaced
    pub fn create_session(
        &self,
        target: &UploadTarget,
        credential: &Credential,
    ) -> Result<(UploadSession, bool), UploadError> {
        let mut response = self.request_session(target, credential)?;
        let mut reauthorized = false;

        if response.status == 401 {
            let token = self.reauth.new_token().map_err(|e| UploadError::Auth {
                reason: format!("reauthorization failed: {e:#}"),
            })?;
            credential.replace(token);
            reauthorized = true;
            self.events.event(&UploadEvent::Reauthorized {
                file_name: target.file_name.clone(),
            });

            response = self.request_session(target, credential)?;
            if response.status == 401 {
                return Err(UploadError::Auth {
                    reason: format!("replacement token rejected: {}", response.body),
                });
            }
        }

        if !response.is_success() {
            return Err(UploadError::Api {
                status: response.status,
                body: response.body,
            });
        }

        let parsed: CreateSessionResponse = serde_json::from_str(&response.body)
            .map_err(|e| UploadError::MalformedResponse(e.to_string()))?;
        if parsed.upload_url.is_empty() {
            return Err(UploadError::MalformedResponse("empty uploadUrl".to_string()));
        }

        let session = UploadSession {
            upload_url: parsed.upload_url,
            target: target.clone(),
            created_at: Utc::now(),
            expires_at: parsed.expiration_date_time,
        };
        Ok((session, reauthorized))
    }

    fn request_session(
        &self,
        target: &UploadTarget,
        credential: &Credential,
    ) -> Result<HttpResponse, UploadError> {
        let url = self
            .endpoints
            .create_session_url(&target.remote_folder, &target.file_name);
        let payload =
            serde_json::to_value(CreateSessionRequest::rename_on_conflict(&target.file_name))
                .map_err(|e| UploadError::MalformedResponse(e.to_string()))?;
        let request = HttpRequest::new(Method::Post, url)
            .bearer(credential.bearer_token())
            .body(Body::Json(payload));
        Ok(self.transport.send(request)?)
    }

    /// Send every planned range in order, stopping at the first failure
    pub fn send_chunks(&self, session: &UploadSession) -> Result<SessionOutcome, UploadError> {
        let target = &session.target;
        let plan = chunk_plan::plan(target.file_size, self.chunk_size);
        let chunks = plan.chunk_count();
        self.events.event(&UploadEvent::SessionCreated {
            file_name: target.file_name.clone(),
            chunks,
        });

        let start = Instant::now();
        let mut file =
            File::open(&target.local_path).map_err(|e| UploadError::io(&target.local_path, e))?;
        let mut bytes_sent = 0u64;

        for range in plan {
            let data = read_range(&mut file, &range)
                .map_err(|e| chunk_error(&range, None, format!("read failed: {e}")))?;
            self.put_chunk(session, &range, data)?;

            bytes_sent += range.len();
            self.events.event(&UploadEvent::ChunkSent {
                file_name: target.file_name.clone(),
                index: range.index,
                chunks,
                bytes_sent,
                file_size: target.file_size,
            });
        }

        Ok(SessionOutcome {
            elapsed: start.elapsed(),
            chunks,
            bytes: bytes_sent,
            reauthorized: false,
        })
    }

    fn put_chunk(
        &self,
        session: &UploadSession,
        range: &ChunkRange,
        data: Vec<u8>,
    ) -> Result<(), UploadError> {
        // The session URL carries its own authorization; no bearer header
        let request = HttpRequest::new(Method::Put, session.upload_url.as_str())
            .header("Content-Length", range.len().to_string())
            .header("Content-Range", range.content_range(session.target.file_size))
            .body(Body::Bytes(data));

        let response = self
            .transport
            .send(request)
            .map_err(|e| chunk_error(range, None, e.to_string()))?;
        if response.is_success() {
            Ok(())
        } else {
            Err(chunk_error(range, Some(response.status), response.body))
        }
    }
}

fn read_range(file: &mut File, range: &ChunkRange) -> std::io::Result<Vec<u8>> {
    let mut data = vec![0u8; range.len() as usize];
    file.seek(SeekFrom::Start(range.start))?;
    file.read_exact(&mut data)?;
    Ok(data)
}

fn chunk_error(range: &ChunkRange, status: Option<u16>, reason: String) -> UploadError {
    UploadError::ChunkTransmission {
        index: range.index,
        range: range.to_string(),
        status,
        reason,
    }
}
