//! Single-request upload for files under the session threshold

use std::fs::File;

use crate::credential::Credential;
use crate::error::UploadError;
use crate::fs_enum::UploadTarget;
use crate::graph::DriveEndpoints;
use crate::transport::{Body, HttpRequest, Method, Transport};

pub struct SimpleUploadClient<'a> {
    transport: &'a dyn Transport,
    endpoints: &'a DriveEndpoints,
}

impl<'a> SimpleUploadClient<'a> {
    pub fn new(transport: &'a dyn Transport, endpoints: &'a DriveEndpoints) -> Self {
        Self {
            transport,
            endpoints,
        }
    }

    /// Stream the whole file in one authenticated PUT. No retry.
    pub fn upload(&self, target: &UploadTarget, credential: &Credential) -> Result<(), UploadError> {
        let file = File::open(&target.local_path)
            .map_err(|e| UploadError::io(&target.local_path, e))?;

        let url = self
            .endpoints
            .content_url(&target.remote_folder, &target.file_name);
        let request = HttpRequest::new(Method::Put, url)
            .bearer(credential.bearer_token())
            .header("Content-Type", "application/octet-stream")
            .body(Body::File {
                file,
                len: target.file_size,
            });

        let response = self.transport.send(request)?;
        if response.is_success() {
            Ok(())
        } else {
            Err(UploadError::Api {
                status: response.status,
                body: response.body,
            })
        }
    }
}
