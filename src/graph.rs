//! Microsoft Graph drive endpoints and payloads

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};

pub const GRAPH_BASE: &str = "https://graph.microsoft.com/v1.0";

/// Characters escaped inside one path segment of a `root:/...:` address
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b':')
    .add(b'\\');

/// Builds the drive URLs for one API base
#[derive(Debug, Clone)]
pub struct DriveEndpoints {
    base: String,
}

impl DriveEndpoints {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    /// `PUT` target for a simple upload
    pub fn content_url(&self, remote_folder: &str, file_name: &str) -> String {
        format!("{}:/content", self.item_address(remote_folder, file_name))
    }

    /// `POST` target that opens an upload session
    pub fn create_session_url(&self, remote_folder: &str, file_name: &str) -> String {
        format!("{}:/createUploadSession", self.item_address(remote_folder, file_name))
    }

    fn item_address(&self, remote_folder: &str, file_name: &str) -> String {
        let mut path = encode_path(remote_folder);
        if !path.is_empty() {
            path.push('/');
        }
        path.push_str(&encode_segment(file_name));
        format!("{}/me/drive/root:/{}", self.base, path)
    }
}

impl Default for DriveEndpoints {
    fn default() -> Self {
        Self::new(GRAPH_BASE)
    }
}

/// Encode a `/`-separated folder path, dropping empty segments
pub fn encode_path(folder: &str) -> String {
    folder
        .split(['/', '\\'])
        .filter(|segment| !segment.is_empty())
        .map(encode_segment)
        .collect::<Vec<_>>()
        .join("/")
}

fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

/// Body of `createUploadSession`
#[derive(Debug, Serialize)]
pub struct CreateSessionRequest {
    pub item: UploadableProperties,
}

#[derive(Debug, Serialize)]
pub struct UploadableProperties {
    #[serde(rename = "@odata.type")]
    pub odata_type: &'static str,
    #[serde(rename = "@microsoft.graph.conflictBehavior")]
    pub conflict_behavior: &'static str,
    pub name: String,
}

impl CreateSessionRequest {
    /// Never overwrite: the service renames on conflict
    pub fn rename_on_conflict(file_name: &str) -> Self {
        Self {
            item: UploadableProperties {
                odata_type: "microsoft.graph.driveItemUploadableProperties",
                conflict_behavior: "rename",
                name: file_name.to_string(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub upload_url: String,
    #[serde(default)]
    pub expiration_date_time: Option<String>,
}
