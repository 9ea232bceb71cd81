//! Wire types shared by the chat API and relay clients.

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

/// Content type sent with presentation uploads.
pub const PPTX_MIME: &str = "application/vnd.openxmlformats-officedocument.presentationml.presentation";

/// Presentation extensions accepted by the client before any upload.
pub const ACCEPTED_EXTENSIONS: [&str; 2] = ["ppt", "pptx"];

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by chat API and relay calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[error("request failed: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("server returned status {status}")]
    Status { status: u16, body: String },

    /// The response body could not be decoded.
    #[error("response decode failed: {0}")]
    Decode(String),

    /// A local file could not be read for upload.
    #[error("file read failed: {0}")]
    Io(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

// =============================================================================
// CHATS
// =============================================================================

/// A chat record. List responses omit `messages`; they decode as empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub messages: Vec<Message>,
}

/// A server-confirmed chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub message: String,
    #[serde(default)]
    pub created_at: String,
    /// Attachment reference, usually a relay retrieval URL.
    #[serde(default)]
    pub path: Option<String>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

// =============================================================================
// UPLOADS
// =============================================================================

/// Relay response to `POST /upload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub url: String,
    pub name: String,
}

/// A presentation file picked by the user, held in memory for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presentation {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Presentation {
    #[must_use]
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { name: name.into(), bytes }
    }

    /// Read a presentation from disk, naming it after the file.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Io` if the file cannot be read.
    pub async fn read(path: &Path) -> Result<Self, ApiError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ApiError::Io(format!("{}: {e}", path.display())))?;
        Ok(Self::new(file_name_of(path), bytes))
    }

    /// True when the file name ends in `.ppt` or `.pptx` (case-insensitive).
    #[must_use]
    pub fn has_accepted_extension(&self) -> bool {
        has_accepted_extension(&self.name)
    }
}

#[must_use]
pub fn has_accepted_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ACCEPTED_EXTENSIONS.iter().any(|a| a.eq_ignore_ascii_case(ext)))
}

/// Final component of `path` as a display name.
#[must_use]
pub fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
