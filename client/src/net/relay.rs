//! Upload relay client: pushes presentations up and pulls document bytes down.

use std::path::Path;
use std::time::Duration;

use tracing::{error, info};

use super::api::parse_body;
use super::types::{ApiError, PPTX_MIME, Presentation, UploadReceipt};

const REQUEST_TIMEOUT_SECS: u64 = 120;
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Fetches raw document bytes by absolute URL.
#[async_trait::async_trait]
pub trait DocumentFetch: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ApiError>;
}

pub struct RelayClient {
    http: reqwest::Client,
    base_url: String,
}

impl RelayClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ApiError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_owned() })
    }

    /// Upload a presentation from disk as multipart field `file`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the request fails, or the
    /// relay answers with a non-success status.
    pub async fn upload(&self, path: &Path) -> Result<UploadReceipt, ApiError> {
        let presentation = Presentation::read(path).await?;
        let part = reqwest::multipart::Part::bytes(presentation.bytes)
            .file_name(presentation.name)
            .mime_str(PPTX_MIME)
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(format!("{}/upload", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let receipt: UploadReceipt = parse_body(status, &text).inspect_err(|e| {
            error!(error = %e, "relay upload failed");
        })?;
        info!(url = %receipt.url, name = %receipt.name, "presentation uploaded");
        Ok(receipt)
    }
}

#[async_trait::async_trait]
impl DocumentFetch for RelayClient {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { status: status.as_u16(), body });
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
