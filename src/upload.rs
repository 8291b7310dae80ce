//! HTTP upload of encoded clips to the Argus inference service
//!
//! One POST per capture cycle: the whole WAV container as the request
//! body, tagged with the device and student identity headers the server
//! expects. The response status and body are logged and reported back;
//! nothing is parsed, nothing is retried.

use std::time::Duration;

use reqwest::Client;

use crate::config::ClientConfig;

/// Errors that can occur during an upload
#[derive(Debug)]
pub enum UploadError {
    /// Server URL not configured
    MissingServerUrl,
    /// Could not reach the server at all (connection-level failure)
    Unreachable(String),
    /// Transport error after the connection was established
    Network(String),
    /// Server answered with a non-success status
    Server { status: u16, body: String },
}

impl std::fmt::Display for UploadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadError::MissingServerUrl => {
                write!(
                    f,
                    "Server URL not configured. Set ARGUS_SERVER_URL or server_url in config.json."
                )
            }
            UploadError::Unreachable(e) => write!(f, "Server unreachable: {}", e),
            UploadError::Network(e) => write!(f, "Network error: {}", e),
            UploadError::Server { status, body } => {
                write!(f, "Server error ({}): {}", status, body)
            }
        }
    }
}

impl std::error::Error for UploadError {}

/// Response from a successful upload: the inference service's verdict,
/// logged and otherwise untouched.
#[derive(Debug, Clone)]
pub struct UploadResponse {
    pub status: u16,
    pub body: String,
}

/// Clip uploader bound to one server endpoint and device identity.
///
/// Holds one HTTP client for reuse across cycles (avoids TLS handshake
/// overhead on periodic uploads).
#[derive(Debug)]
pub struct Uploader {
    client: Client,
    server_url: String,
    device_id: String,
    student_id: String,
}

impl Uploader {
    pub fn new(config: &ClientConfig) -> Result<Self, UploadError> {
        if config.server_url.is_empty() {
            return Err(UploadError::MissingServerUrl);
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.upload_timeout_secs))
            .build()
            .map_err(|e| UploadError::Network(e.to_string()))?;
        Ok(Self {
            client,
            server_url: config.server_url.clone(),
            device_id: config.device_id.clone(),
            student_id: config.student_id.clone(),
        })
    }

    /// Upload one encoded clip and return the service's response.
    ///
    /// The payload is borrowed for the duration of the call and owned by
    /// the caller, which drops it whether or not the upload succeeds.
    pub async fn send(&self, clip: &[u8]) -> Result<UploadResponse, UploadError> {
        log::info!("Uploading clip ({} bytes) to {}", clip.len(), self.server_url);

        let response = self
            .client
            .post(&self.server_url)
            .header("Content-Type", "audio/wav")
            .header("Device-ID", self.device_id.as_str())
            .header("Student-ID", self.student_id.as_str())
            .body(clip.to_vec())
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    UploadError::Unreachable(e.to_string())
                } else {
                    UploadError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status.is_success() {
            log::info!("Server response ({}): {}", status.as_u16(), body);
            Ok(UploadResponse {
                status: status.as_u16(),
                body,
            })
        } else {
            log::error!("Server error ({}): {}", status.as_u16(), body);
            Err(UploadError::Server {
                status: status.as_u16(),
                body,
            })
        }
    }
}
