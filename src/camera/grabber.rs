use super::frame::StillFrame;
use crate::config::CameraConfig;
use crate::error::CaptureError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, trace};

/// Source of raw still frames; the camera protocol lives behind this trait
#[async_trait]
pub trait FrameGrabber: Send + Sync {
    /// Open the endpoint, let the stream settle for `warmup`, then read one frame
    async fn grab(&self, warmup: Duration) -> Result<StillFrame, CaptureError>;

    /// Human-readable endpoint for logs and error messages
    fn endpoint(&self) -> &str;
}

/// Grabs JPEG snapshots from an IP camera's HTTP endpoint
pub struct HttpSnapshotGrabber {
    client: Client,
    url: String,
}

impl HttpSnapshotGrabber {
    pub fn new(config: &CameraConfig) -> Result<Self, CaptureError> {
        let url = snapshot_url(&config.endpoint, &config.snapshot_path)?;

        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| CaptureError::Unreachable {
                endpoint: url.clone(),
                details: format!("Failed to build HTTP client: {}", e),
            })?;

        info!("Camera snapshot endpoint: {}", url);

        Ok(Self { client, url })
    }

    async fn fetch(&self) -> Result<reqwest::Response, CaptureError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| CaptureError::Unreachable {
                endpoint: self.url.clone(),
                details: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CaptureError::NoFrame {
                endpoint: self.url.clone(),
                details: format!("HTTP {}", status),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl FrameGrabber for HttpSnapshotGrabber {
    async fn grab(&self, warmup: Duration) -> Result<StillFrame, CaptureError> {
        // The first response opens the connection; its frame is usually stale
        let warmup_frame = self.fetch().await?;
        drop(warmup_frame);
        debug!("Camera connection open, warming up for {:?}", warmup);

        tokio::time::sleep(warmup).await;

        let response = self.fetch().await?;
        let body = response.bytes().await.map_err(|e| CaptureError::NoFrame {
            endpoint: self.url.clone(),
            details: format!("Failed to read frame body: {}", e),
        })?;

        if body.is_empty() {
            return Err(CaptureError::NoFrame {
                endpoint: self.url.clone(),
                details: "empty response body".to_string(),
            });
        }

        trace!("Read {} byte frame from {}", body.len(), self.url);
        Ok(StillFrame::new(body.to_vec()))
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}

/// Resolve the configured endpoint into a snapshot URL.
///
/// Full `http://` or `https://` URLs are used as given; a bare host or IP gets
/// the `http` scheme and the snapshot path.
pub fn snapshot_url(endpoint: &str, snapshot_path: &str) -> Result<String, CaptureError> {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() || endpoint.chars().any(char::is_whitespace) {
        return Err(CaptureError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
        });
    }

    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        return Ok(endpoint.to_string());
    }

    if endpoint.contains("://") {
        return Err(CaptureError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
        });
    }

    let path = snapshot_path.trim();
    let host = endpoint.trim_end_matches('/');
    if path.is_empty() {
        Ok(format!("http://{}/", host))
    } else if path.starts_with('/') {
        Ok(format!("http://{}{}", host, path))
    } else {
        Ok(format!("http://{}/{}", host, path))
    }
}
