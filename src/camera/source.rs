use super::frame::{ImageHandle, StillFrame};
use super::grabber::FrameGrabber;
use crate::error::CaptureError;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info, warn};

/// Acquires still frames and keeps the latest one at a fixed location
pub struct ImageSource {
    grabber: Arc<dyn FrameGrabber>,
    frame_path: PathBuf,
    warmup: Duration,
    capture_counter: AtomicU64,
}

impl ImageSource {
    pub fn new(grabber: Arc<dyn FrameGrabber>, frame_path: PathBuf, warmup: Duration) -> Self {
        Self {
            grabber,
            frame_path,
            warmup,
            capture_counter: AtomicU64::new(0),
        }
    }

    /// Grab one frame and atomically replace the stored artifact with it
    pub async fn capture(&self) -> Result<ImageHandle, CaptureError> {
        info!("Capturing frame from {}", self.grabber.endpoint());

        let frame = self.grabber.grab(self.warmup).await?;
        if frame.is_empty() {
            return Err(CaptureError::NoFrame {
                endpoint: self.grabber.endpoint().to_string(),
                details: "empty frame".to_string(),
            });
        }

        self.store(&frame).await?;

        let id = self.capture_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let handle = ImageHandle::new(
            id,
            self.frame_path.clone(),
            frame.format,
            frame.len(),
            Utc::now(),
        );

        info!(
            "Captured frame {} ({:?}, {} bytes) -> {}",
            id,
            frame.format,
            frame.len(),
            self.frame_path.display()
        );
        Ok(handle)
    }

    /// Write to a sibling temp file, then rename over the frame path
    async fn store(&self, frame: &StillFrame) -> Result<(), CaptureError> {
        let storage_error = |source: std::io::Error| CaptureError::Storage {
            path: self.frame_path.display().to_string(),
            source,
        };

        if let Some(parent) = self.frame_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await.map_err(storage_error)?;
                debug!("Created frame directory: {}", parent.display());
            }
        }

        let temp_path = temp_sibling(&self.frame_path);
        if let Err(e) = fs::write(&temp_path, frame.data.as_slice()).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(storage_error(e));
        }

        if let Err(e) = fs::rename(&temp_path, &self.frame_path).await {
            warn!("Failed to move frame into place: {}", e);
            let _ = fs::remove_file(&temp_path).await;
            return Err(storage_error(e));
        }

        Ok(())
    }

    pub fn frame_path(&self) -> &Path {
        &self.frame_path
    }

    pub fn endpoint(&self) -> &str {
        self.grabber.endpoint()
    }

    /// Number of successful captures so far
    pub fn capture_count(&self) -> u64 {
        self.capture_counter.load(Ordering::SeqCst)
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "frame".to_string());
    path.with_file_name(format!(".{}.{}.tmp", file_name, std::process::id()))
}
