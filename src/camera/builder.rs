use super::grabber::{FrameGrabber, HttpSnapshotGrabber};
use super::source::ImageSource;
use crate::config::CameraConfig;
use crate::error::{EviveError, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Builder for an image source
pub struct ImageSourceBuilder {
    config: Option<CameraConfig>,
    grabber: Option<Arc<dyn FrameGrabber>>,
    frame_path: Option<PathBuf>,
    warmup: Option<Duration>,
}

impl ImageSourceBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            grabber: None,
            frame_path: None,
            warmup: None,
        }
    }

    pub fn config(mut self, config: CameraConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use a specific grabber instead of the HTTP snapshot grabber
    pub fn grabber(mut self, grabber: Arc<dyn FrameGrabber>) -> Self {
        self.grabber = Some(grabber);
        self
    }

    pub fn frame_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.frame_path = Some(path.into());
        self
    }

    pub fn warmup(mut self, warmup: Duration) -> Self {
        self.warmup = Some(warmup);
        self
    }

    pub fn build(self) -> Result<ImageSource> {
        let config = self.config;

        let grabber: Arc<dyn FrameGrabber> = match (self.grabber, &config) {
            (Some(grabber), _) => grabber,
            (None, Some(config)) => Arc::new(HttpSnapshotGrabber::new(config)?),
            (None, None) => {
                return Err(EviveError::system(
                    "Camera configuration or frame grabber must be specified",
                ))
            }
        };

        let frame_path = self
            .frame_path
            .or_else(|| config.as_ref().map(|c| PathBuf::from(&c.frame_path)))
            .ok_or_else(|| EviveError::system("Frame path must be specified"))?;

        let warmup = self
            .warmup
            .or_else(|| config.as_ref().map(|c| c.warmup()))
            .unwrap_or(Duration::ZERO);

        Ok(ImageSource::new(grabber, frame_path, warmup))
    }
}

impl Default for ImageSourceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
