use super::frame::StillFrame;
use super::grabber::FrameGrabber;
use crate::error::CaptureError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::debug;

/// Scripted outcome for one `grab` call
#[derive(Debug, Clone)]
pub enum MockCapture {
    Frame(Vec<u8>),
    Unreachable,
    NoFrame,
}

/// Frame grabber for running without camera hardware.
///
/// Scripted outcomes are consumed in order; once the script is empty every
/// grab returns a small synthetic JPEG.
pub struct MockFrameGrabber {
    script: Mutex<VecDeque<MockCapture>>,
    grabs: AtomicUsize,
    gate: Option<Arc<Notify>>,
}

impl MockFrameGrabber {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            grabs: AtomicUsize::new(0),
            gate: None,
        }
    }

    pub fn with_script(outcomes: Vec<MockCapture>) -> Self {
        Self {
            script: Mutex::new(outcomes.into()),
            ..Self::new()
        }
    }

    /// Hold every grab until the gate is notified
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn grab_count(&self) -> usize {
        self.grabs.load(Ordering::SeqCst)
    }

    fn next_outcome(&self) -> Option<MockCapture> {
        match self.script.lock() {
            Ok(mut script) => script.pop_front(),
            Err(poisoned) => poisoned.into_inner().pop_front(),
        }
    }
}

impl Default for MockFrameGrabber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FrameGrabber for MockFrameGrabber {
    async fn grab(&self, warmup: Duration) -> Result<StillFrame, CaptureError> {
        let grab_number = self.grabs.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        tokio::time::sleep(warmup).await;

        debug!("Mock grab #{}", grab_number);
        match self.next_outcome() {
            Some(MockCapture::Frame(data)) => Ok(StillFrame::new(data)),
            Some(MockCapture::Unreachable) => Err(CaptureError::Unreachable {
                endpoint: self.endpoint().to_string(),
                details: "connection refused".to_string(),
            }),
            Some(MockCapture::NoFrame) => Err(CaptureError::NoFrame {
                endpoint: self.endpoint().to_string(),
                details: "stream returned no frame".to_string(),
            }),
            None => Ok(StillFrame::new(synthetic_jpeg(grab_number))),
        }
    }

    fn endpoint(&self) -> &str {
        "mock://camera"
    }
}

/// Minimal JPEG-shaped payload that varies with `seed`
pub fn synthetic_jpeg(seed: usize) -> Vec<u8> {
    let mut data = vec![
        0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46, 0x00, 0x01, 0x01, 0x01, 0x00,
        0x48, 0x00, 0x48, 0x00, 0x00,
    ];
    let pattern_size = 256 + seed % 128;
    data.extend(vec![(seed % 256) as u8; pattern_size]);
    data.extend_from_slice(&[0xFF, 0xD9]);
    data
}
