use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Still image encodings recognised from the frame's leading bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    /// Unrecognised payload, submitted as JPEG
    Unknown,
}

impl ImageFormat {
    /// Detect the format from magic bytes
    pub fn detect(data: &[u8]) -> Self {
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            ImageFormat::Jpeg
        } else if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            ImageFormat::Png
        } else {
            ImageFormat::Unknown
        }
    }

    /// MIME type handed to the inference service
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg | ImageFormat::Unknown => "image/jpeg",
        }
    }
}

/// Raw bytes of one captured still
#[derive(Debug, Clone)]
pub struct StillFrame {
    pub data: Arc<Vec<u8>>,
    pub format: ImageFormat,
}

impl StillFrame {
    pub fn new(data: Vec<u8>) -> Self {
        let format = ImageFormat::detect(&data);
        Self {
            data: Arc::new(data),
            format,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Reference to the most recently stored frame.
///
/// Handles compare by `id`; a later capture always carries a larger id, so a
/// handle that differs from the controller's current one is stale.
#[derive(Debug, Clone)]
pub struct ImageHandle {
    id: u64,
    path: PathBuf,
    format: ImageFormat,
    size_bytes: usize,
    captured_at: DateTime<Utc>,
}

impl ImageHandle {
    pub(crate) fn new(
        id: u64,
        path: PathBuf,
        format: ImageFormat,
        size_bytes: usize,
        captured_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            path,
            format,
            size_bytes,
            captured_at,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }
}

impl PartialEq for ImageHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ImageHandle {}
