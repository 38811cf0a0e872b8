use super::*;
use crate::config::CameraConfig;
use crate::error::CaptureError;
use std::sync::Arc;
use std::time::Duration;

fn create_test_camera_config() -> CameraConfig {
    CameraConfig {
        endpoint: "192.168.4.10".to_string(),
        snapshot_path: "/shot.jpg".to_string(),
        warmup_ms: 0,
        request_timeout_seconds: 2,
        frame_path: "evive_image.jpg".to_string(),
    }
}

fn mock_source(grabber: Arc<MockFrameGrabber>, dir: &tempfile::TempDir) -> ImageSource {
    ImageSourceBuilder::new()
        .grabber(grabber)
        .frame_path(dir.path().join("frame.jpg"))
        .warmup(Duration::ZERO)
        .build()
        .unwrap()
}

#[test]
fn test_snapshot_url_for_bare_host() {
    assert_eq!(
        snapshot_url("10.46.122.136", "/shot.jpg").unwrap(),
        "http://10.46.122.136/shot.jpg"
    );
    assert_eq!(
        snapshot_url("cam.local:8080/", "snapshot").unwrap(),
        "http://cam.local:8080/snapshot"
    );
    assert_eq!(snapshot_url("cam.local", "").unwrap(), "http://cam.local/");
}

#[test]
fn test_snapshot_url_keeps_full_urls() {
    assert_eq!(
        snapshot_url("https://cam.local/video?snap=1", "/ignored").unwrap(),
        "https://cam.local/video?snap=1"
    );
}

#[test]
fn test_snapshot_url_rejects_bad_endpoints() {
    assert!(matches!(
        snapshot_url("", "/shot.jpg"),
        Err(CaptureError::InvalidEndpoint { .. })
    ));
    assert!(matches!(
        snapshot_url("rtsp://cam.local/stream", "/shot.jpg"),
        Err(CaptureError::InvalidEndpoint { .. })
    ));
    assert!(snapshot_url("cam local", "/shot.jpg").is_err());
}

#[test]
fn test_image_format_detection() {
    assert_eq!(ImageFormat::detect(&mock::synthetic_jpeg(1)), ImageFormat::Jpeg);
    assert_eq!(
        ImageFormat::detect(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00]),
        ImageFormat::Png
    );
    assert_eq!(ImageFormat::detect(b"GIF89a"), ImageFormat::Unknown);
    assert_eq!(ImageFormat::Unknown.mime_type(), "image/jpeg");
    assert_eq!(ImageFormat::Png.mime_type(), "image/png");
}

#[test]
fn test_builder_validation() {
    let result = ImageSourceBuilder::new().build();
    match result {
        Err(crate::error::EviveError::System { message }) => {
            assert!(message.contains("frame grabber must be specified"));
        }
        _ => panic!("Expected system error for missing configuration"),
    }
}

#[test]
fn test_builder_from_config() {
    let source = ImageSourceBuilder::new()
        .config(create_test_camera_config())
        .build()
        .unwrap();
    assert_eq!(source.endpoint(), "http://192.168.4.10/shot.jpg");
    assert_eq!(source.frame_path(), std::path::Path::new("evive_image.jpg"));
}

#[tokio::test]
async fn test_capture_stores_frame() {
    let dir = tempfile::tempdir().unwrap();
    let frame = mock::synthetic_jpeg(7);
    let grabber = Arc::new(MockFrameGrabber::with_script(vec![MockCapture::Frame(
        frame.clone(),
    )]));
    let source = mock_source(Arc::clone(&grabber), &dir);

    let handle = source.capture().await.unwrap();

    assert_eq!(handle.id(), 1);
    assert_eq!(handle.format(), ImageFormat::Jpeg);
    assert_eq!(handle.size_bytes(), frame.len());
    assert_eq!(std::fs::read(handle.path()).unwrap(), frame);
    assert_eq!(grabber.grab_count(), 1);
}

#[tokio::test]
async fn test_capture_overwrites_previous_frame() {
    let dir = tempfile::tempdir().unwrap();
    let grabber = Arc::new(MockFrameGrabber::with_script(vec![
        MockCapture::Frame(vec![0xFF, 0xD8, 0xFF, 1, 1, 1, 1]),
        MockCapture::Frame(vec![0xFF, 0xD8, 0xFF, 2]),
    ]));
    let source = mock_source(grabber, &dir);

    let first = source.capture().await.unwrap();
    let second = source.capture().await.unwrap();

    assert!(second.id() > first.id());
    assert_ne!(first, second);
    assert_eq!(first.path(), second.path());
    assert_eq!(std::fs::read(second.path()).unwrap(), vec![0xFF, 0xD8, 0xFF, 2]);

    // Only the frame itself remains; no temp files left behind
    let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(source.capture_count(), 2);
}

#[tokio::test]
async fn test_capture_failure_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let grabber = Arc::new(MockFrameGrabber::with_script(vec![
        MockCapture::Unreachable,
        MockCapture::NoFrame,
    ]));
    let source = mock_source(grabber, &dir);

    assert!(matches!(
        source.capture().await,
        Err(CaptureError::Unreachable { .. })
    ));
    assert!(matches!(
        source.capture().await,
        Err(CaptureError::NoFrame { .. })
    ));
    assert!(!dir.path().join("frame.jpg").exists());
    assert_eq!(source.capture_count(), 0);
}

#[tokio::test]
async fn test_empty_frame_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let grabber = Arc::new(MockFrameGrabber::with_script(vec![MockCapture::Frame(
        Vec::new(),
    )]));
    let source = mock_source(grabber, &dir);

    assert!(matches!(
        source.capture().await,
        Err(CaptureError::NoFrame { .. })
    ));
}

#[tokio::test]
async fn test_capture_creates_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let source = ImageSourceBuilder::new()
        .grabber(Arc::new(MockFrameGrabber::new()))
        .frame_path(dir.path().join("nested").join("frame.jpg"))
        .build()
        .unwrap();

    let handle = source.capture().await.unwrap();
    assert!(handle.path().exists());
}
