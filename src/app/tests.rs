use super::*;
use crate::analysis::mock::SAMPLE_REPLY;
use crate::analysis::{parse, MockInference, MockReply};
use crate::camera::{ImageSourceBuilder, MockCapture, MockFrameGrabber};
use crate::config::{EviveConfig, API_KEY_ENV};
use crate::error::{EviveError, InferenceError};
use crate::events::EviveEvent;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

fn create_test_orchestrator(
    dir: &tempfile::TempDir,
    grabber: MockFrameGrabber,
    inference: MockInference,
) -> EviveOrchestrator {
    let mut config = EviveConfig::default();
    config.camera.frame_path = dir.path().join("frame.jpg").display().to_string();

    let image_source = ImageSourceBuilder::new()
        .grabber(Arc::new(grabber))
        .frame_path(&config.camera.frame_path)
        .build()
        .unwrap();

    EviveOrchestrator::with_components(config, Arc::new(image_source), Arc::new(inference))
}

#[tokio::test]
async fn test_orchestrator_from_config() {
    let mut config = EviveConfig::default();
    config.inference.api_key = "test-key".to_string();

    let orchestrator = EviveOrchestrator::new(config).await.unwrap();
    assert!(orchestrator.session().is_none());
    assert!(orchestrator.get_all_component_states().await.is_empty());
}

#[tokio::test]
async fn test_orchestrator_without_api_key() {
    if std::env::var(API_KEY_ENV).is_ok() {
        println!("{} is set - skipping missing key test", API_KEY_ENV);
        return;
    }

    let mut config = EviveConfig::default();
    config.inference.api_key = String::new();

    match EviveOrchestrator::new(config).await {
        Err(EviveError::Inference(InferenceError::MissingApiKey)) => {}
        Err(e) => panic!("Unexpected orchestrator error: {}", e),
        Ok(_) => panic!("Expected a missing API key error"),
    }
}

#[tokio::test]
async fn test_initialize_registers_components() {
    let dir = tempfile::tempdir().unwrap();
    let mut orchestrator =
        create_test_orchestrator(&dir, MockFrameGrabber::new(), MockInference::new());

    orchestrator.initialize().await.unwrap();
    let states = orchestrator.get_all_component_states().await;
    assert_eq!(states.len(), 1);
    assert_eq!(states.get("session"), Some(&ComponentState::Stopped));

    orchestrator.set_console_enabled(true);
    orchestrator.initialize().await.unwrap();
    assert_eq!(
        orchestrator.get_component_state("console").await,
        Some(ComponentState::Stopped)
    );
}

#[tokio::test]
async fn test_cycle_and_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let mut orchestrator =
        create_test_orchestrator(&dir, MockFrameGrabber::new(), MockInference::new());

    orchestrator.initialize().await.unwrap();
    orchestrator.start().await.unwrap();
    assert_eq!(
        orchestrator.get_component_state("session").await,
        Some(ComponentState::Running)
    );

    let result = orchestrator.run_cycle().await.unwrap();
    assert_eq!(result, parse(SAMPLE_REPLY).unwrap());
    assert!(dir.path().join("frame.jpg").exists());

    let exit_code = orchestrator.shutdown().await.unwrap();
    assert_eq!(exit_code, 0);
    assert_eq!(
        orchestrator.get_component_state("session").await,
        Some(ComponentState::Stopped)
    );
    assert!(orchestrator.session().is_none());
}

#[tokio::test]
async fn test_cycle_reports_capture_failure() {
    let dir = tempfile::tempdir().unwrap();
    let mut orchestrator = create_test_orchestrator(
        &dir,
        MockFrameGrabber::with_script(vec![MockCapture::Unreachable]),
        MockInference::new(),
    );
    orchestrator.start().await.unwrap();

    let error = orchestrator.run_cycle().await.unwrap_err();
    assert!(error.to_string().contains("capture failed"));

    orchestrator.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_cycle_reports_parse_failure() {
    let dir = tempfile::tempdir().unwrap();
    let mut orchestrator = create_test_orchestrator(
        &dir,
        MockFrameGrabber::new(),
        MockInference::with_script(vec![MockReply::Text("not json".to_string())]),
    );
    orchestrator.start().await.unwrap();

    let error = orchestrator.run_cycle().await.unwrap_err();
    assert!(error.to_string().contains("parse failed"));

    orchestrator.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_cycle_requires_start() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator =
        create_test_orchestrator(&dir, MockFrameGrabber::new(), MockInference::new());
    assert!(orchestrator.run_cycle().await.is_err());
}

#[tokio::test]
async fn test_run_stops_on_quit_request() {
    let dir = tempfile::tempdir().unwrap();
    let mut orchestrator =
        create_test_orchestrator(&dir, MockFrameGrabber::new(), MockInference::new());
    orchestrator.initialize().await.unwrap();
    orchestrator.start().await.unwrap();

    let event_bus = orchestrator.event_bus();
    tokio::spawn(async move {
        loop {
            let sent = event_bus.publish(EviveEvent::ShutdownRequested {
                timestamp: SystemTime::now(),
                reason: "test".to_string(),
            });
            if sent.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    });

    let exit_code = tokio::time::timeout(Duration::from_secs(5), orchestrator.run())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(exit_code, 0);
}

#[tokio::test]
async fn test_run_fails_when_session_stops() {
    let dir = tempfile::tempdir().unwrap();
    let mut orchestrator =
        create_test_orchestrator(&dir, MockFrameGrabber::new(), MockInference::new());
    orchestrator.initialize().await.unwrap();
    orchestrator.start().await.unwrap();

    // Killing the controller drops its state sender out from under the station
    orchestrator.session_task.as_ref().unwrap().abort();

    let exit_code = tokio::time::timeout(Duration::from_secs(5), orchestrator.run())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(exit_code, 1);
    assert_eq!(
        orchestrator.get_component_state("session").await,
        Some(ComponentState::Failed)
    );
    assert_eq!(orchestrator.failed_components().await, vec!["session".to_string()]);
}

#[tokio::test]
async fn test_component_state_transitions() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator =
        create_test_orchestrator(&dir, MockFrameGrabber::new(), MockInference::new());
    let component = "test_component";

    assert_eq!(orchestrator.get_component_state(component).await, None);

    for state in [
        ComponentState::Starting,
        ComponentState::Running,
        ComponentState::Stopping,
        ComponentState::Stopped,
    ] {
        orchestrator
            .set_component_state(component, state.clone())
            .await;
        assert_eq!(
            orchestrator.get_component_state(component).await,
            Some(state)
        );
    }
    assert!(orchestrator.failed_components().await.is_empty());

    orchestrator
        .set_component_state("console", ComponentState::Failed)
        .await;
    orchestrator
        .set_component_state("camera", ComponentState::Failed)
        .await;
    assert_eq!(
        orchestrator.failed_components().await,
        vec!["camera".to_string(), "console".to_string()]
    );
}

#[tokio::test]
async fn test_concurrent_component_state_access() {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = Arc::new(create_test_orchestrator(
        &dir,
        MockFrameGrabber::new(),
        MockInference::new(),
    ));

    let mut handles = Vec::new();
    for i in 0..10 {
        let orchestrator_clone = Arc::clone(&orchestrator);
        handles.push(tokio::spawn(async move {
            let component_name = format!("component_{}", i);
            orchestrator_clone
                .set_component_state(&component_name, ComponentState::Running)
                .await;
            orchestrator_clone
                .get_component_state(&component_name)
                .await
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap(), Some(ComponentState::Running));
    }
    assert_eq!(orchestrator.get_all_component_states().await.len(), 10);
}
