use super::types::{ComponentState, ShutdownReason};
use crate::analysis::{AnalysisSettings, GeminiClient, InferenceService};
use crate::camera::{ImageSource, ImageSourceBuilder};
use crate::config::EviveConfig;
use crate::error::Result;
use crate::events::EventBus;
use crate::presentation::Console;
use crate::session::SessionHandle;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Main application coordinator that owns the station's components
pub struct EviveOrchestrator {
    pub(super) config: EviveConfig,
    pub(super) event_bus: Arc<EventBus>,
    pub(super) image_source: Arc<ImageSource>,
    pub(super) inference: Arc<dyn InferenceService>,
    pub(super) settings: AnalysisSettings,

    // Started components
    pub(super) session: Option<SessionHandle>,
    pub(super) session_task: Option<JoinHandle<()>>,
    pub(super) console: Option<Console>,
    pub(super) console_enabled: bool,

    // Lifecycle management
    pub(super) component_states: Arc<Mutex<HashMap<String, ComponentState>>>,
    pub(super) shutdown_sender: Option<oneshot::Sender<ShutdownReason>>,
    pub(super) shutdown_receiver: Option<oneshot::Receiver<ShutdownReason>>,
    pub(super) cancellation_token: CancellationToken,
}

impl EviveOrchestrator {
    /// Build the HTTP camera source and the Gemini client from configuration
    pub async fn new(config: EviveConfig) -> Result<Self> {
        let image_source = ImageSourceBuilder::new()
            .config(config.camera.clone())
            .build()?;
        let inference = GeminiClient::new(&config.inference)?;
        info!(
            "Using camera {} and model {}",
            image_source.endpoint(),
            inference.model()
        );

        Ok(Self::with_components(
            config,
            Arc::new(image_source),
            Arc::new(inference),
        ))
    }

    /// Assemble the orchestrator around already-built components
    pub fn with_components(
        config: EviveConfig,
        image_source: Arc<ImageSource>,
        inference: Arc<dyn InferenceService>,
    ) -> Self {
        let event_bus = Arc::new(EventBus::new(config.session.event_bus_capacity));
        let settings = AnalysisSettings::new(config.inference.timeout());
        let (shutdown_sender, shutdown_receiver) = oneshot::channel();

        Self {
            config,
            event_bus,
            image_source,
            inference,
            settings,
            session: None,
            session_task: None,
            console: None,
            console_enabled: false,
            component_states: Arc::new(Mutex::new(HashMap::new())),
            shutdown_sender: Some(shutdown_sender),
            shutdown_receiver: Some(shutdown_receiver),
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Enable or disable the interactive console
    pub fn set_console_enabled(&mut self, enabled: bool) {
        self.console_enabled = enabled;
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.event_bus)
    }

    /// Handle to the running session, available after `start`
    pub fn session(&self) -> Option<SessionHandle> {
        self.session.clone()
    }
}
