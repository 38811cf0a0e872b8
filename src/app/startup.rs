use super::{ComponentState, EviveOrchestrator};
use crate::error::Result;
use crate::presentation::Console;
use crate::session::SessionController;
use std::sync::Arc;
use tracing::{error, info};

impl EviveOrchestrator {
    /// Register every component as stopped
    pub async fn initialize(&mut self) -> Result<()> {
        info!("Initializing E-Vive station components");

        let mut states = self.component_states.lock().await;
        states.insert("session".to_string(), ComponentState::Stopped);
        if self.console_enabled {
            states.insert("console".to_string(), ComponentState::Stopped);
        }
        drop(states);

        info!("All components initialized successfully");
        Ok(())
    }

    /// Start the session loop, then the console if enabled
    pub async fn start(&mut self) -> Result<()> {
        info!("Starting E-Vive station");

        self.set_component_state("session", ComponentState::Starting)
            .await;
        let controller = SessionController::new(
            Arc::clone(&self.image_source),
            Arc::clone(&self.inference),
            self.settings.clone(),
            Arc::clone(&self.event_bus),
        );
        let (handle, join) = controller.spawn(
            self.config.session.command_buffer,
            self.cancellation_token.child_token(),
        );
        self.session = Some(handle.clone());
        self.session_task = Some(join);
        self.set_component_state("session", ComponentState::Running)
            .await;
        info!("Session controller started");

        if self.console_enabled {
            self.set_component_state("console", ComponentState::Starting)
                .await;

            let console = Console::new(handle, Arc::clone(&self.event_bus));
            if let Err(e) = console.start().await {
                error!("Failed to start console: {}", e);
                self.set_component_state("console", ComponentState::Failed)
                    .await;
                return Err(e);
            }
            self.console = Some(console);

            self.set_component_state("console", ComponentState::Running)
                .await;
        }

        info!("E-Vive station started successfully");
        Ok(())
    }
}
