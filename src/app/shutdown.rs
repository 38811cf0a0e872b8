use super::{ComponentState, EviveOrchestrator};
use crate::error::{EviveError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info};

const CONSOLE_STOP_TIMEOUT: Duration = Duration::from_secs(2);
const SESSION_STOP_TIMEOUT: Duration = Duration::from_secs(5);

impl EviveOrchestrator {
    /// Stop every started component; returns the process exit code
    pub async fn shutdown(&mut self) -> Result<i32> {
        info!("Beginning graceful shutdown");

        self.cancellation_token.cancel();

        let mut exit_code = 0;

        // Reverse start order
        if let Err(e) = self.stop_console().await {
            error!("Error stopping console: {}", e);
            exit_code = 1;
        }

        if let Err(e) = self.stop_session().await {
            error!("Error stopping session: {}", e);
            exit_code = 1;
        }

        let failed = self.failed_components().await;
        if !failed.is_empty() {
            error!("Components failed during shutdown: {}", failed.join(", "));
        }

        info!("Graceful shutdown completed with exit code: {}", exit_code);
        Ok(exit_code)
    }

    async fn stop_console(&mut self) -> Result<()> {
        let Some(console) = self.console.take() else {
            return Ok(());
        };
        self.stop_component("console", CONSOLE_STOP_TIMEOUT, async move {
            console.stop().await
        })
        .await
    }

    async fn stop_session(&mut self) -> Result<()> {
        self.session = None;
        let Some(task) = self.session_task.take() else {
            return Ok(());
        };
        self.stop_component("session", SESSION_STOP_TIMEOUT, async move {
            task.await
                .map_err(|e| EviveError::component("session", format!("task failed: {}", e)))
        })
        .await
    }

    /// Drive one component's stop future under a timeout and record the outcome
    async fn stop_component<F>(&self, component: &str, limit: Duration, stop: F) -> Result<()>
    where
        F: Future<Output = Result<()>>,
    {
        info!("Stopping {} component", component);
        self.set_component_state(component, ComponentState::Stopping)
            .await;

        match timeout(limit, stop).await {
            Ok(Ok(())) => {
                self.set_component_state(component, ComponentState::Stopped)
                    .await;
                info!("{} component stopped", component);
                Ok(())
            }
            Ok(Err(e)) => {
                self.set_component_state(component, ComponentState::Failed)
                    .await;
                Err(e)
            }
            Err(_) => {
                self.set_component_state(component, ComponentState::Failed)
                    .await;
                Err(EviveError::component(component, "stop timeout"))
            }
        }
    }
}
