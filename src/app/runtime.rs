use super::{EviveOrchestrator, ShutdownReason};
use crate::error::{EviveError, Result};
use crate::events::{EventFilter, EventReceiver, EviveEvent};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::{oneshot, Mutex};
use tracing::{error, info, warn};

type ShutdownSlot = Arc<Mutex<Option<oneshot::Sender<ShutdownReason>>>>;

impl EviveOrchestrator {
    /// Run until a signal or quit request arrives, then shut down
    pub async fn run(&mut self) -> Result<i32> {
        info!("E-Vive station is running");

        let shutdown_sender = self
            .shutdown_sender
            .take()
            .ok_or_else(|| EviveError::system("Shutdown sender already taken"))?;
        let shutdown_receiver = self
            .shutdown_receiver
            .take()
            .ok_or_else(|| EviveError::system("Shutdown receiver already taken"))?;

        let shutdown_slot: ShutdownSlot = Arc::new(Mutex::new(Some(shutdown_sender)));
        self.setup_signal_handlers(Arc::clone(&shutdown_slot));
        self.watch_quit_requests(Arc::clone(&shutdown_slot));
        self.watch_session(shutdown_slot);

        let shutdown_reason = shutdown_receiver
            .await
            .map_err(|_| EviveError::system("Shutdown channel closed unexpectedly"))?;

        info!("Shutdown initiated: {:?}", shutdown_reason);

        let mut exit_code = self.shutdown().await?;
        if let ShutdownReason::Error(_) = shutdown_reason {
            exit_code = 1;
        }

        info!("E-Vive station shutdown complete");
        Ok(exit_code)
    }

    fn setup_signal_handlers(&self, shutdown_slot: ShutdownSlot) {
        // SIGTERM - Unix only
        #[cfg(unix)]
        {
            let slot = Arc::clone(&shutdown_slot);
            tokio::spawn(async move {
                let mut sigterm =
                    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                        Ok(sigterm) => sigterm,
                        Err(e) => {
                            warn!("Failed to register SIGTERM handler: {}", e);
                            return;
                        }
                    };
                if sigterm.recv().await.is_some() {
                    info!("Received SIGTERM signal");
                    request_shutdown(&slot, ShutdownReason::Signal("SIGTERM".to_string())).await;
                }
            });
        }

        let slot = Arc::clone(&shutdown_slot);
        tokio::spawn(async move {
            if let Ok(()) = signal::ctrl_c().await {
                info!("Received SIGINT signal (Ctrl+C)");
                request_shutdown(&slot, ShutdownReason::Signal("SIGINT".to_string())).await;
            }
        });
    }

    /// A session controller that stops on its own takes the station down with it
    fn watch_session(&self, shutdown_slot: ShutdownSlot) {
        let Some(session) = self.session.clone() else {
            return;
        };
        let cancellation_token = self.cancellation_token.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = cancellation_token.cancelled() => {}
                stopped = session.wait_until(|_| false) => {
                    if let Err(e) = stopped {
                        error!("Session ended before shutdown: {}", e);
                        request_shutdown(&shutdown_slot, ShutdownReason::Error(e.to_string())).await;
                    }
                }
            }
        });
    }

    /// Turn `ShutdownRequested` events (console quit key) into a shutdown
    fn watch_quit_requests(&self, shutdown_slot: ShutdownSlot) {
        let mut receiver = EventReceiver::new(
            self.event_bus.subscribe(),
            EventFilter::EventTypes(vec!["shutdown_requested"]),
            "orchestrator".to_string(),
        );
        let cancellation_token = self.cancellation_token.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = cancellation_token.cancelled() => {}
                event = receiver.recv() => {
                    if let Ok(EviveEvent::ShutdownRequested { reason, .. }) = event {
                        info!("Quit requested: {}", reason);
                        request_shutdown(&shutdown_slot, ShutdownReason::UserRequest).await;
                    }
                }
            }
        });
    }
}

async fn request_shutdown(slot: &ShutdownSlot, reason: ShutdownReason) {
    if let Some(sender) = slot.lock().await.take() {
        let _ = sender.send(reason);
    }
}
