use super::state::SessionState;
use crate::error::{EviveError, Result};
use tokio::sync::{mpsc, oneshot, watch};

/// Commands the presentation layer can issue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    Capture,
    Analyze,
    /// Return a displayed result's frame to `Ready` for re-analysis
    Reset,
}

impl SessionCommand {
    pub fn name(&self) -> &'static str {
        match self {
            SessionCommand::Capture => "capture",
            SessionCommand::Analyze => "analyze",
            SessionCommand::Reset => "reset",
        }
    }
}

/// Whether the controller acted on a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Accepted,
    Rejected { state: &'static str },
}

impl CommandOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, CommandOutcome::Accepted)
    }
}

/// A command plus an optional reply slot
pub struct SessionRequest {
    pub command: SessionCommand,
    pub reply: Option<oneshot::Sender<CommandOutcome>>,
}

/// Cloneable front door to a running controller
#[derive(Clone)]
pub struct SessionHandle {
    requests: mpsc::Sender<SessionRequest>,
    state: watch::Receiver<SessionState>,
}

impl SessionHandle {
    pub(crate) fn new(
        requests: mpsc::Sender<SessionRequest>,
        state: watch::Receiver<SessionState>,
    ) -> Self {
        Self { requests, state }
    }

    /// Send a command and wait for the controller's verdict
    pub async fn send(&self, command: SessionCommand) -> Result<CommandOutcome> {
        let (reply, outcome) = oneshot::channel();
        self.requests
            .send(SessionRequest {
                command,
                reply: Some(reply),
            })
            .await
            .map_err(|_| EviveError::system("Session controller is not running"))?;

        outcome
            .await
            .map_err(|_| EviveError::system("Session controller dropped the command"))
    }

    /// Queue a command without waiting; used from blocking input threads
    pub fn try_send(&self, command: SessionCommand) -> Result<()> {
        self.requests
            .try_send(SessionRequest {
                command,
                reply: None,
            })
            .map_err(|e| EviveError::component("session", format!("Command not queued: {}", e)))
    }

    pub async fn capture(&self) -> Result<CommandOutcome> {
        self.send(SessionCommand::Capture).await
    }

    pub async fn analyze(&self) -> Result<CommandOutcome> {
        self.send(SessionCommand::Analyze).await
    }

    pub async fn reset(&self) -> Result<CommandOutcome> {
        self.send(SessionCommand::Reset).await
    }

    /// Latest state snapshot
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Wait until the state satisfies `predicate` and return that state
    pub async fn wait_until<F>(&self, mut predicate: F) -> Result<SessionState>
    where
        F: FnMut(&SessionState) -> bool,
    {
        let mut state = self.state.clone();
        loop {
            {
                let current = state.borrow_and_update();
                if predicate(&current) {
                    return Ok(current.clone());
                }
            }
            state
                .changed()
                .await
                .map_err(|_| EviveError::system("Session controller stopped"))?;
        }
    }

    /// Wait for the current capture or analysis to settle
    pub async fn wait_idle(&self) -> Result<SessionState> {
        self.wait_until(|state| !state.is_busy()).await
    }
}
