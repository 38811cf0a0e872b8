use super::EviveOrchestrator;
use crate::analysis::AnalysisResult;
use crate::error::{EviveError, Result};
use crate::session::{CommandOutcome, SessionState};
use tracing::info;

impl EviveOrchestrator {
    /// Capture one frame, analyze it and return the result.
    ///
    /// The session must have been started; it is left running so the caller
    /// decides when to shut down.
    pub async fn run_cycle(&self) -> Result<AnalysisResult> {
        let session = self
            .session()
            .ok_or_else(|| EviveError::system("Session is not running"))?;

        info!("Running a single capture and analysis cycle");

        accepted(session.capture().await?, "capture")?;
        let image = match session.wait_idle().await? {
            SessionState::Ready(image) => image,
            other => return Err(failure(other)),
        };
        info!("Captured frame {} at {}", image.id(), image.path().display());

        accepted(session.analyze().await?, "analyze")?;
        match session.wait_idle().await? {
            SessionState::Displaying { result, .. } => Ok(result),
            other => Err(failure(other)),
        }
    }
}

fn accepted(outcome: CommandOutcome, command: &str) -> Result<()> {
    match outcome {
        CommandOutcome::Accepted => Ok(()),
        CommandOutcome::Rejected { state } => Err(EviveError::component(
            "session",
            format!("{} rejected while {}", command, state),
        )),
    }
}

fn failure(state: SessionState) -> EviveError {
    match state.error() {
        Some(error) => EviveError::component("session", error.to_string()),
        None => EviveError::component("session", format!("unexpected state {}", state.name())),
    }
}
