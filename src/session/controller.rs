use super::command::{CommandOutcome, SessionCommand, SessionHandle, SessionRequest};
use super::state::SessionState;
use crate::analysis::{
    AnalysisOutcome, AnalysisSettings, AnalysisSignal, AnalysisTask, AnalysisTaskHandle,
    InferenceService,
};
use crate::camera::{ImageHandle, ImageSource};
use crate::error::{CaptureError, ErrorDescriptor};
use crate::events::{EventBus, EviveEvent};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Completion signals marshaled back from background work
#[derive(Debug)]
pub enum Completion {
    Capture {
        capture_id: u64,
        outcome: Result<ImageHandle, ErrorDescriptor>,
    },
    Analysis(AnalysisSignal),
}

impl From<AnalysisSignal> for Completion {
    fn from(signal: AnalysisSignal) -> Self {
        Completion::Analysis(signal)
    }
}

/// The operation the controller is currently waiting on
enum InFlight {
    Capture { capture_id: u64 },
    Analysis(AnalysisTaskHandle),
}

/// Counters kept by the controller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub captures_started: u64,
    pub captures_succeeded: u64,
    pub captures_failed: u64,
    pub analyses_started: u64,
    pub analyses_succeeded: u64,
    pub analyses_failed: u64,
    pub commands_rejected: u64,
    pub stale_signals: u64,
}

/// State machine sequencing capture -> analyze -> display.
///
/// All commands and all completion signals are applied on the task that owns
/// the controller; background work only ever reports back through the
/// completion channel.
pub struct SessionController {
    state: SessionState,
    image_source: Arc<ImageSource>,
    inference: Arc<dyn InferenceService>,
    settings: AnalysisSettings,
    event_bus: Arc<EventBus>,
    state_tx: watch::Sender<SessionState>,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: mpsc::UnboundedReceiver<Completion>,
    in_flight: Option<InFlight>,
    next_capture_id: u64,
    stats: SessionStats,
}

enum Step {
    Request(SessionRequest),
    Completion(Completion),
}

impl SessionController {
    pub fn new(
        image_source: Arc<ImageSource>,
        inference: Arc<dyn InferenceService>,
        settings: AnalysisSettings,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Idle);
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();

        Self {
            state: SessionState::Idle,
            image_source,
            inference,
            settings,
            event_bus,
            state_tx,
            completion_tx,
            completion_rx,
            in_flight: None,
            next_capture_id: 0,
            stats: SessionStats::default(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Receiver that always holds the latest state
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    pub fn handle_command(&mut self, command: SessionCommand) -> CommandOutcome {
        match command {
            SessionCommand::Capture => self.capture(),
            SessionCommand::Analyze => self.analyze(),
            SessionCommand::Reset => self.reset(),
        }
    }

    /// Start a new capture cycle. Rejected only while a capture is running;
    /// an outstanding analysis is superseded and its result will be dropped.
    pub fn capture(&mut self) -> CommandOutcome {
        if !self.state.accepts_capture() {
            return self.reject(SessionCommand::Capture);
        }

        if let Some(InFlight::Analysis(task)) = &self.in_flight {
            info!(
                "New capture supersedes analysis task {} (frame {})",
                task.task_id(),
                task.image_id()
            );
        }

        self.next_capture_id += 1;
        let capture_id = self.next_capture_id;
        self.stats.captures_started += 1;
        self.in_flight = Some(InFlight::Capture { capture_id });
        self.transition(SessionState::Capturing);

        let image_source = Arc::clone(&self.image_source);
        let completions = self.completion_tx.clone();
        tokio::spawn(async move {
            let worker = tokio::spawn(async move { image_source.capture().await });
            let outcome = match worker.await {
                Ok(Ok(image)) => Ok(image),
                Ok(Err(error)) => Err(ErrorDescriptor::from(&error)),
                Err(join_error) => Err(ErrorDescriptor::from(&CaptureError::NoFrame {
                    endpoint: "camera".to_string(),
                    details: format!("capture task aborted: {}", join_error),
                })),
            };

            if completions
                .send(Completion::Capture {
                    capture_id,
                    outcome,
                })
                .is_err()
            {
                debug!("Capture {} finished after controller shut down", capture_id);
            }
        });

        CommandOutcome::Accepted
    }

    /// Analyze the current frame. Accepted from `Ready` and from a `Failed`
    /// state that still holds a frame; at most one task is ever in flight.
    pub fn analyze(&mut self) -> CommandOutcome {
        let image = match self.state.image() {
            Some(image) if self.state.accepts_analyze() => image.clone(),
            _ => return self.reject(SessionCommand::Analyze),
        };

        let task = AnalysisTask::start(
            image.clone(),
            Arc::clone(&self.inference),
            self.settings.clone(),
            self.completion_tx.clone(),
        );

        self.stats.analyses_started += 1;
        self.in_flight = Some(InFlight::Analysis(task));
        self.transition(SessionState::Analyzing(image));

        CommandOutcome::Accepted
    }

    /// Move a displayed result's frame back to `Ready`
    pub fn reset(&mut self) -> CommandOutcome {
        match &self.state {
            SessionState::Displaying { image, .. } => {
                let image = image.clone();
                self.transition(SessionState::Ready(image));
                CommandOutcome::Accepted
            }
            _ => self.reject(SessionCommand::Reset),
        }
    }

    /// Apply a completion signal; stale signals leave the state untouched
    pub fn apply(&mut self, completion: Completion) {
        match completion {
            Completion::Capture {
                capture_id,
                outcome,
            } => self.apply_capture(capture_id, outcome),
            Completion::Analysis(signal) => self.apply_analysis(signal),
        }
    }

    fn apply_capture(&mut self, capture_id: u64, outcome: Result<ImageHandle, ErrorDescriptor>) {
        let current = matches!(
            self.in_flight,
            Some(InFlight::Capture { capture_id: id }) if id == capture_id
        );
        if !current {
            let image_id = outcome.as_ref().map(|image| image.id()).unwrap_or(0);
            self.discard_stale("capture", image_id);
            return;
        }

        self.in_flight = None;
        match outcome {
            Ok(image) => {
                self.stats.captures_succeeded += 1;
                self.notify(EviveEvent::CaptureCompleted {
                    image_id: image.id(),
                    path: image.path().display().to_string(),
                    size_bytes: image.size_bytes(),
                });
                self.transition(SessionState::Ready(image));
            }
            Err(error) => {
                self.stats.captures_failed += 1;
                self.notify(EviveEvent::OperationFailed {
                    operation: "capture",
                    error: error.clone(),
                });
                self.transition(SessionState::Failed { image: None, error });
            }
        }
    }

    fn apply_analysis(&mut self, signal: AnalysisSignal) {
        let current_task = matches!(
            &self.in_flight,
            Some(InFlight::Analysis(task)) if task.task_id() == signal.task_id
        );
        let image = match &self.state {
            SessionState::Analyzing(image) if current_task && image.id() == signal.image_id => {
                image.clone()
            }
            _ => {
                self.discard_stale("analysis", signal.image_id);
                return;
            }
        };

        self.in_flight = None;
        match signal.outcome {
            AnalysisOutcome::Completed(result) => {
                self.stats.analyses_succeeded += 1;
                self.notify(EviveEvent::AnalysisCompleted {
                    image_id: image.id(),
                    result: result.clone(),
                });
                self.transition(SessionState::Displaying { image, result });
            }
            AnalysisOutcome::Failed(error) => {
                self.stats.analyses_failed += 1;
                self.notify(EviveEvent::OperationFailed {
                    operation: "analysis",
                    error: error.clone(),
                });
                self.transition(SessionState::Failed {
                    image: Some(image),
                    error,
                });
            }
        }
    }

    /// Wait for the next completion signal
    pub async fn next_completion(&mut self) -> Option<Completion> {
        self.completion_rx.recv().await
    }

    /// Drive the controller until shutdown or until every handle is dropped
    pub async fn run(
        mut self,
        mut requests: mpsc::Receiver<SessionRequest>,
        shutdown: CancellationToken,
    ) {
        info!("Session controller running");

        loop {
            let step = tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Session controller cancelled");
                    break;
                }
                request = requests.recv() => match request {
                    Some(request) => Step::Request(request),
                    None => {
                        debug!("All session handles dropped");
                        break;
                    }
                },
                Some(completion) = self.completion_rx.recv() => Step::Completion(completion),
            };

            match step {
                Step::Request(request) => {
                    let outcome = self.handle_command(request.command);
                    if let Some(reply) = request.reply {
                        let _ = reply.send(outcome);
                    }
                }
                Step::Completion(completion) => self.apply(completion),
            }
        }

        if let Some(InFlight::Analysis(task)) = &self.in_flight {
            if !task.is_finished() {
                warn!("Abandoning analysis task {} at shutdown", task.task_id());
            }
        }

        info!("Session controller stopped ({:?})", self.stats);
    }

    /// Spawn the controller on the runtime and return a handle to it
    pub fn spawn(
        self,
        command_buffer: usize,
        shutdown: CancellationToken,
    ) -> (SessionHandle, JoinHandle<()>) {
        let (requests_tx, requests_rx) = mpsc::channel(command_buffer);
        let handle = SessionHandle::new(requests_tx, self.subscribe_state());
        let join = tokio::spawn(self.run(requests_rx, shutdown));
        (handle, join)
    }

    fn transition(&mut self, next: SessionState) {
        let from = self.state.name();
        let to = next.name();
        debug!("Session state {} -> {}", from, to);

        self.state = next;
        self.state_tx.send_replace(self.state.clone());
        self.notify(EviveEvent::StateChanged {
            from,
            to,
            timestamp: SystemTime::now(),
        });
    }

    fn reject(&mut self, command: SessionCommand) -> CommandOutcome {
        let state = self.state.name();
        debug!("Ignoring {} while {}", command.name(), state);
        self.stats.commands_rejected += 1;
        self.notify(EviveEvent::CommandRejected {
            command: command.name(),
            state,
        });
        CommandOutcome::Rejected { state }
    }

    fn discard_stale(&mut self, operation: &'static str, image_id: u64) {
        debug!(
            "Discarding stale {} signal for frame {} while {}",
            operation,
            image_id,
            self.state.name()
        );
        self.stats.stale_signals += 1;
        self.notify(EviveEvent::StaleSignalDiscarded {
            operation,
            image_id,
        });
    }

    fn notify(&self, event: EviveEvent) {
        if self.event_bus.has_subscribers() {
            let _ = self.event_bus.publish(event);
        }
    }
}
