use super::inference::InferenceService;
use super::parser;
use super::prompt::ANALYSIS_PROMPT;
use super::types::AnalysisResult;
use crate::camera::ImageHandle;
use crate::error::{ErrorDescriptor, ErrorKind, InferenceError};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Identity of one analysis task instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(Uuid);

impl TaskId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixed inputs for every analysis call
#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    pub prompt: Arc<str>,
    pub timeout: Duration,
}

impl AnalysisSettings {
    pub fn new(timeout: Duration) -> Self {
        Self {
            prompt: Arc::from(ANALYSIS_PROMPT),
            timeout,
        }
    }
}

/// Terminal result of a task
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    Completed(AnalysisResult),
    Failed(ErrorDescriptor),
}

/// The single completion signal a task emits
#[derive(Debug, Clone)]
pub struct AnalysisSignal {
    pub task_id: TaskId,
    pub image_id: u64,
    pub outcome: AnalysisOutcome,
}

/// Spawner for single-shot inference calls
pub struct AnalysisTask;

impl AnalysisTask {
    /// Spawn the inference call for `image` on the runtime.
    ///
    /// Exactly one [`AnalysisSignal`] is sent on `signals` when the call
    /// finishes, fails, times out or panics.
    pub fn start<T>(
        image: ImageHandle,
        inference: Arc<dyn InferenceService>,
        settings: AnalysisSettings,
        signals: mpsc::UnboundedSender<T>,
    ) -> AnalysisTaskHandle
    where
        T: From<AnalysisSignal> + Send + 'static,
    {
        let task_id = TaskId::new();
        let image_id = image.id();

        info!(
            "Starting analysis task {} for frame {} with {}",
            task_id,
            image_id,
            inference.model()
        );

        let join = tokio::spawn(async move {
            let started = Instant::now();
            let worker = tokio::spawn(run_analysis(image, inference, settings));

            let outcome = match worker.await {
                Ok(Ok(result)) => AnalysisOutcome::Completed(result),
                Ok(Err(descriptor)) => AnalysisOutcome::Failed(descriptor),
                Err(join_error) => {
                    let error = InferenceError::Aborted {
                        details: join_error.to_string(),
                    };
                    AnalysisOutcome::Failed(ErrorDescriptor::from(&error))
                }
            };

            match &outcome {
                AnalysisOutcome::Completed(_) => {
                    info!("Analysis task {} completed in {:?}", task_id, started.elapsed())
                }
                AnalysisOutcome::Failed(descriptor) => {
                    warn!("Analysis task {} failed: {}", task_id, descriptor)
                }
            }

            let signal = AnalysisSignal {
                task_id,
                image_id,
                outcome,
            };
            if signals.send(T::from(signal)).is_err() {
                debug!("Analysis task {} finished after controller shut down", task_id);
            }
        });

        AnalysisTaskHandle {
            task_id,
            image_id,
            join,
        }
    }
}

async fn run_analysis(
    image: ImageHandle,
    inference: Arc<dyn InferenceService>,
    settings: AnalysisSettings,
) -> Result<AnalysisResult, ErrorDescriptor> {
    let bytes = tokio::fs::read(image.path()).await.map_err(|e| {
        ErrorDescriptor::new(
            ErrorKind::Storage,
            format!("Failed to read frame {}: {}", image.path().display(), e),
        )
    })?;

    let call = inference.generate(&settings.prompt, &bytes, image.mime_type());
    let raw = match tokio::time::timeout(settings.timeout, call).await {
        Ok(Ok(raw)) => raw,
        Ok(Err(error)) => return Err(ErrorDescriptor::from(&error)),
        Err(_) => {
            let error = InferenceError::Timeout {
                seconds: settings.timeout.as_secs(),
            };
            return Err(ErrorDescriptor::from(&error));
        }
    };

    debug!("Received {} byte reply for frame {}", raw.len(), image.id());
    parser::parse(&raw).map_err(|error| ErrorDescriptor::from(&error))
}

/// Handle to a spawned analysis task
pub struct AnalysisTaskHandle {
    task_id: TaskId,
    image_id: u64,
    join: JoinHandle<()>,
}

impl AnalysisTaskHandle {
    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    pub fn image_id(&self) -> u64 {
        self.image_id
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}
