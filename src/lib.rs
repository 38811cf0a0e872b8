pub mod analysis;
pub mod app;
pub mod camera;
pub mod config;
pub mod error;
pub mod events;
pub mod presentation;
pub mod session;

pub use analysis::{
    AnalysisResult, ComponentCategory, ComponentDistribution, GeminiClient, InferenceService,
};
pub use app::{ComponentState, EviveOrchestrator, ShutdownReason};
pub use camera::{FrameGrabber, ImageHandle, ImageSource, ImageSourceBuilder};
pub use config::EviveConfig;
pub use error::{ErrorDescriptor, ErrorKind, EviveError, Result};
pub use events::{EventBus, EventFilter, EventReceiver, EviveEvent};
pub use session::{CommandOutcome, SessionCommand, SessionController, SessionHandle, SessionState};
