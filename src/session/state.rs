use crate::analysis::AnalysisResult;
use crate::camera::ImageHandle;
use crate::error::ErrorDescriptor;

/// Where the capture -> analyze -> display cycle currently stands
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SessionState {
    #[default]
    Idle,
    Capturing,
    Ready(ImageHandle),
    Analyzing(ImageHandle),
    Displaying {
        image: ImageHandle,
        result: AnalysisResult,
    },
    Failed {
        image: Option<ImageHandle>,
        error: ErrorDescriptor,
    },
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::Capturing => "Capturing",
            SessionState::Ready(_) => "Ready",
            SessionState::Analyzing(_) => "Analyzing",
            SessionState::Displaying { .. } => "Displaying",
            SessionState::Failed { .. } => "Failed",
        }
    }

    /// Frame the state refers to, if any
    pub fn image(&self) -> Option<&ImageHandle> {
        match self {
            SessionState::Idle | SessionState::Capturing => None,
            SessionState::Ready(image) | SessionState::Analyzing(image) => Some(image),
            SessionState::Displaying { image, .. } => Some(image),
            SessionState::Failed { image, .. } => image.as_ref(),
        }
    }

    /// True while a capture or analysis is outstanding
    pub fn is_busy(&self) -> bool {
        matches!(self, SessionState::Capturing | SessionState::Analyzing(_))
    }

    pub fn accepts_capture(&self) -> bool {
        !matches!(self, SessionState::Capturing)
    }

    pub fn accepts_analyze(&self) -> bool {
        matches!(
            self,
            SessionState::Ready(_) | SessionState::Failed { image: Some(_), .. }
        )
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        match self {
            SessionState::Displaying { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorDescriptor> {
        match self {
            SessionState::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}
