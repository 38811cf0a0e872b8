use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EviveError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),

    #[error("Event bus error: {0}")]
    EventBus(#[from] EventBusError),

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

impl EviveError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<C: Into<String>, M: Into<String>>(component: C, message: M) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

/// Failures while acquiring or storing a still frame
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Camera endpoint {endpoint} is unreachable: {details}")]
    Unreachable { endpoint: String, details: String },

    #[error("No frame returned by {endpoint}: {details}")]
    NoFrame { endpoint: String, details: String },

    #[error("Invalid camera endpoint '{endpoint}'")]
    InvalidEndpoint { endpoint: String },

    #[error("Failed to store frame at {path}: {source}")]
    Storage {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Rejections of the inference service's reply
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Response is not valid JSON: {details}")]
    InvalidJson { details: String },

    #[error("Response JSON is not an object")]
    NotAnObject,

    #[error("Missing required field '{field}'")]
    MissingField { field: &'static str },

    #[error("Field '{field}' must be {expected}")]
    WrongType {
        field: String,
        expected: &'static str,
    },
}

/// Transport or service failures during an inference call
#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Inference API key is not configured")]
    MissingApiKey,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Inference service returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Inference service returned an unusable reply: {details}")]
    InvalidReply { details: String },

    #[error("Inference call timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Inference task aborted: {details}")]
    Aborted { details: String },
}

#[derive(Error, Debug)]
pub enum EventBusError {
    #[error("Failed to publish event: {details}")]
    PublishFailed { details: String },

    #[error("Event bus channel closed")]
    ChannelClosed,
}

/// Category of a session-level failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Capture,
    Inference,
    Parse,
    Storage,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Capture => "capture",
            ErrorKind::Inference => "inference",
            ErrorKind::Parse => "parse",
            ErrorKind::Storage => "storage",
        };
        f.write_str(name)
    }
}

/// Human-readable failure carried by `SessionState::Failed`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDescriptor {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorDescriptor {
    pub fn new<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.kind, self.message)
    }
}

impl From<&CaptureError> for ErrorDescriptor {
    fn from(error: &CaptureError) -> Self {
        let kind = match error {
            CaptureError::Storage { .. } => ErrorKind::Storage,
            _ => ErrorKind::Capture,
        };
        Self::new(kind, error.to_string())
    }
}

impl From<&ParseError> for ErrorDescriptor {
    fn from(error: &ParseError) -> Self {
        Self::new(ErrorKind::Parse, error.to_string())
    }
}

impl From<&InferenceError> for ErrorDescriptor {
    fn from(error: &InferenceError) -> Self {
        Self::new(ErrorKind::Inference, error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EviveError>;
