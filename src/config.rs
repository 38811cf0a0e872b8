use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Environment variable consulted when no API key is configured
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EviveConfig {
    pub camera: CameraConfig,
    pub inference: InferenceConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CameraConfig {
    /// Camera address: bare host/IP or a full http(s) URL
    #[serde(default = "default_camera_endpoint")]
    pub endpoint: String,

    /// Snapshot path appended to bare host endpoints
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,

    /// Delay between opening the stream and reading the frame
    #[serde(default = "default_warmup_ms")]
    pub warmup_ms: u64,

    /// Per-request timeout for the camera endpoint
    #[serde(default = "default_camera_timeout")]
    pub request_timeout_seconds: u64,

    /// Location of the single stored frame
    #[serde(default = "default_frame_path")]
    pub frame_path: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct InferenceConfig {
    /// API key for the inference service (falls back to GEMINI_API_KEY)
    #[serde(default)]
    pub api_key: String,

    /// Model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of the models endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Upper bound on one inference call
    #[serde(default = "default_inference_timeout")]
    pub timeout_seconds: u64,

    /// Sampling temperature
    pub temperature: Option<f32>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SessionConfig {
    /// Event bus capacity
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,

    /// Pending command capacity between presentation and controller
    #[serde(default = "default_command_buffer")]
    pub command_buffer: usize,
}

impl CameraConfig {
    pub fn warmup(&self) -> Duration {
        Duration::from_millis(self.warmup_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl InferenceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Configured key, or the value of `GEMINI_API_KEY` when unset
    pub fn resolved_api_key(&self) -> String {
        if !self.api_key.is_empty() {
            return self.api_key.clone();
        }
        std::env::var(API_KEY_ENV).unwrap_or_default()
    }
}

impl EviveConfig {
    /// Render as a TOML document, the same shape `load_from_file` reads
    pub fn to_toml(&self) -> crate::error::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("evive.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("camera.endpoint", default_camera_endpoint())?
            .set_default("camera.snapshot_path", default_snapshot_path())?
            .set_default("camera.warmup_ms", default_warmup_ms())?
            .set_default(
                "camera.request_timeout_seconds",
                default_camera_timeout(),
            )?
            .set_default("camera.frame_path", default_frame_path())?
            .set_default("inference.api_key", "")?
            .set_default("inference.model", default_model())?
            .set_default("inference.base_url", default_base_url())?
            .set_default("inference.timeout_seconds", default_inference_timeout())?
            .set_default(
                "session.event_bus_capacity",
                default_event_bus_capacity() as i64,
            )?
            .set_default("session.command_buffer", default_command_buffer() as i64)?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // Double underscore keeps field names like api_key intact
            .add_source(Environment::with_prefix("EVIVE").separator("__"))
            .build()?;

        let config: EviveConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config.redacted());

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.endpoint.trim().is_empty() {
            return Err(ConfigError::Message(
                "Camera endpoint must not be empty".to_string(),
            ));
        }

        if self.camera.frame_path.trim().is_empty() {
            return Err(ConfigError::Message(
                "Camera frame_path must not be empty".to_string(),
            ));
        }

        if self.camera.request_timeout_seconds == 0 {
            return Err(ConfigError::Message(
                "Camera request_timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if self.inference.model.trim().is_empty() {
            return Err(ConfigError::Message(
                "Inference model must not be empty".to_string(),
            ));
        }

        if self.inference.timeout_seconds == 0 {
            return Err(ConfigError::Message(
                "Inference timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if let Some(temperature) = self.inference.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ConfigError::Message(
                    "Inference temperature must be within 0.0..=2.0".to_string(),
                ));
            }
        }

        if self.session.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        if self.session.command_buffer == 0 {
            return Err(ConfigError::Message(
                "Command buffer must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Copy with the API key masked, for logging
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.inference.api_key.is_empty() {
            copy.inference.api_key = "***".to_string();
        }
        copy
    }
}

impl Default for EviveConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig {
                endpoint: default_camera_endpoint(),
                snapshot_path: default_snapshot_path(),
                warmup_ms: default_warmup_ms(),
                request_timeout_seconds: default_camera_timeout(),
                frame_path: default_frame_path(),
            },
            inference: InferenceConfig {
                api_key: String::new(),
                model: default_model(),
                base_url: default_base_url(),
                timeout_seconds: default_inference_timeout(),
                temperature: None,
            },
            session: SessionConfig {
                event_bus_capacity: default_event_bus_capacity(),
                command_buffer: default_command_buffer(),
            },
        }
    }
}

// Default value functions
fn default_camera_endpoint() -> String {
    "10.46.122.136".to_string()
}
fn default_snapshot_path() -> String {
    "/shot.jpg".to_string()
}
fn default_warmup_ms() -> u64 {
    2000
}
fn default_camera_timeout() -> u64 {
    10
}
fn default_frame_path() -> String {
    "evive_image.jpg".to_string()
}

fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}
fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta/models".to_string()
}
fn default_inference_timeout() -> u64 {
    60
}

fn default_event_bus_capacity() -> usize {
    100
}
fn default_command_buffer() -> usize {
    16
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = EviveConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.camera.warmup(), Duration::from_secs(2));
        assert_eq!(config.inference.model, "gemini-1.5-flash");
    }

    #[test]
    fn test_config_validation() {
        let mut config = EviveConfig::default();
        config.camera.endpoint = "  ".to_string();
        assert!(config.validate().is_err());

        config.camera.endpoint = "192.168.1.20".to_string();
        assert!(config.validate().is_ok());

        config.inference.timeout_seconds = 0;
        assert!(config.validate().is_err());

        config.inference.timeout_seconds = 30;
        config.inference.temperature = Some(3.5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[camera]\nendpoint = \"http://cam.local/snap.jpg\"\nwarmup_ms = 500\n\n[inference]\nmodel = \"gemini-2.0-flash\"\n"
        )
        .unwrap();

        let config = EviveConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.camera.endpoint, "http://cam.local/snap.jpg");
        assert_eq!(config.camera.warmup_ms, 500);
        assert_eq!(config.camera.frame_path, "evive_image.jpg");
        assert_eq!(config.inference.model, "gemini-2.0-flash");
        assert_eq!(config.session.command_buffer, 16);
    }

    #[test]
    fn test_redacted_masks_api_key() {
        let mut config = EviveConfig::default();
        config.inference.api_key = "secret".to_string();
        assert_eq!(config.redacted().inference.api_key, "***");
        assert_eq!(config.inference.api_key, "secret");
    }

    #[test]
    fn test_configured_api_key_wins() {
        let mut config = EviveConfig::default();
        config.inference.api_key = "from-file".to_string();
        assert_eq!(config.inference.resolved_api_key(), "from-file");
    }

    #[test]
    fn test_default_config_serializes_to_toml() {
        let rendered = EviveConfig::default().to_toml().unwrap();
        assert!(rendered.contains("[camera]"));
        assert!(rendered.contains("warmup_ms = 2000"));

        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(rendered.as_bytes()).unwrap();
        let reloaded = EviveConfig::load_from_file(file.path()).unwrap();
        assert_eq!(reloaded.camera.warmup_ms, 2000);
        assert_eq!(reloaded.inference.model, EviveConfig::default().inference.model);
    }
}
