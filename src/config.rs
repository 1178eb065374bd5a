use crate::error::AppError;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

const CONFIG_FILE: &str = "finger-stream";
const ENV_PREFIX: &str = "FINGER_STREAM";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub host: String,
    pub port: u16,
    pub frontend_dir: PathBuf,
    pub sounds_dir: PathBuf,
    /// Root of the replay camera; camera `i` reads `<frames_dir>/<i>/`.
    pub frames_dir: PathBuf,
    pub frame_interval_ms: u64,
    pub error_backoff_ms: u64,
    pub capture_width: u32,
    pub capture_height: u32,
    pub capture_fps: u32,
    pub jpeg_quality: u8,
    pub annotate_frames: bool,
    pub max_message_bytes: usize,
    pub client_buffer: usize,
    pub max_suggestions_per_ip: u32,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            frontend_dir: PathBuf::from("frontend"),
            sounds_dir: PathBuf::from("sounds"),
            frames_dir: PathBuf::from("frames"),
            frame_interval_ms: 10,
            error_backoff_ms: 1000,
            capture_width: 640,
            capture_height: 480,
            capture_fps: 30,
            jpeg_quality: 70,
            annotate_frames: true,
            max_message_bytes: 2 * 1024 * 1024,
            client_buffer: 64,
            max_suggestions_per_ip: 3,
        }
    }
}

impl Configuration {
    /// Defaults, then `finger-stream.toml` if present, then `FINGER_STREAM_*`
    /// variables. A bare `PORT` variable wins over everything for the port.
    pub fn load() -> Result<Self, AppError> {
        let configuration: Configuration = config::Config::builder()
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .set_override_option("port", std::env::var("PORT").ok())?
            .build()?
            .try_deserialize()?;
        configuration
            .validate()
            .map_err(AppError::InvalidConfig)?;
        Ok(configuration)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.frame_interval_ms == 0 {
            return Err("Frame interval must be greater than 0".to_string());
        }

        if self.error_backoff_ms == 0 {
            return Err("Error back-off must be greater than 0".to_string());
        }

        if self.client_buffer == 0 {
            return Err("Client buffer must be greater than 0".to_string());
        }

        if !(1..=100).contains(&self.jpeg_quality) {
            return Err("JPEG quality must be between 1 and 100".to_string());
        }

        if self.max_message_bytes == 0 {
            return Err("Max message size must be greater than 0".to_string());
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }

    pub fn capture_settings(&self) -> CaptureSettings {
        CaptureSettings {
            width: self.capture_width,
            height: self.capture_height,
            fps: self.capture_fps,
        }
    }
}

/// Requested resolution and frame rate; devices may ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_configuration_is_valid() {
        let configuration = Configuration::default();
        assert!(configuration.validate().is_ok());
        assert_eq!(configuration.bind_address(), "0.0.0.0:8080");
        assert_eq!(configuration.max_message_bytes, 2 * 1024 * 1024);
    }

    #[test]
    fn rejects_out_of_range_quality() {
        let configuration = Configuration {
            jpeg_quality: 0,
            ..Configuration::default()
        };
        assert!(configuration.validate().is_err());
    }

    #[test]
    fn rejects_zero_frame_interval() {
        let configuration = Configuration {
            frame_interval_ms: 0,
            ..Configuration::default()
        };
        assert!(configuration.validate().is_err());
    }

    #[test]
    fn capture_settings_follow_configuration() {
        let configuration = Configuration {
            capture_width: 320,
            capture_height: 240,
            capture_fps: 15,
            ..Configuration::default()
        };
        assert_eq!(
            configuration.capture_settings(),
            CaptureSettings {
                width: 320,
                height: 240,
                fps: 15
            }
        );
    }
}
