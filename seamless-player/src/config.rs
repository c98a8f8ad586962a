//! Configuration for seamless-play
//!
//! Loaded from an optional TOML file; every field has a built-in default.
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments / environment variables (applied by the binary)
//! 2. TOML configuration file
//! 3. Built-in defaults
//!
//! ```toml
//! [output]
//! channels = 2
//! sample_rate = 44100
//! buffer_frames = 4096
//! device = "USB Audio"
//!
//! [logging]
//! level = "debug"
//! ```

use crate::audio::DEFAULT_BUFFER_FRAMES;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// Largest channel count accepted for the output format
pub const MAX_CHANNELS: u16 = 8;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Output device format
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct OutputConfig {
    /// Interleaved channel count
    #[serde(default = "default_channels")]
    pub channels: u16,

    /// Output rate in Hz; every track is resampled to it
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Frames per device callback
    #[serde(default = "default_buffer_frames")]
    pub buffer_frames: u32,

    /// Output device name (None = default device)
    #[serde(default)]
    pub device: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_channels() -> u16 {
    2
}

fn default_sample_rate() -> u32 {
    44100
}

fn default_buffer_frames() -> u32 {
    DEFAULT_BUFFER_FRAMES
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            channels: default_channels(),
            sample_rate: default_sample_rate(),
            buffer_frames: default_buffer_frames(),
            device: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// - `Error::Io` if the file cannot be read
    /// - `Error::Config` if it is not valid TOML for this schema
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        info!("Loaded TOML configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Reject formats no device can open and unknown log levels
    pub fn validate(&self) -> Result<()> {
        let output = &self.output;
        if output.channels == 0 || output.channels > MAX_CHANNELS {
            return Err(Error::Config(format!(
                "channels must be between 1 and {}, got {}",
                MAX_CHANNELS, output.channels
            )));
        }
        if output.sample_rate == 0 {
            return Err(Error::Config("sample_rate must be non-zero".to_string()));
        }
        if output.buffer_frames == 0 {
            return Err(Error::Config("buffer_frames must be non-zero".to_string()));
        }
        if !LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(Error::Config(format!(
                "Unknown log level '{}'",
                self.logging.level
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.output.channels, 2);
        assert_eq!(config.output.sample_rate, 44100);
        assert_eq!(config.output.buffer_frames, 4096);
        assert_eq!(config.output.device, None);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_gives_defaults() {
        assert_eq!(Config::from_toml_str("").unwrap(), Config::default());
    }

    #[test]
    fn test_partial_toml() {
        let config = Config::from_toml_str(
            r#"
            [output]
            sample_rate = 48000
            device = "USB Audio"

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.output.channels, 2);
        assert_eq!(config.output.sample_rate, 48000);
        assert_eq!(config.output.device.as_deref(), Some("USB Audio"));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_malformed_toml() {
        let result = Config::from_toml_str("[output]\nchannels = \"two\"");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.output.channels = 0;
        assert!(config.validate().is_err());

        config.output.channels = MAX_CHANNELS + 1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.output.sample_rate = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.output.buffer_frames = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seamless.toml");
        std::fs::write(&path, "[output]\nchannels = 1\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.output.channels, 1);

        let missing = Config::load(dir.path().join("absent.toml"));
        assert!(matches!(missing, Err(Error::Io(_))));
    }
}
