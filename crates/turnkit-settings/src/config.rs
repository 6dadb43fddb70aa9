//! Configuration handling for Turnkit
//!
//! Supports JSON and TOML files stored in the platform config directory.
//! Configuration remembers connection and motion defaults between sessions;
//! none of it affects protocol correctness.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use turnkit_core::{Error, Result};

/// Connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// Serial port of the turntable
    pub port: String,
    /// Baud rate
    pub baud_rate: u32,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 115_200,
        }
    }
}

/// Motion defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotionSettings {
    /// Default rotation speed, degrees per second
    pub default_speed_dps: f64,
    /// Seconds the motor stays enabled before auto-disable; 0 turns the
    /// feature off
    pub auto_disable_secs: f64,
}

impl Default for MotionSettings {
    fn default() -> Self {
        Self {
            default_speed_dps: 200.0,
            auto_disable_secs: 0.0,
        }
    }
}

impl MotionSettings {
    /// Auto-disable timeout as a duration, `None` when off.
    pub fn auto_disable(&self) -> Option<Duration> {
        if self.auto_disable_secs > 0.0 {
            Some(Duration::from_secs_f64(self.auto_disable_secs))
        } else {
            None
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Connection settings
    #[serde(default)]
    pub connection: ConnectionSettings,
    /// Motion defaults
    #[serde(default)]
    pub motion: MotionSettings,
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::other(format!("Failed to read config file: {}", e)))?;

        let config: Self = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)
                .map_err(|e| Error::other(format!("Invalid JSON config: {}", e)))?
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            toml::from_str(&content)
                .map_err(|e| Error::other(format!("Invalid TOML config: {}", e)))?
        } else {
            return Err(Error::other("Config file must be .json or .toml"));
        };

        config.validate()?;
        Ok(config)
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        self.validate()?;

        let content = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::to_string_pretty(self)
                .map_err(|e| Error::other(format!("Failed to serialize config: {}", e)))?
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            toml::to_string_pretty(self)
                .map_err(|e| Error::other(format!("Failed to serialize config: {}", e)))?
        } else {
            return Err(Error::other("Config file must be .json or .toml"));
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::other(format!("Failed to create config directory: {}", e)))?;
        }
        std::fs::write(path, content)
            .map_err(|e| Error::other(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.connection.port.is_empty() {
            return Err(Error::other("Port must not be empty"));
        }

        if self.connection.baud_rate == 0 {
            return Err(Error::other("Baud rate must be > 0"));
        }

        if !self.motion.default_speed_dps.is_finite() || self.motion.default_speed_dps <= 0.0 {
            return Err(Error::other("Default speed must be > 0"));
        }

        if !self.motion.auto_disable_secs.is_finite() || self.motion.auto_disable_secs < 0.0 {
            return Err(Error::other("Auto-disable timeout must be >= 0"));
        }

        Ok(())
    }

    /// Default config file path under the platform config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("turnkit").join("config.toml"))
    }

    /// Load the default config file, falling back to defaults when it does
    /// not exist or does not parse.
    pub fn load_default() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring bad config file");
                Self::default()
            }
        }
    }
}
