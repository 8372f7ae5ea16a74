//! # Configuration Management
//!
//! Centralized configuration for connections.
//!
//! This module provides structured configuration for the client: socket and
//! handshake timeouts, protocol constants, the login endpoint and logging.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment-specific overrides via `from_env()`

use crate::error::{ConnectionError, Result};
use crate::utils::timeout;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Protocol version sent in the login request
pub const PROTOCOL_VERSION: i32 = 29;

/// Launcher version reported to the login service
pub const LAUNCHER_VERSION: u32 = 13;

/// Default login endpoint
pub const DEFAULT_AUTH_URL: &str = "https://login.minecraft.net/";

/// IP traffic class requested on the socket (low delay | high throughput)
pub const DEFAULT_TRAFFIC_CLASS: u32 = 24;

/// Client configuration
///
/// Fields missing from a TOML document take their default value.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Read timeout, also bounding socket connect and each handshake wait
    #[serde(with = "duration_serde")]
    pub timeout: Duration,

    /// Time allowed for the writer to flush and close after shutdown
    #[serde(with = "duration_serde")]
    pub shutdown_timeout: Duration,

    /// Protocol version sent in the login request
    pub protocol_version: i32,

    /// Login service endpoint
    pub auth_url: String,

    /// Launcher version reported to the login service
    pub launcher_version: u32,

    /// IP traffic class hint
    pub traffic_class: u32,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: timeout::DEFAULT_TIMEOUT,
            shutdown_timeout: timeout::SHUTDOWN_TIMEOUT,
            protocol_version: PROTOCOL_VERSION,
            auth_url: String::from(DEFAULT_AUTH_URL),
            launcher_version: LAUNCHER_VERSION,
            traffic_class: DEFAULT_TRAFFIC_CLASS,
            logging: LoggingConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path).map_err(|e| {
            ConnectionError::ConfigError(format!("Failed to open config file: {e}"))
        })?;

        let mut contents = String::new();
        file.read_to_string(&mut contents).map_err(|e| {
            ConnectionError::ConfigError(format!("Failed to read config file: {e}"))
        })?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ConnectionError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(timeout) = std::env::var("MCBOT_TIMEOUT_MS") {
            let val = timeout.parse::<u64>().map_err(|e| {
                ConnectionError::ConfigError(format!("Invalid MCBOT_TIMEOUT_MS '{timeout}': {e}"))
            })?;
            config.timeout = Duration::from_millis(val);
        }

        if let Ok(url) = std::env::var("MCBOT_AUTH_URL") {
            config.auth_url = url;
        }

        if let Ok(level) = std::env::var("MCBOT_LOG_LEVEL") {
            config.logging.log_level = level.parse::<Level>().map_err(|_| {
                ConnectionError::ConfigError(format!("Invalid MCBOT_LOG_LEVEL '{level}'"))
            })?;
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            ConnectionError::ConfigError(format!("Failed to serialize config: {e}"))
        })?;

        std::fs::write(path, content).map_err(|e| {
            ConnectionError::ConfigError(format!("Failed to write config file: {e}"))
        })?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.timeout.as_millis() < 100 {
            errors.push("Timeout too short (minimum: 100ms)".to_string());
        } else if self.timeout.as_secs() > 300 {
            errors.push("Timeout too long (maximum: 300s)".to_string());
        }

        if self.shutdown_timeout.as_millis() < 10 {
            errors.push("Shutdown timeout too short (minimum: 10ms)".to_string());
        } else if self.shutdown_timeout.as_secs() > 60 {
            errors.push("Shutdown timeout too long (maximum: 60s)".to_string());
        }

        if self.protocol_version <= 0 {
            errors.push(format!(
                "Invalid protocol version: {} (must be positive)",
                self.protocol_version
            ));
        }

        if self.auth_url.is_empty() {
            errors.push("Auth URL cannot be empty".to_string());
        } else if !(self.auth_url.starts_with("http://") || self.auth_url.starts_with("https://"))
        {
            errors.push(format!(
                "Invalid auth URL: '{}' (expected an http:// or https:// URL)",
                self.auth_url
            ));
        }

        if self.traffic_class > 255 {
            errors.push(format!(
                "Invalid traffic class: {} (valid range: 0-255)",
                self.traffic_class
            ));
        }

        errors.extend(self.logging.validate());

        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConnectionError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("mcbot-net"),
            log_level: Level::INFO,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        errors
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
