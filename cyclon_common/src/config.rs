//! Configuration loading traits and types.
//!
//! Every Cyclon config file is plain TOML deserialised through serde.
//! Parsing is the only I/O done here; semantic checks live next to each
//! config struct as `validate()`.
//!
//! # Usage
//!
//! ```rust,no_run
//! use cyclon_common::config::{ConfigLoader, SharedConfig, ConfigError};
//! use serde::Deserialize;
//! use std::path::Path;
//!
//! #[derive(Debug, Deserialize)]
//! struct RunnerConfig {
//!     shared: SharedConfig,
//!     cycles: u64,
//! }
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = RunnerConfig::load(Path::new("cyclon.toml"))?;
//!     println!("Instance: {}", config.shared.service_name);
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl ConfigError {
    /// Non-zero setup return code reported upward.
    pub const fn code(&self) -> u32 {
        match self {
            Self::FileNotFound => 0x30000,
            Self::ParseError(_) => 0x30001,
            Self::ValidationError(_) => 0x30002,
        }
    }
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

impl LogLevel {
    /// Level in effect when a `--verbose` flag may raise it to DEBUG.
    pub const fn with_verbose(self, verbose: bool) -> Self {
        match self {
            Self::Trace => Self::Trace,
            _ if verbose => Self::Debug,
            other => other,
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Common configuration fields shared across Cyclon binaries.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "cyclon-sim-01"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    pub service_name: String,
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            service_name: "cyclon".to_string(),
        }
    }
}

/// Trait for loading configuration from TOML files.
///
/// Blanket-implemented for every `DeserializeOwned` type.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from an in-memory TOML string.
    fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

/// Check `value` lies inside `[min, max]`, naming the field on failure.
pub fn check_range<T>(field: &str, value: T, min: T, max: T) -> Result<(), String>
where
    T: PartialOrd + std::fmt::Display + Copy,
{
    if value < min || value > max {
        return Err(format!("{field} {value} out of range [{min}, {max}]"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn log_level_round_trips_lowercase() {
        #[derive(Debug, Serialize, Deserialize, PartialEq)]
        struct Wrapper {
            level: LogLevel,
        }

        let text = toml::to_string(&Wrapper {
            level: LogLevel::Warn,
        })
        .unwrap();
        assert!(text.contains("warn"));
        assert_eq!(
            toml::from_str::<Wrapper>("level = \"trace\"").unwrap().level,
            LogLevel::Trace
        );
    }

    #[test]
    fn verbose_raises_to_debug_only() {
        assert_eq!(LogLevel::Warn.with_verbose(false), LogLevel::Warn);
        assert_eq!(LogLevel::Warn.with_verbose(true), LogLevel::Debug);
        assert_eq!(LogLevel::Trace.with_verbose(true), LogLevel::Trace);
        assert_eq!(tracing::Level::from(LogLevel::default()), tracing::Level::INFO);
        assert_eq!(tracing::Level::from(LogLevel::Error), tracing::Level::ERROR);
    }

    #[test]
    fn shared_config_rejects_empty_name() {
        let config = SharedConfig {
            log_level: LogLevel::Info,
            service_name: String::new(),
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn loader_file_not_found() {
        let result = SharedConfig::load(Path::new("/nonexistent/cyclon.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound)));
    }

    #[test]
    fn loader_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "service_name = {{{{").unwrap();
        let result = SharedConfig::load(file.path());
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn loader_success_with_default_level() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "service_name = \"bench-01\"\n").unwrap();
        file.flush().unwrap();

        let config = SharedConfig::load(file.path()).unwrap();
        assert_eq!(config.service_name, "bench-01");
        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn range_check_messages() {
        assert!(check_range("x", 5, 1, 10).is_ok());
        let err = check_range("cycle_us", 50u32, 100, 10_000).unwrap_err();
        assert!(err.contains("cycle_us 50"));
    }

    #[test]
    fn error_codes_are_nonzero_and_distinct() {
        let a = ConfigError::FileNotFound.code();
        let b = ConfigError::ParseError(String::new()).code();
        let c = ConfigError::ValidationError(String::new()).code();
        assert!(a != 0 && b != 0 && c != 0);
        assert!(a != b && b != c);
    }
}
