//! Configuration loading traits and types.
//!
//! All joint applications read a single TOML file whose top-level tables are
//! *sections*. Each starter picks the section names it cares about; the
//! runtime itself never interprets them.
//!
//! # Usage
//!
//! ```rust,no_run
//! use joint_common::config::{ConfigError, ConfigLoader, Configuration};
//! use serde::Deserialize;
//! use std::path::Path;
//!
//! #[derive(Debug, Deserialize)]
//! struct StoreSection {
//!     path: String,
//! }
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = Configuration::load(Path::new("joint.toml"))?;
//!     let store: StoreSection = config.require("store")?;
//!     println!("store path: {}", store.path);
//!     Ok(())
//! }
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::consts::SHARED_SECTION;

/// Error type for configuration loading and option parsing.
#[derive(Debug, Clone, PartialEq, Error)]
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

    /// A section required by a component is absent.
    #[error("Missing configuration section [{0}]")]
    MissingSection(String),

    /// A per-instance option is missing or has the wrong shape.
    #[error("Invalid option '{name}': {reason}")]
    InvalidOption {
        /// Option name
        name: String,
        /// What is wrong with it
        reason: String,
    },
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

/// Common configuration fields shared across all joint applications.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "joint-demo-01"
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

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation for all types that implement DeserializeOwned.
impl<T: DeserializeOwned> ConfigLoader for T {}

/// Process-wide, read-only sectioned settings.
///
/// Loaded once before bootstrap and shared by reference with every starter.
/// Sections are top-level TOML tables addressed by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Configuration {
    root: toml::Table,
}

impl Configuration {
    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Whether a section with this name exists.
    pub fn has_section(&self, name: &str) -> bool {
        self.root.contains_key(name)
    }

    /// Names of all top-level sections, sorted.
    pub fn section_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.root.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Deserialize an optional section.
    ///
    /// Absence is `Ok(None)`; a section that exists but does not match `T`
    /// is a `ParseError` naming the section.
    pub fn section<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, ConfigError> {
        let Some(value) = self.root.get(name) else {
            return Ok(None);
        };
        value
            .clone()
            .try_into()
            .map(Some)
            .map_err(|e| ConfigError::ParseError(format!("section [{name}]: {e}")))
    }

    /// Deserialize a section that must be present.
    pub fn require<T: DeserializeOwned>(&self, name: &str) -> Result<T, ConfigError> {
        self.section(name)?
            .ok_or_else(|| ConfigError::MissingSection(name.to_string()))
    }

    /// The validated `[shared]` section, if present.
    pub fn shared(&self) -> Result<Option<SharedConfig>, ConfigError> {
        let shared: Option<SharedConfig> = self.section(SHARED_SECTION)?;
        if let Some(ref shared) = shared {
            shared.validate()?;
        }
        Ok(shared)
    }
}
