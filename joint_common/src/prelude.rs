//! Prelude module for common re-exports.
//!
//! ```rust
//! use joint_common::prelude::*;
//! ```

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, Configuration, SharedConfig};

// ─── Options ────────────────────────────────────────────────────────
pub use crate::options::Options;

// ─── Constants ──────────────────────────────────────────────────────
pub use crate::consts::{DEFAULT_BUILD_LABEL, DEFAULT_CONFIG_PATH};
