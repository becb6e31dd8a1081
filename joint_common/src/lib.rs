//! Joint Common Library
//!
//! Shared configuration and option types for all joint workspace crates.
//!
//! # Module Structure
//!
//! - [`config`] - Sectioned configuration, loader trait, shared settings
//! - [`options`] - Per-instance component options
//! - [`consts`] - Workspace-wide constants
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use joint_common::prelude::*;
//!
//! let config = Configuration::from_toml_str("[store]\npath = \"/tmp\"").unwrap();
//! assert!(config.has_section("store"));
//! ```

pub mod config;
pub mod consts;
pub mod options;
pub mod prelude;
