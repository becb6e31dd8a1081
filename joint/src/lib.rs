//! # Joint Demo
//!
//! A small backend assembled from starters through `joint_runtime`: an
//! in-memory store, one or more static-token authenticators, and a
//! line-oriented request server on top of them.
//!
//! ## Module Structure
//!
//! - [`components`] - Demo starters and the default component list
//! - [`serve`] - Request loop driven by the binary

pub mod components;
pub mod serve;

pub use components::{BUILD_LABEL, default_specs};
