//! Workspace-wide constants.

/// Default configuration file path used by binaries.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/joint/joint.toml";

/// Name of the section holding [`SharedConfig`](crate::config::SharedConfig).
pub const SHARED_SECTION: &str = "shared";

/// Build label used when the caller supplies none.
pub const DEFAULT_BUILD_LABEL: &str = "JOINT BUILD";
