//! Demo feature modules and the default component list.
//!
//! Order matters: each starter may only resolve what the ones before it
//! joined. The default list is
//!
//! ```text
//! logging → store → auth → [components.*] → server
//! ```
//!
//! Extra instances come from `[components.<name>]` tables. Each table names
//! its starter with `kind` (`"auth"` or `"store"`); every other entry is
//! passed to that starter as an option. Tables are taken in name order.

pub mod auth;
pub mod server;
pub mod store;

use joint_common::config::{ConfigError, Configuration};
use joint_common::options::Options;
use joint_runtime::{ComponentSpec, Starter, logging};

/// Build label reported in logs and `--version`.
pub const BUILD_LABEL: &str = "JOINT DEMO BUILD";

/// Config section holding extra component instances.
pub const COMPONENTS_SECTION: &str = "components";

/// Starter for a `kind` name, if known.
pub fn starter_for(kind: &str) -> Option<Box<dyn Starter>> {
    match kind {
        "logging" => Some(Box::new(logging::starter())),
        "store" => Some(Box::new(store::starter())),
        "auth" => Some(Box::new(auth::starter())),
        "server" => Some(Box::new(server::starter())),
        _ => None,
    }
}

/// Extra component specs declared under `[components]`.
pub fn configured_specs(config: &Configuration) -> Result<Vec<ComponentSpec>, ConfigError> {
    let Some(table) = config.section::<toml::Table>(COMPONENTS_SECTION)? else {
        return Ok(Vec::new());
    };

    let mut specs = Vec::with_capacity(table.len());
    for (name, value) in table {
        let Some(entry) = value.as_table() else {
            return Err(ConfigError::InvalidOption {
                name: format!("{COMPONENTS_SECTION}.{name}"),
                reason: "expected a table".to_string(),
            });
        };
        let mut options = Options::from(entry.clone());
        let kind = options.require_string("kind")?.to_string();
        let starter = starter_for(&kind).ok_or_else(|| ConfigError::InvalidOption {
            name: format!("{COMPONENTS_SECTION}.{name}.kind"),
            reason: format!("unknown component kind '{kind}'"),
        })?;
        options.remove("kind");
        let options = Options::new().with("section", name.as_str()).merged(&options);
        specs.push(ComponentSpec::boxed(starter, options));
    }
    Ok(specs)
}

/// The full demo list: built-ins plus configured extras, server last.
pub fn default_specs(config: &Configuration) -> Result<Vec<ComponentSpec>, ConfigError> {
    let mut specs = vec![
        ComponentSpec::new(logging::starter()),
        ComponentSpec::new(store::starter()),
        ComponentSpec::new(auth::starter()),
    ];
    specs.extend(configured_specs(config)?);
    specs.push(ComponentSpec::new(server::starter()));
    Ok(specs)
}
