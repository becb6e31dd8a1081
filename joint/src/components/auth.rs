//! Static token authentication.
//!
//! Several authenticators may be active at once, each joined under its own
//! key; consumers find them all with `interfaces_all::<dyn Authenticator>()`.

use std::collections::BTreeMap;
use std::sync::Arc;

use joint_common::config::ConfigError;
use joint_common::options::Options;
use joint_runtime::{Context, InterfaceKey, Joinable, RegistryView, Starter, StarterError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Default key of the primary authenticator.
pub const AUTH_KEY: InterfaceKey = InterfaceKey::from_static("auth");

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub user: String,
    /// Authenticator that accepted the token
    pub backend: String,
}

/// Authentication capability.
pub trait Authenticator: Send + Sync {
    /// Backend name, reported in [`Identity::backend`].
    fn name(&self) -> &str;

    /// Identity owning `token`, if any.
    fn authenticate(&self, token: &str) -> Option<Identity>;
}

/// Authenticator with a fixed token → user table.
#[derive(Debug)]
pub struct StaticTokenAuth {
    name: String,
    tokens: BTreeMap<String, String>,
}

impl StaticTokenAuth {
    pub fn new(name: impl Into<String>, tokens: BTreeMap<String, String>) -> Self {
        Self {
            name: name.into(),
            tokens,
        }
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }
}

impl Authenticator for StaticTokenAuth {
    fn name(&self) -> &str {
        &self.name
    }

    fn authenticate(&self, token: &str) -> Option<Identity> {
        self.tokens.get(token).map(|user| Identity {
            user: user.clone(),
            backend: self.name.clone(),
        })
    }
}

// ─── Starter ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AuthSection {
    tokens: BTreeMap<String, String>,
}

/// Starter for [`StaticTokenAuth`].
///
/// Options: `section` (default `"auth"`), `interface_key` (defaults to the
/// section name, so `"auth"` for the primary instance).
#[derive(Debug)]
pub struct AuthStarter {
    section: String,
    tokens: BTreeMap<String, String>,
    interface_key: InterfaceKey,
}

pub fn starter() -> AuthStarter {
    AuthStarter {
        section: AUTH_KEY.to_string(),
        tokens: BTreeMap::new(),
        interface_key: AUTH_KEY,
    }
}

fn validate_tokens(tokens: &BTreeMap<String, String>) -> Result<(), ConfigError> {
    if tokens.is_empty() {
        return Err(ConfigError::ValidationError(
            "at least one token is required".to_string(),
        ));
    }
    if let Some((token, _)) = tokens
        .iter()
        .find(|(token, user)| token.trim().is_empty() || user.trim().is_empty())
    {
        return Err(ConfigError::ValidationError(format!(
            "token entry '{token}' has an empty token or user"
        )));
    }
    Ok(())
}

impl Starter for AuthStarter {
    fn name(&self) -> &str {
        "auth"
    }

    fn init(&mut self, ctx: &Context<'_>, options: &Options) -> Result<Vec<Options>, StarterError> {
        self.section = options.string_or("section", AUTH_KEY.as_str());
        let section: AuthSection = ctx.config.require(&self.section)?;
        validate_tokens(&section.tokens)?;

        self.tokens = section.tokens;
        self.interface_key = options
            .string("interface_key")
            .map_or_else(|| InterfaceKey::from(self.section.as_str()), InterfaceKey::from);

        debug!(section = %self.section, tokens = self.tokens.len(), "auth configured");
        Ok(Vec::new())
    }

    fn run(&mut self, _ctx: &Context<'_>, registry: &RegistryView<'_>) -> Result<(), StarterError> {
        let auth = Arc::new(StaticTokenAuth::new(
            self.section.clone(),
            std::mem::take(&mut self.tokens),
        ));
        registry.join(
            Joinable::new(auth.clone()).provide::<dyn Authenticator>(auth.clone()),
            self.interface_key.clone(),
        )?;
        info!(key = %self.interface_key, tokens = auth.token_count(), "authenticator joined");
        Ok(())
    }
}
