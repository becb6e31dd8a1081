//! Logger handle and the built-in logging starter.
//!
//! There is no process-wide logger object: the orchestrator hands every
//! starter a [`Logger`] scoped to that component in each phase. The
//! `logging` starter additionally joins a service-level `Logger` under
//! [`LOGGER_KEY`] so later components can resolve it like any other
//! capability.

use std::sync::Arc;

use joint_common::config::ConfigError;
use joint_common::options::Options;
use serde::Deserialize;
use tracing::span::Entered;
use tracing::{Span, debug, info_span};

use crate::error::StarterError;
use crate::registry::{InterfaceKey, Joinable, RegistryView};
use crate::starter::{Context, Starter};

/// Well-known key of the service logger.
pub const LOGGER_KEY: InterfaceKey = InterfaceKey::from_static("logger");

/// Cloneable handle on a `tracing` span.
///
/// Records emitted while the span is entered carry its fields, so a
/// component that keeps its logger and enters it from worker threads stays
/// attributed after bootstrap.
#[derive(Debug, Clone)]
pub struct Logger {
    name: Arc<str>,
    span: Span,
}

impl Logger {
    /// Root logger for one bootstrap run.
    pub fn root(label: &str) -> Self {
        Self {
            name: Arc::from(label),
            span: info_span!("bootstrap", label = %label),
        }
    }

    /// Service-level logger, not tied to a bootstrap run.
    pub fn service(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            span: info_span!("service", name = %name),
        }
    }

    /// Child logger for one component.
    pub fn component(&self, name: &str) -> Self {
        Self {
            name: Arc::from(name),
            span: info_span!(parent: &self.span, "component", name = %name),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Enter the span for the lifetime of the returned guard.
    pub fn enter(&self) -> Entered<'_> {
        self.span.enter()
    }

    /// Run `f` inside the span.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        self.span.in_scope(f)
    }
}

/// `[logging]` section.
#[derive(Debug, Default, Deserialize)]
struct LoggingSection {
    #[serde(default)]
    service: Option<String>,
}

/// Starter that joins a service [`Logger`].
///
/// Service name precedence: `service` option, then `[logging] service`, then
/// the build label.
#[derive(Debug)]
pub struct LoggingStarter {
    service: String,
    interface_key: InterfaceKey,
}

/// Create the logging starter.
pub fn starter() -> LoggingStarter {
    LoggingStarter {
        service: String::new(),
        interface_key: LOGGER_KEY,
    }
}

impl Starter for LoggingStarter {
    fn name(&self) -> &str {
        "logging"
    }

    fn init(&mut self, ctx: &Context<'_>, options: &Options) -> Result<Vec<Options>, StarterError> {
        let section: LoggingSection = ctx.config.section("logging")?.unwrap_or_default();

        self.service = options
            .string("service")
            .map(str::to_string)
            .or(section.service)
            .unwrap_or_else(|| ctx.label.to_string());
        if self.service.is_empty() {
            return Err(ConfigError::InvalidOption {
                name: "service".to_string(),
                reason: "service name cannot be empty".to_string(),
            }
            .into());
        }

        self.interface_key = options
            .string("interface_key")
            .map(InterfaceKey::from)
            .unwrap_or(LOGGER_KEY);

        debug!(service = %self.service, key = %self.interface_key, "logging configured");
        Ok(Vec::new())
    }

    fn run(&mut self, _ctx: &Context<'_>, registry: &RegistryView<'_>) -> Result<(), StarterError> {
        let logger = Arc::new(Logger::service(&self.service));
        registry.join(Joinable::new(logger), self.interface_key.clone())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_logger_keeps_name() {
        let root = Logger::root("TEST BUILD");
        let child = root.component("store");
        assert_eq!(root.name(), "TEST BUILD");
        assert_eq!(child.name(), "store");
        assert_eq!(child.in_scope(|| 7), 7);
    }
}
