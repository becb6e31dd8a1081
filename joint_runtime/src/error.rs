//! Error types for registry lookups, starter phases and shutdown.

use std::fmt;

use joint_common::config::ConfigError;
use thiserror::Error;

use crate::cancel::Cancelled;
use crate::registry::InterfaceKey;
use crate::starter::Phase;

/// Boxed error used where components report arbitrary causes.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced by registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Nothing visible is joined under the key.
    #[error("no {capability} joined under key '{key}'")]
    NotFound {
        /// Key that was looked up
        key: InterfaceKey,
        /// Requested capability type
        capability: &'static str,
    },

    /// The key is bound, but its registration does not provide the capability.
    #[error("key '{key}' is bound to {registered}, which does not provide {expected}")]
    CapabilityMismatch {
        /// Key that was looked up
        key: InterfaceKey,
        /// Requested capability type
        expected: &'static str,
        /// Concrete type registered under the key
        registered: &'static str,
    },

    /// The registry was already closed.
    #[error("registry is closed")]
    Closed,
}

/// Errors a starter returns from `init`, `setup` or `run`.
#[derive(Debug, Error)]
pub enum StarterError {
    /// Bad or missing configuration/option during init.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A run-phase lookup found no matching capability.
    #[error("dependency missing: no {capability} joined under key '{key}'")]
    DependencyMissing {
        /// Key that was looked up
        key: InterfaceKey,
        /// Requested capability type
        capability: &'static str,
    },

    /// Lookup or join failed for a reason other than absence.
    #[error(transparent)]
    Registry(RegistryError),

    /// Setup could not provision a resource.
    #[error("provisioning failed: {reason}")]
    Provision {
        /// What could not be provisioned
        reason: String,
        /// Underlying cause
        #[source]
        source: Option<BoxError>,
    },

    /// The cancellation token fired or its deadline passed.
    #[error(transparent)]
    Cancelled(#[from] Cancelled),

    /// Any other component-specific failure.
    #[error("{0}")]
    Other(#[source] BoxError),
}

impl StarterError {
    /// Provisioning failure without an underlying cause.
    pub fn provision(reason: impl Into<String>) -> Self {
        Self::Provision {
            reason: reason.into(),
            source: None,
        }
    }

    /// Provisioning failure wrapping its cause.
    pub fn provision_with(
        reason: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Provision {
            reason: reason.into(),
            source: Some(source.into()),
        }
    }

    /// Wrap an arbitrary component error.
    pub fn other(source: impl Into<BoxError>) -> Self {
        Self::Other(source.into())
    }
}

impl From<RegistryError> for StarterError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound { key, capability } => {
                Self::DependencyMissing { key, capability }
            }
            other => Self::Registry(other),
        }
    }
}

/// Terminal bootstrap failure: which component failed, in which phase, and why.
#[derive(Debug, Error)]
#[error("{phase} failed for component '{component}': {source}")]
pub struct BootstrapError {
    /// Diagnostic name of the failing starter
    pub component: String,
    /// Phase that failed
    pub phase: Phase,
    /// Underlying cause
    #[source]
    pub source: StarterError,
}

/// One instance that failed to release its resources.
#[derive(Debug)]
pub struct CloseFailure {
    /// Key the instance was joined under
    pub key: InterfaceKey,
    /// Concrete type of the instance
    pub type_name: &'static str,
    /// Error returned by `close`
    pub source: BoxError,
}

/// Aggregate of every release failure seen by `close_all`.
#[derive(Debug)]
pub struct CloseError {
    /// Number of instances that had a close capability
    pub attempted: usize,
    /// Failures, in the order they were closed
    pub failures: Vec<CloseFailure>,
}

impl fmt::Display for CloseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} instance(s) failed to close",
            self.failures.len(),
            self.attempted
        )?;
        for (idx, failure) in self.failures.iter().enumerate() {
            let sep = if idx == 0 { ": " } else { "; " };
            write!(
                f,
                "{sep}'{}' ({}): {}",
                failure.key, failure.type_name, failure.source
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for CloseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.failures
            .first()
            .map(|failure| failure.source.as_ref() as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_becomes_dependency_missing() {
        let err: StarterError = RegistryError::NotFound {
            key: InterfaceKey::from_static("store"),
            capability: "dyn DataStore",
        }
        .into();
        assert!(matches!(err, StarterError::DependencyMissing { .. }));
        assert!(err.to_string().contains("'store'"));

        let err: StarterError = RegistryError::Closed.into();
        assert!(matches!(err, StarterError::Registry(RegistryError::Closed)));
    }

    #[test]
    fn bootstrap_error_names_component_and_phase() {
        let err = BootstrapError {
            component: "store_sqlite".to_string(),
            phase: Phase::Setup,
            source: StarterError::provision("schema"),
        };
        assert_eq!(
            err.to_string(),
            "setup failed for component 'store_sqlite': provisioning failed: schema"
        );
    }

    #[test]
    fn close_error_lists_failures() {
        let err = CloseError {
            attempted: 3,
            failures: vec![
                CloseFailure {
                    key: InterfaceKey::from_static("a"),
                    type_name: "A",
                    source: "flush".into(),
                },
                CloseFailure {
                    key: InterfaceKey::from_static("b"),
                    type_name: "B",
                    source: "socket".into(),
                },
            ],
        };
        assert_eq!(
            err.to_string(),
            "2 of 3 instance(s) failed to close: 'a' (A): flush; 'b' (B): socket"
        );
        assert!(std::error::Error::source(&err).is_some());
    }
}
