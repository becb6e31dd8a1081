//! The starter contract and the component list it rides on.

use std::fmt;

use joint_common::config::Configuration;
use joint_common::options::Options;
use serde::Serialize;

use crate::cancel::CancelToken;
use crate::error::StarterError;
use crate::logging::Logger;
use crate::registry::RegistryView;

// ─── Phases and states ──────────────────────────────────────────────

/// One bootstrap sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Parse and validate configuration and options.
    Init,
    /// Provision external resources.
    Setup,
    /// Resolve dependencies and join instances.
    Run,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Init => "init",
            Phase::Setup => "setup",
            Phase::Run => "run",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of one component.
///
/// `Created → Initialized → Provisioned → Running → Closed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentState {
    Created,
    Initialized,
    Provisioned,
    Running,
    Closed,
}

impl ComponentState {
    /// State reached once `phase` completes.
    pub fn after(phase: Phase) -> Self {
        match phase {
            Phase::Init => ComponentState::Initialized,
            Phase::Setup => ComponentState::Provisioned,
            Phase::Run => ComponentState::Running,
        }
    }
}

impl fmt::Display for ComponentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ComponentState::Created => "created",
            ComponentState::Initialized => "initialized",
            ComponentState::Provisioned => "provisioned",
            ComponentState::Running => "running",
            ComponentState::Closed => "closed",
        };
        f.write_str(s)
    }
}

// ─── Context ────────────────────────────────────────────────────────

/// Everything a starter receives in each phase besides its own options.
///
/// The logger is scoped to the component; nothing here is process-global.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    /// Process configuration, read-only.
    pub config: &'a Configuration,
    /// Logger for this component and phase.
    pub logger: &'a Logger,
    /// Cancellation token; poll it around blocking work.
    pub cancel: &'a CancelToken,
    /// Process arguments, passed through untouched.
    pub args: &'a [String],
    /// Build label, diagnostic only.
    pub label: &'a str,
}

// ─── Starter ────────────────────────────────────────────────────────

/// Lifecycle contract implemented by every feature module.
///
/// The orchestrator calls each method once, in three global sweeps: every
/// component's `init`, then every component's `setup`, then every
/// component's `run`. An error from any call ends bootstrap.
pub trait Starter: Send {
    /// Diagnostic name, used in logs and errors only.
    fn name(&self) -> &str;

    /// Parse configuration and per-instance options.
    ///
    /// Must not perform I/O or touch the registry. May return additional
    /// option maps for sub-components the starter manages.
    fn init(&mut self, ctx: &Context<'_>, options: &Options) -> Result<Vec<Options>, StarterError>;

    /// Provision external resources. Must be idempotent.
    fn setup(&mut self, _ctx: &Context<'_>) -> Result<(), StarterError> {
        Ok(())
    }

    /// Resolve dependencies from earlier components and join this
    /// component's instances.
    fn run(&mut self, ctx: &Context<'_>, registry: &RegistryView<'_>) -> Result<(), StarterError>;
}

impl fmt::Debug for dyn Starter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Starter").field("name", &self.name()).finish()
    }
}

// ─── ComponentSpec ──────────────────────────────────────────────────

/// A starter paired with its per-instance option overrides.
#[derive(Debug)]
pub struct ComponentSpec {
    pub(crate) starter: Box<dyn Starter>,
    pub(crate) options: Options,
}

impl ComponentSpec {
    /// Spec without option overrides.
    pub fn new(starter: impl Starter + 'static) -> Self {
        Self::with_options(starter, Options::new())
    }

    pub fn with_options(starter: impl Starter + 'static, options: Options) -> Self {
        Self {
            starter: Box::new(starter),
            options,
        }
    }

    /// Spec from an already boxed starter.
    pub fn boxed(starter: Box<dyn Starter>, options: Options) -> Self {
        Self { starter, options }
    }

    pub fn name(&self) -> &str {
        self.starter.name()
    }

    pub fn options(&self) -> &Options {
        &self.options
    }
}
