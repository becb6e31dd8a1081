//! Staged bootstrap.
//!
//! [`Orchestrator::run`] drives an ordered component list through three
//! global sweeps (init, setup, run) against one [`Registry`]. The first
//! error ends bootstrap: components after the failing one get no further
//! calls and earlier setup side effects are not undone. Instances already
//! joined into the partial registry are released with `close_all` before
//! the error is returned.

use std::sync::Arc;
use std::time::{Duration, Instant};

use joint_common::config::Configuration;
use joint_common::consts::DEFAULT_BUILD_LABEL;
use joint_common::options::Options;
use serde::Serialize;
use tracing::{debug, debug_span, info, warn};

use crate::cancel::CancelToken;
use crate::error::{BootstrapError, CloseError, StarterError};
use crate::logging::Logger;
use crate::registry::{Registry, RegistryView};
use crate::starter::{ComponentSpec, ComponentState, Context, Phase};

/// Builder and driver for one bootstrap.
///
/// ```rust
/// use joint_common::config::Configuration;
/// use joint_runtime::orchestrator::Orchestrator;
/// use joint_runtime::{ComponentSpec, logging};
///
/// let bootstrap = Orchestrator::new(vec![ComponentSpec::new(logging::starter())])
///     .with_label("DOC BUILD")
///     .run(&Configuration::default())
///     .unwrap();
/// assert_eq!(bootstrap.registry().len(), 1);
/// ```
#[derive(Debug)]
pub struct Orchestrator {
    specs: Vec<ComponentSpec>,
    args: Vec<String>,
    label: String,
    cancel: CancelToken,
    call_timeout: Option<Duration>,
}

impl Orchestrator {
    pub fn new(specs: Vec<ComponentSpec>) -> Self {
        Self {
            specs,
            args: Vec::new(),
            label: DEFAULT_BUILD_LABEL.to_string(),
            cancel: CancelToken::new(),
            call_timeout: None,
        }
    }

    /// Process arguments handed to every starter untouched.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Build label, used in logs only.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Token covering the whole bootstrap.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Deadline applied to each individual phase call.
    ///
    /// A call that is still running when its deadline passes fails with
    /// `Cancelled::DeadlineExceeded` once it returns, even if it returned
    /// `Ok`. Starters that poll `ctx.cancel` give up earlier.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Run init, setup and run over every component, in order.
    ///
    /// # Errors
    ///
    /// The first failing call, as a [`BootstrapError`] naming the component
    /// and phase.
    pub fn run(self, config: &Configuration) -> Result<Bootstrap, BootstrapError> {
        let started = Instant::now();
        let root = Logger::root(&self.label);
        let _entered = root.enter();

        info!(
            label = %self.label,
            components = self.specs.len(),
            "bootstrap starting"
        );

        let mut tracked: Vec<Tracked> = self
            .specs
            .into_iter()
            .map(|spec| Tracked {
                logger: root.component(spec.name()),
                spec,
                state: ComponentState::Created,
                sub_options: Vec::new(),
            })
            .collect();

        let env = Env {
            config,
            args: &self.args,
            label: &self.label,
            root: &root,
            cancel: &self.cancel,
            call_timeout: self.call_timeout,
        };
        let registry = Arc::new(Registry::new());

        let outcome = sweep(Phase::Init, &mut tracked, &env, |t, ctx, _| {
            let Tracked {
                spec, sub_options, ..
            } = t;
            *sub_options = spec.starter.init(ctx, &spec.options)?;
            if !sub_options.is_empty() {
                debug!(sub_options = sub_options.len(), "init returned sub-options");
            }
            Ok(())
        })
        .and_then(|()| {
            sweep(Phase::Setup, &mut tracked, &env, |t, ctx, _| {
                t.spec.starter.setup(ctx)
            })
        })
        .and_then(|()| {
            sweep(Phase::Run, &mut tracked, &env, |t, ctx, ordinal| {
                t.spec.starter.run(ctx, &RegistryView::new(&registry, ordinal))
            })
        });

        if let Err(e) = outcome {
            debug!(
                component = %e.component,
                phase = %e.phase,
                joined = registry.len(),
                "bootstrap aborted, releasing joined instances"
            );
            if let Err(close) = registry.close_all() {
                warn!("release after failed bootstrap: {}", close);
            }
            return Err(e);
        }

        info!(
            label = %self.label,
            components = tracked.len(),
            joined = registry.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "bootstrap complete"
        );

        Ok(Bootstrap {
            registry,
            components: tracked
                .into_iter()
                .map(|t| ComponentReport {
                    name: t.spec.name().to_string(),
                    state: t.state,
                    sub_options: t.sub_options,
                })
                .collect(),
        })
    }
}

/// Run `specs` with default cancellation and no call timeout.
pub fn run<I, S>(
    specs: Vec<ComponentSpec>,
    config: &Configuration,
    args: I,
    label: &str,
) -> Result<Bootstrap, BootstrapError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Orchestrator::new(specs)
        .with_args(args)
        .with_label(label)
        .run(config)
}

// ─── Sweeps ─────────────────────────────────────────────────────────

struct Tracked {
    spec: ComponentSpec,
    state: ComponentState,
    sub_options: Vec<Options>,
    logger: Logger,
}

/// Inputs shared by every call of a bootstrap.
struct Env<'a> {
    config: &'a Configuration,
    args: &'a [String],
    label: &'a str,
    root: &'a Logger,
    cancel: &'a CancelToken,
    call_timeout: Option<Duration>,
}

/// One full pass of `phase` over every component, stopping at the first
/// error.
fn sweep<F>(
    phase: Phase,
    tracked: &mut [Tracked],
    env: &Env<'_>,
    mut call: F,
) -> Result<(), BootstrapError>
where
    F: FnMut(&mut Tracked, &Context<'_>, usize) -> Result<(), StarterError>,
{
    let started = Instant::now();
    let _span = debug_span!(parent: env.root.span(), "phase", phase = %phase).entered();

    for (ordinal, t) in tracked.iter_mut().enumerate() {
        let cancel = match env.call_timeout {
            Some(timeout) => env.cancel.child_with_timeout(timeout),
            None => env.cancel.clone(),
        };
        let logger = t.logger.clone();

        let result = cancel
            .check()
            .map_err(StarterError::from)
            .and_then(|()| {
                let ctx = Context {
                    config: env.config,
                    logger: &logger,
                    cancel: &cancel,
                    args: env.args,
                    label: env.label,
                };
                logger.in_scope(|| call(&mut *t, &ctx, ordinal))
            })
            .and_then(|()| cancel.check().map_err(StarterError::from));

        if let Err(source) = result {
            warn!(component = %t.spec.name(), phase = %phase, "component failed: {}", source);
            return Err(BootstrapError {
                component: t.spec.name().to_string(),
                phase,
                source,
            });
        }

        t.state = ComponentState::after(phase);
        debug!(component = %t.spec.name(), state = %t.state, "component advanced");
    }

    info!(
        phase = %phase,
        components = tracked.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "phase complete"
    );
    Ok(())
}

// ─── Result ─────────────────────────────────────────────────────────

/// Final state of one component after bootstrap.
#[derive(Debug, Clone, Serialize)]
pub struct ComponentReport {
    /// Diagnostic name of the starter
    pub name: String,
    /// Lifecycle state
    pub state: ComponentState,
    /// Option maps returned by `init`
    pub sub_options: Vec<Options>,
}

/// A successfully wired process: the populated registry plus a report per
/// component.
#[derive(Debug)]
pub struct Bootstrap {
    registry: Arc<Registry>,
    components: Vec<ComponentReport>,
}

impl Bootstrap {
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Give up the reports and keep only the registry.
    pub fn into_registry(self) -> Arc<Registry> {
        self.registry
    }

    pub fn components(&self) -> &[ComponentReport] {
        &self.components
    }

    /// Option maps returned by the first component named `name`.
    pub fn sub_options(&self, name: &str) -> Option<&[Options]> {
        self.components
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.sub_options.as_slice())
    }

    /// Close every joined instance and mark all components closed.
    pub fn shutdown(&mut self) -> Result<(), CloseError> {
        let result = self.registry.close_all();
        for component in &mut self.components {
            component.state = ComponentState::Closed;
        }
        result
    }
}
