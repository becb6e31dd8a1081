//! # Joint Runtime
//!
//! Component orchestration for backends assembled from independently built
//! feature modules. Each module implements [`Starter`]; the caller lists the
//! modules in dependency order and the [`Orchestrator`] wires them together
//! through a typed capability [`Registry`].
//!
//! ## Bootstrap
//!
//! ```text
//!  specs: [logging, store, auth, server]
//!
//!  init   ──► logging ─► store ─► auth ─► server     parse + validate
//!  setup  ──► logging ─► store ─► auth ─► server     provision resources
//!  run    ──► logging ─► store ─► auth ─► server     look up + join
//!                │          │       │        │
//!                ▼          ▼       ▼        ▼
//!           ┌─────────────────────────────────────┐
//!           │ Registry  "logger" "store" "auth" … │
//!           └─────────────────────────────────────┘
//! ```
//!
//! Each phase is a full sweep over the list before the next one starts. A
//! component's `run` only sees what earlier components joined. The first
//! error aborts bootstrap with a [`BootstrapError`] naming the component and
//! phase.
//!
//! ## Shutdown
//!
//! [`Registry::close_all`] releases every instance that offers [`Close`], in
//! reverse join order, and reports all failures together. Wrap the registry
//! in a [`CloseGuard`] to run it on every exit path.
//!
//! ## Module Structure
//!
//! - [`registry`] - Capability registry, view and close guard
//! - [`starter`] - Starter contract, component spec, phases and states
//! - [`orchestrator`] - Three-phase bootstrap driver
//! - [`cancel`] - Cooperative cancellation token
//! - [`logging`] - Logger handle and the built-in logging starter
//! - [`error`] - Error types

pub mod cancel;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod registry;
pub mod starter;

pub use cancel::{CancelToken, Cancelled};
pub use error::{
    BootstrapError, BoxError, CloseError, CloseFailure, RegistryError, StarterError,
};
pub use logging::{LOGGER_KEY, Logger};
pub use orchestrator::{Bootstrap, ComponentReport, Orchestrator, run};
pub use registry::{
    Close, CloseGuard, InterfaceKey, JoinedComponent, Joinable, Registry, RegistryView,
};
pub use starter::{ComponentSpec, ComponentState, Context, Phase, Starter};

use static_assertions::assert_impl_all;

assert_impl_all!(Logger: Send, Sync, Clone);
assert_impl_all!(CancelToken: Send, Sync, Clone);
assert_impl_all!(ComponentSpec: Send);
