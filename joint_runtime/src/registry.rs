//! Capability registry (the "joiner").
//!
//! Components join instances under an [`InterfaceKey`]. Each joined instance
//! is described by a [`Joinable`]: the concrete handle plus every capability
//! view (`Arc<dyn Trait>`) it offers. Lookups are typed: the caller names the
//! capability it expects and gets an `Arc` of exactly that type back.
//!
//! # Lookup contract
//!
//! - [`Registry::interface`] is last-write-wins per key. An earlier binding
//!   under the same key is superseded and unreachable by key.
//! - [`Registry::interfaces_all`] scans the *full* join history in order,
//!   superseded bindings included.
//!
//! The two views are deliberately asymmetric: overwriting a key does not
//! remove the older instance from capability scans, and the older instance is
//! still closed by [`Registry::close_all`].
//!
//! # Visibility during bootstrap
//!
//! Starters reach the registry through a [`RegistryView`] bound to their
//! position in the component list. A view only sees instances joined by
//! components strictly before it (plus instances joined directly on the
//! registry), so causality runs forward only.
//!
//! # Concurrency
//!
//! All state sits behind one `parking_lot::RwLock`: lookups share the read
//! lock, joins and `close_all` take the write lock, so a reader observes a
//! registry either before or after a join, never in between.

use std::any::{Any, TypeId, type_name};
use std::borrow::{Borrow, Cow};
use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use static_assertions::assert_impl_all;
use tracing::{debug, error, info, warn};

use crate::error::{BoxError, CloseError, CloseFailure, RegistryError};

// ─── InterfaceKey ───────────────────────────────────────────────────

/// Symbolic name a component joins an instance under.
///
/// Keys exported as constants by feature modules are a compatibility
/// contract: renaming one breaks every consumer that looks it up.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct InterfaceKey(Cow<'static, str>);

impl InterfaceKey {
    /// Key from a string literal, usable in `const` items.
    pub const fn from_static(key: &'static str) -> Self {
        Self(Cow::Borrowed(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InterfaceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InterfaceKey {
    fn from(key: &str) -> Self {
        Self(Cow::Owned(key.to_string()))
    }
}

impl From<String> for InterfaceKey {
    fn from(key: String) -> Self {
        Self(Cow::Owned(key))
    }
}

impl From<&InterfaceKey> for InterfaceKey {
    fn from(key: &InterfaceKey) -> Self {
        key.clone()
    }
}

impl AsRef<str> for InterfaceKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for InterfaceKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// ─── Close capability ───────────────────────────────────────────────

/// Release capability.
///
/// Offered through [`Joinable::with_close`]. Called at most once per joined
/// instance, from [`Registry::close_all`].
pub trait Close: Send + Sync {
    /// Release resources held by the instance.
    fn close(&self) -> Result<(), BoxError>;
}

// ─── Joinable ───────────────────────────────────────────────────────

/// One capability view of a joined instance.
struct Provided {
    capability: TypeId,
    name: &'static str,
    /// Always an `Arc<C>` where `TypeId::of::<C>() == capability`.
    handle: Box<dyn Any + Send + Sync>,
}

/// An instance ready to be joined, with the capabilities it offers.
///
/// ```rust
/// use std::sync::Arc;
/// use joint_runtime::registry::{Joinable, Registry};
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
///
/// struct English;
/// impl Greeter for English {
///     fn greet(&self) -> String { "hello".into() }
/// }
///
/// let registry = Registry::new();
/// let english = Arc::new(English);
/// registry
///     .join(Joinable::new(english.clone()).provide::<dyn Greeter>(english), "greeter")
///     .unwrap();
///
/// let greeter = registry.interface::<dyn Greeter>("greeter").unwrap().unwrap();
/// assert_eq!(greeter.greet(), "hello");
/// ```
pub struct Joinable {
    type_name: &'static str,
    provided: Vec<Provided>,
}

impl Joinable {
    /// Wrap an instance. The concrete type `T` is always a capability.
    pub fn new<T: Send + Sync + 'static>(instance: Arc<T>) -> Self {
        Self {
            type_name: type_name::<T>(),
            provided: Vec::new(),
        }
        .provide::<T>(instance)
    }

    /// Offer `view` as capability `C` (usually a `dyn Trait`).
    ///
    /// Offering the same capability twice keeps the last view.
    pub fn provide<C>(mut self, view: Arc<C>) -> Self
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let capability = TypeId::of::<C>();
        self.provided.retain(|p| p.capability != capability);
        self.provided.push(Provided {
            capability,
            name: type_name::<C>(),
            handle: Box::new(view),
        });
        self
    }

    /// Offer the release capability.
    pub fn with_close(self, closer: Arc<dyn Close>) -> Self {
        self.provide::<dyn Close>(closer)
    }

    /// Concrete type name of the wrapped instance.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Whether capability `C` is offered.
    pub fn provides<C: ?Sized + 'static>(&self) -> bool {
        let capability = TypeId::of::<C>();
        self.provided.iter().any(|p| p.capability == capability)
    }

    fn view<C>(&self) -> Option<Arc<C>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let capability = TypeId::of::<C>();
        self.provided
            .iter()
            .find(|p| p.capability == capability)
            .and_then(|p| p.handle.downcast_ref::<Arc<C>>())
            .cloned()
    }

    fn capability_names(&self) -> Vec<&'static str> {
        self.provided.iter().map(|p| p.name).collect()
    }
}

impl fmt::Debug for Joinable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Joinable")
            .field("type_name", &self.type_name)
            .field("capabilities", &self.capability_names())
            .finish()
    }
}

// ─── Registry ───────────────────────────────────────────────────────

/// Which joins a lookup may observe.
#[derive(Debug, Clone, Copy)]
enum Visibility {
    /// Everything, e.g. after bootstrap.
    All,
    /// Joins by components with ordinal `< n`, plus direct joins.
    Before(usize),
}

struct Entry {
    key: InterfaceKey,
    /// Ordinal of the component whose run phase joined this entry.
    origin: Option<usize>,
    joinable: Joinable,
}

impl Entry {
    fn visible(&self, visibility: Visibility) -> bool {
        match (visibility, self.origin) {
            (Visibility::All, _) | (Visibility::Before(_), None) => true,
            (Visibility::Before(limit), Some(origin)) => origin < limit,
        }
    }
}

#[derive(Default)]
struct Inner {
    /// Join history, in order.
    entries: Vec<Entry>,
    /// Positions in `entries` per key, oldest first.
    by_key: HashMap<InterfaceKey, Vec<usize>>,
    closed: bool,
}

/// Snapshot of one joined instance, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinedComponent {
    /// Position in join order
    pub position: usize,
    /// Key it was joined under
    pub key: InterfaceKey,
    /// Concrete type name
    pub type_name: &'static str,
    /// Capability type names it offers
    pub capabilities: Vec<&'static str>,
    /// Whether it offers the close capability
    pub closable: bool,
    /// Whether a later join under the same key hides it from `interface`
    pub superseded: bool,
    /// Ordinal of the component that joined it, if joined during bootstrap
    pub joined_by: Option<usize>,
}

/// Table of joined capability instances.
///
/// Owns every joined instance until [`close_all`](Self::close_all).
#[derive(Default)]
pub struct Registry {
    inner: RwLock<Inner>,
}

assert_impl_all!(Registry: Send, Sync);
assert_impl_all!(Joinable: Send, Sync);

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join an instance under `key`, visible to every later lookup.
    ///
    /// # Errors
    ///
    /// `RegistryError::Closed` after `close_all`.
    pub fn join(
        &self,
        joinable: Joinable,
        key: impl Into<InterfaceKey>,
    ) -> Result<(), RegistryError> {
        self.insert(joinable, key.into(), None)
    }

    /// Most recent instance joined under `key`, as capability `C`.
    ///
    /// `Ok(None)` when nothing is joined under the key; this is a normal
    /// signal, the caller decides whether it is fatal.
    ///
    /// # Errors
    ///
    /// `RegistryError::CapabilityMismatch` when the most recent binding does
    /// not provide `C`.
    pub fn interface<C>(&self, key: impl AsRef<str>) -> Result<Option<Arc<C>>, RegistryError>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.lookup(key.as_ref(), Visibility::All)
    }

    /// Like [`interface`](Self::interface), but absence is an error.
    pub fn require<C>(&self, key: impl AsRef<str>) -> Result<Arc<C>, RegistryError>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        require(self.lookup(key.as_ref(), Visibility::All)?, key.as_ref())
    }

    /// Every joined instance providing `C`, with its key, in join order.
    pub fn interfaces_all<C>(&self) -> Vec<(InterfaceKey, Arc<C>)>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.scan(Visibility::All)
    }

    /// Number of joined instances, superseded ones included.
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.inner.read().closed
    }

    /// Diagnostic view of the join history.
    pub fn snapshot(&self) -> Vec<JoinedComponent> {
        let inner = self.inner.read();
        inner
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| {
                let latest = inner
                    .by_key
                    .get(&entry.key)
                    .and_then(|positions| positions.last().copied());
                JoinedComponent {
                    position,
                    key: entry.key.clone(),
                    type_name: entry.joinable.type_name,
                    capabilities: entry.joinable.capability_names(),
                    closable: entry.joinable.provides::<dyn Close>(),
                    superseded: latest != Some(position),
                    joined_by: entry.origin,
                }
            })
            .collect()
    }

    /// Close every joined instance that offers the close capability.
    ///
    /// Instances are closed in reverse join order, so dependents go before
    /// their dependencies. Every instance gets exactly one attempt regardless
    /// of earlier failures; all failures are returned together. The registry
    /// drops every instance afterwards and rejects further joins.
    ///
    /// A second call logs a warning and returns `Ok(())`.
    pub fn close_all(&self) -> Result<(), CloseError> {
        let entries = {
            let mut inner = self.inner.write();
            if inner.closed {
                warn!("close_all called on a registry that is already closed");
                return Ok(());
            }
            inner.closed = true;
            inner.by_key.clear();
            std::mem::take(&mut inner.entries)
        };

        let mut attempted = 0;
        let mut failures = Vec::new();
        for entry in entries.iter().rev() {
            let Some(closer) = entry.joinable.view::<dyn Close>() else {
                continue;
            };
            attempted += 1;
            match closer.close() {
                Ok(()) => debug!(key = %entry.key, type_name = entry.joinable.type_name, "closed"),
                Err(source) => {
                    warn!(
                        key = %entry.key,
                        type_name = entry.joinable.type_name,
                        error = %source,
                        "close failed"
                    );
                    failures.push(CloseFailure {
                        key: entry.key.clone(),
                        type_name: entry.joinable.type_name,
                        source,
                    });
                }
            }
        }
        drop(entries);

        info!(
            attempted,
            failed = failures.len(),
            "registry closed"
        );
        if failures.is_empty() {
            Ok(())
        } else {
            Err(CloseError {
                attempted,
                failures,
            })
        }
    }

    /// Guard that runs [`close_all`](Self::close_all) when dropped.
    pub fn close_on_drop(self: &Arc<Self>) -> CloseGuard {
        CloseGuard {
            registry: Arc::clone(self),
        }
    }

    fn insert(
        &self,
        joinable: Joinable,
        key: InterfaceKey,
        origin: Option<usize>,
    ) -> Result<(), RegistryError> {
        let mut inner = self.inner.write();
        if inner.closed {
            return Err(RegistryError::Closed);
        }
        let position = inner.entries.len();
        let superseding = inner.by_key.contains_key(&key);
        debug!(
            key = %key,
            type_name = joinable.type_name,
            position,
            superseding,
            "joined"
        );
        inner.by_key.entry(key.clone()).or_default().push(position);
        inner.entries.push(Entry {
            key,
            origin,
            joinable,
        });
        Ok(())
    }

    fn lookup<C>(&self, key: &str, visibility: Visibility) -> Result<Option<Arc<C>>, RegistryError>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let inner = self.inner.read();
        let Some(positions) = inner.by_key.get(key) else {
            return Ok(None);
        };
        let Some(entry) = positions
            .iter()
            .rev()
            .map(|&position| &inner.entries[position])
            .find(|entry| entry.visible(visibility))
        else {
            return Ok(None);
        };
        entry
            .joinable
            .view::<C>()
            .map(Some)
            .ok_or_else(|| RegistryError::CapabilityMismatch {
                key: entry.key.clone(),
                expected: type_name::<C>(),
                registered: entry.joinable.type_name,
            })
    }

    fn scan<C>(&self, visibility: Visibility) -> Vec<(InterfaceKey, Arc<C>)>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let inner = self.inner.read();
        inner
            .entries
            .iter()
            .filter(|entry| entry.visible(visibility))
            .filter_map(|entry| entry.joinable.view::<C>().map(|view| (entry.key.clone(), view)))
            .collect()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("Registry")
            .field("entries", &inner.entries.len())
            .field("keys", &inner.by_key.len())
            .field("closed", &inner.closed)
            .finish()
    }
}

fn require<C: ?Sized>(found: Option<Arc<C>>, key: &str) -> Result<Arc<C>, RegistryError> {
    found.ok_or_else(|| RegistryError::NotFound {
        key: InterfaceKey::from(key),
        capability: type_name::<C>(),
    })
}

// ─── RegistryView ───────────────────────────────────────────────────

/// The registry as seen by one component's run phase.
///
/// Lookups only observe instances joined by components ordered before this
/// one; joins are attributed to this component.
#[derive(Debug, Clone, Copy)]
pub struct RegistryView<'a> {
    registry: &'a Arc<Registry>,
    ordinal: usize,
}

impl<'a> RegistryView<'a> {
    pub(crate) fn new(registry: &'a Arc<Registry>, ordinal: usize) -> Self {
        Self { registry, ordinal }
    }

    /// See [`Registry::interface`].
    pub fn interface<C>(&self, key: impl AsRef<str>) -> Result<Option<Arc<C>>, RegistryError>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.registry
            .lookup(key.as_ref(), Visibility::Before(self.ordinal))
    }

    /// See [`Registry::require`].
    pub fn require<C>(&self, key: impl AsRef<str>) -> Result<Arc<C>, RegistryError>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        require(self.interface(key.as_ref())?, key.as_ref())
    }

    /// See [`Registry::interfaces_all`].
    pub fn interfaces_all<C>(&self) -> Vec<(InterfaceKey, Arc<C>)>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.registry.scan(Visibility::Before(self.ordinal))
    }

    /// Join an instance produced by this component.
    pub fn join(
        &self,
        joinable: Joinable,
        key: impl Into<InterfaceKey>,
    ) -> Result<(), RegistryError> {
        self.registry
            .insert(joinable, key.into(), Some(self.ordinal))
    }
}

// ─── CloseGuard ─────────────────────────────────────────────────────

/// Runs [`Registry::close_all`] on drop and logs the aggregate error.
#[must_use = "dropping the guard closes the registry immediately"]
pub struct CloseGuard {
    registry: Arc<Registry>,
}

impl CloseGuard {
    /// Close now and report the result instead of logging it.
    pub fn close(self) -> Result<(), CloseError> {
        self.registry.close_all()
    }
}

impl Deref for CloseGuard {
    type Target = Arc<Registry>;

    fn deref(&self) -> &Self::Target {
        &self.registry
    }
}

impl Drop for CloseGuard {
    fn drop(&mut self) {
        if self.registry.is_closed() {
            return;
        }
        if let Err(e) = self.registry.close_all() {
            error!("shutdown completed with release errors: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    trait Speak: Send + Sync {
        fn speak(&self) -> String;
    }

    trait Count: Send + Sync {
        fn count(&self) -> usize;
    }

    struct Parrot(&'static str);

    impl Speak for Parrot {
        fn speak(&self) -> String {
            self.0.to_string()
        }
    }

    struct Counter(usize);

    impl Count for Counter {
        fn count(&self) -> usize {
            self.0
        }
    }

    fn speaker(word: &'static str) -> Joinable {
        let parrot = Arc::new(Parrot(word));
        Joinable::new(parrot.clone()).provide::<dyn Speak>(parrot)
    }

    fn counter(n: usize) -> Joinable {
        let counter = Arc::new(Counter(n));
        Joinable::new(counter.clone()).provide::<dyn Count>(counter)
    }

    #[derive(Default)]
    struct Tracked {
        closes: AtomicUsize,
        fail: bool,
    }

    impl Close for Tracked {
        fn close(&self) -> Result<(), BoxError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err("release failed".into())
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn interface_is_last_write_wins() {
        let registry = Registry::new();
        registry.join(speaker("x"), "k").unwrap();
        registry.join(speaker("y"), "k").unwrap();

        let found = registry.interface::<dyn Speak>("k").unwrap().unwrap();
        assert_eq!(found.speak(), "y");
    }

    #[test]
    fn superseded_binding_stays_in_scans() {
        let registry = Registry::new();
        registry.join(speaker("x"), "k").unwrap();
        registry.join(speaker("y"), "k").unwrap();

        let all: Vec<String> = registry
            .interfaces_all::<dyn Speak>()
            .into_iter()
            .map(|(_, s)| s.speak())
            .collect();
        assert_eq!(all, vec!["x", "y"]);

        let snapshot = registry.snapshot();
        assert!(snapshot[0].superseded);
        assert!(!snapshot[1].superseded);
    }

    #[test]
    fn capability_scan_ignores_keys() {
        let registry = Registry::new();
        registry.join(speaker("a"), "k1").unwrap();
        registry.join(counter(2), "k2").unwrap();
        registry.join(speaker("c"), "k3").unwrap();

        let found = registry.interfaces_all::<dyn Speak>();
        let keys: Vec<&str> = found.iter().map(|(k, _)| k.as_str()).collect();
        let words: Vec<String> = found.iter().map(|(_, s)| s.speak()).collect();
        assert_eq!(keys, vec!["k1", "k3"]);
        assert_eq!(words, vec!["a", "c"]);

        let counters = registry.interfaces_all::<dyn Count>();
        assert_eq!(counters.len(), 1);
        assert_eq!(counters[0].1.count(), 2);
    }

    #[test]
    fn missing_key_is_not_an_error() {
        let registry = Registry::new();
        assert!(registry.interface::<dyn Speak>("nope").unwrap().is_none());
        assert!(matches!(
            registry.require::<dyn Speak>("nope"),
            Err(RegistryError::NotFound { .. })
        ));
    }

    #[test]
    fn wrong_capability_is_a_typed_error() {
        let registry = Registry::new();
        registry.join(counter(1), "store").unwrap();

        match registry.interface::<dyn Speak>("store") {
            Err(RegistryError::CapabilityMismatch {
                key,
                expected,
                registered,
            }) => {
                assert_eq!(key.as_str(), "store");
                assert!(expected.contains("Speak"));
                assert!(registered.contains("Counter"));
            }
            other => panic!("expected mismatch, got {:?}", other.map(|o| o.is_some())),
        }
    }

    #[test]
    fn concrete_type_is_always_a_capability() {
        let registry = Registry::new();
        registry.join(counter(5), "c").unwrap();
        let concrete = registry.interface::<Counter>("c").unwrap().unwrap();
        assert_eq!(concrete.0, 5);
    }

    #[test]
    fn close_all_attempts_every_instance() {
        let registry = Registry::new();
        let tracked: Vec<Arc<Tracked>> = (0..5)
            .map(|i| {
                Arc::new(Tracked {
                    fail: i == 2,
                    ..Default::default()
                })
            })
            .collect();
        for (i, t) in tracked.iter().enumerate() {
            registry
                .join(Joinable::new(t.clone()).with_close(t.clone()), format!("t{i}"))
                .unwrap();
        }
        // Not closable; must be skipped.
        registry.join(speaker("quiet"), "quiet").unwrap();

        let err = registry.close_all().unwrap_err();
        assert_eq!(err.attempted, 5);
        assert_eq!(err.failures.len(), 1);
        assert_eq!(err.failures[0].key.as_str(), "t2");
        for t in &tracked {
            assert_eq!(t.closes.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn close_all_runs_in_reverse_join_order() {
        struct Ordered {
            id: usize,
            log: Arc<parking_lot::Mutex<Vec<usize>>>,
        }
        impl Close for Ordered {
            fn close(&self) -> Result<(), BoxError> {
                self.log.lock().push(self.id);
                Ok(())
            }
        }

        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let registry = Registry::new();
        for id in 0..3 {
            let item = Arc::new(Ordered {
                id,
                log: log.clone(),
            });
            registry
                .join(Joinable::new(item.clone()).with_close(item), "same")
                .unwrap();
        }
        registry.close_all().unwrap();
        assert_eq!(*log.lock(), vec![2, 1, 0]);
    }

    #[test]
    fn second_close_is_harmless() {
        let registry = Registry::new();
        let t = Arc::new(Tracked::default());
        registry
            .join(Joinable::new(t.clone()).with_close(t.clone()), "t")
            .unwrap();

        registry.close_all().unwrap();
        registry.close_all().unwrap();
        assert_eq!(t.closes.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());
        assert_eq!(registry.join(speaker("late"), "late"), Err(RegistryError::Closed));
    }

    #[test]
    fn view_hides_later_components() {
        let registry = Arc::new(Registry::new());
        registry.join(speaker("seed"), "seed").unwrap();

        let first = RegistryView::new(&registry, 0);
        let second = RegistryView::new(&registry, 1);
        second.join(speaker("late"), "k").unwrap();

        // Component 0 cannot see what component 1 joined.
        assert!(first.interface::<dyn Speak>("k").unwrap().is_none());
        assert_eq!(first.interfaces_all::<dyn Speak>().len(), 1);
        // Direct joins are visible to everyone.
        assert!(first.interface::<dyn Speak>("seed").unwrap().is_some());
        // Nor can component 1 see its own joins.
        assert!(second.interface::<dyn Speak>("k").unwrap().is_none());
        // A later component can.
        let third = RegistryView::new(&registry, 2);
        assert_eq!(third.require::<dyn Speak>("k").unwrap().speak(), "late");
    }

    #[test]
    fn view_falls_back_to_older_visible_binding() {
        let registry = Arc::new(Registry::new());
        RegistryView::new(&registry, 0).join(speaker("old"), "k").unwrap();
        RegistryView::new(&registry, 2).join(speaker("new"), "k").unwrap();

        let middle = RegistryView::new(&registry, 1);
        assert_eq!(middle.require::<dyn Speak>("k").unwrap().speak(), "old");
        assert_eq!(registry.require::<dyn Speak>("k").unwrap().speak(), "new");
    }

    #[test]
    fn guard_closes_on_drop() {
        let registry = Arc::new(Registry::new());
        let t = Arc::new(Tracked::default());
        registry
            .join(Joinable::new(t.clone()).with_close(t.clone()), "t")
            .unwrap();
        {
            let guard = registry.close_on_drop();
            assert_eq!(guard.len(), 1);
        }
        assert!(registry.is_closed());
        assert_eq!(t.closes.load(Ordering::SeqCst), 1);
    }
}
