//! Session-scoped selector of the active tenant.
//!
//! [`TenantScope`] holds one `Option<TenantId>` for the lifetime of a session,
//! persists it through a [`TenantStore`], and fans every change out to its
//! subscribers.
//!
//! ## Guarantees
//!
//! - `get()` right after a completed `set()` observes the new value.
//! - Setting the current value again is a no-op: no write, no notification.
//! - The store write happens together with the in-memory update, so the
//!   persisted value always matches the last completed `set()`.
//! - Listeners run synchronously, after the internal lock is released, so a
//!   listener may call back into the scope. Changes made while listeners are
//!   running are queued and delivered in order once the current round ends:
//!   every subscriber's last notification names the current tenant.
//! - A failed persistence write is logged and otherwise ignored; the in-memory
//!   value and notifications are unaffected.
//!
//! Listeners that need the scope should capture a [`WeakTenantScope`]: the
//! scope owns its listeners, so a captured strong handle keeps it alive
//! forever.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use serde::Serialize;

use crm_core::TenantId;

use crate::store::{InMemoryTenantStore, TenantStore};

/// Where the current value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantOrigin {
    /// Nothing selected yet.
    Unset,
    /// Restored from the durable store at startup.
    Persisted,
    /// Chosen by the user (tenant picker).
    Explicit,
    /// Taken from the URL parameter.
    UrlOverride,
    /// Explicitly cleared.
    Cleared,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantState {
    pub tenant_id: Option<TenantId>,
    pub origin: TenantOrigin,
}

/// Payload delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantChange {
    pub previous: Option<TenantId>,
    pub current: Option<TenantId>,
    pub origin: TenantOrigin,
}

type Listener = Arc<dyn Fn(&TenantChange) + Send + Sync>;

struct Inner {
    state: TenantState,
    listeners: Vec<(u64, Listener)>,
    next_listener_id: u64,
    pending: VecDeque<TenantChange>,
    dispatching: bool,
    // URL override held in memory only until `confirm_override`.
    unconfirmed_override: bool,
}

/// Something that can report which tenant it currently acts for.
pub trait TenantScoped {
    fn active_tenant(&self) -> Option<TenantId>;
}

/// Handle to the active-tenant cell. Clones share the same cell.
#[derive(Clone)]
pub struct TenantScope {
    inner: Arc<Mutex<Inner>>,
    store: Arc<dyn TenantStore>,
}

impl core::fmt::Debug for TenantScope {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TenantScope")
            .field("state", &self.state())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl TenantScope {
    /// Start a scope from the store and an optional URL override.
    ///
    /// The URL value always wins over the persisted one and is written back,
    /// so a later reload without the parameter restores it.
    pub fn bootstrap(store: Arc<dyn TenantStore>, url_override: Option<TenantId>) -> Self {
        Self::start(store, url_override, true)
    }

    /// Like [`TenantScope::bootstrap`], but the URL value is only held in
    /// memory until [`TenantScope::confirm_override`] writes it back.
    ///
    /// Used when the caller does not yet know whether the user may switch
    /// tenants at all.
    pub fn bootstrap_deferred(store: Arc<dyn TenantStore>, url_override: Option<TenantId>) -> Self {
        Self::start(store, url_override, false)
    }

    fn start(
        store: Arc<dyn TenantStore>,
        url_override: Option<TenantId>,
        persist_override: bool,
    ) -> Self {
        let persisted = match store.load() {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "could not read persisted tenant; starting unset");
                None
            }
        };

        let mut unconfirmed_override = false;
        let state = match (url_override, persisted) {
            (Some(from_url), persisted) => {
                if persisted.as_ref() != Some(&from_url) {
                    if persist_override {
                        if let Err(e) = store.save(Some(&from_url)) {
                            tracing::warn!(error = %e, tenant_id = %from_url, "could not persist url tenant");
                        }
                    } else {
                        unconfirmed_override = true;
                    }
                }
                TenantState {
                    tenant_id: Some(from_url),
                    origin: TenantOrigin::UrlOverride,
                }
            }
            (None, Some(persisted)) => TenantState {
                tenant_id: Some(persisted),
                origin: TenantOrigin::Persisted,
            },
            (None, None) => TenantState {
                tenant_id: None,
                origin: TenantOrigin::Unset,
            },
        };

        tracing::debug!(
            tenant_id = ?state.tenant_id,
            origin = ?state.origin,
            unconfirmed_override,
            "tenant scope started"
        );

        Self {
            inner: Arc::new(Mutex::new(Inner {
                state,
                listeners: Vec::new(),
                next_listener_id: 0,
                pending: VecDeque::new(),
                dispatching: false,
                unconfirmed_override,
            })),
            store,
        }
    }

    /// Scope over a fresh in-memory store (tests/dev).
    pub fn in_memory() -> Self {
        Self::bootstrap(Arc::new(InMemoryTenantStore::new()), None)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Listeners never run under the lock, so a poisoned guard still holds
        // a consistent state.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self) -> Option<TenantId> {
        self.lock().state.tenant_id.clone()
    }

    pub fn state(&self) -> TenantState {
        self.lock().state.clone()
    }

    /// Select (or clear, with `None`) the active tenant.
    ///
    /// Returns `false` when the value was already current.
    pub fn set(&self, tenant_id: Option<TenantId>) -> bool {
        let origin = if tenant_id.is_some() {
            TenantOrigin::Explicit
        } else {
            TenantOrigin::Cleared
        };
        self.set_from(origin, tenant_id)
    }

    pub fn set_from(&self, origin: TenantOrigin, tenant_id: Option<TenantId>) -> bool {
        {
            let mut inner = self.lock();
            if inner.state.tenant_id == tenant_id {
                return false;
            }

            let previous = inner.state.tenant_id.take();
            inner.state = TenantState {
                tenant_id: tenant_id.clone(),
                origin,
            };
            inner.unconfirmed_override = false;

            // Saved under the lock: concurrent writers persist in the same
            // order they update memory.
            self.persist(tenant_id.as_ref());

            tracing::debug!(
                previous = ?previous,
                current = ?tenant_id,
                origin = ?origin,
                subscribers = inner.listeners.len(),
                "active tenant changed"
            );

            inner.pending.push_back(TenantChange {
                previous,
                current: tenant_id,
                origin,
            });
            if inner.dispatching {
                // The running round delivers it after the current change.
                return true;
            }
            inner.dispatching = true;
        }

        self.dispatch();
        true
    }

    /// Deliver queued changes until none are left.
    fn dispatch(&self) {
        let mut round = DispatchRound { scope: self };
        while let Some((change, listeners)) = round.next() {
            for listener in listeners {
                listener(&change);
            }
        }
    }

    fn persist(&self, tenant_id: Option<&TenantId>) {
        if let Err(e) = self.store.save(tenant_id) {
            tracing::warn!(error = %e, tenant_id = ?tenant_id, "could not persist tenant selection");
        }
    }

    /// Write back a URL override held by [`TenantScope::bootstrap_deferred`].
    ///
    /// Returns `true` when a write was attempted.
    pub fn confirm_override(&self) -> bool {
        let mut inner = self.lock();
        if !inner.unconfirmed_override {
            return false;
        }
        inner.unconfirmed_override = false;
        self.persist(inner.state.tenant_id.as_ref());
        tracing::debug!(tenant_id = ?inner.state.tenant_id, "url tenant confirmed");
        true
    }

    /// Whether a URL override is still waiting for [`TenantScope::confirm_override`].
    pub fn has_unconfirmed_override(&self) -> bool {
        self.lock().unconfirmed_override
    }

    /// Register a listener for every subsequent change.
    ///
    /// The listener stays registered until the returned [`Subscription`] is
    /// dropped or explicitly unsubscribed.
    #[must_use = "dropping the subscription unsubscribes the listener"]
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&TenantChange) + Send + Sync + 'static,
    {
        let mut inner = self.lock();
        let id = inner.next_listener_id;
        inner.next_listener_id += 1;
        inner.listeners.push((id, Arc::new(listener)));

        Subscription {
            scope: Arc::downgrade(&self.inner),
            id,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().listeners.len()
    }

    /// Non-owning handle, for listeners that call back into the scope.
    pub fn downgrade(&self) -> WeakTenantScope {
        WeakTenantScope {
            inner: Arc::downgrade(&self.inner),
            store: self.store.clone(),
        }
    }
}

impl TenantScoped for TenantScope {
    fn active_tenant(&self) -> Option<TenantId> {
        self.get()
    }
}

/// One dispatch pass over the pending queue.
///
/// Clears the dispatching flag when the queue runs dry, or when a listener
/// panics so later changes are still delivered.
struct DispatchRound<'a> {
    scope: &'a TenantScope,
}

impl DispatchRound<'_> {
    fn next(&mut self) -> Option<(TenantChange, Vec<Listener>)> {
        let mut inner = self.scope.lock();
        match inner.pending.pop_front() {
            Some(change) => {
                let listeners = inner.listeners.iter().map(|(_, l)| l.clone()).collect();
                Some((change, listeners))
            }
            None => {
                inner.dispatching = false;
                None
            }
        }
    }
}

impl Drop for DispatchRound<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            let mut inner = self.scope.lock();
            inner.pending.clear();
            inner.dispatching = false;
        }
    }
}

/// Weak counterpart of [`TenantScope`]; see [`TenantScope::downgrade`].
#[derive(Clone)]
pub struct WeakTenantScope {
    inner: Weak<Mutex<Inner>>,
    store: Arc<dyn TenantStore>,
}

impl WeakTenantScope {
    pub fn upgrade(&self) -> Option<TenantScope> {
        Some(TenantScope {
            inner: self.inner.upgrade()?,
            store: self.store.clone(),
        })
    }
}

impl core::fmt::Debug for WeakTenantScope {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WeakTenantScope")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

/// Disposer returned by [`TenantScope::subscribe`].
pub struct Subscription {
    scope: Weak<Mutex<Inner>>,
    id: u64,
}

impl core::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Subscription {
    pub fn unsubscribe(self) {
        // Removal happens in Drop.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cell) = self.scope.upgrade() {
            let mut inner = cell.lock().unwrap_or_else(|e| e.into_inner());
            inner.listeners.retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    fn tenant(id: &str) -> TenantId {
        TenantId::new(id).unwrap()
    }

    fn recorder(scope: &TenantScope) -> (Arc<Mutex<Vec<Option<TenantId>>>>, Subscription) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let sub = scope.subscribe(move |change| {
            sink.lock().unwrap().push(change.current.clone());
        });
        (seen, sub)
    }

    #[test]
    fn empty_start_then_set_notifies_once() {
        let scope = TenantScope::in_memory();
        assert_eq!(scope.get(), None);
        assert_eq!(scope.state().origin, TenantOrigin::Unset);

        let (seen, _sub) = recorder(&scope);
        assert!(scope.set(Some(tenant("tenant-42"))));

        assert_eq!(scope.get(), Some(tenant("tenant-42")));
        assert_eq!(*seen.lock().unwrap(), vec![Some(tenant("tenant-42"))]);
    }

    #[test]
    fn setting_the_same_value_twice_notifies_once() {
        let store = InMemoryTenantStore::new();
        let scope = TenantScope::bootstrap(Arc::new(store.clone()), None);
        let (seen, _sub) = recorder(&scope);

        assert!(scope.set(Some(tenant("x"))));
        assert!(!scope.set(Some(tenant("x"))));

        assert_eq!(seen.lock().unwrap().len(), 1);
        assert_eq!(store.writes(), 1);
    }

    #[test]
    fn fan_out_reaches_every_subscriber() {
        let scope = TenantScope::in_memory();
        let (a, _sa) = recorder(&scope);
        let (b, sb) = recorder(&scope);
        let (c, _sc) = recorder(&scope);

        scope.set(Some(tenant("x")));
        assert_eq!(a.lock().unwrap().len(), 1);
        assert_eq!(b.lock().unwrap().len(), 1);
        assert_eq!(c.lock().unwrap().len(), 1);

        sb.unsubscribe();
        assert_eq!(scope.subscriber_count(), 2);

        scope.set(Some(tenant("y")));
        assert_eq!(a.lock().unwrap().len(), 2);
        assert_eq!(b.lock().unwrap().len(), 1);
        assert_eq!(c.lock().unwrap().len(), 2);
    }

    #[test]
    fn dropping_a_subscription_unsubscribes() {
        let scope = TenantScope::in_memory();
        let calls = Arc::new(AtomicUsize::new(0));
        {
            let calls = calls.clone();
            let _sub = scope.subscribe(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            });
        }

        scope.set(Some(tenant("x")));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(scope.subscriber_count(), 0);
    }

    #[test]
    fn url_override_wins_and_is_remembered() {
        let store = InMemoryTenantStore::with_value(tenant("A"));

        let scope = TenantScope::bootstrap(Arc::new(store.clone()), Some(tenant("B")));
        assert_eq!(scope.get(), Some(tenant("B")));
        assert_eq!(scope.state().origin, TenantOrigin::UrlOverride);

        // Reload without the URL parameter.
        let reloaded = TenantScope::bootstrap(Arc::new(store), None);
        assert_eq!(reloaded.get(), Some(tenant("B")));
        assert_eq!(reloaded.state().origin, TenantOrigin::Persisted);
    }

    #[test]
    fn persisted_value_seeds_the_scope() {
        let store = InMemoryTenantStore::with_value(tenant("A"));
        let scope = TenantScope::bootstrap(Arc::new(store), None);
        assert_eq!(scope.get(), Some(tenant("A")));
    }

    #[test]
    fn storage_failure_does_not_block_update_or_notification() {
        let store = InMemoryTenantStore::new();
        store.set_fail_writes(true);
        let scope = TenantScope::bootstrap(Arc::new(store.clone()), None);
        let (seen, _sub) = recorder(&scope);

        assert!(scope.set(Some(tenant("x"))));
        assert_eq!(scope.get(), Some(tenant("x")));
        assert_eq!(seen.lock().unwrap().len(), 1);
        assert_eq!(store.value(), None);
    }

    #[test]
    fn clearing_records_origin_and_previous_value() {
        let scope = TenantScope::in_memory();
        let last = Arc::new(Mutex::new(None));
        let sink = last.clone();
        let _sub = scope.subscribe(move |change| {
            *sink.lock().unwrap() = Some(change.clone());
        });

        scope.set(Some(tenant("x")));
        scope.set(None);

        let change = last.lock().unwrap().clone().unwrap();
        assert_eq!(change.previous, Some(tenant("x")));
        assert_eq!(change.current, None);
        assert_eq!(change.origin, TenantOrigin::Cleared);
        assert_eq!(scope.state().origin, TenantOrigin::Cleared);
    }

    #[test]
    fn listener_observes_new_value_and_may_reenter() {
        let scope = TenantScope::in_memory();
        let observed = Arc::new(Mutex::new(None));

        let handle = scope.downgrade();
        let sink = observed.clone();
        let _sub = scope.subscribe(move |_| {
            let Some(scope) = handle.upgrade() else { return };
            *sink.lock().unwrap() = scope.get();
            // Same-value set from inside a listener is a no-op.
            assert!(!scope.set(scope.get()));
        });

        scope.set(Some(tenant("x")));
        assert_eq!(*observed.lock().unwrap(), Some(tenant("x")));
    }

    #[test]
    fn change_made_by_a_listener_reaches_later_subscribers_last() {
        let scope = TenantScope::in_memory();

        let handle = scope.downgrade();
        let _redirect = scope.subscribe(move |change| {
            if change.current == Some(tenant("x")) {
                if let Some(scope) = handle.upgrade() {
                    assert!(scope.set(Some(tenant("y"))));
                }
            }
        });
        let (seen, _sub) = recorder(&scope);

        scope.set(Some(tenant("x")));

        assert_eq!(scope.get(), Some(tenant("y")));
        let seen = seen.lock().unwrap();
        assert_eq!(*seen, vec![Some(tenant("x")), Some(tenant("y"))]);
        assert_eq!(seen.last().cloned().flatten(), scope.get());
    }

    #[test]
    fn queued_changes_carry_the_right_previous_value() {
        let scope = TenantScope::in_memory();

        let handle = scope.downgrade();
        let _redirect = scope.subscribe(move |change| {
            if change.current == Some(tenant("x")) {
                if let Some(scope) = handle.upgrade() {
                    scope.set(Some(tenant("y")));
                }
            }
        });
        let changes = Arc::new(Mutex::new(Vec::new()));
        let sink = changes.clone();
        let _sub = scope.subscribe(move |change| sink.lock().unwrap().push(change.clone()));

        scope.set(Some(tenant("x")));

        let changes = changes.lock().unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].previous, None);
        assert_eq!(changes[1].previous, Some(tenant("x")));
        assert_eq!(changes[1].current, Some(tenant("y")));
    }

    #[test]
    fn panicking_listener_does_not_stall_later_notifications() {
        let scope = TenantScope::in_memory();
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        let _sub = scope.subscribe(move |change| {
            counter.fetch_add(1, Ordering::SeqCst);
            if change.current == Some(tenant("boom")) {
                panic!("listener failed");
            }
        });

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| scope.set(Some(tenant("boom")))));
        assert!(outcome.is_err());
        assert_eq!(scope.get(), Some(tenant("boom")));

        assert!(scope.set(Some(tenant("calm"))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn weak_handle_in_listener_does_not_keep_scope_alive() {
        let scope = TenantScope::in_memory();
        let weak = scope.downgrade();

        let handle = scope.downgrade();
        let _sub = scope.subscribe(move |_| {
            let _ = handle.upgrade().map(|s| s.get());
        });

        drop(scope);
        assert!(weak.upgrade().is_none());
    }

    /// Store whose first write blocks until released.
    struct GatedStore {
        inner: InMemoryTenantStore,
        entered: Mutex<Option<mpsc::Sender<()>>>,
        release: Mutex<Option<mpsc::Receiver<()>>>,
    }

    impl TenantStore for GatedStore {
        fn load(&self) -> Result<Option<TenantId>, crate::StoreError> {
            self.inner.load()
        }

        fn save(&self, tenant_id: Option<&TenantId>) -> Result<(), crate::StoreError> {
            if let Some(entered) = self.entered.lock().unwrap().take() {
                entered.send(()).unwrap();
                if let Some(release) = self.release.lock().unwrap().take() {
                    release.recv().unwrap();
                }
            }
            self.inner.save(tenant_id)
        }
    }

    #[test]
    fn overlapping_sets_persist_in_update_order() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let memory = InMemoryTenantStore::new();
        let store = Arc::new(GatedStore {
            inner: memory.clone(),
            entered: Mutex::new(Some(entered_tx)),
            release: Mutex::new(Some(release_rx)),
        });
        let scope = TenantScope::bootstrap(store, None);

        let first = {
            let scope = scope.clone();
            thread::spawn(move || scope.set(Some(tenant("x"))))
        };
        entered_rx.recv().unwrap();

        let second = {
            let scope = scope.clone();
            thread::spawn(move || scope.set(Some(tenant("y"))))
        };
        thread::sleep(Duration::from_millis(50));
        release_tx.send(()).unwrap();

        assert!(first.join().unwrap());
        assert!(second.join().unwrap());

        assert_eq!(scope.get(), Some(tenant("y")));
        assert_eq!(memory.value(), scope.get());
    }

    #[test]
    fn deferred_override_is_not_written_until_confirmed() {
        let store = InMemoryTenantStore::with_value(tenant("A"));

        let scope = TenantScope::bootstrap_deferred(Arc::new(store.clone()), Some(tenant("B")));
        assert_eq!(scope.get(), Some(tenant("B")));
        assert!(scope.has_unconfirmed_override());
        assert_eq!(store.value(), Some(tenant("A")));

        assert!(scope.confirm_override());
        assert!(!scope.confirm_override());
        assert_eq!(store.value(), Some(tenant("B")));
    }

    #[test]
    fn unconfirmed_override_is_forgotten_on_reload() {
        let store = InMemoryTenantStore::with_value(tenant("A"));

        let scope = TenantScope::bootstrap_deferred(Arc::new(store.clone()), Some(tenant("B")));
        drop(scope);

        let reloaded = TenantScope::bootstrap_deferred(Arc::new(store), None);
        assert_eq!(reloaded.get(), Some(tenant("A")));
        assert!(!reloaded.has_unconfirmed_override());
    }

    #[test]
    fn explicit_set_supersedes_unconfirmed_override() {
        let store = InMemoryTenantStore::new();
        let scope = TenantScope::bootstrap_deferred(Arc::new(store.clone()), Some(tenant("B")));

        scope.set(Some(tenant("C")));
        assert!(!scope.has_unconfirmed_override());
        assert!(!scope.confirm_override());
        assert_eq!(store.value(), Some(tenant("C")));
    }

    #[test]
    fn subscription_outliving_scope_is_harmless() {
        let scope = TenantScope::in_memory();
        let sub = scope.subscribe(|_| {});
        drop(scope);
        drop(sub);
    }
}
