//! Per-source registry of property change subscriptions.

use crate::disposer::Disposable;
use crate::error::{NotifyError, Result};
use crate::types::{PropertyName, SubscriptionId};
use crate::weak::{Method, Receiver, WeakCallback, WeakHandle};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

use super::types::{DisposeToken, EntryRemover};

/// Internal subscription state.
struct Subscription<S: 'static> {
    id: SubscriptionId,
    /// `None` subscribes to every property.
    property: Option<PropertyName>,
    callback: WeakCallback<S>,
}

impl<S: 'static> Subscription<S> {
    fn matches(&self, property: &str) -> bool {
        matches!(&self.property, Some(name) if name == property)
    }

    fn is_wildcard(&self) -> bool {
        self.property.is_none()
    }
}

struct Entries<S: 'static> {
    list: Vec<Subscription<S>>,
    next_id: u64,
}

impl<S: 'static> Entries<S> {
    /// Drop entries whose receiver is gone. Returns how many were removed.
    fn purge(&mut self) -> usize {
        let before = self.list.len();
        self.list.retain(|s| s.callback.receiver_alive());
        let purged = before - self.list.len();
        if purged > 0 {
            debug!(purged, remaining = self.list.len(), "purged dead subscriptions");
        }
        purged
    }
}

/// State shared between a registry and the tokens it hands out.
struct Shared<S: 'static> {
    entries: Mutex<Entries<S>>,
    /// Only written while `entries` is locked.
    disposed: AtomicBool,
}

impl<S: 'static> Shared<S> {
    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

impl<S: 'static> EntryRemover for Shared<S> {
    fn remove_entry(&self, id: SubscriptionId) -> bool {
        let mut entries = self.entries.lock();
        match entries.list.iter().position(|s| s.id == id) {
            Some(pos) => {
                entries.list.remove(pos);
                true
            }
            None => false,
        }
    }
}

/// Registry of property change subscriptions on behalf of one source.
///
/// Subscribers are held weakly: an entry whose receiver has been dropped is
/// purged on the next subscribe, unsubscribe or notify pass. Static entries
/// (no receiver) live until removed or until the registry is disposed.
///
/// Callbacks run with no lock held, so they may freely subscribe,
/// unsubscribe, notify or dispose on the same registry.
pub struct SubscriptionRegistry<S: 'static> {
    shared: Arc<Shared<S>>,
    source: WeakHandle<S>,
}

impl<S: 'static> SubscriptionRegistry<S> {
    /// Create a registry serving `source`.
    pub fn new(source: &Arc<S>) -> Self {
        Self::with_source(Arc::downgrade(source))
    }

    /// Create a registry from a weak source, e.g. inside `Arc::new_cyclic`.
    pub fn with_source(source: Weak<S>) -> Self {
        Self {
            shared: Arc::new(Shared {
                entries: Mutex::new(Entries {
                    list: Vec::new(),
                    next_id: 1,
                }),
                disposed: AtomicBool::new(false),
            }),
            source: WeakHandle::from_weak(source),
        }
    }

    /// Create a registry with no source of its own.
    ///
    /// `notify` on it dispatches nothing; use [`relay`](Self::relay).
    pub fn detached() -> Self {
        Self::with_source(Weak::new())
    }

    /// Subscribe `method` to changes of `property` (`None` for every property).
    ///
    /// With `receiver = None` the method must be unbound and the entry is
    /// static. Otherwise the receiver is held weakly.
    pub fn subscribe(
        &self,
        property: Option<PropertyName>,
        receiver: Option<&Receiver>,
        method: &Method<S>,
    ) -> Result<DisposeToken> {
        let id = {
            let mut entries = self.lock_active()?;
            let callback = WeakCallback::wrap(method, receiver)?;
            entries.purge();

            let id = SubscriptionId(entries.next_id);
            entries.next_id += 1;
            trace!(%id, property = ?property, method = %method.id(), "subscribed");
            entries.list.push(Subscription {
                id,
                property,
                callback,
            });
            id
        };

        let remover: Weak<Shared<S>> = Arc::downgrade(&self.shared);
        let remover: Weak<dyn EntryRemover> = remover;
        Ok(DisposeToken::new(id, remover))
    }

    /// Remove every entry for `property` (`None` for wildcard entries) whose
    /// method has the identity of `method`. Returns how many were removed.
    pub fn unsubscribe(&self, property: Option<&str>, method: &Method<S>) -> Result<usize> {
        let mut entries = self.lock_active()?;
        entries.purge();

        let before = entries.list.len();
        entries.list.retain(|s| {
            let same_property = match property {
                Some(property) => s.matches(property),
                None => s.is_wildcard(),
            };
            !(same_property && s.callback.method_id() == method.id())
        });
        let removed = before - entries.list.len();
        trace!(property = ?property, method = %method.id(), removed, "unsubscribed");
        Ok(removed)
    }

    /// Subscribe a wildcard handler, fired for every property.
    pub fn add_handler(
        &self,
        receiver: Option<&Receiver>,
        method: &Method<S>,
    ) -> Result<DisposeToken> {
        self.subscribe(None, receiver, method)
    }

    /// Remove every entry, named or wildcard, bound to exactly `receiver`
    /// (`None` for static entries) with the identity of `method`.
    pub fn remove_handler(&self, receiver: Option<&Receiver>, method: &Method<S>) -> Result<usize> {
        let mut entries = self.lock_active()?;
        entries.purge();

        let before = entries.list.len();
        entries.list.retain(|s| {
            !(s.callback.method_id() == method.id() && s.callback.is_bound_to(receiver))
        });
        let removed = before - entries.list.len();
        trace!(method = %method.id(), removed, "handler removed");
        Ok(removed)
    }

    /// Report a change of `property` on this registry's source.
    ///
    /// Purges dead entries, then invokes entries subscribed to `property`
    /// followed by wildcard entries, each group in subscription order.
    /// Returns how many callbacks ran. Nothing runs once the source is gone.
    pub fn notify(&self, property: &str) -> Result<usize> {
        let callbacks = self.snapshot(property)?;
        match self.source.get() {
            Some(source) => Ok(self.dispatch(&source, property, callbacks)),
            None => {
                trace!(property, "source dropped; nothing dispatched");
                Ok(0)
            }
        }
    }

    /// Like [`notify`](Self::notify), but with an explicit source.
    ///
    /// Used by aggregates re-raising their members' notifications.
    pub fn relay(&self, source: &S, property: &str) -> Result<usize> {
        let callbacks = self.snapshot(property)?;
        Ok(self.dispatch(source, property, callbacks))
    }

    /// Drop every subscription without invoking any. Later calls do nothing.
    pub fn dispose(&self) {
        let mut entries = self.shared.entries.lock();
        if self.shared.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let dropped = entries.list.len();
        entries.list.clear();
        entries.list.shrink_to_fit();
        debug!(dropped, "subscription registry disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.is_disposed()
    }

    /// Number of entries, including dead ones not yet purged.
    pub fn subscription_count(&self) -> usize {
        self.shared.entries.lock().list.len()
    }

    fn lock_active(&self) -> Result<parking_lot::MutexGuard<'_, Entries<S>>> {
        let entries = self.shared.entries.lock();
        if self.shared.is_disposed() {
            return Err(NotifyError::disposed("subscription registry"));
        }
        Ok(entries)
    }

    /// Purge, then copy out the callbacks due for `property` in dispatch order.
    fn snapshot(&self, property: &str) -> Result<Vec<WeakCallback<S>>> {
        let mut entries = self.lock_active()?;
        entries.purge();

        let named = entries.list.iter().filter(|s| s.matches(property));
        let wildcard = entries.list.iter().filter(|s| s.is_wildcard());
        Ok(named.chain(wildcard).map(|s| s.callback.clone()).collect())
    }

    fn dispatch(&self, source: &S, property: &str, callbacks: Vec<WeakCallback<S>>) -> usize {
        let name = PropertyName::from(property);
        let mut invoked = 0;

        for callback in &callbacks {
            if self.shared.is_disposed() {
                debug!(property, "registry disposed during dispatch; stopping");
                break;
            }
            // Resolved right before the call: a receiver dropped since the
            // purge is skipped, not revived.
            match callback.resolve() {
                Some(invokable) => {
                    invokable.invoke(source, &name);
                    invoked += 1;
                }
                None => trace!(method = %callback.method_id(), "receiver dropped; skipped"),
            }
        }

        invoked
    }
}

impl<S: 'static> Disposable for SubscriptionRegistry<S> {
    fn dispose(&self) -> Result<()> {
        SubscriptionRegistry::dispose(self);
        Ok(())
    }
}

impl<S: 'static> fmt::Debug for SubscriptionRegistry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("subscriptions", &self.subscription_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
