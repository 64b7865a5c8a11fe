//! Handles returned from subscribing.

use crate::disposer::Disposable;
use crate::error::Result;
use crate::types::SubscriptionId;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Weak;

/// Removes a single entry from a registry, by id.
pub(crate) trait EntryRemover: Send + Sync {
    fn remove_entry(&self, id: SubscriptionId) -> bool;
}

/// Handle to one subscription entry.
///
/// Disposing it removes exactly that entry, even when other entries share
/// its property name and method. The token holds its registry weakly.
/// Dropping a token does not unsubscribe; see [`DisposeToken::into_guard`].
pub struct DisposeToken {
    id: SubscriptionId,
    registry: Weak<dyn EntryRemover>,
    disposed: AtomicBool,
}

impl DisposeToken {
    pub(crate) fn new(id: SubscriptionId, registry: Weak<dyn EntryRemover>) -> Self {
        Self {
            id,
            registry,
            disposed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Remove the entry if still present. Later calls do nothing.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            if registry.remove_entry(self.id) {
                tracing::trace!(id = %self.id, "subscription removed by token");
            }
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Tie the subscription to a scope: it is removed when the guard drops.
    pub fn into_guard(self) -> SubscriptionGuard {
        SubscriptionGuard { token: self }
    }
}

impl Disposable for DisposeToken {
    fn dispose(&self) -> Result<()> {
        DisposeToken::dispose(self);
        Ok(())
    }
}

impl fmt::Debug for DisposeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisposeToken")
            .field("id", &self.id)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Scope-bound subscription; disposes its token on drop.
#[must_use = "dropping the guard removes the subscription immediately"]
#[derive(Debug)]
pub struct SubscriptionGuard {
    token: DisposeToken,
}

impl SubscriptionGuard {
    pub fn id(&self) -> SubscriptionId {
        self.token.id()
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.token.dispose();
    }
}
