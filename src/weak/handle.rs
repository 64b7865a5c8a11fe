//! Non-owning handle over an `Arc` allocation.

use std::fmt;
use std::sync::{Arc, Weak};

/// A reference that does not keep its target alive.
///
/// Once every strong owner has released the target, [`get`](Self::get)
/// returns `None` forever.
pub struct WeakHandle<T: ?Sized> {
    inner: Weak<T>,
}

impl<T: ?Sized> WeakHandle<T> {
    /// Create a handle observing `target`.
    pub fn wrap(target: &Arc<T>) -> Self {
        Self {
            inner: Arc::downgrade(target),
        }
    }

    pub fn from_weak(inner: Weak<T>) -> Self {
        Self { inner }
    }

    /// Whether a strong owner still exists.
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    /// Upgrade to a strong reference if the target is still alive.
    pub fn get(&self) -> Option<Arc<T>> {
        self.inner.upgrade()
    }

    /// Whether this handle observes the same allocation as `target`.
    ///
    /// Works on dead handles too; the allocation address stays reserved
    /// while any weak reference exists.
    pub fn points_to(&self, target: &Arc<T>) -> bool {
        std::ptr::eq(
            self.inner.as_ptr() as *const (),
            Arc::as_ptr(target) as *const (),
        )
    }
}

impl<T> WeakHandle<T> {
    /// A handle that was never alive.
    pub fn dangling() -> Self {
        Self { inner: Weak::new() }
    }
}

impl<T: ?Sized> Clone for WeakHandle<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: ?Sized> fmt::Debug for WeakHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakHandle")
            .field("alive", &self.is_alive())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dies_with_last_owner() {
        let target = Arc::new(5u32);
        let handle = WeakHandle::wrap(&target);
        assert!(handle.is_alive());
        assert_eq!(handle.get().as_deref(), Some(&5));

        drop(target);
        assert!(!handle.is_alive());
        assert!(handle.get().is_none());
    }

    #[test]
    fn test_upgrade_keeps_alive_only_while_held() {
        let target = Arc::new(String::from("x"));
        let handle = WeakHandle::wrap(&target);

        let strong = handle.get().unwrap();
        drop(target);
        assert!(handle.is_alive());

        drop(strong);
        assert!(!handle.is_alive());
        // Never resurrects.
        assert!(handle.get().is_none());
        assert!(!handle.is_alive());
    }

    #[test]
    fn test_dangling() {
        let handle: WeakHandle<u8> = WeakHandle::dangling();
        assert!(!handle.is_alive());
        assert!(handle.get().is_none());
    }

    #[test]
    fn test_points_to_unsized() {
        let a: Arc<dyn std::any::Any + Send + Sync> = Arc::new(1u8);
        let b: Arc<dyn std::any::Any + Send + Sync> = Arc::new(1u8);
        let handle = WeakHandle::wrap(&a);
        assert!(handle.points_to(&a));
        assert!(!handle.points_to(&b));
    }
}
