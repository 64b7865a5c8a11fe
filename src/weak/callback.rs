//! Method descriptors and weakly-bound callbacks.

use crate::error::{NotifyError, Result};
use crate::types::{MethodId, PropertyName};
use crate::weak::WeakHandle;
use std::any::{self, Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// Type-erased strong reference to a subscriber.
pub type Receiver = Arc<dyn Any + Send + Sync>;

type UnboundFn<S> = dyn Fn(&S, &PropertyName) + Send + Sync;
type BoundFn<S> = dyn Fn(&(dyn Any + Send + Sync), &S, &PropertyName) + Send + Sync;

enum MethodKind<S: 'static> {
    Unbound(Arc<UnboundFn<S>>),
    Bound {
        receiver_type: TypeId,
        receiver_type_name: &'static str,
        call: Arc<BoundFn<S>>,
    },
}

/// A callable that reacts to a property change on a source of type `S`.
///
/// A bound method never captures its receiver: the receiver is handed in at
/// dispatch time from a weak handle, so subscribing does not extend its
/// lifetime. Clones share one [`MethodId`].
pub struct Method<S: 'static> {
    id: MethodId,
    kind: MethodKind<S>,
}

impl<S: 'static> Method<S> {
    /// A receiver-less method. Subscriptions using it live until removed.
    pub fn unbound<F>(f: F) -> Self
    where
        F: Fn(&S, &PropertyName) + Send + Sync + 'static,
    {
        Self {
            id: MethodId::next(),
            kind: MethodKind::Unbound(Arc::new(f)),
        }
    }

    /// A method invoked on a receiver of type `R`.
    pub fn bound<R, F>(f: F) -> Self
    where
        R: Any + Send + Sync,
        F: Fn(&R, &S, &PropertyName) + Send + Sync + 'static,
    {
        let call = move |receiver: &(dyn Any + Send + Sync), source: &S, name: &PropertyName| {
            if let Some(receiver) = receiver.downcast_ref::<R>() {
                f(receiver, source, name);
            }
        };
        Self {
            id: MethodId::next(),
            kind: MethodKind::Bound {
                receiver_type: TypeId::of::<R>(),
                receiver_type_name: any::type_name::<R>(),
                call: Arc::new(call),
            },
        }
    }

    pub fn id(&self) -> MethodId {
        self.id
    }

    /// Whether this method needs no receiver.
    pub fn is_static(&self) -> bool {
        matches!(self.kind, MethodKind::Unbound(_))
    }
}

impl<S: 'static> Clone for Method<S> {
    fn clone(&self) -> Self {
        let kind = match &self.kind {
            MethodKind::Unbound(f) => MethodKind::Unbound(Arc::clone(f)),
            MethodKind::Bound {
                receiver_type,
                receiver_type_name,
                call,
            } => MethodKind::Bound {
                receiver_type: *receiver_type,
                receiver_type_name: *receiver_type_name,
                call: Arc::clone(call),
            },
        };
        Self { id: self.id, kind }
    }
}

impl<S: 'static> fmt::Debug for Method<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Method");
        s.field("id", &self.id);
        match &self.kind {
            MethodKind::Unbound(_) => s.field("receiver", &"none"),
            MethodKind::Bound {
                receiver_type_name, ..
            } => s.field("receiver", receiver_type_name),
        };
        s.finish()
    }
}

/// A method paired with a weak handle to its receiver.
pub struct WeakCallback<S: 'static> {
    method: Method<S>,
    receiver: Option<WeakHandle<dyn Any + Send + Sync>>,
}

impl<S: 'static> WeakCallback<S> {
    /// Pair `method` with `receiver`.
    ///
    /// Bound methods require a receiver of their declared type; unbound
    /// methods must not be given one.
    pub fn wrap(method: &Method<S>, receiver: Option<&Receiver>) -> Result<Self> {
        let receiver = match (&method.kind, receiver) {
            (MethodKind::Unbound(_), None) => None,
            (MethodKind::Unbound(_), Some(_)) => {
                return Err(NotifyError::InvalidArgument(format!(
                    "method {} takes no receiver",
                    method.id
                )));
            }
            (MethodKind::Bound { .. }, None) => {
                return Err(NotifyError::InvalidArgument(format!(
                    "method {} requires a receiver",
                    method.id
                )));
            }
            (
                MethodKind::Bound {
                    receiver_type,
                    receiver_type_name,
                    ..
                },
                Some(receiver),
            ) => {
                if (**receiver).type_id() != *receiver_type {
                    return Err(NotifyError::InvalidArgument(format!(
                        "method {} expects a receiver of type {}",
                        method.id, receiver_type_name
                    )));
                }
                Some(WeakHandle::wrap(receiver))
            }
        };

        Ok(Self {
            method: method.clone(),
            receiver,
        })
    }

    pub fn method_id(&self) -> MethodId {
        self.method.id
    }

    pub fn is_static(&self) -> bool {
        self.receiver.is_none()
    }

    /// True for static callbacks, otherwise whether the receiver lives.
    pub fn receiver_alive(&self) -> bool {
        match &self.receiver {
            None => true,
            Some(handle) => handle.is_alive(),
        }
    }

    /// Whether this callback was bound to exactly `receiver`
    /// (`None` matching static callbacks).
    pub fn is_bound_to(&self, receiver: Option<&Receiver>) -> bool {
        match (&self.receiver, receiver) {
            (None, None) => true,
            (Some(handle), Some(receiver)) => handle.points_to(receiver),
            _ => false,
        }
    }

    /// Rebuild a callable for immediate use.
    ///
    /// The result borrows this callback and is consumed by
    /// [`Invokable::invoke`], so it cannot outlive the current dispatch.
    pub fn resolve(&self) -> Option<Invokable<'_, S>> {
        let target = match (&self.method.kind, &self.receiver) {
            (MethodKind::Unbound(f), _) => Target::Unbound(f.as_ref()),
            (MethodKind::Bound { call, .. }, Some(handle)) => {
                Target::Bound(call.as_ref(), handle.get()?)
            }
            (MethodKind::Bound { .. }, None) => return None,
        };
        Some(Invokable { target })
    }
}

impl<S: 'static> Clone for WeakCallback<S> {
    fn clone(&self) -> Self {
        Self {
            method: self.method.clone(),
            receiver: self.receiver.clone(),
        }
    }
}

impl<S: 'static> fmt::Debug for WeakCallback<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakCallback")
            .field("method", &self.method)
            .field("alive", &self.receiver_alive())
            .finish()
    }
}

enum Target<'a, S: 'static> {
    Unbound(&'a UnboundFn<S>),
    Bound(&'a BoundFn<S>, Receiver),
}

/// A resolved callback, holding its receiver alive until invoked.
#[must_use = "an invokable does nothing unless invoked"]
pub struct Invokable<'a, S: 'static> {
    target: Target<'a, S>,
}

impl<S: 'static> Invokable<'_, S> {
    pub fn invoke(self, source: &S, property: &PropertyName) {
        match self.target {
            Target::Unbound(f) => f(source, property),
            Target::Bound(call, receiver) => call(&*receiver, source, property),
        }
    }
}
