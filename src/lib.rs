//! # propnotify
//!
//! Property change notification where neither side has to unsubscribe.
//!
//! ## Core Concepts
//!
//! - **Registries**: per-source lists of subscriptions, dispatched in order
//! - **Weak callbacks**: methods paired with weakly-held receivers; dead
//!   receivers are purged lazily before the next pass
//! - **Tokens**: dispose one subscription exactly, idempotently
//! - **Disposers**: run cleanup actions and dispose weakly-held resources, once
//!
//! ## Example
//!
//! ```ignore
//! use propnotify::{Method, Notifiable, PropertyName};
//!
//! let person = Person::new();
//! let view = Arc::new(AgeView::default());
//!
//! let on_age = Method::bound(|view: &AgeView, person: &Person, _: &PropertyName| {
//!     view.refresh(person)
//! });
//! person.notifier().subscribe("Age", &view, &on_age)?;
//!
//! person.set_age(42)?; // view.refresh runs
//! drop(view);
//! person.set_age(43)?; // purged, nothing runs
//! ```

pub mod disposer;
pub mod error;
pub mod notifiable;
pub mod subscriptions;
pub mod types;
pub mod weak;

// Re-exports
pub use disposer::{Disposable, ResourceDisposer};
pub use error::{BoxError, CleanupFailure, NotifyError, ObligationKind, Result};
pub use notifiable::{Notifiable, NotifiableSource, ObservableList, COUNT_PROPERTY, ITEMS_PROPERTY};
pub use subscriptions::{DisposeToken, SubscriptionGuard, SubscriptionRegistry};
pub use types::*;
pub use weak::{Invokable, Method, Receiver, WeakCallback, WeakHandle};
