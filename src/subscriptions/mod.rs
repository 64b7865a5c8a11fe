//! Weakly-held property change subscriptions.
//!
//! A [`SubscriptionRegistry`] serves one source object. Subscribers are
//! either:
//! - bound: a [`Method`](crate::Method) plus a receiver held weakly; the
//!   entry disappears once the receiver is dropped
//! - static: an unbound method that lives until removed
//!
//! Entries can be removed one at a time through the [`DisposeToken`]
//! returned by `subscribe`, in bulk by method identity with `unsubscribe`,
//! or all at once by disposing the registry.
//!
//! # Example
//!
//! ```ignore
//! let registry = SubscriptionRegistry::new(&person);
//!
//! let on_age = Method::bound(|view: &AgeView, person: &Person, _: &PropertyName| {
//!     view.refresh(person)
//! });
//! let receiver: Receiver = view.clone();
//! let token = registry.subscribe(Some("Age".into()), Some(&receiver), &on_age)?;
//!
//! registry.notify("Age")?; // view.refresh runs
//! token.dispose();
//! registry.notify("Age")?; // nothing runs
//! ```

mod manager;
mod types;

pub use manager::SubscriptionRegistry;
pub use types::{DisposeToken, SubscriptionGuard};
