//! Entity-facing change notification.
//!
//! An entity implements [`Notifiable`] and embeds a [`NotifiableSource`]
//! built from its own weak reference:
//!
//! ```ignore
//! struct Person {
//!     age: AtomicU32,
//!     notifier: NotifiableSource<Person>,
//! }
//!
//! impl Person {
//!     fn new() -> Arc<Self> {
//!         Arc::new_cyclic(|me| Person {
//!             age: AtomicU32::new(0),
//!             notifier: NotifiableSource::new(me.clone()),
//!         })
//!     }
//!
//!     fn set_age(&self, age: u32) -> Result<usize> {
//!         self.age.store(age, Ordering::SeqCst);
//!         self.on_property_changed("Age")
//!     }
//! }
//!
//! impl Notifiable for Person {
//!     const PROPERTY_NAMES: &'static [&'static str] = &["Age"];
//!
//!     fn notifier(&self) -> &NotifiableSource<Self> {
//!         &self.notifier
//!     }
//! }
//! ```

mod list;
mod source;

pub use list::{ObservableList, COUNT_PROPERTY, ITEMS_PROPERTY};
pub use source::{Notifiable, NotifiableSource};
