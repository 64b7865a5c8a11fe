//! Weak references and weakly-bound callbacks.
//!
//! Liveness here is plain reference counting: a receiver is alive while
//! some `Arc` to it exists anywhere. Nothing in this module holds a strong
//! reference longer than a single dispatch.

mod callback;
mod handle;

pub use callback::{Invokable, Method, Receiver, WeakCallback};
pub use handle::WeakHandle;
