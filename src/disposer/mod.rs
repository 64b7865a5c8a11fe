//! Idempotent teardown.
//!
//! - [`Disposable`]: anything with an explicit, repeatable `dispose`
//! - [`ResourceDisposer`]: runs registered cleanup actions and disposes
//!   weakly-held disposables, once

mod resource;

pub use resource::ResourceDisposer;

use crate::error::Result;

/// An object with explicit teardown.
///
/// Implementations must tolerate repeated calls; only the first does work.
pub trait Disposable {
    fn dispose(&self) -> Result<()>;
}
