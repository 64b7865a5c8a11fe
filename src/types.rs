//! Core types shared by registries, sources and disposers.

use std::borrow::Borrow;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Name of a property reported through a change notification.
///
/// Cheap to clone; the same name is handed to every callback of a pass.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyName(Arc<str>);

impl PropertyName {
    pub fn new(name: impl AsRef<str>) -> Self {
        PropertyName(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PropertyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropertyName({:?})", &*self.0)
    }
}

impl fmt::Display for PropertyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PropertyName {
    fn from(name: &str) -> Self {
        PropertyName(Arc::from(name))
    }
}

impl From<String> for PropertyName {
    fn from(name: String) -> Self {
        PropertyName(Arc::from(name))
    }
}

impl From<&PropertyName> for PropertyName {
    fn from(name: &PropertyName) -> Self {
        name.clone()
    }
}

impl AsRef<str> for PropertyName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for PropertyName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for PropertyName {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for PropertyName {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

/// Identifier of one subscription entry within its registry.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl fmt::Debug for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubscriptionId({})", self.0)
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Process-wide identity of a [`Method`](crate::Method).
///
/// Clones of a method share its id, which is what bulk removal compares.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodId(pub u64);

static NEXT_METHOD_ID: AtomicU64 = AtomicU64::new(1);

impl MethodId {
    pub(crate) fn next() -> Self {
        MethodId(NEXT_METHOD_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Debug for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MethodId({})", self.0)
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Configuration for a [`NotifiableSource`](crate::NotifiableSource).
#[derive(Clone, Debug)]
pub struct NotifiableConfig {
    /// Check notified names against the entity's known properties.
    /// Only honoured in debug builds.
    /// Default: true
    pub validate_property_names: bool,
}

impl Default for NotifiableConfig {
    fn default() -> Self {
        Self {
            validate_property_names: true,
        }
    }
}

/// What a [`ResourceDisposer`](crate::ResourceDisposer) does when an
/// obligation reports an error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Keep draining, then report every failure together.
    #[default]
    ContinueAndCollect,
    /// Stop at the first failure; remaining obligations are dropped unrun.
    FailFast,
}

/// Configuration for a [`ResourceDisposer`](crate::ResourceDisposer).
#[derive(Clone, Debug, Default)]
pub struct DisposerConfig {
    pub failure_policy: FailurePolicy,
}
