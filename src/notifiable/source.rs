//! Lazily-created registry owned by a notifying entity.

use crate::disposer::{Disposable, ResourceDisposer};
use crate::error::{NotifyError, Result};
use crate::subscriptions::{DisposeToken, SubscriptionRegistry};
use crate::types::{NotifiableConfig, PropertyName};
use crate::weak::{Method, Receiver};
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use tracing::debug;

/// An entity that reports changes of its named properties.
///
/// Implementors own a [`NotifiableSource`] built from their own weak
/// reference, usually inside `Arc::new_cyclic`.
pub trait Notifiable: Send + Sync + Sized + 'static {
    /// Property names accepted by [`NotifiableSource::on_property_changed`].
    const PROPERTY_NAMES: &'static [&'static str];

    fn notifier(&self) -> &NotifiableSource<Self>;

    /// Report that `property` changed.
    fn on_property_changed(&self, property: &str) -> Result<usize> {
        self.notifier().on_property_changed(property)
    }
}

/// Change notification support embedded in an entity.
///
/// The [`SubscriptionRegistry`] is created on first subscription; an entity
/// nobody watches never allocates one.
pub struct NotifiableSource<S: Notifiable> {
    source: Weak<S>,
    config: NotifiableConfig,
    registry: OnceLock<SubscriptionRegistry<S>>,
    teardown: ResourceDisposer,
    disposed: AtomicBool,
}

impl<S: Notifiable> NotifiableSource<S> {
    pub fn new(source: Weak<S>) -> Self {
        Self::with_config(source, NotifiableConfig::default())
    }

    pub fn with_config(source: Weak<S>, config: NotifiableConfig) -> Self {
        Self {
            source,
            config,
            registry: OnceLock::new(),
            teardown: ResourceDisposer::new(),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &NotifiableConfig {
        &self.config
    }

    /// Report that `property` changed. Returns how many callbacks ran.
    ///
    /// Debug builds reject names missing from `S::PROPERTY_NAMES` (unless
    /// disabled in the config); release builds skip the check.
    pub fn on_property_changed(&self, property: &str) -> Result<usize> {
        self.ensure_active()?;
        self.check_property_name(property)?;
        match self.registry.get() {
            Some(registry) => registry.notify(property),
            None => Ok(0),
        }
    }

    /// Subscribe `method`, bound weakly to `receiver`, to one property.
    pub fn subscribe<R>(
        &self,
        property: impl Into<PropertyName>,
        receiver: &Arc<R>,
        method: &Method<S>,
    ) -> Result<DisposeToken>
    where
        R: Any + Send + Sync,
    {
        let receiver: Receiver = receiver.clone();
        self.registry()?
            .subscribe(Some(property.into()), Some(&receiver), method)
    }

    /// Subscribe an unbound `method` to one property.
    pub fn subscribe_static(
        &self,
        property: impl Into<PropertyName>,
        method: &Method<S>,
    ) -> Result<DisposeToken> {
        self.registry()?.subscribe(Some(property.into()), None, method)
    }

    /// Subscribe a plain closure to one property.
    ///
    /// The closure is held strongly; remove it with the returned token.
    pub fn subscribe_fn<F>(&self, property: impl Into<PropertyName>, f: F) -> Result<DisposeToken>
    where
        F: Fn(&S) + Send + Sync + 'static,
    {
        let method = Method::unbound(move |source: &S, _: &PropertyName| f(source));
        self.subscribe_static(property, &method)
    }

    /// Remove every subscription to `property` using `method`.
    pub fn unsubscribe(&self, property: &str, method: &Method<S>) -> Result<usize> {
        self.ensure_active()?;
        match self.registry.get() {
            Some(registry) => registry.unsubscribe(Some(property), method),
            None => Ok(0),
        }
    }

    /// Subscribe `method`, bound weakly to `receiver`, to every property.
    pub fn add_handler<R>(&self, receiver: &Arc<R>, method: &Method<S>) -> Result<DisposeToken>
    where
        R: Any + Send + Sync,
    {
        let receiver: Receiver = receiver.clone();
        self.registry()?.add_handler(Some(&receiver), method)
    }

    pub fn add_static_handler(&self, method: &Method<S>) -> Result<DisposeToken> {
        self.registry()?.add_handler(None, method)
    }

    /// Remove every subscription bound to `receiver` with `method`, named
    /// or not.
    pub fn remove_handler<R>(&self, receiver: &Arc<R>, method: &Method<S>) -> Result<usize>
    where
        R: Any + Send + Sync,
    {
        self.ensure_active()?;
        let receiver: Receiver = receiver.clone();
        match self.registry.get() {
            Some(registry) => registry.remove_handler(Some(&receiver), method),
            None => Ok(0),
        }
    }

    pub fn remove_static_handler(&self, method: &Method<S>) -> Result<usize> {
        self.ensure_active()?;
        match self.registry.get() {
            Some(registry) => registry.remove_handler(None, method),
            None => Ok(0),
        }
    }

    /// Run `action` when this source is disposed, after its registry.
    pub fn on_dispose<F>(&self, action: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.ensure_active()?;
        self.teardown.register_action(action)?;
        Ok(())
    }

    /// Dispose the registry, then run teardown actions. Only the first call
    /// does anything.
    pub fn dispose(&self) -> Result<()> {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if let Some(registry) = self.registry.get() {
            registry.dispose();
        }
        debug!(source = std::any::type_name::<S>(), "notifiable source disposed");
        self.teardown.dispose()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Number of subscriptions, including dead ones not yet purged.
    pub fn subscription_count(&self) -> usize {
        self.registry
            .get()
            .map_or(0, SubscriptionRegistry::subscription_count)
    }

    fn ensure_active(&self) -> Result<()> {
        if self.is_disposed() {
            return Err(NotifyError::disposed("notifiable source"));
        }
        Ok(())
    }

    fn registry(&self) -> Result<&SubscriptionRegistry<S>> {
        self.ensure_active()?;
        let registry = self
            .registry
            .get_or_init(|| SubscriptionRegistry::with_source(self.source.clone()));
        // Disposed while the registry was being created.
        if self.is_disposed() {
            registry.dispose();
            return Err(NotifyError::disposed("notifiable source"));
        }
        Ok(registry)
    }

    #[cfg_attr(not(debug_assertions), allow(unused_variables))]
    fn check_property_name(&self, property: &str) -> Result<()> {
        #[cfg(debug_assertions)]
        {
            let known = S::PROPERTY_NAMES.iter().any(|name| *name == property);
            if self.config.validate_property_names && !known {
                return Err(NotifyError::UnknownProperty {
                    property: property.to_string(),
                    source_type: std::any::type_name::<S>(),
                });
            }
        }
        Ok(())
    }
}

impl<S: Notifiable> Disposable for NotifiableSource<S> {
    fn dispose(&self) -> Result<()> {
        NotifiableSource::dispose(self)
    }
}

impl<S: Notifiable> fmt::Debug for NotifiableSource<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifiableSource")
            .field("source", &std::any::type_name::<S>())
            .field("subscriptions", &self.subscription_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
