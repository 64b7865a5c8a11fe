//! Error handling and edge case tests.

use propnotify::{
    DisposerConfig, FailurePolicy, Method, Notifiable, NotifiableConfig, NotifiableSource,
    NotifyError, ObligationKind, PropertyName, Receiver, ResourceDisposer, SubscriptionRegistry,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

struct Sensor {
    notifier: NotifiableSource<Sensor>,
}

impl Sensor {
    fn new() -> Arc<Self> {
        Self::with_config(NotifiableConfig::default())
    }

    fn with_config(config: NotifiableConfig) -> Arc<Self> {
        Arc::new_cyclic(|me| Sensor {
            notifier: NotifiableSource::with_config(me.clone(), config),
        })
    }
}

impl Notifiable for Sensor {
    const PROPERTY_NAMES: &'static [&'static str] = &["Reading"];

    fn notifier(&self) -> &NotifiableSource<Self> {
        &self.notifier
    }
}

struct Gauge;

// --- Argument Errors ---

#[test]
fn test_bound_method_without_receiver() {
    let sensor = Sensor::new();
    let registry = SubscriptionRegistry::new(&sensor);
    let method = Method::bound(|_: &Gauge, _: &Sensor, _: &PropertyName| {});

    let result = registry.subscribe(Some("Reading".into()), None, &method);
    assert!(matches!(result, Err(NotifyError::InvalidArgument(_))));
    assert_eq!(registry.subscription_count(), 0);
}

#[test]
fn test_receiver_of_wrong_type() {
    let sensor = Sensor::new();
    let method = Method::bound(|_: &Gauge, _: &Sensor, _: &PropertyName| {});
    let wrong = Arc::new(String::from("not a gauge"));

    let result = sensor.notifier().subscribe("Reading", &wrong, &method);
    assert!(matches!(result, Err(NotifyError::InvalidArgument(_))));
}

#[test]
fn test_unbound_method_with_receiver() {
    let sensor = Sensor::new();
    let registry = SubscriptionRegistry::new(&sensor);
    let receiver: Receiver = Arc::new(Gauge);

    let method = Method::unbound(|_: &Sensor, _: &PropertyName| {});

    let result = registry.add_handler(Some(&receiver), &method);
    assert!(matches!(result, Err(NotifyError::InvalidArgument(_))));
}

// --- Property Validation ---

#[cfg(debug_assertions)]
#[test]
fn test_unknown_property_in_debug_build() {
    let sensor = Sensor::new();
    let result = sensor.on_property_changed("Temperature");

    match result {
        Err(NotifyError::UnknownProperty {
            property,
            source_type,
        }) => {
            assert_eq!(property, "Temperature");
            assert!(source_type.ends_with("Sensor"));
        }
        other => panic!("Expected UnknownProperty, got {:?}", other),
    }
}

#[cfg(not(debug_assertions))]
#[test]
fn test_unknown_property_ignored_in_release_build() {
    let sensor = Sensor::new();
    assert_eq!(sensor.on_property_changed("Temperature").unwrap(), 0);
}

#[test]
fn test_validation_disabled_by_config() {
    let sensor = Sensor::with_config(NotifiableConfig {
        validate_property_names: false,
    });
    let hits = Arc::new(AtomicU32::new(0));
    let sink = hits.clone();
    sensor
        .notifier()
        .add_static_handler(&Method::unbound(move |_: &Sensor, _: &PropertyName| {
            sink.fetch_add(1, Ordering::SeqCst);
        }))
        .unwrap();

    assert_eq!(sensor.on_property_changed("Temperature").unwrap(), 1);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

// --- Disposed State ---

#[test]
fn test_registry_rejects_use_after_dispose() {
    let sensor = Sensor::new();
    let registry = SubscriptionRegistry::new(&sensor);
    let method = Method::unbound(|_: &Sensor, _: &PropertyName| {});
    registry.dispose();

    assert!(matches!(
        registry.subscribe(None, None, &method),
        Err(NotifyError::IllegalState(_))
    ));
    assert!(matches!(
        registry.unsubscribe(None, &method),
        Err(NotifyError::IllegalState(_))
    ));
    assert!(matches!(
        registry.remove_handler(None, &method),
        Err(NotifyError::IllegalState(_))
    ));
    assert!(matches!(
        registry.notify("Reading"),
        Err(NotifyError::IllegalState(_))
    ));
    assert!(matches!(
        registry.relay(&sensor, "Reading"),
        Err(NotifyError::IllegalState(_))
    ));
}

#[test]
fn test_dispose_does_not_invoke_subscribers() {
    let sensor = Sensor::new();
    let hits = Arc::new(AtomicU32::new(0));
    let sink = hits.clone();
    sensor
        .notifier()
        .subscribe_fn("Reading", move |_: &Sensor| {
            sink.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    sensor.notifier().dispose().unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert!(matches!(
        sensor.on_property_changed("Reading"),
        Err(NotifyError::IllegalState(_))
    ));
    assert!(matches!(
        sensor.notifier().on_dispose(|| {}),
        Err(NotifyError::IllegalState(_))
    ));
}

#[test]
fn test_error_messages() {
    let err = NotifyError::UnknownProperty {
        property: "Temperature".to_string(),
        source_type: "Sensor",
    };
    assert_eq!(err.to_string(), "Unknown property `Temperature` on Sensor");

    let sensor = Sensor::new();
    let registry = SubscriptionRegistry::new(&sensor);
    registry.dispose();
    let err = registry.notify("Reading").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Illegal state: subscription registry has been disposed"
    );
}

// --- Cleanup Failures ---

#[test]
fn test_cleanup_collects_every_failure() {
    let disposer = ResourceDisposer::new();
    let ran = Arc::new(AtomicU32::new(0));

    for i in 0..4 {
        let ran = ran.clone();
        disposer
            .try_register_action(move || {
                ran.fetch_add(1, Ordering::SeqCst);
                if i % 2 == 0 {
                    Err(format!("action {i} failed"))
                } else {
                    Ok(())
                }
            })
            .unwrap();
    }

    let err = disposer.dispose().unwrap_err();
    assert_eq!(ran.load(Ordering::SeqCst), 4);
    match err {
        NotifyError::CleanupFailed {
            failures,
            attempted,
        } => {
            assert_eq!(attempted, 4);
            let positions: Vec<usize> = failures.iter().map(|f| f.position).collect();
            assert_eq!(positions, vec![0, 2]);
            assert!(failures.iter().all(|f| f.kind == ObligationKind::Action));
            assert_eq!(failures[1].to_string(), "action #2: action 2 failed");
        }
        other => panic!("Expected CleanupFailed, got {:?}", other),
    }
}

#[test]
fn test_cleanup_fail_fast() {
    let disposer = ResourceDisposer::with_config(DisposerConfig {
        failure_policy: FailurePolicy::FailFast,
    });
    let ran = Arc::new(AtomicU32::new(0));

    for _ in 0..3 {
        let ran = ran.clone();
        disposer
            .try_register_action(move || {
                ran.fetch_add(1, Ordering::SeqCst);
                Err("stop")
            })
            .unwrap();
    }

    assert!(matches!(
        disposer.dispose(),
        Err(NotifyError::CleanupFailed { attempted: 1, .. })
    ));
    assert_eq!(ran.load(Ordering::SeqCst), 1);
    // Never runs again.
    assert!(disposer.dispose().is_ok());
    assert_eq!(ran.load(Ordering::SeqCst), 1);
}
