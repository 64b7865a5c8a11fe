//! Aggregated cleanup obligations.

use crate::error::{BoxError, CleanupFailure, NotifyError, ObligationKind, Result};
use crate::types::{DisposerConfig, FailurePolicy};
use crate::weak::WeakHandle;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use super::Disposable;

type CleanupAction = Box<dyn FnOnce() -> std::result::Result<(), BoxError> + Send>;
type DisposableRef = WeakHandle<dyn Disposable + Send + Sync>;

struct Obligations {
    actions: VecDeque<(usize, CleanupAction)>,
    disposables: VecDeque<(usize, DisposableRef)>,
    registered_actions: usize,
    registered_disposables: usize,
    disposed: bool,
}

/// Collects cleanup obligations and runs them once.
///
/// Actions are held strongly and run first, in registration order.
/// Disposables are held weakly and disposed afterwards, in registration
/// order; ones already dropped elsewhere are skipped.
pub struct ResourceDisposer {
    config: DisposerConfig,
    state: Mutex<Obligations>,
}

impl ResourceDisposer {
    pub fn new() -> Self {
        Self::with_config(DisposerConfig::default())
    }

    pub fn with_config(config: DisposerConfig) -> Self {
        Self {
            config,
            state: Mutex::new(Obligations {
                actions: VecDeque::new(),
                disposables: VecDeque::new(),
                registered_actions: 0,
                registered_disposables: 0,
                disposed: false,
            }),
        }
    }

    /// Register an action to run on dispose.
    pub fn register_action<F>(&self, action: F) -> Result<&Self>
    where
        F: FnOnce() + Send + 'static,
    {
        self.push_action(Box::new(move || {
            action();
            Ok(())
        }))
    }

    /// Register an action whose failure is reported by `dispose`.
    pub fn try_register_action<F, E>(&self, action: F) -> Result<&Self>
    where
        F: FnOnce() -> std::result::Result<(), E> + Send + 'static,
        E: Into<BoxError>,
    {
        self.push_action(Box::new(move || action().map_err(Into::into)))
    }

    /// Register a disposable without keeping it alive.
    pub fn register_disposable<D>(&self, disposable: &Arc<D>) -> Result<&Self>
    where
        D: Disposable + Send + Sync + 'static,
    {
        let disposable: Arc<dyn Disposable + Send + Sync> = disposable.clone();
        let handle = WeakHandle::wrap(&disposable);

        let mut state = self.state.lock();
        if state.disposed {
            return Err(NotifyError::disposed("resource disposer"));
        }
        let position = state.registered_disposables;
        state.registered_disposables += 1;
        state.disposables.push_back((position, handle));
        Ok(self)
    }

    /// Run every obligation once. Later calls do nothing and return `Ok`.
    ///
    /// Failures are handled per [`FailurePolicy`]. Either way, the disposer
    /// ends up disposed with no obligations left.
    pub fn dispose(&self) -> Result<()> {
        {
            let mut state = self.state.lock();
            if state.disposed {
                return Ok(());
            }
            state.disposed = true;
        }

        let fail_fast = self.config.failure_policy == FailurePolicy::FailFast;
        let mut failures = Vec::new();
        let mut attempted = 0;

        // Popped before running, so a re-entrant dispose never sees it again.
        while let Some((position, action)) = self.next_action() {
            attempted += 1;
            if let Err(error) = action() {
                warn!(position, %error, "cleanup action failed");
                failures.push(CleanupFailure {
                    position,
                    kind: ObligationKind::Action,
                    error,
                });
                if fail_fast {
                    return Err(self.abort(failures, attempted));
                }
            }
        }

        while let Some((position, handle)) = self.next_disposable() {
            let Some(target) = handle.get() else {
                trace!(position, "disposable already dropped");
                continue;
            };
            attempted += 1;
            if let Err(error) = target.dispose() {
                warn!(position, %error, "disposable failed to dispose");
                failures.push(CleanupFailure {
                    position,
                    kind: ObligationKind::Disposable,
                    error: Box::new(error),
                });
                if fail_fast {
                    return Err(self.abort(failures, attempted));
                }
            }
        }

        debug!(attempted, failed = failures.len(), "resource disposer disposed");
        if failures.is_empty() {
            Ok(())
        } else {
            Err(NotifyError::CleanupFailed {
                failures,
                attempted,
            })
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.state.lock().disposed
    }

    pub fn pending_actions(&self) -> usize {
        self.state.lock().actions.len()
    }

    /// Registered disposables not yet processed, dead or alive.
    pub fn pending_disposables(&self) -> usize {
        self.state.lock().disposables.len()
    }

    fn push_action(&self, action: CleanupAction) -> Result<&Self> {
        let mut state = self.state.lock();
        if state.disposed {
            return Err(NotifyError::disposed("resource disposer"));
        }
        let position = state.registered_actions;
        state.registered_actions += 1;
        state.actions.push_back((position, action));
        Ok(self)
    }

    fn next_action(&self) -> Option<(usize, CleanupAction)> {
        self.state.lock().actions.pop_front()
    }

    fn next_disposable(&self) -> Option<(usize, DisposableRef)> {
        self.state.lock().disposables.pop_front()
    }

    fn abort(&self, failures: Vec<CleanupFailure>, attempted: usize) -> NotifyError {
        let (actions, disposables) = {
            let mut state = self.state.lock();
            let actions = std::mem::take(&mut state.actions);
            let disposables = std::mem::take(&mut state.disposables);
            (actions, disposables)
        };
        debug!(
            skipped_actions = actions.len(),
            skipped_disposables = disposables.len(),
            "cleanup aborted after failure"
        );
        NotifyError::CleanupFailed {
            failures,
            attempted,
        }
    }
}

impl Default for ResourceDisposer {
    fn default() -> Self {
        Self::new()
    }
}

impl Disposable for ResourceDisposer {
    fn dispose(&self) -> Result<()> {
        ResourceDisposer::dispose(self)
    }
}

impl fmt::Debug for ResourceDisposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ResourceDisposer")
            .field("actions", &state.actions.len())
            .field("disposables", &state.disposables.len())
            .field("disposed", &state.disposed)
            .field("policy", &self.config.failure_policy)
            .finish()
    }
}
