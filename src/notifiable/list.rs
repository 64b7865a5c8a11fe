//! A list that relays its items' property changes.

use crate::disposer::Disposable;
use crate::error::{NotifyError, Result};
use crate::subscriptions::{DisposeToken, SubscriptionRegistry};
use crate::types::PropertyName;
use crate::weak::{Method, Receiver};
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::trace;

use super::{Notifiable, NotifiableSource};

/// Property raised when the number of items changes.
pub const COUNT_PROPERTY: &str = "Count";
/// Property raised when the list contents change.
pub const ITEMS_PROPERTY: &str = "Item[]";

/// Ordered collection of notifiable items.
///
/// The list watches each item through a weakly-bound handler, so items never
/// keep the list alive. Item changes are re-raised to item listeners with
/// the item as source; content changes raise `Count` and `Item[]` on the
/// list itself, once per operation.
pub struct ObservableList<T: Notifiable> {
    me: Weak<Self>,
    items: Mutex<Vec<Arc<T>>>,
    notifier: NotifiableSource<Self>,
    item_changes: SubscriptionRegistry<T>,
    relay: Method<T>,
    disposed: AtomicBool,
}

impl<T: Notifiable> Notifiable for ObservableList<T> {
    const PROPERTY_NAMES: &'static [&'static str] = &[COUNT_PROPERTY, ITEMS_PROPERTY];

    fn notifier(&self) -> &NotifiableSource<Self> {
        &self.notifier
    }
}

impl<T: Notifiable> ObservableList<T> {
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|me: &Weak<Self>| Self {
            me: me.clone(),
            items: Mutex::new(Vec::new()),
            notifier: NotifiableSource::new(me.clone()),
            item_changes: SubscriptionRegistry::detached(),
            relay: Method::bound(|list: &Self, item: &T, property: &PropertyName| {
                list.item_changed(item, property)
            }),
            disposed: AtomicBool::new(false),
        })
    }

    pub fn with_items<I>(items: I) -> Result<Arc<Self>>
    where
        I: IntoIterator<Item = Arc<T>>,
    {
        let list = Self::new();
        list.add_range(items)?;
        Ok(list)
    }

    pub fn push(&self, item: Arc<T>) -> Result<()> {
        self.add_range([item]).map(|_| ())
    }

    /// Append `items`, raising change notifications once.
    pub fn add_range<I>(&self, items: I) -> Result<usize>
    where
        I: IntoIterator<Item = Arc<T>>,
    {
        self.ensure_active()?;
        let items: Vec<Arc<T>> = items.into_iter().collect();
        if items.is_empty() {
            return Ok(0);
        }

        let current = self.snapshot();
        self.attach_all(&items, &current)?;
        self.items.lock().extend(items.iter().cloned());

        self.raise_changed()?;
        Ok(items.len())
    }

    /// Remove every item matching `predicate`. Returns how many were removed.
    ///
    /// The predicate runs on a snapshot with no lock held, so it may read
    /// the list.
    pub fn remove_where<F>(&self, mut predicate: F) -> Result<usize>
    where
        F: FnMut(&T) -> bool,
    {
        self.ensure_active()?;
        let matched: Vec<Arc<T>> = self
            .snapshot()
            .into_iter()
            .filter(|item| predicate(item.as_ref()))
            .collect();
        if matched.is_empty() {
            return Ok(0);
        }

        let removed: Vec<Arc<T>> = {
            let mut items = self.items.lock();
            let (removed, kept): (Vec<_>, Vec<_>) =
                items.drain(..).partition(|item| contains(&matched, item));
            *items = kept;
            removed
        };
        if removed.is_empty() {
            return Ok(0);
        }

        let remaining = self.snapshot();
        self.detach_all(&removed, &remaining);

        self.raise_changed()?;
        Ok(removed.len())
    }

    /// Replace the whole contents, raising change notifications once.
    pub fn replace_all<I>(&self, items: I) -> Result<()>
    where
        I: IntoIterator<Item = Arc<T>>,
    {
        self.ensure_active()?;
        let items: Vec<Arc<T>> = items.into_iter().collect();

        let old = self.snapshot();
        self.attach_all(&items, &old)?;
        *self.items.lock() = items.clone();
        self.detach_all(&old, &items);

        self.raise_changed()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Arc<T>> {
        self.items.lock().get(index).cloned()
    }

    pub fn snapshot(&self) -> Vec<Arc<T>> {
        self.items.lock().clone()
    }

    /// Listen to every property change of every item, bound weakly to
    /// `receiver`.
    pub fn subscribe_items<R>(&self, receiver: &Arc<R>, method: &Method<T>) -> Result<DisposeToken>
    where
        R: Any + Send + Sync,
    {
        let receiver: Receiver = receiver.clone();
        self.item_changes.add_handler(Some(&receiver), method)
    }

    pub fn subscribe_items_static(&self, method: &Method<T>) -> Result<DisposeToken> {
        self.item_changes.add_handler(None, method)
    }

    /// Stop watching the items, then dispose both registries.
    pub fn dispose(&self) -> Result<()> {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let items = std::mem::take(&mut *self.items.lock());
        self.detach_all(&items, &[]);
        self.item_changes.dispose();
        self.notifier.dispose()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn ensure_active(&self) -> Result<()> {
        if self.is_disposed() {
            return Err(NotifyError::disposed("observable list"));
        }
        Ok(())
    }

    fn item_changed(&self, item: &T, property: &PropertyName) {
        if let Err(error) = self.item_changes.relay(item, property.as_str()) {
            trace!(%error, "item change not relayed");
        }
    }

    fn raise_changed(&self) -> Result<()> {
        self.notifier.on_property_changed(COUNT_PROPERTY)?;
        self.notifier.on_property_changed(ITEMS_PROPERTY)?;
        Ok(())
    }

    /// Watch each of `items` not already in `watched`. On failure, handlers
    /// added by this call are removed again.
    fn attach_all(&self, items: &[Arc<T>], watched: &[Arc<T>]) -> Result<()> {
        let Some(me) = self.me.upgrade() else {
            return Err(NotifyError::disposed("observable list"));
        };

        let mut attached: Vec<Arc<T>> = Vec::new();
        for item in items {
            if contains(watched, item) || contains(&attached, item) {
                continue;
            }
            if let Err(error) = item.notifier().add_handler(&me, &self.relay) {
                self.detach_all(&attached, &[]);
                return Err(error);
            }
            attached.push(Arc::clone(item));
        }
        Ok(())
    }

    /// Stop watching each of `items` not still present in `kept`.
    fn detach_all(&self, items: &[Arc<T>], kept: &[Arc<T>]) {
        let Some(me) = self.me.upgrade() else {
            return;
        };

        let mut detached: Vec<&Arc<T>> = Vec::new();
        for item in items {
            if contains(kept, item) || detached.iter().any(|d| Arc::ptr_eq(d, item)) {
                continue;
            }
            // A disposed item has already dropped every handler.
            if let Err(error) = item.notifier().remove_handler(&me, &self.relay) {
                trace!(%error, "item handler not removed");
            }
            detached.push(item);
        }
    }
}

fn contains<T>(items: &[Arc<T>], item: &Arc<T>) -> bool {
    items.iter().any(|i| Arc::ptr_eq(i, item))
}

impl<T: Notifiable> Disposable for ObservableList<T> {
    fn dispose(&self) -> Result<()> {
        ObservableList::dispose(self)
    }
}

impl<T: Notifiable> fmt::Debug for ObservableList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableList")
            .field("len", &self.len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    struct Task {
        id: u32,
        done: AtomicBool,
        notifier: NotifiableSource<Task>,
    }

    impl Task {
        fn new(id: u32) -> Arc<Self> {
            Arc::new_cyclic(|me| Task {
                id,
                done: AtomicBool::new(false),
                notifier: NotifiableSource::new(me.clone()),
            })
        }

        fn complete(&self) {
            self.done.store(true, Ordering::SeqCst);
            self.on_property_changed("Done").unwrap();
        }
    }

    impl Notifiable for Task {
        const PROPERTY_NAMES: &'static [&'static str] = &["Done"];

        fn notifier(&self) -> &NotifiableSource<Self> {
            &self.notifier
        }
    }

    #[derive(Default)]
    struct Board {
        events: Mutex<Vec<(u32, String)>>,
    }

    fn board_method() -> Method<Task> {
        Method::bound(|b: &Board, task: &Task, property: &PropertyName| {
            b.events.lock().push((task.id, property.to_string()))
        })
    }

    #[test]
    fn test_relays_item_changes() {
        let list = ObservableList::new();
        let a = Task::new(1);
        let b = Task::new(2);
        list.add_range([a.clone(), b.clone()]).unwrap();

        let board = Arc::new(Board::default());
        let _token = list.subscribe_items(&board, &board_method()).unwrap();

        b.complete();
        a.complete();
        assert_eq!(
            *board.events.lock(),
            vec![(2, "Done".to_string()), (1, "Done".to_string())]
        );
    }

    #[test]
    fn test_removed_items_no_longer_relayed() {
        let list = ObservableList::new();
        let a = Task::new(1);
        let b = Task::new(2);
        list.add_range([a.clone(), b.clone()]).unwrap();
        let board = Arc::new(Board::default());
        let _token = list.subscribe_items(&board, &board_method()).unwrap();

        assert_eq!(list.remove_where(|t| t.id == 1).unwrap(), 1);
        assert_eq!(a.notifier.subscription_count(), 0);

        a.complete();
        b.complete();
        assert_eq!(*board.events.lock(), vec![(2, "Done".to_string())]);
    }

    #[test]
    fn test_bulk_operations_raise_once() {
        let list = ObservableList::new();
        let counts = Arc::new(AtomicU32::new(0));
        let sink = counts.clone();
        let _token = list
            .notifier
            .subscribe_fn(COUNT_PROPERTY, move |_: &ObservableList<Task>| {
                sink.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        list.add_range((0..5).map(Task::new)).unwrap();
        list.replace_all((5..7).map(Task::new)).unwrap();
        list.remove_where(|_| true).unwrap();
        assert_eq!(list.remove_where(|_| true).unwrap(), 0);

        assert_eq!(counts.load(Ordering::SeqCst), 3);
        assert!(list.is_empty());
    }

    #[test]
    fn test_remove_where_predicate_reads_list() {
        let list = ObservableList::new();
        list.add_range((0..4).map(Task::new)).unwrap();

        let removed = list
            .remove_where(|t| list.len() > 2 && t.id % 2 == 0)
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(
            list.snapshot().iter().map(|t| t.id).collect::<Vec<_>>(),
            vec![1, 3]
        );
    }

    #[test]
    fn test_duplicate_item_keeps_one_handler() {
        let list = ObservableList::new();
        let a = Task::new(1);
        list.push(a.clone()).unwrap();
        list.push(a.clone()).unwrap();
        assert_eq!(a.notifier.subscription_count(), 1);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_dropped_list_purged_from_items() {
        let a = Task::new(1);
        let list = ObservableList::with_items([a.clone()]).unwrap();
        assert_eq!(a.notifier.subscription_count(), 1);

        drop(list);
        a.complete();
        assert_eq!(a.notifier.subscription_count(), 0);
    }

    #[test]
    fn test_dispose_detaches_items() {
        let a = Task::new(1);
        let list = ObservableList::with_items([a.clone()]).unwrap();
        list.dispose().unwrap();
        list.dispose().unwrap();

        assert_eq!(a.notifier.subscription_count(), 0);
        assert!(matches!(
            list.push(Task::new(2)),
            Err(NotifyError::IllegalState(_))
        ));
    }
}
