#![forbid(unsafe_code)]

use std::sync::{Arc, Mutex, MutexGuard};

/// A complete, internally consistent view of a cell's value at one
/// revision. Readers never observe a torn value: `set` swaps the whole
/// `Arc` and bumps the revision.
#[derive(Debug)]
pub struct Snapshot<T> {
    pub revision: u64,
    pub value: Arc<T>,
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            revision: self.revision,
            value: Arc::clone(&self.value),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber<T> = Arc<dyn Fn(&Snapshot<T>) + Send + Sync + 'static>;

struct CellInner<T> {
    revision: u64,
    value: Arc<T>,
    next_subscription: u64,
    subscribers: Vec<(SubscriptionId, Subscriber<T>)>,
}

/// Single-writer, many-reader observable value holder. Replaces ambient
/// module-level state with an explicit cell that owners pass by
/// reference to whoever needs to read or watch it.
pub struct StateCell<T> {
    inner: Mutex<CellInner<T>>,
}

impl<T> StateCell<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(CellInner {
                revision: 0,
                value: Arc::new(value),
                next_subscription: 1,
                subscribers: Vec::new(),
            }),
        }
    }

    pub fn get(&self) -> Snapshot<T> {
        let inner = self.lock();
        Snapshot {
            revision: inner.revision,
            value: Arc::clone(&inner.value),
        }
    }

    pub fn revision(&self) -> u64 {
        self.lock().revision
    }

    /// Replaces the value, bumps the revision and notifies subscribers.
    /// Notifications run after the lock is released, so a subscriber may
    /// call back into the cell.
    pub fn set(&self, value: T) -> Snapshot<T> {
        let (snapshot, subscribers) = {
            let mut inner = self.lock();
            inner.revision += 1;
            inner.value = Arc::new(value);
            let snapshot = Snapshot {
                revision: inner.revision,
                value: Arc::clone(&inner.value),
            };
            let subscribers: Vec<Subscriber<T>> = inner
                .subscribers
                .iter()
                .map(|(_, subscriber)| Arc::clone(subscriber))
                .collect();
            (snapshot, subscribers)
        };
        for subscriber in &subscribers {
            subscriber(&snapshot);
        }
        snapshot
    }

    /// Read-modify-write on the single writer path.
    pub fn update(&self, apply: impl FnOnce(&T) -> T) -> Snapshot<T> {
        let current = self.get();
        self.set(apply(&current.value))
    }

    pub fn subscribe(
        &self,
        subscriber: impl Fn(&Snapshot<T>) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let mut inner = self.lock();
        let id = SubscriptionId(inner.next_subscription);
        inner.next_subscription += 1;
        inner.subscribers.push((id, Arc::new(subscriber)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.lock();
        let before = inner.subscribers.len();
        inner.subscribers.retain(|(existing, _)| *existing != id);
        inner.subscribers.len() != before
    }

    fn lock(&self) -> MutexGuard<'_, CellInner<T>> {
        self.inner.lock().expect("state cell mutex poisoned")
    }
}

impl<T: Default> Default for StateCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
