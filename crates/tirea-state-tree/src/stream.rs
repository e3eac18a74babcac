//! Per-path change streams.
//!
//! A [`Changes`] handle is cold: it only names a path. Subscribing activates
//! the path in the store's cache, replays the current value synchronously and
//! keeps the callback registered until the returned [`Subscription`] is
//! dropped or explicitly unsubscribed.
//!
//! Delivery is multicast: the store computes a path's value once per
//! dispatch round and hands it to every subscriber whose last delivered
//! value is not [`same`](Value::same). Each round iterates over a snapshot of
//! subscriber ids, so callbacks may subscribe, unsubscribe or write while a
//! round is in flight.

use std::any::Any;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use crate::error::{StoreError, StoreResult};
use crate::{Path, RootStore, StoreNode, Value};

pub(crate) type Callback = Rc<dyn Fn(&Value)>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct SubscriberId(pub(crate) u64);

pub(crate) struct Subscriber {
    id: SubscriberId,
    last: Value,
    callback: Callback,
}

/// Subscriber list of one active path.
#[derive(Clone, Default)]
pub(crate) struct Subject {
    subscribers: Rc<RefCell<Vec<Subscriber>>>,
}

impl Subject {
    pub(crate) fn add(&self, id: SubscriberId, current: Value, callback: Callback) {
        self.subscribers.borrow_mut().push(Subscriber {
            id,
            last: current,
            callback,
        });
    }

    /// Remove a subscriber and hand it back so the caller can drop it outside
    /// of any borrow.
    pub(crate) fn remove(&self, id: SubscriberId) -> Option<Subscriber> {
        let mut subscribers = self.subscribers.borrow_mut();
        let position = subscribers.iter().position(|s| s.id == id)?;
        Some(subscribers.remove(position))
    }

    pub(crate) fn len(&self) -> usize {
        self.subscribers.borrow().len()
    }

    /// Deliver `value` to every subscriber that has not seen it yet.
    ///
    /// Returns the number of callbacks invoked. A panicking callback aborts
    /// the round.
    pub(crate) fn emit(&self, path: &Path, value: &Value) -> StoreResult<usize> {
        let ids: Vec<SubscriberId> = self.subscribers.borrow().iter().map(|s| s.id).collect();
        let mut delivered = 0;

        for id in ids {
            let callback = {
                let mut subscribers = self.subscribers.borrow_mut();
                let Some(subscriber) = subscribers.iter_mut().find(|s| s.id == id) else {
                    continue;
                };
                if subscriber.last.same(value) {
                    continue;
                }
                subscriber.last = value.clone();
                Rc::clone(&subscriber.callback)
            };
            invoke(path, &callback, value)?;
            delivered += 1;
        }

        Ok(delivered)
    }
}

fn invoke(path: &Path, callback: &Callback, value: &Value) -> StoreResult<()> {
    panic::catch_unwind(AssertUnwindSafe(|| callback(value))).map_err(|payload| {
        let message = panic_message(payload.as_ref());
        tracing::warn!(path = %path, %message, "change subscriber panicked");
        StoreError::Subscriber {
            path: path.clone(),
            message,
        }
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

/// The live stream of values at one path.
///
/// Obtained from [`StoreNode::changes`].
#[derive(Clone, Debug)]
pub struct Changes {
    node: StoreNode,
}

impl Changes {
    pub(crate) fn new(node: StoreNode) -> Self {
        Self { node }
    }

    pub fn path(&self) -> &Path {
        self.node.path()
    }

    /// Register `callback` and call it once, before returning, with the
    /// current value at the path.
    ///
    /// Afterwards `callback` runs synchronously whenever a write changes the
    /// value at the path (by [`Value::same`]). Callbacks may read, write and
    /// subscribe re-entrantly.
    ///
    /// ```
    /// use std::cell::RefCell;
    /// use std::rc::Rc;
    /// use tirea_state_tree::RootStore;
    /// use serde_json::json;
    ///
    /// let store = RootStore::new(json!({"counter": 0}));
    /// let seen = Rc::new(RefCell::new(Vec::new()));
    ///
    /// let log = Rc::clone(&seen);
    /// let _sub = store
    ///     .child("counter")
    ///     .changes()
    ///     .subscribe(move |v| log.borrow_mut().push(v.as_i64()));
    ///
    /// store.child("counter").set(1).unwrap();
    /// store.child("counter").set(1).unwrap();
    /// assert_eq!(*seen.borrow(), vec![Some(0), Some(1)]);
    /// ```
    ///
    /// # Panics
    ///
    /// A panic in the replay call propagates out of `subscribe`, and the
    /// callback is unregistered while unwinding. Panics during later
    /// deliveries are caught and returned from the write that triggered them
    /// as [`StoreError::Subscriber`].
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Value) + 'static,
    {
        self.node.root_store().subscribe(&self.node, Rc::new(callback))
    }
}

/// Keeps a change callback registered.
///
/// Dropping the subscription unsubscribes; so does [`unsubscribe`].
/// Unsubscribing releases the path's cache entry (and any ancestor entries
/// pinned only by it) immediately.
///
/// [`unsubscribe`]: Subscription::unsubscribe
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    store: RootStore,
    path: Path,
    id: SubscriberId,
    active: bool,
}

impl Subscription {
    pub(crate) fn new(store: RootStore, path: Path, id: SubscriberId) -> Self {
        Self {
            store,
            path,
            id,
            active: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if std::mem::take(&mut self.active) {
            self.store.unsubscribe(&self.path, self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("path", &self.path)
            .field("active", &self.active)
            .finish()
    }
}
