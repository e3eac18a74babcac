//! The root store: canonical value, node cache and change dispatch.
//!
//! # Cache
//!
//! The store keeps one entry per *active* path. A path is active while at
//! least one subscription is registered on it, or while any descendant path
//! is active. Entries are created by subscribing and evicted, together with
//! any ancestors they alone were pinning, the moment the last subscription
//! goes away.
//!
//! # Dispatch
//!
//! A write swaps the root and then notifies every active path related to the
//! written one (its ancestors, itself, and its descendants), shortest path
//! first. Each path's value is read from the root at the moment it is
//! delivered, so a round that is overtaken by a nested write never hands out
//! a stale value.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use crate::accessor;
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::stream::{Callback, Subject, SubscriberId};
use crate::{Path, Seg, StoreNode, Subscription, Value};

/// Owner of one state tree.
///
/// `RootStore` is a cheap, clonable handle; clones share the same tree.
///
/// ```
/// use tirea_state_tree::RootStore;
/// use serde_json::json;
///
/// let store = RootStore::new(json!({"counter": 0, "nested": {"state": 0}}));
/// let before = store.state();
///
/// store.child("counter").set(5).unwrap();
///
/// let after = store.state();
/// assert!(!after.same(&before));
/// assert!(store.child("nested").value().same(&before.as_object().unwrap().get("nested")));
/// ```
#[derive(Clone)]
pub struct RootStore {
    inner: Rc<StoreInner>,
}

struct StoreInner {
    config: StoreConfig,
    root: RefCell<Value>,
    cache: RefCell<HashMap<Path, CacheEntry>>,
    next_subscriber: Cell<u64>,
    dispatch_depth: Cell<usize>,
    batch_depth: Cell<usize>,
    pending: RefCell<Vec<Path>>,
}

struct CacheEntry {
    node: StoreNode,
    subject: Subject,
    subscribers: usize,
    children: usize,
}

impl CacheEntry {
    fn new(node: StoreNode) -> Self {
        Self {
            node,
            subject: Subject::default(),
            subscribers: 0,
            children: 0,
        }
    }

    fn is_pinned(&self) -> bool {
        self.subscribers + self.children > 0
    }
}

/// Restores a counter when a scope ends, including by unwinding.
struct DepthGuard<'a>(&'a Cell<usize>);

impl<'a> DepthGuard<'a> {
    fn enter(depth: &'a Cell<usize>) -> Self {
        depth.set(depth.get() + 1);
        Self(depth)
    }
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

impl RootStore {
    /// Create a store holding `initial`.
    pub fn new(initial: impl Into<Value>) -> Self {
        Self::with_config(initial, StoreConfig::default())
    }

    /// Create a store holding `initial` with explicit settings.
    pub fn with_config(initial: impl Into<Value>, config: StoreConfig) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                config,
                root: RefCell::new(initial.into()),
                cache: RefCell::new(HashMap::new()),
                next_subscriber: Cell::new(0),
                dispatch_depth: Cell::new(0),
                batch_depth: Cell::new(0),
                pending: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Settings this store was created with.
    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// The node for the root path.
    pub fn root(&self) -> StoreNode {
        self.node_at(Path::root())
    }

    /// Shorthand for `self.root().child(key)`.
    pub fn child(&self, key: impl Into<Seg>) -> StoreNode {
        self.node_at(Path::root().child(key))
    }

    /// The current root value.
    pub fn state(&self) -> Value {
        self.inner.root.borrow().clone()
    }

    /// Whether both handles refer to the same store.
    pub fn ptr_eq(&self, other: &RootStore) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Paths that currently have a cache entry, sorted.
    pub fn active_paths(&self) -> Vec<Path> {
        let mut paths: Vec<Path> = self.inner.cache.borrow().keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Run `f` with notifications deferred.
    ///
    /// Writes made inside `f` update the root immediately, so reads inside
    /// the batch see them. Subscribers are notified once, after the
    /// outermost batch returns, and only see the final values.
    ///
    /// ```
    /// use std::cell::Cell;
    /// use std::rc::Rc;
    /// use tirea_state_tree::RootStore;
    /// use serde_json::json;
    ///
    /// let store = RootStore::new(json!({"a": 0, "b": 0}));
    /// let calls = Rc::new(Cell::new(0));
    /// let counter = Rc::clone(&calls);
    /// let _sub = store.root().changes().subscribe(move |_| counter.set(counter.get() + 1));
    ///
    /// store
    ///     .batch(|| {
    ///         store.child("a").set(1)?;
    ///         store.child("b").set(2)
    ///     })
    ///     .unwrap()
    ///     .unwrap();
    /// assert_eq!(calls.get(), 2); // replay + one batched notification
    /// ```
    ///
    /// If `f` panics, writes it already committed are still delivered once
    /// the outermost batch unwinds, and the panic is then resumed.
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> StoreResult<R> {
        let outcome = {
            let _batch = DepthGuard::enter(&self.inner.batch_depth);
            panic::catch_unwind(AssertUnwindSafe(f))
        };

        let flushed = if self.inner.batch_depth.get() == 0 {
            self.flush_pending()
        } else {
            Ok(())
        };
        match outcome {
            Ok(result) => flushed.map(|()| result),
            Err(payload) => {
                if let Err(err) = flushed {
                    tracing::warn!(
                        store = %self.inner.config.name,
                        error = %err,
                        "delivering writes of a panicked batch failed"
                    );
                }
                panic::resume_unwind(payload)
            }
        }
    }

    fn flush_pending(&self) -> StoreResult<()> {
        let pending = std::mem::take(&mut *self.inner.pending.borrow_mut());
        if pending.is_empty() {
            return Ok(());
        }
        tracing::debug!(
            store = %self.inner.config.name,
            writes = pending.len(),
            "flushing batched writes"
        );
        self.notify(&pending)
    }

    /// The cached node for `path` when it is active, a fresh one otherwise.
    pub(crate) fn node_at(&self, path: Path) -> StoreNode {
        if let Some(entry) = self.inner.cache.borrow().get(&path) {
            return entry.node.clone();
        }
        StoreNode::new(self.clone(), path)
    }

    pub(crate) fn read(&self, path: &Path) -> Value {
        accessor::get(&self.inner.root.borrow(), path)
    }

    /// Compute a new root from the current one and commit it.
    ///
    /// `update` runs without any borrow of the store held.
    pub(crate) fn write<F>(&self, path: &Path, update: F) -> StoreResult<()>
    where
        F: FnOnce(&Value) -> StoreResult<Value>,
    {
        let max_depth = self.inner.config.max_dispatch_depth;
        if self.inner.dispatch_depth.get() >= max_depth {
            tracing::warn!(
                store = %self.inner.config.name,
                path = %path,
                max_depth,
                "refusing write nested too deeply inside change notifications"
            );
            return Err(StoreError::DispatchDepthExceeded {
                path: path.clone(),
                depth: max_depth,
            });
        }

        let current = self.state();
        let next = update(&current)?;
        if next.same(&current) {
            tracing::trace!(store = %self.inner.config.name, path = %path, "write was a no-op");
            return Ok(());
        }

        *self.inner.root.borrow_mut() = next;
        tracing::debug!(store = %self.inner.config.name, path = %path, "committed write");

        if self.inner.batch_depth.get() > 0 {
            self.inner.pending.borrow_mut().push(path.clone());
            return Ok(());
        }
        self.notify(std::slice::from_ref(path))
    }

    /// Deliver current values to every active path related to `changed`.
    fn notify(&self, changed: &[Path]) -> StoreResult<()> {
        let mut targets: Vec<(Path, Subject)> = self
            .inner
            .cache
            .borrow()
            .iter()
            .filter(|(path, entry)| {
                entry.subscribers > 0 && changed.iter().any(|c| c.is_related_to(path))
            })
            .map(|(path, entry)| (path.clone(), entry.subject.clone()))
            .collect();
        targets.sort_by(|(a, _), (b, _)| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));

        let _dispatch = DepthGuard::enter(&self.inner.dispatch_depth);
        for (path, subject) in targets {
            let value = self.read(&path);
            let delivered = subject.emit(&path, &value)?;
            if delivered > 0 {
                tracing::trace!(
                    store = %self.inner.config.name,
                    path = %path,
                    delivered,
                    "delivered change"
                );
            }
        }
        Ok(())
    }

    /// Register `callback` on `node`'s path and replay the current value.
    pub(crate) fn subscribe(&self, node: &StoreNode, callback: Callback) -> Subscription {
        let path = node.path().clone();
        let id = SubscriberId(self.inner.next_subscriber.get());
        self.inner.next_subscriber.set(id.0 + 1);

        let current = self.read(&path);
        {
            let mut cache = self.inner.cache.borrow_mut();
            activate(&mut cache, self, node);
            if let Some(entry) = cache.get_mut(&path) {
                entry.subscribers += 1;
                entry.subject.add(id, current.clone(), Rc::clone(&callback));
            }
        }
        tracing::trace!(store = %self.inner.config.name, path = %path, "subscribed");

        // Created before the replay so that a panicking callback still
        // unregisters while unwinding.
        let subscription = Subscription::new(self.clone(), path, id);
        callback(&current);
        subscription
    }

    pub(crate) fn unsubscribe(&self, path: &Path, id: SubscriberId) {
        let removed;
        let evicted;
        {
            let mut cache = self.inner.cache.borrow_mut();
            let Some(entry) = cache.get_mut(path) else {
                return;
            };
            removed = entry.subject.remove(id);
            if removed.is_none() {
                return;
            }
            entry.subscribers -= 1;
            debug_assert_eq!(entry.subscribers, entry.subject.len());
            evicted = release(&mut cache, path);
        }
        tracing::trace!(
            store = %self.inner.config.name,
            path = %path,
            evicted = evicted.len(),
            "unsubscribed"
        );
        // Callbacks and nodes may own subscriptions of their own; drop them
        // only after the cache borrow is gone.
        drop(removed);
        drop(evicted);
    }
}

/// Create the entry for `node`'s path, pinning ancestors as needed.
fn activate(cache: &mut HashMap<Path, CacheEntry>, store: &RootStore, node: &StoreNode) {
    if cache.contains_key(node.path()) {
        return;
    }
    cache.insert(node.path().clone(), CacheEntry::new(node.clone()));

    let mut current = node.path().clone();
    while let Some(parent) = current.parent() {
        if let Some(entry) = cache.get_mut(&parent) {
            entry.children += 1;
            return;
        }
        let mut entry = CacheEntry::new(StoreNode::new(store.clone(), parent.clone()));
        entry.children = 1;
        cache.insert(parent.clone(), entry);
        current = parent;
    }
}

/// Evict `path` and every ancestor no longer pinned. Returns evicted entries.
fn release(cache: &mut HashMap<Path, CacheEntry>, path: &Path) -> Vec<CacheEntry> {
    let mut evicted = Vec::new();
    let mut current = path.clone();
    loop {
        match cache.get(&current) {
            Some(entry) if !entry.is_pinned() => {}
            _ => break,
        }
        if let Some(entry) = cache.remove(&current) {
            evicted.push(entry);
        }
        let Some(parent) = current.parent() else {
            break;
        };
        if let Some(entry) = cache.get_mut(&parent) {
            entry.children -= 1;
        }
        current = parent;
    }
    evicted
}

impl fmt::Debug for RootStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootStore")
            .field("name", &self.inner.config.name)
            .field("active_paths", &self.inner.cache.borrow().len())
            .finish()
    }
}
