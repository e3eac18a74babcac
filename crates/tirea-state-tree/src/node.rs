//! Handles bound to one path of a store.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::rc::Rc;

use crate::accessor::{self, check_parent};
use crate::{Changes, Path, RootStore, Seg, StoreResult, Value};

/// A read/write handle for the value at one path.
///
/// Nodes are cheap to create and never fail to construct, even when nothing
/// exists at their path yet. While a path is active (something is subscribed
/// to it or below it), [`child`](StoreNode::child) hands out the same node
/// instance; otherwise each call returns a fresh, equivalent node.
#[derive(Clone)]
pub struct StoreNode(Rc<NodeInner>);

struct NodeInner {
    store: RootStore,
    path: Path,
}

impl StoreNode {
    pub(crate) fn new(store: RootStore, path: Path) -> Self {
        Self(Rc::new(NodeInner { store, path }))
    }

    pub fn path(&self) -> &Path {
        &self.0.path
    }

    /// The store this node belongs to.
    pub fn root_store(&self) -> RootStore {
        self.0.store.clone()
    }

    /// Whether both handles are the same node instance.
    pub fn ptr_eq(a: &StoreNode, b: &StoreNode) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    /// The current value at this path, read fresh from the root.
    pub fn value(&self) -> Value {
        self.0.store.read(&self.0.path)
    }

    /// Deserialize the current value.
    pub fn value_as<T: DeserializeOwned>(&self) -> StoreResult<T> {
        Ok(serde_json::from_value(self.value().to_json())?)
    }

    /// The node one level below this one.
    pub fn child(&self, key: impl Into<Seg>) -> StoreNode {
        self.0.store.node_at(self.0.path.child(key))
    }

    /// One node per key currently present under this path.
    ///
    /// Object keys come back in key order, array items in index order.
    /// Anything else has no children.
    pub fn children(&self) -> Vec<StoreNode> {
        match self.value() {
            Value::Object(obj) => obj.keys().into_iter().map(|k| self.child(k)).collect(),
            Value::Array(arr) => (0..arr.len()).map(|i| self.child(i)).collect(),
            _ => Vec::new(),
        }
    }

    /// The change stream of this path.
    pub fn changes(&self) -> Changes {
        Changes::new(self.clone())
    }

    /// Replace the value at this path.
    ///
    /// Setting a value that is already [`same`](Value::same) as the current
    /// one changes nothing and notifies nobody.
    pub fn set(&self, value: impl Into<Value>) -> StoreResult<()> {
        let value = value.into();
        self.0
            .store
            .write(&self.0.path, |root| accessor::copy_with_set(root, &self.0.path, value))
    }

    /// Serialize `value` and store the result at this path.
    pub fn set_serialized<T: Serialize>(&self, value: &T) -> StoreResult<()> {
        let json = serde_json::to_value(value)?;
        self.set(json)
    }

    /// Shallow-merge `partial` into the object at this path.
    pub fn assign(&self, partial: impl Into<Value>) -> StoreResult<()> {
        let partial = partial.into();
        self.0.store.write(&self.0.path, |root| {
            accessor::copy_with_assign(root, &self.0.path, &partial)
        })
    }

    /// Replace the value with `f(current)`.
    ///
    /// Fails with [`StoreError::MissingParent`](crate::StoreError::MissingParent)
    /// before calling `f` when the parent container is absent.
    pub fn set_using<F, V>(&self, f: F) -> StoreResult<()>
    where
        F: FnOnce(&Value) -> V,
        V: Into<Value>,
    {
        self.0.store.write(&self.0.path, |root| {
            check_parent(root, &self.0.path)?;
            let next = f(&accessor::get(root, &self.0.path)).into();
            accessor::copy_with_set(root, &self.0.path, next)
        })
    }

    /// Edit the current value in place.
    ///
    /// `f` may mutate the contents of the array or object it is given. The
    /// value keeps its identity, so subscribers of this exact path are not
    /// notified; subscribers of every ancestor are.
    ///
    /// ```
    /// use tirea_state_tree::RootStore;
    /// use serde_json::json;
    ///
    /// let store = RootStore::new(json!({"array": []}));
    /// store
    ///     .child("array")
    ///     .mutate_using(|v| v.as_array().unwrap().push(1))
    ///     .unwrap();
    /// assert_eq!(store.child("array").value(), json!([1]));
    /// ```
    pub fn mutate_using<F>(&self, f: F) -> StoreResult<()>
    where
        F: FnOnce(&Value),
    {
        self.0.store.write(&self.0.path, |root| {
            accessor::mutate_in_place(root, &self.0.path, f)
        })
    }

    /// Remove this path's key from its parent object.
    pub fn delete(&self) -> StoreResult<()> {
        self.0
            .store
            .write(&self.0.path, |root| accessor::copy_with_delete(root, &self.0.path))
    }
}

impl fmt::Debug for StoreNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StoreNode").field(&self.0.path).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{path, StoreError};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Nested {
        state: i64,
    }

    fn store() -> RootStore {
        RootStore::new(json!({
            "counter": 0,
            "nested": {"state": 0},
            "list": ["a", "b"]
        }))
    }

    #[test]
    fn test_child_paths() {
        let store = store();
        let node = store.child("nested").child("state");
        assert_eq!(node.path(), &path!("nested", "state"));
        assert_eq!(node.value(), json!(0));
        assert!(store.child("nope").child("deeper").value().is_undefined());
    }

    #[test]
    fn test_root_store_reachable_from_any_depth() {
        let store = store();
        let deep = store.child("a").child("b").child(3);
        assert!(deep.root_store().ptr_eq(&store));
    }

    #[test]
    fn test_set_and_assign() {
        let store = store();
        store.child("counter").set(5).unwrap();
        store.child("nested").assign(json!({"extra": true})).unwrap();
        assert_eq!(
            store.state(),
            json!({"counter": 5, "nested": {"state": 0, "extra": true}, "list": ["a", "b"]})
        );
    }

    #[test]
    fn test_set_using_checks_parent() {
        let store = store();
        store
            .child("counter")
            .set_using(|v| v.as_i64().unwrap_or_default() + 1)
            .unwrap();
        assert_eq!(store.child("counter").value(), json!(1));

        // a missing leaf is fine, a missing parent is not
        store.child("fresh").set_using(|_| 1).unwrap();
        let mut called = false;
        let err = store
            .child("optional")
            .child("state")
            .set_using(|_| {
                called = true;
                1
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingParent { .. }));
        assert!(!called);
    }

    #[test]
    fn test_delete() {
        let store = store();
        store.child("nested").delete().unwrap();
        assert!(store.child("nested").value().is_undefined());
        assert!(store.state().as_object().unwrap().get("nested").is_undefined());
    }

    #[test]
    fn test_children() {
        let store = store();
        let keys: Vec<Path> = store.root().children().iter().map(|n| n.path().clone()).collect();
        assert_eq!(keys, vec![path!("counter"), path!("list"), path!("nested")]);

        let items: Vec<Value> = store
            .child("list")
            .children()
            .iter()
            .map(StoreNode::value)
            .collect();
        assert_eq!(items, vec![Value::from("a"), Value::from("b")]);

        assert!(store.child("counter").children().is_empty());
    }

    #[test]
    fn test_typed_bridge() {
        let store = store();
        let nested: Nested = store.child("nested").value_as().unwrap();
        assert_eq!(nested, Nested { state: 0 });

        store.child("nested").set_serialized(&Nested { state: 9 }).unwrap();
        assert_eq!(store.child("nested").child("state").value(), json!(9));

        let err = store.child("counter").value_as::<Nested>().unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[test]
    fn test_debug_shows_path() {
        let store = store();
        assert_eq!(
            format!("{:?}", store.child("a").child(0)),
            r#"StoreNode(Path([Key("a"), Index(0)]))"#
        );
    }
}
