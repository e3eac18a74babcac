//! Pure copy-on-write access to values at a path.
//!
//! Every function here takes a root value and returns a new root value,
//! leaving the input untouched (the one exception is the leaf handed to the
//! callback of [`mutate_in_place`]). Containers on the written path are
//! shallow-copied; everything off the path keeps its identity. When a write
//! would not change anything, the input root is returned as-is, so callers
//! can detect no-ops with [`Value::same`].

use crate::error::{value_type_name, StoreError, StoreResult};
use crate::{Map, Path, Seg, Value};

/// Read the value at `path`.
///
/// Walking through a missing, `Null` or scalar value yields
/// [`Value::Undefined`]; this never fails.
///
/// ```
/// use tirea_state_tree::{get, path, Value};
/// use serde_json::json;
///
/// let root = Value::from(json!({"a": {"b": [1, 2]}}));
/// assert_eq!(get(&root, &path!("a", "b", 1)), json!(2));
/// assert!(get(&root, &path!("x", "y")).is_undefined());
/// ```
pub fn get(root: &Value, path: &Path) -> Value {
    path.iter()
        .fold(root.clone(), |current, seg| current.child(seg))
}

/// Return a root where the value at `path` is `value`.
///
/// The containers from the root down to the parent of the last segment are
/// shallow-copied. If the value at `path` is already [`same`](Value::same)
/// as `value`, the original root is returned.
///
/// # Errors
///
/// - [`StoreError::MissingParent`] when the parent is `Undefined` or `Null`
/// - [`StoreError::TypeMismatch`] when the parent is a scalar, or a
///   non-numeric key addresses an array
pub fn copy_with_set(root: &Value, path: &Path, value: Value) -> StoreResult<Value> {
    if get(root, path).same(&value) {
        return Ok(root.clone());
    }
    replace_at(root, path.segments(), value, path)
}

/// Return a root where the object at `path` is merged with `partial`.
///
/// Keys of `partial` overwrite keys of the existing object; the existing
/// object itself is not modified. A `Null` leaf merges as an empty object.
/// When the merged object is shallow-equal to the existing one, the original
/// root is returned.
///
/// # Errors
///
/// - [`StoreError::MissingParent`] when the value at `path` is `Undefined`
/// - [`StoreError::MergeRequiresObject`] when the existing value or `partial`
///   is not an object
pub fn copy_with_assign(root: &Value, path: &Path, partial: &Value) -> StoreResult<Value> {
    let leaf = get(root, path);
    let mut merged: Map = match &leaf {
        Value::Undefined => return Err(StoreError::missing_parent(path.clone())),
        Value::Null => Map::new(),
        Value::Object(obj) => obj.borrow().clone(),
        _ => return Err(StoreError::merge_requires_object(path.clone())),
    };
    let partial = partial
        .as_object()
        .ok_or_else(|| StoreError::merge_requires_object(path.clone()))?;
    for (k, v) in partial.borrow().iter() {
        merged.insert(k.clone(), v.clone());
    }

    let merged = Value::from(merged);
    if merged.shallow_equal(&leaf) {
        return Ok(root.clone());
    }
    replace_at(root, path.segments(), merged, path)
}

/// Return a root where the last key of `path` is removed from its parent
/// object.
///
/// Deleting a key that does not exist, or whose parent does not exist, is a
/// no-op and returns the original root.
///
/// # Errors
///
/// - [`StoreError::InvalidOperation`] for the root path
/// - [`StoreError::TypeMismatch`] when the parent is an array
pub fn copy_with_delete(root: &Value, path: &Path) -> StoreResult<Value> {
    let Some((last, parent_segments)) = path.segments().split_last() else {
        return Err(StoreError::invalid_operation("cannot delete the root value"));
    };

    let parent_path = Path::from_segments(parent_segments.to_vec());
    match get(root, &parent_path) {
        Value::Object(obj) => {
            let key = last.to_key();
            if !obj.contains_key(&key) {
                return Ok(root.clone());
            }
            let copy = obj.shallow_copy();
            copy.borrow_mut().remove(&key);
            replace_at(root, parent_segments, Value::Object(copy), path)
        }
        Value::Array(_) => Err(StoreError::type_mismatch(parent_path, "object", "array")),
        _ => Ok(root.clone()),
    }
}

/// Let `f` edit the value at `path` in place, then copy its ancestors.
///
/// `f` receives the current value (possibly `Undefined`) and may mutate the
/// contents of containers through [`Array::borrow_mut`](crate::Array::borrow_mut)
/// or [`Object::borrow_mut`](crate::Object::borrow_mut). The leaf keeps its
/// identity; every ancestor is replaced by a shallow copy, so the returned
/// root differs from the input unless `path` is the root path.
///
/// # Errors
///
/// Same parent checks as [`copy_with_set`]. They run before `f` is called.
pub fn mutate_in_place<F>(root: &Value, path: &Path, f: F) -> StoreResult<Value>
where
    F: FnOnce(&Value),
{
    check_parent(root, path)?;
    let leaf = get(root, path);
    f(&leaf);
    replace_at(root, path.segments(), leaf, path)
}

/// Verify that a write at `path` has a container to land in.
pub(crate) fn check_parent(root: &Value, path: &Path) -> StoreResult<()> {
    let Some((last, parent_segments)) = path.segments().split_last() else {
        return Ok(());
    };
    let parent = parent_segments
        .iter()
        .fold(root.clone(), |current, seg| current.child(seg));
    check_container(&parent, last, path)
}

fn check_container(container: &Value, seg: &Seg, path: &Path) -> StoreResult<()> {
    match container {
        Value::Object(_) => Ok(()),
        Value::Array(_) if seg.as_index().is_some() => Ok(()),
        Value::Array(_) => Err(StoreError::type_mismatch(path.clone(), "object", "array")),
        Value::Undefined | Value::Null => Err(StoreError::missing_parent(path.clone())),
        other => Err(StoreError::type_mismatch(
            path.clone(),
            "object or array",
            value_type_name(other),
        )),
    }
}

/// Rebuild `current` with `leaf` placed at `segments`.
fn replace_at(
    current: &Value,
    segments: &[Seg],
    leaf: Value,
    full_path: &Path,
) -> StoreResult<Value> {
    let Some((seg, rest)) = segments.split_first() else {
        return Ok(leaf);
    };

    check_container(current, seg, full_path)?;
    let child = replace_at(&current.child(seg), rest, leaf, full_path)?;

    match current {
        Value::Object(obj) => {
            let copy = obj.shallow_copy();
            copy.borrow_mut().insert(seg.to_key(), child);
            Ok(Value::Object(copy))
        }
        Value::Array(arr) => {
            // check_container guarantees a numeric segment here
            let index = seg.as_index().unwrap_or_default();
            let copy = arr.shallow_copy();
            {
                let mut items = copy.borrow_mut();
                if index >= items.len() {
                    items.resize(index + 1, Value::Undefined);
                }
                items[index] = child;
            }
            Ok(Value::Array(copy))
        }
        _ => Err(StoreError::missing_parent(full_path.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;
    use serde_json::json;

    fn sample() -> Value {
        Value::from(json!({
            "counter": 0,
            "nested": {"state": 0, "left": null},
            "list": [1, 2, 3]
        }))
    }

    #[test]
    fn test_get_short_circuits() {
        let root = sample();
        assert_eq!(get(&root, &path!("nested", "state")), json!(0));
        assert!(get(&root, &path!("nested", "left")).same(&Value::Null));
        assert!(get(&root, &path!("nested", "left", "deeper")).is_undefined());
        assert!(get(&root, &path!("counter", "x")).is_undefined());
        assert!(get(&root, &path!()).same(&root));
    }

    #[test]
    fn test_set_copies_path_and_shares_siblings() {
        let root = sample();
        let new_root = copy_with_set(&root, &path!("nested", "state"), Value::from(5)).unwrap();

        assert!(!new_root.same(&root));
        assert!(!get(&new_root, &path!("nested")).same(&get(&root, &path!("nested"))));
        assert!(get(&new_root, &path!("list")).same(&get(&root, &path!("list"))));
        assert_eq!(get(&new_root, &path!("nested", "state")), json!(5));
        // input untouched
        assert_eq!(get(&root, &path!("nested", "state")), json!(0));
    }

    #[test]
    fn test_set_keeps_exact_reference() {
        let root = sample();
        let value = Value::from(json!({"fresh": true}));
        let new_root = copy_with_set(&root, &path!("nested"), value.clone()).unwrap();
        assert!(get(&new_root, &path!("nested")).same(&value));
    }

    #[test]
    fn test_set_same_value_returns_same_root() {
        let root = sample();
        let nested = get(&root, &path!("nested"));
        assert!(copy_with_set(&root, &path!("nested"), nested).unwrap().same(&root));
        assert!(copy_with_set(&root, &path!("counter"), Value::from(0)).unwrap().same(&root));
    }

    #[test]
    fn test_set_root_path_replaces_everything() {
        let root = sample();
        let replacement = Value::from(json!({"other": 1}));
        let new_root = copy_with_set(&root, &path!(), replacement.clone()).unwrap();
        assert!(new_root.same(&replacement));
    }

    #[test]
    fn test_set_missing_parent_fails() {
        let root = sample();
        let err = copy_with_set(&root, &path!("missing", "x"), Value::from(1)).unwrap_err();
        assert!(
            matches!(err, StoreError::MissingParent { ref path } if *path == path!("missing", "x"))
        );

        let err = copy_with_set(&root, &path!("nested", "left", "x"), Value::from(1)).unwrap_err();
        assert!(err.is_missing_parent());
    }

    #[test]
    fn test_set_into_scalar_fails() {
        let root = sample();
        let err = copy_with_set(&root, &path!("counter", "x"), Value::from(1)).unwrap_err();
        assert!(matches!(
            err,
            StoreError::TypeMismatch { found: "number", .. }
        ));
    }

    #[test]
    fn test_set_array_index_pads_with_undefined() {
        let root = sample();
        let new_root = copy_with_set(&root, &path!("list", 5), Value::from(6)).unwrap();
        let list = get(&new_root, &path!("list"));
        assert_eq!(list.as_array().unwrap().len(), 6);
        assert!(get(&new_root, &path!("list", 4)).is_undefined());
        assert_eq!(get(&root, &path!("list")), json!([1, 2, 3]));
    }

    #[test]
    fn test_set_array_with_word_key_fails() {
        let root = sample();
        let err = copy_with_set(&root, &path!("list", "first"), Value::from(0)).unwrap_err();
        assert!(matches!(err, StoreError::TypeMismatch { expected: "object", .. }));
    }

    #[test]
    fn test_assign_merges_shallowly() {
        let root = sample();
        let new_root = copy_with_assign(
            &root,
            &path!("nested"),
            &Value::from(json!({"state": 3, "right": 1})),
        )
        .unwrap();
        assert_eq!(
            get(&new_root, &path!("nested")),
            json!({"state": 3, "left": null, "right": 1})
        );
        assert_eq!(get(&root, &path!("nested")), json!({"state": 0, "left": null}));
    }

    #[test]
    fn test_assign_shallow_equal_is_noop() {
        let root = sample();
        let same = copy_with_assign(&root, &path!("nested"), &Value::from(json!({"state": 0})))
            .unwrap();
        assert!(same.same(&root));
    }

    #[test]
    fn test_assign_undefined_leaf_fails() {
        let root = sample();
        let err = copy_with_assign(&root, &path!("optional"), &Value::from(json!({"state": 3})))
            .unwrap_err();
        assert!(err.is_missing_parent());
    }

    #[test]
    fn test_assign_requires_objects() {
        let root = sample();
        let err = copy_with_assign(&root, &path!("counter"), &Value::from(json!({"a": 1})))
            .unwrap_err();
        assert!(matches!(err, StoreError::MergeRequiresObject { .. }));

        let err = copy_with_assign(&root, &path!("nested"), &Value::from(3)).unwrap_err();
        assert!(matches!(err, StoreError::MergeRequiresObject { .. }));
    }

    #[test]
    fn test_assign_null_leaf_starts_empty() {
        let root = sample();
        let new_root =
            copy_with_assign(&root, &path!("nested", "left"), &Value::from(json!({"a": 1})))
                .unwrap();
        assert_eq!(get(&new_root, &path!("nested", "left")), json!({"a": 1}));
    }

    #[test]
    fn test_delete_removes_key() {
        let root = sample();
        let new_root = copy_with_delete(&root, &path!("nested", "state")).unwrap();
        assert_eq!(get(&new_root, &path!("nested")), json!({"left": null}));
        assert!(get(&new_root, &path!("list")).same(&get(&root, &path!("list"))));
        assert_eq!(get(&root, &path!("nested", "state")), json!(0));
    }

    #[test]
    fn test_delete_missing_is_noop() {
        let root = sample();
        assert!(copy_with_delete(&root, &path!("nope")).unwrap().same(&root));
        assert!(copy_with_delete(&root, &path!("nope", "deeper")).unwrap().same(&root));
    }

    #[test]
    fn test_delete_rejects_root_and_array_items() {
        let root = sample();
        assert!(matches!(
            copy_with_delete(&root, &path!()),
            Err(StoreError::InvalidOperation { .. })
        ));
        assert!(matches!(
            copy_with_delete(&root, &path!("list", 0)),
            Err(StoreError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_mutate_keeps_leaf_and_replaces_ancestors() {
        let root = sample();
        let list = get(&root, &path!("list"));
        let new_root = mutate_in_place(&root, &path!("list"), |v| {
            v.as_array().unwrap().push(4);
        })
        .unwrap();

        assert!(!new_root.same(&root));
        assert!(get(&new_root, &path!("list")).same(&list));
        assert_eq!(list, json!([1, 2, 3, 4]));
    }

    #[test]
    fn test_mutate_runs_on_undefined_leaf() {
        let root = sample();
        let mut seen = None;
        mutate_in_place(&root, &path!("nested", "absent"), |v| seen = Some(v.clone())).unwrap();
        assert!(seen.unwrap().is_undefined());
    }

    #[test]
    fn test_mutate_checks_parent_before_running() {
        let root = sample();
        let mut ran = false;
        let err = mutate_in_place(&root, &path!("optional", "state"), |_| ran = true).unwrap_err();
        assert!(err.is_missing_parent());
        assert!(!ran);
    }
}
