//! Path-addressable reactive state tree.
//!
//! `tirea-state-tree` keeps one immutable value tree per [`RootStore`] and
//! hands out [`StoreNode`] handles for any path into it. Nodes read, replace,
//! merge, delete or (explicitly) mutate the value at their path, and expose a
//! synchronous change stream of it.
//!
//! # Core Concepts
//!
//! - **Value**: the tree itself; arrays and objects are shared containers with
//!   identity ([`Value::same`])
//! - **Accessor functions**: pure copy-on-write updates ([`copy_with_set`],
//!   [`copy_with_assign`], [`copy_with_delete`], [`mutate_in_place`])
//! - **StoreNode**: a handle bound to a [`Path`]
//! - **Changes / Subscription**: the live stream of a path's value
//! - **RootStore**: the canonical root, the node cache and dispatch
//!
//! # Guarantees
//!
//! - Writes never modify existing containers (except through
//!   [`StoreNode::mutate_using`]); unaffected subtrees keep their identity
//! - A write that changes nothing leaves the root untouched and notifies no one
//! - Subscribing replays the current value synchronously
//! - A stream fires only when the value at its path changes identity
//! - Ancestor streams are notified before descendant streams
//!
//! # Quick Start
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use tirea_state_tree::{RootStore, Value};
//! use serde_json::json;
//!
//! let store = RootStore::new(json!({"counter": 0, "optional": null}));
//! let seen = Rc::new(RefCell::new(Vec::<Value>::new()));
//!
//! let log = Rc::clone(&seen);
//! let sub = store
//!     .child("optional")
//!     .child("state")
//!     .changes()
//!     .subscribe(move |v| log.borrow_mut().push(v.clone()));
//!
//! store.child("optional").set(json!({"state": 17})).unwrap();
//! store.child("optional").delete().unwrap();
//!
//! assert_eq!(seen.borrow().len(), 3);
//! assert!(seen.borrow()[0].is_undefined());
//! assert_eq!(seen.borrow()[1], json!(17));
//! assert!(seen.borrow()[2].is_undefined());
//! sub.unsubscribe();
//! ```
//!
//! Everything is single-threaded and synchronous; handles are `!Send`.

mod accessor;
mod config;
mod error;
mod node;
mod path;
mod store;
mod stream;
mod value;

pub use accessor::{copy_with_assign, copy_with_delete, copy_with_set, get, mutate_in_place};
pub use config::{StoreConfig, DEFAULT_MAX_DISPATCH_DEPTH};
pub use error::{value_type_name, StoreError, StoreResult};
pub use node::StoreNode;
pub use path::{Path, Seg};
pub use store::RootStore;
pub use stream::{Changes, Subscription};
pub use value::{Array, Map, Object, Value};
