//! Store configuration.

use serde::{Deserialize, Serialize};

/// Default bound on nested write/notify rounds.
pub const DEFAULT_MAX_DISPATCH_DEPTH: usize = 64;

/// Settings for a [`RootStore`](crate::RootStore).
///
/// ```
/// use tirea_state_tree::StoreConfig;
///
/// let config: StoreConfig = serde_json::from_str(r#"{"name": "session"}"#).unwrap();
/// assert_eq!(config.name, "session");
/// assert_eq!(config.max_dispatch_depth, 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Label attached to tracing events emitted by the store.
    pub name: String,
    /// How deeply subscribers may nest writes inside their own
    /// notifications before further writes are refused.
    pub max_dispatch_depth: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: "state-tree".to_owned(),
            max_dispatch_depth: DEFAULT_MAX_DISPATCH_DEPTH,
        }
    }
}

impl StoreConfig {
    /// Default settings.
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_max_dispatch_depth(mut self, depth: usize) -> Self {
        self.max_dispatch_depth = depth;
        self
    }
}
