//! # Render registry for custom component types.
//!
//! Maps a component type tag to a render function. The function is resolved
//! **once**, when the custom component is constructed — rendering never does
//! a tag lookup at runtime.
//!
//! ## Rules
//! - Built-in kinds do not go through the registry; their render behavior is
//!   part of the type.
//! - Registering a tag twice replaces the previous function (last wins).
//! - A render function must be pure: same state in, same payload out.
//!
//! ## Example
//! ```
//! use livecard::{Component, RenderRegistry};
//! use serde_json::json;
//!
//! let mut registry = RenderRegistry::new();
//! registry.register("counter", |state| {
//!     let n = state.get("n").and_then(|v| v.as_u64()).unwrap_or(0);
//!     Ok(json!({ "count": n }))
//! });
//!
//! let component = Component::custom(&registry, "counter", json!({ "n": 1 }));
//! assert!(component.is_some());
//! assert!(Component::custom(&registry, "unknown", json!({})).is_none());
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

/// Render function for a custom component: state in, payload out.
///
/// Errors are isolated per entry at snapshot time — a failing render
/// function produces an error placeholder payload for that component only.
pub type RenderFn = Arc<dyn Fn(&Value) -> Result<Value, String> + Send + Sync>;

/// Registry mapping custom component type tags to render functions.
#[derive(Clone, Default)]
pub struct RenderRegistry {
    map: HashMap<String, RenderFn>,
}

impl RenderRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// Registers a render function for the given type tag.
    ///
    /// Replaces any previously registered function for the same tag.
    pub fn register<F>(&mut self, tag: impl Into<String>, f: F)
    where
        F: Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.map.insert(tag.into(), Arc::new(f));
    }

    /// Resolves the render function for a tag, if one is registered.
    pub fn resolve(&self, tag: &str) -> Option<RenderFn> {
        self.map.get(tag).cloned()
    }

    /// Returns true if the tag has a registered render function.
    pub fn contains(&self, tag: &str) -> bool {
        self.map.contains_key(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_registered_tag() {
        let mut reg = RenderRegistry::new();
        reg.register("echo", |state| Ok(state.clone()));

        let f = reg.resolve("echo").expect("registered");
        assert_eq!(f(&json!({"a": 1})).unwrap(), json!({"a": 1}));
        assert!(reg.resolve("missing").is_none());
    }

    #[test]
    fn test_register_twice_last_wins() {
        let mut reg = RenderRegistry::new();
        reg.register("t", |_| Ok(json!(1)));
        reg.register("t", |_| Ok(json!(2)));

        let f = reg.resolve("t").expect("registered");
        assert_eq!(f(&json!(null)).unwrap(), json!(2));
    }
}
