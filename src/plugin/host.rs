//! Host interface for plugins.
//!
//! This module defines what the host application hands to plugins: an
//! application context (scoped to one plugin, or the live whole-app view)
//! and a shared method object plugins can call back into.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Application context handed to plugins.
///
/// The loader and dispatcher never look inside `data`; its shape is a
/// contract between the host and its plugins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppContext {
    /// Plugin this context is scoped to, `None` for the live app context.
    pub plugin: Option<String>,
    /// Host-defined payload.
    #[serde(default)]
    pub data: serde_json::Value,
}

impl AppContext {
    /// Create a context scoped to a single plugin.
    pub fn scoped(plugin: impl Into<String>, data: serde_json::Value) -> Self {
        Self { plugin: Some(plugin.into()), data }
    }

    /// Create a live, unscoped application context.
    pub fn live(data: serde_json::Value) -> Self {
        Self { plugin: None, data }
    }

    /// Whether this context is scoped to a plugin.
    pub fn is_scoped(&self) -> bool {
        self.plugin.is_some()
    }
}

/// Shared capability object the host exposes to every plugin.
pub trait HostMethod: Send + Sync {
    /// Invoke a named host capability.
    fn call(&self, name: &str, args: serde_json::Value) -> anyhow::Result<serde_json::Value>;
}

/// Handle to the host's shared method object.
pub type SharedMethod = Arc<dyn HostMethod>;

/// The host application collaborator.
///
/// Without a host the loader can still build settings objects, but never
/// plugin runtime objects.
pub trait Host: Send + Sync {
    /// Build an application context.
    ///
    /// `Some(name)` yields a context scoped to that plugin and is used at load
    /// time. `None` yields the live application context used by `update`; it
    /// is fetched fresh on every call so it reflects current host state.
    fn app_context(&self, plugin: Option<&str>) -> AppContext;

    /// The shared method object passed to every plugin constructor.
    fn method(&self) -> SharedMethod;
}

/// A host method that accepts every call and returns its arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMethod;

impl HostMethod for NoopMethod {
    fn call(&self, name: &str, args: serde_json::Value) -> anyhow::Result<serde_json::Value> {
        tracing::trace!(method = name, "Host method called");
        Ok(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_context_scoping() {
        let scoped = AppContext::scoped("heartbeat", json!({"tick": 1}));
        assert!(scoped.is_scoped());
        assert_eq!(scoped.plugin.as_deref(), Some("heartbeat"));

        let live = AppContext::live(json!({}));
        assert!(!live.is_scoped());
    }

    #[test]
    fn test_context_serde() {
        let ctx: AppContext = serde_json::from_str(r#"{"plugin": null}"#).unwrap();
        assert_eq!(ctx, AppContext::default());
    }

    #[test]
    fn test_noop_method_echoes() {
        let method: SharedMethod = Arc::new(NoopMethod);
        let out = method.call("anything", json!([1, 2])).unwrap();
        assert_eq!(out, json!([1, 2]));
    }
}
