//! In-memory registry of loaded plugin instances.
//!
//! The background loader is the only writer. Every insertion publishes a
//! fully built instance under the write lock, so readers see a growing set of
//! complete entries and never a half-built one.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::{Plugin, PluginSettings};

/// A loaded runtime plugin, shared between the registry and dispatch.
pub type SharedPlugin = Arc<Mutex<Box<dyn Plugin>>>;

/// Registry of loaded settings and runtime plugin instances, keyed by name.
#[derive(Default)]
pub struct PluginRegistry {
    settings: RwLock<HashMap<String, Arc<dyn PluginSettings>>>,
    plugins: RwLock<HashMap<String, SharedPlugin>>,
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("settings", &self.settings_count())
            .field("plugins", &self.plugin_count())
            .finish()
    }
}

impl PluginRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert_settings(&self, name: &str, settings: Box<dyn PluginSettings>) {
        self.settings.write().insert(name.to_string(), Arc::from(settings));
    }

    pub(crate) fn insert_plugin(&self, name: &str, plugin: Box<dyn Plugin>) {
        self.plugins.write().insert(name.to_string(), Arc::new(Mutex::new(plugin)));
    }

    /// Get a plugin's settings instance.
    pub fn settings(&self, name: &str) -> Option<Arc<dyn PluginSettings>> {
        self.settings.read().get(name).cloned()
    }

    /// Get a plugin's runtime instance.
    pub fn plugin(&self, name: &str) -> Option<SharedPlugin> {
        self.plugins.read().get(name).cloned()
    }

    /// Check whether a runtime instance is loaded for `name`.
    pub fn contains_plugin(&self, name: &str) -> bool {
        self.plugins.read().contains_key(name)
    }

    /// Check whether a settings instance is loaded for `name`.
    pub fn contains_settings(&self, name: &str) -> bool {
        self.settings.read().contains_key(name)
    }

    /// Names with a loaded runtime instance, sorted.
    pub fn plugin_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.plugins.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Names with a loaded settings instance, sorted.
    pub fn settings_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.settings.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Snapshot of every runtime instance.
    ///
    /// The lock is released before returning so callers can invoke plugins
    /// while the loader keeps publishing.
    pub fn plugins_snapshot(&self) -> Vec<(String, SharedPlugin)> {
        self.plugins.read().iter().map(|(name, plugin)| (name.clone(), Arc::clone(plugin))).collect()
    }

    /// Get the number of runtime instances.
    pub fn plugin_count(&self) -> usize {
        self.plugins.read().len()
    }

    /// Get the number of settings instances.
    pub fn settings_count(&self) -> usize {
        self.settings.read().len()
    }

    /// Check if nothing has been loaded yet.
    pub fn is_empty(&self) -> bool {
        self.plugin_count() == 0 && self.settings_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::*;

    struct Noop;

    impl Plugin for Noop {
        fn execute(&mut self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    struct Settings(PathBuf);

    impl PluginSettings for Settings {
        fn name(&self) -> &str {
            "s"
        }

        fn dir(&self) -> &Path {
            &self.0
        }
    }

    #[test]
    fn test_registry_starts_empty() {
        let registry = PluginRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.plugins_snapshot().is_empty());
    }

    #[test]
    fn test_independent_maps() {
        let registry = PluginRegistry::new();
        registry.insert_settings("a", Box::new(Settings(PathBuf::from("plugins/a"))));
        registry.insert_plugin("b", Box::new(Noop));

        assert!(registry.contains_settings("a"));
        assert!(!registry.contains_plugin("a"));
        assert!(registry.contains_plugin("b"));
        assert!(!registry.contains_settings("b"));
        assert_eq!(registry.settings("a").unwrap().dir(), Path::new("plugins/a"));
    }

    #[test]
    fn test_insert_overwrites() {
        let registry = PluginRegistry::new();
        registry.insert_plugin("a", Box::new(Noop));
        registry.insert_plugin("a", Box::new(Noop));

        assert_eq!(registry.plugin_count(), 1);
        assert_eq!(registry.plugin_names(), vec!["a".to_string()]);
    }

    #[test]
    fn test_snapshot_survives_later_inserts() {
        let registry = PluginRegistry::new();
        registry.insert_plugin("a", Box::new(Noop));

        let snapshot = registry.plugins_snapshot();
        registry.insert_plugin("b", Box::new(Noop));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.plugin_count(), 2);
    }

    #[test]
    fn test_concurrent_readers_see_whole_entries() {
        let registry = Arc::new(PluginRegistry::new());

        let writer = {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || {
                for i in 0..200 {
                    registry.insert_plugin(&format!("p{i}"), Box::new(Noop));
                }
            })
        };

        let mut last = 0;
        while !writer.is_finished() {
            let snapshot = registry.plugins_snapshot();
            assert!(snapshot.len() >= last, "registry view must only grow");
            for (_, plugin) in &snapshot {
                plugin.lock().execute().unwrap();
            }
            last = snapshot.len();
        }
        writer.join().unwrap();

        assert_eq!(registry.plugin_count(), 200);
    }
}
