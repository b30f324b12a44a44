//! Plugin module catalog.
//!
//! Plugins are compiled into the host and register a module factory under a
//! qualified name of the form `<root-basename>.<plugin-name>`, mirroring the
//! directory layout they are discovered from. Resolving a name runs the
//! factory, which stands in for the module's top-level initialization and
//! may fail.

use std::collections::HashMap;
use std::path::Path;

use super::{AppContext, Plugin, PluginError, PluginResult, PluginSettings, SharedMethod};

/// Builds the settings role from the plugin's own directory.
pub type SettingsFactory =
    Box<dyn Fn(&Path) -> anyhow::Result<Box<dyn PluginSettings>> + Send + Sync>;

/// Builds the runtime role from a scoped context and the host's shared method.
pub type PluginFactory =
    Box<dyn Fn(AppContext, SharedMethod) -> anyhow::Result<Box<dyn Plugin>> + Send + Sync>;

type ModuleFactory = Box<dyn Fn() -> anyhow::Result<PluginModule> + Send + Sync>;

/// A resolved plugin module and the roles it exposes.
pub struct PluginModule {
    name: String,
    settings: Option<SettingsFactory>,
    plugin: Option<PluginFactory>,
}

impl std::fmt::Debug for PluginModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginModule")
            .field("name", &self.name)
            .field("settings", &self.settings.is_some())
            .field("plugin", &self.plugin.is_some())
            .finish()
    }
}

impl PluginModule {
    /// Create a module exposing no roles.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), settings: None, plugin: None }
    }

    /// Expose a settings role.
    pub fn with_settings<F>(mut self, factory: F) -> Self
    where
        F: Fn(&Path) -> anyhow::Result<Box<dyn PluginSettings>> + Send + Sync + 'static,
    {
        self.settings = Some(Box::new(factory));
        self
    }

    /// Expose a runtime plugin role.
    pub fn with_plugin<F>(mut self, factory: F) -> Self
    where
        F: Fn(AppContext, SharedMethod) -> anyhow::Result<Box<dyn Plugin>> + Send + Sync + 'static,
    {
        self.plugin = Some(Box::new(factory));
        self
    }

    /// Module name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the module exposes a settings role.
    pub fn has_settings(&self) -> bool {
        self.settings.is_some()
    }

    /// Whether the module exposes a runtime plugin role.
    pub fn has_plugin(&self) -> bool {
        self.plugin.is_some()
    }

    /// Build the settings role, if exposed.
    pub fn build_settings(&self, dir: &Path) -> Option<PluginResult<Box<dyn PluginSettings>>> {
        self.settings.as_ref().map(|factory| {
            factory(dir).map_err(|e| PluginError::LoadError(format!("{}: settings: {e:#}", self.name)))
        })
    }

    /// Build the runtime plugin role, if exposed.
    pub fn build_plugin(
        &self,
        ctx: AppContext,
        method: SharedMethod,
    ) -> Option<PluginResult<Box<dyn Plugin>>> {
        self.plugin.as_ref().map(|factory| {
            factory(ctx, method)
                .map_err(|e| PluginError::LoadError(format!("{}: plugin: {e:#}", self.name)))
        })
    }
}

/// Registration table of every plugin module the host knows about.
#[derive(Default)]
pub struct ModuleCatalog {
    modules: HashMap<String, ModuleFactory>,
}

impl std::fmt::Debug for ModuleCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleCatalog").field("modules", &self.modules.len()).finish()
    }
}

impl ModuleCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module factory under a fully qualified name.
    ///
    /// Registering the same name twice replaces the earlier factory.
    pub fn register<F>(&mut self, qualified: impl Into<String>, factory: F)
    where
        F: Fn() -> anyhow::Result<PluginModule> + Send + Sync + 'static,
    {
        self.modules.insert(qualified.into(), Box::new(factory));
    }

    /// Register a module for the plugin directory `name` under `root_basename`.
    pub fn register_plugin<F>(&mut self, root_basename: &str, name: &str, factory: F)
    where
        F: Fn() -> anyhow::Result<PluginModule> + Send + Sync + 'static,
    {
        self.register(qualified_name(root_basename, name), factory);
    }

    /// Resolve and initialize a module.
    pub fn resolve(&self, qualified: &str) -> PluginResult<PluginModule> {
        let factory = self
            .modules
            .get(qualified)
            .ok_or_else(|| PluginError::ModuleNotFound(qualified.to_string()))?;

        factory().map_err(|e| PluginError::LoadError(format!("{qualified}: {e:#}")))
    }

    /// Check whether a module is registered.
    pub fn contains(&self, qualified: &str) -> bool {
        self.modules.contains_key(qualified)
    }

    /// Registered qualified names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.modules.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Get the number of registered modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Check if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// Build the qualified module name for a plugin directory.
pub fn qualified_name(root_basename: &str, name: &str) -> String {
    format!("{root_basename}.{name}")
}

/// Final component of the plugin root, used as the module namespace.
///
/// Roots like `.` are canonicalized first; `plugins` is the fallback when no
/// name can be derived.
pub fn root_basename(plugin_root: &Path) -> String {
    let from_path = |p: &Path| p.file_name().and_then(|n| n.to_str()).map(str::to_string);

    from_path(plugin_root)
        .or_else(|| plugin_root.canonicalize().ok().as_deref().and_then(from_path))
        .unwrap_or_else(|| "plugins".to_string())
}
