//! Core plugin types.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::{AppContext, PluginResult};

/// Plugin manifest marker file name.
///
/// Only its presence is checked; the contents belong to the plugin.
pub const MANIFEST_FILE: &str = "plugin.json";

/// Settings role of a plugin.
///
/// Built once per plugin with the plugin's own directory and then only read,
/// typically by a settings UI.
pub trait PluginSettings: Send + Sync {
    /// Plugin name.
    fn name(&self) -> &str;

    /// Directory the settings were built from.
    fn dir(&self) -> &Path;

    /// Settings rendered for display.
    fn describe(&self) -> serde_json::Value {
        serde_json::Value::Null
    }
}

/// Runtime role of a plugin.
pub trait Plugin: Send + Sync {
    /// Run the plugin's main entry point.
    fn execute(&mut self) -> anyhow::Result<()>;

    /// The update capability, if this plugin has one.
    fn updatable(&mut self) -> Option<&mut dyn Updatable> {
        None
    }
}

/// Optional capability for plugins that react to live host state.
pub trait Updatable: Send + Sync {
    /// Receive a freshly fetched application context.
    fn update(&mut self, ctx: &AppContext) -> anyhow::Result<()>;
}

/// Source of plugin configuration consumed by the loader.
pub trait ConfigSource: Send + Sync {
    /// Directory under which every plugin has its own subdirectory.
    fn plugin_root(&self) -> PathBuf;

    /// Names of the plugins that should be loaded.
    ///
    /// Read once at the start of each load pass and used for every
    /// candidate in that pass. Edits made while a pass is running take
    /// effect on the next pass.
    fn enabled_plugins(&self) -> PluginResult<HashSet<String>>;
}
