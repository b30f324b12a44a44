//! Application wiring for the plugdeck binary.
//!
//! Ties the config file, the built-in plugin catalog and a concrete host
//! together into a ready-to-use [`PluginLoader`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Local;
use serde_json::json;

use crate::core::{Config, ConfigFile, LOCAL_CONFIG_FILE};
use crate::plugin::{
    builtin, root_basename, AppContext, ConfigSource, Host, HostMethod, PluginLoader, SharedMethod,
};

/// Host used by the command-line application.
#[derive(Debug)]
pub struct CliHost {
    plugin_root: PathBuf,
    started: Instant,
}

impl CliHost {
    /// Create a host serving plugins under `plugin_root`.
    pub fn new(plugin_root: PathBuf) -> Self {
        Self { plugin_root, started: Instant::now() }
    }
}

impl Host for CliHost {
    fn app_context(&self, plugin: Option<&str>) -> AppContext {
        let data = json!({
            "timestamp": Local::now().to_rfc3339(),
            "uptime_ms": self.started.elapsed().as_millis() as u64,
            "plugin_root": self.plugin_root.display().to_string(),
        });
        AppContext { plugin: plugin.map(str::to_string), data }
    }

    fn method(&self) -> SharedMethod {
        Arc::new(CliMethod)
    }
}

/// Shared method object handed to plugins by [`CliHost`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CliMethod;

impl HostMethod for CliMethod {
    fn call(&self, name: &str, args: serde_json::Value) -> anyhow::Result<serde_json::Value> {
        match name {
            "log" => {
                tracing::info!(args = %args, "Plugin log");
                Ok(serde_json::Value::Null)
            }
            "echo" => Ok(args),
            other => anyhow::bail!("Unknown host method: {other}"),
        }
    }
}

/// Main application state.
#[derive(Debug)]
pub struct App {
    config_path: PathBuf,
    source: ConfigFile,
}

impl App {
    /// Create the application.
    ///
    /// `config_path` falls back to [`Config::locate`] and then to
    /// `.plugdeck.toml` in the current directory. `plugin_dir` overrides the
    /// configured plugin root.
    pub fn new(config_path: Option<PathBuf>, plugin_dir: Option<PathBuf>) -> anyhow::Result<Self> {
        let config_path = config_path
            .or_else(Config::locate)
            .unwrap_or_else(|| PathBuf::from(LOCAL_CONFIG_FILE));

        let mut source = ConfigFile::open(&config_path)?;
        if let Some(dir) = plugin_dir {
            source = source.with_plugin_root(dir);
        }

        Ok(Self { config_path, source })
    }

    /// Path of the config file in use.
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Current config file contents.
    pub fn config(&self) -> anyhow::Result<Config> {
        self.source.current()
    }

    /// Effective plugin root.
    pub fn plugin_root(&self) -> PathBuf {
        self.source.plugin_root()
    }

    /// Build a loader with the built-in plugins and the CLI host attached.
    pub fn loader(&self) -> PluginLoader {
        let root = self.plugin_root();
        let catalog = builtin::catalog(&root_basename(&root));

        PluginLoader::new(Arc::new(self.source.clone()), Arc::new(catalog))
            .with_host(Arc::new(CliHost::new(root)))
    }

    /// Enable or disable a plugin in the config file.
    ///
    /// Returns whether the file changed.
    pub fn set_enabled(&self, name: &str, enabled: bool) -> anyhow::Result<bool> {
        let mut config = self.config()?;
        let changed = if enabled { config.enable(name) } else { config.disable(name) };

        if changed {
            config.save_to_file(&self.config_path)?;
        }

        Ok(changed)
    }
}
