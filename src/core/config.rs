//! Configuration management for plugdeck.
//!
//! Handles loading and saving configuration from TOML files, and exposes it
//! to the plugin loader through [`ConfigSource`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::plugin::{ConfigSource, PluginError, PluginResult};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "PLUGDECK_CONFIG";

/// Local config file name, looked up in the current directory.
pub const LOCAL_CONFIG_FILE: &str = ".plugdeck.toml";

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Plugin settings
    pub plugins: PluginsConfig,

    /// Watch loop settings
    pub watch: WatchConfig,
}

/// Plugin settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginsConfig {
    /// Plugin root directory
    pub dir: PathBuf,

    /// Plugins to load
    pub enabled: Vec<String>,
}

/// Watch loop settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Seconds between update dispatches
    pub interval_secs: u64,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self { dir: PathBuf::from("plugins"), enabled: Vec::new() }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { interval_secs: 5 }
    }
}

impl Config {
    /// Create a config for a plugin root with an enabled list.
    pub fn for_plugins<I, S>(dir: impl Into<PathBuf>, enabled: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            plugins: PluginsConfig {
                dir: dir.into(),
                enabled: enabled.into_iter().map(Into::into).collect(),
            },
            ..Self::default()
        }
    }

    /// Load configuration from the default location.
    ///
    /// Looks for config in:
    /// 1. the file named by `PLUGDECK_CONFIG`
    /// 2. `.plugdeck.toml` in current directory
    /// 3. `~/.config/plugdeck/config.toml`
    /// 4. Falls back to defaults
    pub fn load() -> anyhow::Result<Self> {
        match Self::locate() {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Path of the config file `load` would read, if any exists.
    pub fn locate() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Some(local_config);
        }

        Self::global_path().filter(|p| p.exists())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a specific file, creating parent directories.
    pub fn save_to_file(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("plugdeck"))
    }

    /// Path of the global config file.
    pub fn global_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("config.toml"))
    }

    /// Check whether a plugin is enabled.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.plugins.enabled.iter().any(|n| n == name)
    }

    /// Enable a plugin. Returns `false` if it already was.
    pub fn enable(&mut self, name: &str) -> bool {
        if self.is_enabled(name) {
            return false;
        }
        self.plugins.enabled.push(name.to_string());
        true
    }

    /// Disable a plugin. Returns `false` if it was not enabled.
    pub fn disable(&mut self, name: &str) -> bool {
        let before = self.plugins.enabled.len();
        self.plugins.enabled.retain(|n| n != name);
        before != self.plugins.enabled.len()
    }
}

impl ConfigSource for Config {
    fn plugin_root(&self) -> PathBuf {
        self.plugins.dir.clone()
    }

    fn enabled_plugins(&self) -> PluginResult<HashSet<String>> {
        Ok(self.plugins.enabled.iter().cloned().collect())
    }
}

/// A config file re-read every time the enabled set is requested.
///
/// The plugin root is fixed when the source is opened; the enabled list
/// follows edits made to the file afterwards.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
    plugin_root: PathBuf,
}

impl ConfigFile {
    /// Open a config file. A missing file behaves like the default config.
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let config = Self::read(&path)?;
        Ok(Self { path, plugin_root: config.plugins.dir })
    }

    /// Override the plugin root.
    pub fn with_plugin_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.plugin_root = root.into();
        self
    }

    /// Path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current file contents.
    pub fn current(&self) -> anyhow::Result<Config> {
        Self::read(&self.path)
    }

    fn read(path: &Path) -> anyhow::Result<Config> {
        if path.exists() {
            Config::load_from_file(path)
        } else {
            Ok(Config::default())
        }
    }
}

impl ConfigSource for ConfigFile {
    fn plugin_root(&self) -> PathBuf {
        self.plugin_root.clone()
    }

    fn enabled_plugins(&self) -> PluginResult<HashSet<String>> {
        let config = self
            .current()
            .map_err(|e| PluginError::Config(format!("{}: {e:#}", self.path.display())))?;
        config.enabled_plugins()
    }
}
