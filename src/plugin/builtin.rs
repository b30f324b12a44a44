//! Built-in plugins shipped with plugdeck.
//!
//! These register themselves into a [`ModuleCatalog`] the same way any
//! compiled-in plugin would, and double as a reference for plugin authors.

use std::path::{Path, PathBuf};

use serde_json::json;

use super::{
    AppContext, ModuleCatalog, Plugin, PluginModule, PluginSettings, SharedMethod, Updatable,
    MANIFEST_FILE,
};

/// Names of the built-in plugins.
pub const BUILTIN_PLUGINS: &[&str] = &["heartbeat", "echo"];

/// Default heartbeat interval when the manifest does not set one.
const DEFAULT_INTERVAL_SECS: u64 = 5;

/// Register every built-in plugin under `root_basename`.
pub fn register_all(catalog: &mut ModuleCatalog, root_basename: &str) {
    catalog.register_plugin(root_basename, "heartbeat", || Ok(heartbeat_module()));
    catalog.register_plugin(root_basename, "echo", || Ok(echo_module()));
}

/// Catalog holding only the built-in plugins.
pub fn catalog(root_basename: &str) -> ModuleCatalog {
    let mut catalog = ModuleCatalog::new();
    register_all(&mut catalog, root_basename);
    catalog
}

/// Create the directory and manifest marker for a built-in plugin.
///
/// Existing manifests are left untouched. Returns whether anything was written.
pub fn scaffold(plugin_root: &Path, name: &str) -> std::io::Result<bool> {
    let dir = plugin_root.join(name);
    let manifest = dir.join(MANIFEST_FILE);
    if manifest.exists() {
        return Ok(false);
    }

    std::fs::create_dir_all(&dir)?;
    let body = json!({ "name": name, "version": env!("CARGO_PKG_VERSION") });
    std::fs::write(&manifest, serde_json::to_string_pretty(&body)?)?;
    Ok(true)
}

fn heartbeat_module() -> PluginModule {
    PluginModule::new("heartbeat")
        .with_settings(|dir| Ok(Box::new(HeartbeatSettings::from_dir(dir)?) as Box<dyn PluginSettings>))
        .with_plugin(|ctx, method| Ok(Box::new(Heartbeat::new(ctx, method)) as Box<dyn Plugin>))
}

fn echo_module() -> PluginModule {
    PluginModule::new("echo")
        .with_plugin(|ctx, method| Ok(Box::new(Echo { ctx, method }) as Box<dyn Plugin>))
}

/// Heartbeat settings, read from the plugin's own manifest.
#[derive(Debug, Clone)]
pub struct HeartbeatSettings {
    dir: PathBuf,
    interval_secs: u64,
}

impl HeartbeatSettings {
    fn from_dir(dir: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(dir.join(MANIFEST_FILE))?;
        let manifest: serde_json::Value = serde_json::from_str(&content)?;
        let interval_secs =
            manifest.get("interval").and_then(|v| v.as_u64()).unwrap_or(DEFAULT_INTERVAL_SECS);

        Ok(Self { dir: dir.to_path_buf(), interval_secs })
    }

    /// Beat interval in seconds.
    pub fn interval_secs(&self) -> u64 {
        self.interval_secs
    }
}

impl PluginSettings for HeartbeatSettings {
    fn name(&self) -> &str {
        "heartbeat"
    }

    fn dir(&self) -> &Path {
        &self.dir
    }

    fn describe(&self) -> serde_json::Value {
        json!({ "interval": self.interval_secs })
    }
}

/// Counts beats and remembers the last live context it saw.
struct Heartbeat {
    ctx: AppContext,
    method: SharedMethod,
    beats: u64,
    last_seen: Option<serde_json::Value>,
}

impl Heartbeat {
    fn new(ctx: AppContext, method: SharedMethod) -> Self {
        Self { ctx, method, beats: 0, last_seen: None }
    }
}

impl Plugin for Heartbeat {
    fn execute(&mut self) -> anyhow::Result<()> {
        self.beats += 1;
        self.method.call(
            "log",
            json!({ "plugin": self.ctx.plugin, "beats": self.beats, "last_seen": self.last_seen }),
        )?;
        tracing::info!(plugin = "heartbeat", beats = self.beats, "Beat");
        Ok(())
    }

    fn updatable(&mut self) -> Option<&mut dyn Updatable> {
        Some(self)
    }
}

impl Updatable for Heartbeat {
    fn update(&mut self, ctx: &AppContext) -> anyhow::Result<()> {
        self.last_seen = ctx.data.get("timestamp").cloned();
        Ok(())
    }
}

/// Calls the host's `echo` method with its own name.
struct Echo {
    ctx: AppContext,
    method: SharedMethod,
}

impl Plugin for Echo {
    fn execute(&mut self) -> anyhow::Result<()> {
        let reply = self.method.call("echo", json!({ "from": self.ctx.plugin }))?;
        tracing::info!(plugin = "echo", reply = %reply, "Echoed");
        Ok(())
    }
}
