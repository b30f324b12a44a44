//! Plugin loader.
//!
//! Discovery runs synchronously so the caller gets candidate names right
//! away. Module resolution and role construction then run on a single
//! background thread, one plugin at a time, and publish into the shared
//! [`PluginRegistry`]. A failing plugin is logged and left out; it never
//! stops the rest of the batch.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;

use serde::Serialize;

use super::catalog::{qualified_name, root_basename};
use super::error::isolate;
use super::{
    discover, ConfigSource, DispatchReport, Dispatcher, Host, ModuleCatalog, PluginError,
    PluginRegistry, PluginResult,
};

/// Name of the background loader thread.
const LOADER_THREAD: &str = "plugin-loader";

/// A plugin that failed to load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadFailure {
    /// Plugin name.
    pub plugin: String,
    /// Failure reason.
    pub reason: String,
}

/// Outcome of one background load pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    /// Plugins that loaded, in processing order.
    pub loaded: Vec<String>,
    /// Plugins that failed, in processing order.
    pub failed: Vec<LoadFailure>,
    /// Candidates skipped because they were not enabled.
    pub skipped: usize,
}

impl LoadReport {
    /// Whether every enabled candidate loaded.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// Check if a plugin failed in this pass.
    pub fn has_failed(&self, plugin: &str) -> bool {
        self.failed.iter().any(|f| f.plugin == plugin)
    }
}

/// Handle to a running load pass.
///
/// Dropping the handle detaches the pass; it keeps running and the registry
/// keeps filling in.
#[derive(Debug)]
pub struct LoadHandle {
    thread: JoinHandle<LoadReport>,
}

impl LoadHandle {
    /// Check whether the pass has finished, without blocking.
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Block until the pass finishes and return its report.
    pub fn wait(self) -> PluginResult<LoadReport> {
        self.thread.join().map_err(|_| PluginError::LoaderPanicked)
    }
}

/// Discovers plugins and loads them in the background.
pub struct PluginLoader {
    config: Arc<dyn ConfigSource>,
    catalog: Arc<ModuleCatalog>,
    registry: Arc<PluginRegistry>,
    host: Option<Arc<dyn Host>>,
    candidates: Vec<String>,
}

impl std::fmt::Debug for PluginLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginLoader")
            .field("plugin_root", &self.config.plugin_root())
            .field("catalog", &self.catalog)
            .field("registry", &self.registry)
            .field("host", &self.host.is_some())
            .field("candidates", &self.candidates)
            .finish()
    }
}

impl PluginLoader {
    /// Create a loader with no host attached.
    pub fn new(config: Arc<dyn ConfigSource>, catalog: Arc<ModuleCatalog>) -> Self {
        Self {
            config,
            catalog,
            registry: Arc::new(PluginRegistry::new()),
            host: None,
            candidates: Vec::new(),
        }
    }

    /// Attach a host, builder style.
    pub fn with_host(mut self, host: Arc<dyn Host>) -> Self {
        self.host = Some(host);
        self
    }

    /// Attach or replace the host.
    ///
    /// Only passes started after this call see the new host.
    pub fn set_host(&mut self, host: Arc<dyn Host>) {
        self.host = Some(host);
    }

    /// Check whether a host is attached.
    pub fn has_host(&self) -> bool {
        self.host.is_some()
    }

    /// The shared registry this loader publishes into.
    pub fn registry(&self) -> Arc<PluginRegistry> {
        Arc::clone(&self.registry)
    }

    /// Candidates found by the last synchronous scan.
    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// Current plugin root from the config source.
    pub fn plugin_root(&self) -> PathBuf {
        self.config.plugin_root()
    }

    /// Scan for candidates and start loading them in the background.
    ///
    /// Returns as soon as the scan is done. A missing plugin root fails here;
    /// per-plugin failures during the pass only show up in the log and the
    /// pass report.
    pub fn load_plugins(&mut self) -> PluginResult<(Vec<String>, LoadHandle)> {
        let root = self.config.plugin_root();
        self.candidates = discover(&root)?;
        tracing::debug!(
            root = %root.display(),
            count = self.candidates.len(),
            "Discovered plugin candidates"
        );

        let pass = LoadPass {
            root,
            config: Arc::clone(&self.config),
            catalog: Arc::clone(&self.catalog),
            registry: Arc::clone(&self.registry),
            host: self.host.clone(),
        };

        let thread =
            std::thread::Builder::new().name(LOADER_THREAD.to_string()).spawn(move || pass.run())?;

        Ok((self.candidates.clone(), LoadHandle { thread }))
    }

    /// Start loading and return only the completion handle.
    pub fn start_loading(&mut self) -> PluginResult<LoadHandle> {
        self.load_plugins().map(|(_, handle)| handle)
    }

    /// Dispatcher bound to this loader's registry and host.
    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(Arc::clone(&self.registry), self.host.clone())
    }

    /// Execute every loaded plugin.
    pub fn run_plugins(&self) -> DispatchReport {
        self.dispatcher().run()
    }

    /// Push a live context to every loaded plugin that can take one.
    pub fn update_plugins(&self) -> DispatchReport {
        self.dispatcher().update()
    }
}

/// One background load pass with everything it needs captured up front.
struct LoadPass {
    root: PathBuf,
    config: Arc<dyn ConfigSource>,
    catalog: Arc<ModuleCatalog>,
    registry: Arc<PluginRegistry>,
    host: Option<Arc<dyn Host>>,
}

impl LoadPass {
    fn run(self) -> LoadReport {
        let mut report = LoadReport::default();

        let candidates = match discover(&self.root) {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::error!(root = %self.root.display(), error = %e, "Plugin rescan failed");
                return report;
            }
        };

        let enabled = match self.config.enabled_plugins() {
            Ok(enabled) => enabled,
            Err(e) => {
                tracing::error!(error = %e, "Could not read enabled plugins");
                report.skipped = candidates.len();
                return report;
            }
        };

        if self.host.is_none() {
            tracing::debug!("No host attached, only settings will be loaded");
        }

        let namespace = root_basename(&self.root);

        for name in candidates {
            if !enabled.contains(&name) {
                tracing::debug!(plugin = %name, "Plugin not enabled, skipping");
                report.skipped += 1;
                continue;
            }

            let module = qualified_name(&namespace, &name);
            match isolate(&name, || self.load_one(&name, &module)) {
                Ok(true) => {
                    tracing::info!(plugin = %name, module = %module, "Loaded plugin");
                    report.loaded.push(name);
                }
                Ok(false) => {
                    tracing::info!(plugin = %name, module = %module, "Loaded plugin settings");
                    report.loaded.push(name);
                }
                Err(e) => {
                    tracing::error!(plugin = %name, error = %e, "Failed to load plugin");
                    report.failed.push(LoadFailure { plugin: name, reason: e.to_string() });
                }
            }
        }

        tracing::debug!(
            loaded = report.loaded.len(),
            failed = report.failed.len(),
            skipped = report.skipped,
            "Plugin load pass finished"
        );

        report
    }

    /// Load one candidate. Returns whether a runtime instance was registered.
    fn load_one(&self, name: &str, module: &str) -> PluginResult<bool> {
        let module = self.catalog.resolve(module)?;

        if let Some(settings) = module.build_settings(&plugin_dir(&self.root, name)) {
            self.registry.insert_settings(name, settings?);
        }

        // The host is only asked for a context when there is a runtime role to build
        let Some(host) = self.host.as_ref().filter(|_| module.has_plugin()) else {
            return Ok(false);
        };

        if let Some(plugin) = module.build_plugin(host.app_context(Some(name)), host.method()) {
            self.registry.insert_plugin(name, plugin?);
        }

        Ok(true)
    }
}

fn plugin_dir(root: &Path, name: &str) -> PathBuf {
    root.join(name)
}
