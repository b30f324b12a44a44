//! Run and update dispatch over loaded plugins.
//!
//! Both operations work on a snapshot of whatever has finished loading and
//! never wait for the loader. A plugin that fails or panics is logged and
//! recorded, and dispatch moves on to the next one.

use std::sync::Arc;

use serde::Serialize;

use super::error::isolate;
use super::{Host, PluginError, PluginRegistry, PluginResult};

/// A plugin call that failed during dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchFailure {
    /// Plugin name.
    pub plugin: String,
    /// Failure reason.
    pub reason: String,
}

/// Outcome of a `run` or `update` dispatch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatchReport {
    /// Plugins called successfully.
    pub succeeded: usize,
    /// Plugins without the requested capability.
    pub skipped: usize,
    /// Plugins whose call failed.
    pub failed: Vec<DispatchFailure>,
}

impl DispatchReport {
    /// Whether every call succeeded.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    fn record_failure(&mut self, op: &str, plugin: String, err: &PluginError) {
        tracing::warn!(plugin = %plugin, op, error = %err, "Plugin call failed");
        self.failed.push(DispatchFailure { plugin, reason: err.to_string() });
    }
}

/// Invokes loaded plugins.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<PluginRegistry>,
    host: Option<Arc<dyn Host>>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("host", &self.host.is_some())
            .finish()
    }
}

impl Dispatcher {
    /// Create a dispatcher over `registry`.
    pub fn new(registry: Arc<PluginRegistry>, host: Option<Arc<dyn Host>>) -> Self {
        Self { registry, host }
    }

    /// Call `execute` on every loaded plugin, in sequence, on this thread.
    pub fn run(&self) -> DispatchReport {
        let mut report = DispatchReport::default();

        for (name, plugin) in self.registry.plugins_snapshot() {
            let result = isolate(&name, || {
                plugin.lock().execute().map_err(|e| execution_error(&name, &e))
            });

            match result {
                Ok(()) => report.succeeded += 1,
                Err(e) => report.record_failure("execute", name, &e),
            }
        }

        report
    }

    /// Call `update` on every loaded plugin that has the capability.
    ///
    /// Each plugin gets a live context fetched from the host right before its
    /// own call. Plugins without the capability are counted as skipped.
    pub fn update(&self) -> DispatchReport {
        let mut report = DispatchReport::default();

        let Some(host) = &self.host else {
            tracing::debug!("No host attached, nothing to update");
            return report;
        };

        for (name, plugin) in self.registry.plugins_snapshot() {
            let result: PluginResult<bool> = isolate(&name, || {
                let mut plugin = plugin.lock();
                let Some(updater) = plugin.updatable() else {
                    return Ok(false);
                };
                let ctx = host.app_context(None);
                updater.update(&ctx).map_err(|e| execution_error(&name, &e))?;
                Ok(true)
            });

            match result {
                Ok(true) => report.succeeded += 1,
                Ok(false) => report.skipped += 1,
                Err(e) => report.record_failure("update", name, &e),
            }
        }

        report
    }
}

fn execution_error(plugin: &str, err: &anyhow::Error) -> PluginError {
    PluginError::ExecutionError(format!("{plugin}: {err:#}"))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;
    use crate::plugin::{AppContext, NoopMethod, Plugin, SharedMethod, Updatable};

    struct CountingHost {
        live_fetches: AtomicUsize,
    }

    impl Host for CountingHost {
        fn app_context(&self, plugin: Option<&str>) -> AppContext {
            let n = self.live_fetches.fetch_add(1, Ordering::SeqCst);
            AppContext { plugin: plugin.map(str::to_string), data: json!({ "fetch": n }) }
        }

        fn method(&self) -> SharedMethod {
            Arc::new(NoopMethod)
        }
    }

    struct Probe {
        runs: Arc<AtomicUsize>,
        updates: Arc<AtomicUsize>,
        updatable: bool,
    }

    impl Plugin for Probe {
        fn execute(&mut self) -> anyhow::Result<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn updatable(&mut self) -> Option<&mut dyn Updatable> {
            if self.updatable {
                Some(self)
            } else {
                None
            }
        }
    }

    impl Updatable for Probe {
        fn update(&mut self, ctx: &AppContext) -> anyhow::Result<()> {
            assert!(ctx.plugin.is_none(), "update receives the live context");
            self.updates.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Failing;

    impl Plugin for Failing {
        fn execute(&mut self) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }

        fn updatable(&mut self) -> Option<&mut dyn Updatable> {
            Some(self)
        }
    }

    impl Updatable for Failing {
        fn update(&mut self, _ctx: &AppContext) -> anyhow::Result<()> {
            panic!("update blew up")
        }
    }

    fn probe(updatable: bool) -> (Probe, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let runs = Arc::new(AtomicUsize::new(0));
        let updates = Arc::new(AtomicUsize::new(0));
        let probe = Probe { runs: Arc::clone(&runs), updates: Arc::clone(&updates), updatable };
        (probe, runs, updates)
    }

    fn host() -> Arc<CountingHost> {
        Arc::new(CountingHost { live_fetches: AtomicUsize::new(0) })
    }

    #[test]
    fn test_run_executes_each_once() {
        let registry = Arc::new(PluginRegistry::new());
        let (p1, runs1, _) = probe(false);
        let (p2, runs2, _) = probe(false);
        registry.insert_plugin("p1", Box::new(p1));
        registry.insert_plugin("p2", Box::new(p2));

        let report = Dispatcher::new(registry, None).run();

        assert_eq!(report.succeeded, 2);
        assert_eq!(runs1.load(Ordering::SeqCst), 1);
        assert_eq!(runs2.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_run_isolates_failures() {
        let registry = Arc::new(PluginRegistry::new());
        let (ok, runs, _) = probe(false);
        registry.insert_plugin("bad", Box::new(Failing));
        registry.insert_plugin("ok", Box::new(ok));

        let report = Dispatcher::new(registry, None).run();

        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].plugin, "bad");
        assert!(report.failed[0].reason.contains("disk full"));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_update_skips_plugins_without_capability() {
        let registry = Arc::new(PluginRegistry::new());
        let (with, _, updates_with) = probe(true);
        let (without, _, updates_without) = probe(false);
        registry.insert_plugin("with", Box::new(with));
        registry.insert_plugin("without", Box::new(without));

        let host = host();
        let report = Dispatcher::new(registry, Some(host.clone())).update();

        assert!(report.is_clean());
        assert_eq!((report.succeeded, report.skipped), (1, 1));
        assert_eq!(updates_with.load(Ordering::SeqCst), 1);
        assert_eq!(updates_without.load(Ordering::SeqCst), 0);
        // live context fetched only for the plugin that took it
        assert_eq!(host.live_fetches.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_update_fetches_fresh_context_per_call() {
        let registry = Arc::new(PluginRegistry::new());
        let (a, _, _) = probe(true);
        let (b, _, _) = probe(true);
        registry.insert_plugin("a", Box::new(a));
        registry.insert_plugin("b", Box::new(b));

        let host = host();
        let dispatcher = Dispatcher::new(registry, Some(host.clone()));
        dispatcher.update();
        dispatcher.update();

        assert_eq!(host.live_fetches.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_update_isolates_panics() {
        let registry = Arc::new(PluginRegistry::new());
        let (ok, _, updates) = probe(true);
        registry.insert_plugin("bad", Box::new(Failing));
        registry.insert_plugin("ok", Box::new(ok));

        let report = Dispatcher::new(Arc::clone(&registry), Some(host())).update();

        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed[0].plugin, "bad");
        assert!(report.failed[0].reason.contains("update blew up"));
        assert_eq!(updates.load(Ordering::SeqCst), 1);
        // the panicking plugin stays registered and usable
        assert!(registry.contains_plugin("bad"));
    }

    #[test]
    fn test_update_without_host_is_noop() {
        let registry = Arc::new(PluginRegistry::new());
        let (p, _, updates) = probe(true);
        registry.insert_plugin("p", Box::new(p));

        let report = Dispatcher::new(registry, None).update();

        assert_eq!(report.succeeded + report.skipped + report.failed.len(), 0);
        assert_eq!(updates.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_empty_registry() {
        let dispatcher = Dispatcher::new(Arc::new(PluginRegistry::new()), Some(host()));
        assert!(dispatcher.run().is_clean());
        assert_eq!(dispatcher.update().succeeded, 0);
    }
}
