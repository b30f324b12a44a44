//! Performance benchmarks for Plugdeck.
//!
//! This module contains benchmarks for:
//! - Discovery over plugin roots of increasing size
//! - A full background load pass
//! - Dispatching `run`/`update` to loaded plugins
//!
//! Run with: `cargo bench`

use std::fs;
use std::path::Path;
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use plugdeck::core::Config;
use plugdeck::plugin::{
    discover, root_basename, AppContext, Host, ModuleCatalog, NoopMethod, Plugin, PluginLoader,
    PluginModule, SharedMethod, Updatable, MANIFEST_FILE,
};
use tempfile::TempDir;

// ============================================================================
// Fixtures
// ============================================================================

mod fixtures {
    use super::*;

    pub struct BenchHost;

    impl Host for BenchHost {
        fn app_context(&self, plugin: Option<&str>) -> AppContext {
            match plugin {
                Some(name) => AppContext::scoped(name, serde_json::Value::Null),
                None => AppContext::live(serde_json::json!({ "tick": 1 })),
            }
        }

        fn method(&self) -> SharedMethod {
            Arc::new(NoopMethod)
        }
    }

    pub struct Tick {
        count: u64,
    }

    impl Plugin for Tick {
        fn execute(&mut self) -> anyhow::Result<()> {
            self.count += 1;
            Ok(())
        }

        fn updatable(&mut self) -> Option<&mut dyn Updatable> {
            Some(self)
        }
    }

    impl Updatable for Tick {
        fn update(&mut self, _ctx: &AppContext) -> anyhow::Result<()> {
            self.count += 1;
            Ok(())
        }
    }

    pub fn plugin_name(i: usize) -> String {
        format!("plugin_{i:04}")
    }

    /// Create `marked` plugin directories plus `unmarked` plain directories.
    pub fn plugin_root(marked: usize, unmarked: usize) -> TempDir {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");

        for i in 0..marked {
            let dir = temp_dir.path().join(plugin_name(i));
            fs::create_dir(&dir).expect("Failed to create plugin dir");
            fs::write(dir.join(MANIFEST_FILE), "{}").expect("Failed to write manifest");
        }
        for i in 0..unmarked {
            fs::create_dir(temp_dir.path().join(format!("data_{i:04}")))
                .expect("Failed to create dir");
        }

        temp_dir
    }

    /// A loader with every plugin under `root` registered and enabled.
    pub fn loader(root: &Path, count: usize) -> PluginLoader {
        let basename = root_basename(root);
        let mut catalog = ModuleCatalog::new();
        let names: Vec<String> = (0..count).map(plugin_name).collect();

        for name in &names {
            let module_name = name.clone();
            catalog.register_plugin(&basename, name, move || {
                Ok(PluginModule::new(module_name.clone())
                    .with_plugin(|_ctx, _method| Ok(Box::new(Tick { count: 0 }) as Box<dyn Plugin>)))
            });
        }

        PluginLoader::new(Arc::new(Config::for_plugins(root, names)), Arc::new(catalog))
            .with_host(Arc::new(BenchHost))
    }

    /// A loader that has finished loading `count` plugins.
    pub fn loaded(root: &Path, count: usize) -> PluginLoader {
        let mut loader = loader(root, count);
        let report = loader
            .start_loading()
            .expect("Failed to start loading")
            .wait()
            .expect("Load pass panicked");
        assert_eq!(report.loaded.len(), count);
        loader
    }
}

// ============================================================================
// Discovery Benchmarks
// ============================================================================

fn bench_discover(c: &mut Criterion) {
    let mut group = c.benchmark_group("discover");

    for count in &[10, 100, 500] {
        let temp_dir = fixtures::plugin_root(*count, *count);

        group.throughput(Throughput::Elements((*count * 2) as u64));
        group.bench_with_input(BenchmarkId::new("dirs", count), temp_dir.path(), |b, root| {
            b.iter(|| discover(black_box(root)).expect("Discovery failed"));
        });
    }

    group.finish();
}

// ============================================================================
// Loading Benchmarks
// ============================================================================

fn bench_load_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("load");

    for count in &[10, 100] {
        let temp_dir = fixtures::plugin_root(*count, 0);

        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::new("pass", count), temp_dir.path(), |b, root| {
            b.iter(|| {
                let loader = fixtures::loaded(root, *count);
                black_box(loader.registry().plugin_count())
            });
        });
    }

    group.finish();
}

// ============================================================================
// Dispatch Benchmarks
// ============================================================================

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");

    for count in &[10, 100, 1000] {
        let temp_dir = fixtures::plugin_root(*count, 0);
        let dispatcher = fixtures::loaded(temp_dir.path(), *count).dispatcher();

        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::new("run", count), &dispatcher, |b, dispatcher| {
            b.iter(|| black_box(dispatcher.run()));
        });
        group.bench_with_input(BenchmarkId::new("update", count), &dispatcher, |b, dispatcher| {
            b.iter(|| black_box(dispatcher.update()));
        });
    }

    group.finish();
}

// ============================================================================
// Criterion Groups
// ============================================================================

criterion_group!(discovery_benches, bench_discover);
criterion_group!(loader_benches, bench_load_pass, bench_dispatch);

criterion_main!(discovery_benches, loader_benches);
