//! Plugdeck - plugin lifecycle manager.
//!
//! Discovers plugins under a plugin root, loads the enabled ones in the
//! background, and drives them with `run`/`update`.

use std::io;
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use plugdeck::plugin::{builtin, discover, DispatchReport, LoadReport};
use plugdeck::App;

/// Plugin lifecycle manager
#[derive(Parser)]
#[command(name = "plugdeck")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use
    #[arg(short, long, global = true, env = "PLUGDECK_CONFIG")]
    config: Option<PathBuf>,

    /// Plugin root directory (overrides the config file)
    #[arg(short, long, global = true)]
    dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List plugin candidates found in the plugin root
    Discover {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Load enabled plugins and report what loaded
    Load {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Load enabled plugins and execute each once
    Run {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Load and run plugins, then push live updates until interrupted
    Watch {
        /// Seconds between updates (defaults to the config value)
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Enable a plugin in the config file
    Enable {
        /// Plugin name
        name: String,
    },

    /// Disable a plugin in the config file
    Disable {
        /// Plugin name
        name: String,
    },

    /// Create plugin directories for the built-in plugins
    Init {
        /// Also enable them in the config file
        #[arg(short, long)]
        enable: bool,
    },

    /// Show configuration
    Config {
        /// Show config file path
        #[arg(long)]
        path: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();

    if let Commands::Completions { shell } = cli.command {
        cmd_completions(shell);
        return Ok(());
    }

    let app = App::new(cli.config, cli.dir)?;

    match cli.command {
        Commands::Discover { format } => cmd_discover(&app, &format),
        Commands::Load { format } => cmd_load(&app, &format),
        Commands::Run { format } => cmd_run(&app, &format),
        Commands::Watch { interval } => cmd_watch(&app, interval),
        Commands::Enable { name } => cmd_set_enabled(&app, &name, true),
        Commands::Disable { name } => cmd_set_enabled(&app, &name, false),
        Commands::Init { enable } => cmd_init(&app, enable),
        Commands::Config { path } => cmd_config(&app, path),
        Commands::Completions { .. } => Ok(()),
    }
}

/// List plugin candidates.
fn cmd_discover(app: &App, format: &str) -> Result<()> {
    let root = app.plugin_root();
    let mut names = discover(&root)?;
    names.sort();

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&names)?);
        return Ok(());
    }

    let config = app.config()?;
    println!("Discovered {} plugins in {}\n", names.len(), root.display());
    for name in &names {
        let marker = if config.is_enabled(name) { "enabled" } else { "disabled" };
        println!("  - {name} ({marker})");
    }

    Ok(())
}

/// Load plugins and print the load report.
fn cmd_load(app: &App, format: &str) -> Result<()> {
    let mut loader = app.loader();
    let (candidates, handle) = loader.load_plugins()?;
    tracing::debug!(count = candidates.len(), "Loading plugins");
    let report = handle.wait()?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_load_report(&report);
        let registry = loader.registry();
        for name in registry.settings_names() {
            if let Some(settings) = registry.settings(&name) {
                println!("  settings {name}: {}", settings.describe());
            }
        }
    }

    Ok(())
}

/// Load plugins and execute each once.
fn cmd_run(app: &App, format: &str) -> Result<()> {
    let mut loader = app.loader();
    let load = loader.start_loading()?.wait()?;
    let run = loader.run_plugins();

    if format == "json" {
        let body = serde_json::json!({ "load": load, "run": run });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        print_load_report(&load);
        print_dispatch_report("Run", &run);
    }

    Ok(())
}

/// Load and run plugins, then update them on an interval until Ctrl+C.
fn cmd_watch(app: &App, interval: Option<u64>) -> Result<()> {
    let interval = interval.unwrap_or(app.config()?.watch.interval_secs).max(1);

    let mut loader = app.loader();
    let load = loader.start_loading()?.wait()?;
    print_load_report(&load);
    print_dispatch_report("Run", &loader.run_plugins());

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })?;

    println!("\nWatching every {interval}s. Press Ctrl+C to stop.");
    let dispatcher = loader.dispatcher();

    loop {
        match rx.recv_timeout(Duration::from_secs(interval)) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                let report = dispatcher.update();
                if !report.is_clean() {
                    print_dispatch_report("Update", &report);
                }
            }
        }
    }

    println!("\nStopping.");
    Ok(())
}

/// Enable or disable a plugin.
fn cmd_set_enabled(app: &App, name: &str, enabled: bool) -> Result<()> {
    let verb = if enabled { "enabled" } else { "disabled" };

    if app.set_enabled(name, enabled)? {
        println!("Plugin '{name}' {verb} in {}", app.config_path().display());
    } else {
        println!("Plugin '{name}' is already {verb}");
    }

    Ok(())
}

/// Scaffold the built-in plugin directories.
fn cmd_init(app: &App, enable: bool) -> Result<()> {
    let root = app.plugin_root();

    for name in builtin::BUILTIN_PLUGINS {
        if builtin::scaffold(&root, name)? {
            println!("Created {}", root.join(name).display());
        } else {
            println!("Exists  {}", root.join(name).display());
        }

        if enable {
            app.set_enabled(name, true)?;
        }
    }

    Ok(())
}

/// Show configuration.
fn cmd_config(app: &App, show_path: bool) -> Result<()> {
    if show_path {
        println!("{}", app.config_path().display());
        return Ok(());
    }

    let toml = toml::to_string_pretty(&app.config()?)?;
    println!("{toml}");

    Ok(())
}

fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "plugdeck", &mut io::stdout());
}

fn print_load_report(report: &LoadReport) {
    println!(
        "Loaded {} plugins ({} failed, {} not enabled)",
        report.loaded.len(),
        report.failed.len(),
        report.skipped
    );
    for name in &report.loaded {
        println!("  ok     {name}");
    }
    for failure in &report.failed {
        println!("  failed {}: {}", failure.plugin, failure.reason);
    }
}

fn print_dispatch_report(label: &str, report: &DispatchReport) {
    println!(
        "{label}: {} succeeded, {} skipped, {} failed",
        report.succeeded,
        report.skipped,
        report.failed.len()
    );
    for failure in &report.failed {
        println!("  failed {}: {}", failure.plugin, failure.reason);
    }
}
