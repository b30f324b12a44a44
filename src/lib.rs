//! # Plugdeck
//!
//! Plugin lifecycle manager - discover, load, and drive directory-packaged
//! plugins without blocking the host's startup.
//!
//! A host points plugdeck at a plugin root. Discovery returns the candidate
//! names right away, the enabled ones load on a background thread, and the
//! host dispatches `run`/`update` to whatever has loaded so far.
//!
//! ## Features
//!
//! - **Directory discovery**: any subdirectory with a `plugin.json` marker
//! - **Selective enabling**: enabled set re-read from config on every load pass
//! - **Failure isolation**: one broken plugin never takes down the batch
//! - **Optional roles**: settings objects, runtime plugins, update capability
//!
//! ## Quick Start
//!
//! ```bash
//! # Scaffold the built-in plugins and enable them
//! plugdeck init --enable
//!
//! # Load and execute every enabled plugin
//! plugdeck run
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::uninlined_format_args)]

pub mod app;
pub mod core;
pub mod plugin;

pub use plugin::{
    discover, AppContext, ConfigSource, DispatchReport, Dispatcher, Host, HostMethod, LoadHandle,
    LoadReport, ModuleCatalog, Plugin, PluginError, PluginLoader, PluginModule, PluginRegistry,
    PluginResult, PluginSettings, Updatable,
};

// Re-export commonly used types
pub use app::App;
pub use core::{Config, ConfigFile};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "plugdeck";
