//! Plugin system for plugdeck.
//!
//! This module discovers plugins on disk, loads the enabled ones in the
//! background, and dispatches `run`/`update` calls to whatever has loaded.
//!
//! # Architecture
//!
//! Plugins live in their own subdirectory of the plugin root, marked by a
//! `plugin.json` file. Their code is compiled into the host and registered in
//! a [`ModuleCatalog`] under `<root-basename>.<plugin-name>`; the directory
//! decides *whether* a plugin is present, the catalog decides *what* it is.
//!
//! # Plugin Roles
//!
//! - **Settings**: built from the plugin directory, read by settings UIs
//! - **Plugin**: runtime object with `execute` and an optional update capability
//!
//! # Example
//!
//! ```rust,ignore
//! let mut loader = PluginLoader::new(config, Arc::new(builtin::catalog("plugins")))
//!     .with_host(host);
//!
//! let (candidates, handle) = loader.load_plugins()?;
//! // host startup continues here
//! loader.run_plugins();
//! ```

pub mod builtin;
mod catalog;
mod discovery;
mod dispatch;
mod error;
mod host;
mod loader;
mod registry;
mod types;

pub use catalog::{
    qualified_name, root_basename, ModuleCatalog, PluginFactory, PluginModule, SettingsFactory,
};
pub use discovery::discover;
pub use dispatch::{DispatchFailure, DispatchReport, Dispatcher};
pub use error::{PluginError, PluginResult};
pub use host::{AppContext, Host, HostMethod, NoopMethod, SharedMethod};
pub use loader::{LoadFailure, LoadHandle, LoadReport, PluginLoader};
pub use registry::{PluginRegistry, SharedPlugin};
pub use types::{ConfigSource, Plugin, PluginSettings, Updatable, MANIFEST_FILE};
