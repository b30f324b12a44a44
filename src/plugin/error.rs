//! Plugin system error types.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;

use thiserror::Error;

/// Result type for plugin operations.
pub type PluginResult<T> = Result<T, PluginError>;

/// Errors that can occur during plugin operations.
#[derive(Debug, Error)]
pub enum PluginError {
    /// Plugin root directory is missing or not a directory.
    #[error("Plugin root not found: {0}")]
    RootNotFound(PathBuf),

    /// No module registered under the qualified name.
    #[error("Plugin module not found: {0}")]
    ModuleNotFound(String),

    /// Module initialization or role construction failed.
    #[error("Failed to load plugin: {0}")]
    LoadError(String),

    /// Plugin code panicked.
    #[error("Plugin '{plugin}' panicked: {message}")]
    Panicked { plugin: String, message: String },

    /// Plugin execution failed.
    #[error("Plugin execution failed: {0}")]
    ExecutionError(String),

    /// The background loader thread died outside per-plugin isolation.
    #[error("Plugin loader thread panicked")]
    LoaderPanicked,

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Directory walk error that carries no IO error.
    #[error("Directory walk error: {0}")]
    Walk(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<walkdir::Error> for PluginError {
    fn from(err: walkdir::Error) -> Self {
        let message = err.to_string();
        match err.into_io_error() {
            Some(io) => Self::Io(io),
            None => Self::Walk(message),
        }
    }
}

/// Run plugin code, turning a panic into [`PluginError::Panicked`].
pub(crate) fn isolate<T>(plugin: &str, f: impl FnOnce() -> PluginResult<T>) -> PluginResult<T> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(PluginError::Panicked {
            plugin: plugin.to_string(),
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
