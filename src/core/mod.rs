//! Core types shared across plugdeck.
//!
//! Currently this is the configuration layer the plugin loader reads its
//! plugin root and enabled set from.

mod config;

pub use config::{
    Config, ConfigFile, PluginsConfig, WatchConfig, CONFIG_ENV, LOCAL_CONFIG_FILE,
};
