//! Plugin directory discovery.

use std::path::Path;

use walkdir::WalkDir;

use super::{PluginError, PluginResult, MANIFEST_FILE};

/// Find plugin candidates under `plugin_root`.
///
/// A candidate is a direct subdirectory that contains the manifest marker
/// file. Names come back in filesystem iteration order, which is not stable
/// across platforms.
pub fn discover(plugin_root: &Path) -> PluginResult<Vec<String>> {
    if !plugin_root.is_dir() {
        return Err(PluginError::RootNotFound(plugin_root.to_path_buf()));
    }

    let mut names = Vec::new();

    for entry in WalkDir::new(plugin_root).min_depth(1).max_depth(1).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            // Failing to open the root itself is a setup error
            Err(e) if e.depth() == 0 => return Err(e.into()),
            Err(e) => {
                tracing::debug!(error = %e, "Skipping unreadable plugin entry");
                continue;
            }
        };

        if !entry.file_type().is_dir() || !entry.path().join(MANIFEST_FILE).is_file() {
            continue;
        }

        match entry.file_name().to_str() {
            Some(name) => names.push(name.to_string()),
            None => {
                tracing::debug!(path = %entry.path().display(), "Skipping non UTF-8 plugin name");
            }
        }
    }

    Ok(names)
}
