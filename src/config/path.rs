//! Module for searching for the bridge config file

use std::path::PathBuf;

/// Name of the config file looked up in each config directory
pub const CONFIG_FILE_NAME: &str = "dualsense_bridge.yaml";

/// Plugin directory used by the console loader
const FALLBACK_BASE_PATH: &str = "/data/GoldHEN/plugins";

/// Returns the base path for configuration data
pub fn get_base_path() -> PathBuf {
    let Ok(base_dirs) = xdg::BaseDirectories::with_prefix("dualsense-bridge") else {
        log::debug!("Unable to determine config base path. Using fallback path.");
        return PathBuf::from(FALLBACK_BASE_PATH);
    };

    // Get the data directories in preference order
    let data_dirs = base_dirs.get_data_dirs();
    for dir in data_dirs {
        if dir.exists() {
            return dir;
        }
    }

    log::debug!("Config base path not found. Using fallback path.");
    PathBuf::from(FALLBACK_BASE_PATH)
}

/// Returns the list of config file paths in load order. The first one that
/// exists wins.
/// E.g. ["/etc/dualsense-bridge/dualsense_bridge.yaml", "/data/GoldHEN/plugins/dualsense_bridge.yaml"]
pub fn get_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/dualsense-bridge").join(CONFIG_FILE_NAME)];
    if let Ok(base_dirs) = xdg::BaseDirectories::with_prefix("dualsense-bridge") {
        paths.push(base_dirs.get_config_home().join(CONFIG_FILE_NAME));
    }
    paths.push(get_base_path().join(CONFIG_FILE_NAME));

    paths
}
