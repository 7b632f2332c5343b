pub mod path;


use std::{io, path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::drivers::dualsense::driver::{
    DS5_EP_IN, DS5_EP_OUT, DS5_INTERFACE, DS5_PID, DS5_VID,
};

/// Represents all possible errors loading a [BridgeConfig]
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Could not read: {0}")]
    IoError(#[from] io::Error),
    #[error("Unable to deserialize: {0}")]
    DeserializeError(#[from] serde_yaml::Error),
}

/// Configuration for the bridge. Every value is optional in the YAML file and
/// falls back to its default.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "snake_case", default)]
pub struct BridgeConfig {
    pub version: u32,
    pub device: DeviceConfig,
    pub timing: TimingConfig,
    pub hook: HookConfig,
    /// Show notifications when the controller connects or disconnects
    pub notifications: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            version: 1,
            device: Default::default(),
            timing: Default::default(),
            hook: Default::default(),
            notifications: true,
        }
    }
}

impl BridgeConfig {
    /// Load a [BridgeConfig] from the given YAML string
    pub fn from_yaml(content: String) -> Result<BridgeConfig, LoadError> {
        let config: BridgeConfig = serde_yaml::from_str(content.as_str())?;
        Ok(config)
    }

    /// Load a [BridgeConfig] from the given YAML file
    pub fn from_yaml_file(path: &Path) -> Result<BridgeConfig, LoadError> {
        let file = std::fs::File::open(path)?;
        let config: BridgeConfig = serde_yaml::from_reader(file)?;
        Ok(config)
    }

    /// Serialize the config to YAML
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Load the config from the given path, or from the first config file
    /// found in the config directories. Missing or malformed files fall back
    /// to the defaults.
    pub fn load(config_path: Option<&Path>) -> BridgeConfig {
        let candidates = match config_path {
            Some(config_path) => vec![config_path.to_path_buf()],
            None => path::get_config_paths(),
        };

        for candidate in candidates {
            if !candidate.exists() {
                log::trace!("Config {candidate:?} does not exist");
                continue;
            }
            return match BridgeConfig::from_yaml_file(&candidate) {
                Ok(config) => {
                    log::info!("Loaded config from {candidate:?}");
                    config
                }
                Err(e) => {
                    log::warn!("Unable to load config {candidate:?}: {e}. Using defaults.");
                    BridgeConfig::default()
                }
            };
        }

        log::debug!("No config file found. Using defaults.");
        BridgeConfig::default()
    }
}

/// Which USB device to bridge and how to talk to it
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "snake_case", default)]
pub struct DeviceConfig {
    pub vendor_id: u16,
    pub product_id: u16,
    pub interface: u8,
    pub endpoint_in: u8,
    pub endpoint_out: u8,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            vendor_id: DS5_VID,
            product_id: DS5_PID,
            interface: DS5_INTERFACE,
            endpoint_in: DS5_EP_IN,
            endpoint_out: DS5_EP_OUT,
        }
    }
}

/// Timeouts and intervals, all in milliseconds
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "snake_case", default)]
pub struct TimingConfig {
    /// Timeout of the read done inside of every pad read. Must stay short
    /// enough to never stall a frame.
    pub read_timeout_ms: u64,
    pub keep_alive_timeout_ms: u64,
    pub keep_alive_interval_ms: u64,
    pub discovery_interval_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: 2,
            keep_alive_timeout_ms: 10,
            keep_alive_interval_ms: 1000,
            discovery_interval_ms: 1000,
        }
    }
}

impl TimingConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn keep_alive_timeout(&self) -> Duration {
        Duration::from_millis(self.keep_alive_timeout_ms)
    }

    pub fn keep_alive_interval(&self) -> Duration {
        Duration::from_millis(self.keep_alive_interval_ms)
    }

    pub fn discovery_interval(&self) -> Duration {
        Duration::from_millis(self.discovery_interval_ms)
    }
}

/// Library and exported function to intercept
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "snake_case", default)]
pub struct HookConfig {
    pub module: String,
    pub symbol: String,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            module: "libScePad.sprx".to_string(),
            symbol: "scePadRead".to_string(),
        }
    }
}
