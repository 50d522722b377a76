/*!
Configuration management for the board host.
*/

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use drivers::{DriverKind, DriverOptions};
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub host: HostConfig,

    /// Parameter overrides, applied to every driver that knows the key
    #[serde(default)]
    pub parameters: BTreeMap<String, u32>,

    /// Devices to start
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

impl AppConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        let mut parameters = BTreeMap::new();
        parameters.insert("common.debug".to_string(), 0);

        Self {
            host: HostConfig::default(),
            parameters,
            devices: vec![DeviceConfig {
                driver: DriverKind::WhiteBoard,
                id: 0x26501311,
                address: 0x0001_0200,
            }],
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig =
            toml::from_str(&content).with_context(|| "Failed to parse config file as TOML")?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            toml::to_string_pretty(self).with_context(|| "Failed to serialize config to TOML")?;

        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Driver kinds referenced by the device list, in first-use order
    pub fn driver_kinds(&self) -> Vec<DriverKind> {
        let mut kinds = Vec::new();
        for device in &self.devices {
            if !kinds.contains(&device.driver) {
                kinds.push(device.driver);
            }
        }
        kinds
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Host process settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,

    /// Bound on a blocking device read, in milliseconds
    pub read_timeout_ms: u64,

    /// Serial device prefix; the port index comes from `<family>.tty`
    pub serial_prefix: String,

    /// Delay before the Multiclass init byte, in milliseconds
    pub multiclass_settle_ms: u64,
}

impl HostConfig {
    pub fn driver_options(&self) -> DriverOptions {
        DriverOptions {
            read_timeout: Duration::from_millis(self.read_timeout_ms),
            serial_prefix: self.serial_prefix.clone(),
            serial_settle: Duration::from_millis(self.multiclass_settle_ms),
            ..DriverOptions::default()
        }
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        let options = DriverOptions::default();
        Self {
            log_level: "info".to_string(),
            read_timeout_ms: options.read_timeout.as_millis() as u64,
            serial_prefix: options.serial_prefix,
            multiclass_settle_ms: options.serial_settle.as_millis() as u64,
        }
    }
}

/// One device instance to start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub driver: DriverKind,
    /// Vendor id in the high half, product id in the low half
    pub id: u32,
    /// Bus in bits 23:16, device number in bits 15:8
    pub address: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_roundtrip() {
        let original_config = AppConfig::new();

        let temp_file = NamedTempFile::new().unwrap();
        let temp_path = temp_file.path();

        original_config.save_to_file(temp_path).unwrap();
        let loaded_config = AppConfig::load_from_file(temp_path).unwrap();

        assert_eq!(original_config, loaded_config);
    }

    #[test]
    fn test_default_values() {
        let config = AppConfig::new();

        assert_eq!(config.host.log_level, "info");
        assert_eq!(config.host.read_timeout_ms, 1000);
        assert_eq!(config.host.serial_prefix, "/dev/ttyUSB");
        assert_eq!(config.parameters.get("common.debug"), Some(&0));
        assert_eq!(config.driver_kinds(), vec![DriverKind::WhiteBoard]);
    }

    #[test]
    fn test_hand_written_file() {
        let content = r#"
[host]
read_timeout_ms = 250

[parameters]
"ebeam.filter" = 0
"common.debug" = 1

[[devices]]
driver = "multiclass"
id = 0x10c4ea60
address = 0

[[devices]]
driver = "tablet"
id = 0x0b8c0083
address = 0x00010300

[[devices]]
driver = "multiclass"
id = 0x10c4ea60
address = 0x100
"#;
        let config: AppConfig = toml::from_str(content).unwrap();

        assert_eq!(config.host.read_timeout_ms, 250);
        assert_eq!(config.host.log_level, "info");
        assert_eq!(config.parameters.get("ebeam.filter"), Some(&0));
        assert_eq!(config.devices.len(), 3);
        assert_eq!(config.devices[1].id, 0x0b8c0083);
        assert_eq!(
            config.driver_kinds(),
            vec![DriverKind::Multiclass, DriverKind::Tablet]
        );

        let options = config.host.driver_options();
        assert_eq!(options.read_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_missing_file() {
        let err = AppConfig::load_from_file("/nonexistent/boardd.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
