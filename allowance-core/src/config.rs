//! Configuration management
//!
//! Settings live in `settings.json` inside the data directory:
//! ```json
//! {
//!   "deviceName": "kitchen-tablet",
//!   "cloudDir": "/mnt/shared/allowance",
//!   "storageKey": "allowance-tracker-data"
//! }
//! ```
//! Fields this crate does not know about are kept when saving.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const SETTINGS_FILE: &str = "settings.json";
pub const DEFAULT_STORAGE_KEY: &str = "allowance-tracker-data";
pub const DEFAULT_DEVICE_NAME: &str = "device";

/// Env var overriding `cloudDir`
pub const CLOUD_DIR_ENV: &str = "ALLOWANCE_CLOUD_DIR";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    device_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cloud_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    storage_key: Option<String>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

impl SettingsFile {
    fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!(error = %e, "Malformed settings file; using defaults");
            Self::default()
        }))
    }
}

/// Resolved settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Name this device uses on the peer channel
    pub device_name: String,
    /// Shared directory acting as the cloud key-value store
    pub cloud_dir: Option<PathBuf>,
    /// Key (file stem) the ledger blob is stored under
    pub storage_key: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device_name: DEFAULT_DEVICE_NAME.to_string(),
            cloud_dir: None,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

impl Config {
    /// Load config from the data directory
    ///
    /// A missing or malformed file yields defaults. `ALLOWANCE_CLOUD_DIR`
    /// takes precedence over the file's `cloudDir`.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let mut config = Self::load_saved(data_dir)?;

        if let Some(dir) = std::env::var_os(CLOUD_DIR_ENV).filter(|d| !d.is_empty()) {
            config.cloud_dir = Some(PathBuf::from(dir));
        }
        Ok(config)
    }

    /// Load only what is stored in settings.json, ignoring env overrides
    pub fn load_saved(data_dir: &Path) -> Result<Self> {
        let raw = SettingsFile::read(&data_dir.join(SETTINGS_FILE))?;
        Ok(Self::from_raw(raw))
    }

    fn from_raw(raw: SettingsFile) -> Self {
        let defaults = Self::default();
        Self {
            device_name: raw
                .device_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or(defaults.device_name),
            cloud_dir: raw.cloud_dir,
            storage_key: raw
                .storage_key
                .filter(|k| !k.trim().is_empty())
                .unwrap_or(defaults.storage_key),
        }
    }

    /// Save config to the data directory, preserving unmanaged fields
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let settings_path = data_dir.join(SETTINGS_FILE);
        let mut settings = SettingsFile::read(&settings_path)?;

        settings.device_name = Some(self.device_name.clone());
        settings.cloud_dir = self.cloud_dir.clone();
        settings.storage_key = Some(self.storage_key.clone());

        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create {}", data_dir.display()))?;
        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)
            .with_context(|| format!("Failed to write {}", settings_path.display()))?;
        Ok(())
    }

    /// Location of the device-local snapshot
    pub fn local_snapshot_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join("ledger.json")
    }

    /// Location of the cloud snapshot, if a cloud directory is configured
    pub fn cloud_snapshot_path(&self) -> Option<PathBuf> {
        self.cloud_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.json", self.storage_key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let raw = SettingsFile::read(&dir.path().join(SETTINGS_FILE)).unwrap();
        let config = Config::from_raw(raw);
        assert_eq!(config, Config::default());
        assert_eq!(config.storage_key, "allowance-tracker-data");
    }

    #[test]
    fn test_malformed_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), "{ nope").unwrap();
        let raw = SettingsFile::read(&dir.path().join(SETTINGS_FILE)).unwrap();
        assert_eq!(Config::from_raw(raw), Config::default());
    }

    #[test]
    fn test_save_preserves_unknown_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, r#"{"theme": "dark", "deviceName": "old"}"#).unwrap();

        let config = Config {
            device_name: "tablet".to_string(),
            cloud_dir: Some(PathBuf::from("/shared")),
            storage_key: "family".to_string(),
        };
        config.save(dir.path()).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["theme"], "dark");
        assert_eq!(value["deviceName"], "tablet");
        assert_eq!(value["storageKey"], "family");

        assert_eq!(Config::load_saved(dir.path()).unwrap(), config);
    }

    #[test]
    fn test_blank_names_fall_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{"deviceName": "  ", "storageKey": ""}"#,
        )
        .unwrap();

        let config = Config::load_saved(dir.path()).unwrap();
        assert_eq!(config.device_name, DEFAULT_DEVICE_NAME);
        assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);
    }

    #[test]
    fn test_snapshot_paths() {
        let config = Config {
            cloud_dir: Some(PathBuf::from("/shared")),
            ..Config::default()
        };
        assert_eq!(
            config.cloud_snapshot_path(),
            Some(PathBuf::from("/shared/allowance-tracker-data.json"))
        );
        assert_eq!(
            config.local_snapshot_path(Path::new("/data")),
            PathBuf::from("/data/ledger.json")
        );
        assert!(Config::default().cloud_snapshot_path().is_none());
    }
}
