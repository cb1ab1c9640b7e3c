use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::storage::file::{Config, FileIoWithBackup};

/// immutable through full lifetime of app, unless restart app.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub management: ManagementConfig,
    #[serde(default)]
    pub files: FilesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base directory holding `servers.json` and the per-server trees.
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("crafthost"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagementConfig {
    /// Per-server console history cap; oldest entries are evicted first.
    pub log_cap: usize,
    /// Seconds between a graceful stop and a forced kill. 0 disables the
    /// escalation.
    pub stop_timeout_secs: u64,
}

impl Default for ManagementConfig {
    fn default() -> Self {
        Self {
            log_cap: 5000,
            stop_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilesConfig {
    /// Demo mode: file mutations on missing paths are logged and ignored
    /// instead of failing.
    pub sandbox: bool,
}

impl FileIoWithBackup for AppConfig {}

impl Config for AppConfig {
    type ConfigType = AppConfig;
}

impl AppConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<AppConfig> {
        Self::load_config_or_default(path, Self::default)
    }
}
