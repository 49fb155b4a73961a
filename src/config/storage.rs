use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where uploads and their metadata live, and what may be uploaded.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory holding uploaded blobs, one file per upload id.
    /// TOML: `storage.data_dir`. Default: `data`.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// SQLite database file.
    /// TOML: `storage.database_path`. Default: `messages.db`.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Accepted file extensions, compared case-insensitively.
    /// TOML: `storage.allowed_extensions`.
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,

    /// Upper bound for a whole upload request body, in bytes.
    /// TOML: `storage.max_upload_bytes`. Default: 100 MiB.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Seconds between two sweeps of expired uploads.
    /// TOML: `storage.sweep_interval_secs`. Default: `300`.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            database_path: default_database_path(),
            allowed_extensions: default_allowed_extensions(),
            max_upload_bytes: default_max_upload_bytes(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl StorageConfig {
    /// SQLite connection URL for `database_path`.
    pub fn database_url(&self) -> String {
        format!("sqlite://{}", self.database_path.display())
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_database_path() -> PathBuf {
    PathBuf::from("messages.db")
}

fn default_allowed_extensions() -> Vec<String> {
    ["txt", "pdf", "png", "jpg", "jpeg", "gif", "zip", "rar"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn default_max_upload_bytes() -> usize {
    100 * 1024 * 1024
}

fn default_sweep_interval_secs() -> u64 {
    300
}
