use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The only config layout this build understands.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    CONFIG_SCHEMA_VERSION
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// `apple_music` or `json`.
    pub backend: String,
    /// Scripting name of the player application.
    pub app_name: String,
    /// Primary data file of the library; backed up before every update.
    pub data_file: Option<PathBuf>,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            backend: "apple_music".to_string(),
            app_name: "iTunes".to_string(),
            data_file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub storage_dir: Option<PathBuf>,
    pub snapshot_file: String,
    pub backup_dir: String,
    pub dry_run: bool,
    pub log_level: String,
    pub library: LibraryConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            storage_dir: None,
            snapshot_file: "playcounts.plist".to_string(),
            backup_dir: "Playcounts".to_string(),
            dry_run: false,
            log_level: "info".to_string(),
            library: LibraryConfig::default(),
        }
    }
}
