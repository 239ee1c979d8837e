use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Could not determine config directory")]
    NoConfigDir,
}

/// Application configuration
///
/// In debug builds a `.env` file is loaded first so `SHELFWRIGHT_CONFIG` can
/// point at a local config without touching the real one.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub qbit: QbitConfig,
    pub importers: ImportersConfig,
    pub notifications: NotificationsConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive applied when RUST_LOG is unset, e.g. "info"
    pub level: String,
}

/// Connection and path-mapping settings for the qBittorrent client
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct QbitConfig {
    pub url: String,
    pub username: String,
    pub password: String,
    /// Base download path as qBittorrent sees it
    pub download_path: String,
    /// The same directory as this process sees it
    pub local_download_path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ImportersConfig {
    pub imported_tag: String,
    pub manual_intervention_tag: String,
    /// Seconds between sweeps. Zero means run one sweep and exit.
    pub sweep_interval_secs: u64,
    pub audiobooks: AudiobookImporterConfig,
}

impl Default for ImportersConfig {
    fn default() -> Self {
        ImportersConfig {
            imported_tag: "imported".to_string(),
            manual_intervention_tag: "manual-intervention".to_string(),
            sweep_interval_secs: 0,
            audiobooks: AudiobookImporterConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AudiobookImporterConfig {
    pub libraries: Vec<Library>,
    pub import_types: Vec<ImportType>,
}

/// A library directory that imports are relocated into
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Library {
    pub name: String,
    pub path: PathBuf,
}

/// Maps a qBittorrent category to a library, with an optional notifier
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ImportType {
    pub category: String,
    pub library: String,
    pub notifier: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct NotificationsConfig {
    pub notifiers: Vec<NotifierConfig>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct NotifierConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

const DEFAULT_CONFIG: &str = r#"# shelfwright configuration file

[logging]
# Filter directive applied when RUST_LOG is unset
level = "info"

[qbit]
url = ""                  # Example: http://localhost:8080/
username = ""
password = ""
download_path = ""        # Base download path as qBittorrent sees it
local_download_path = ""  # The same directory as this process sees it

[importers]
imported_tag = "imported"
manual_intervention_tag = "manual-intervention"
sweep_interval_secs = 0   # 0 = run one sweep and exit

[importers.audiobooks]
libraries = []
# Example:
# [[importers.audiobooks.libraries]]
# name = "audiobooks"
# path = "/audiobooks"

import_types = []
# Example:
# [[importers.audiobooks.import_types]]
# category = "audiobooks"
# library = "audiobooks"
# notifier = "my-discord-notifier"

[notifications]
notifiers = []
# Example:
# [[notifications.notifiers]]
# name = "my-discord-notifier"
# type = "discord"
# url = "https://discord.com/api/webhooks/..."
"#;

impl Config {
    /// Load configuration, writing a commented default file on first run
    pub fn load() -> Result<Self, ConfigError> {
        #[cfg(debug_assertions)]
        {
            if dotenvy::dotenv().is_ok() {
                info!("Config: Dev mode activated - loaded .env file");
            }
        }

        let path = Self::config_file_path()?;
        Self::load_from(&path)
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            std::fs::write(path, DEFAULT_CONFIG)?;
            info!(path = %path.display(), "Created default configuration file");
        }

        info!(path = %path.display(), "Loading configuration");

        let contents = std::fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;

        Ok(config)
    }

    fn config_file_path() -> Result<PathBuf, ConfigError> {
        if let Ok(path) = std::env::var("SHELFWRIGHT_CONFIG") {
            return Ok(PathBuf::from(path));
        }

        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("shelfwright").join("config.toml"))
    }
}

/// Look up a library by name
pub fn find_library_by_name<'a>(libraries: &'a [Library], name: &str) -> Option<&'a Library> {
    libraries.iter().find(|lib| lib.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_parses() {
        let config: Config = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.importers.imported_tag, "imported");
        assert_eq!(config.importers.manual_intervention_tag, "manual-intervention");
        assert_eq!(config.importers.sweep_interval_secs, 0);
        assert!(config.importers.audiobooks.libraries.is_empty());
        assert!(config.notifications.notifiers.is_empty());
    }

    #[test]
    fn empty_config_uses_reserved_tag_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.importers.imported_tag, "imported");
        assert_eq!(config.importers.manual_intervention_tag, "manual-intervention");
    }

    #[test]
    fn find_library_by_name_matches_exactly() {
        let libraries = vec![
            Library {
                name: "audiobooks".to_string(),
                path: PathBuf::from("/audiobooks"),
            },
            Library {
                name: "kids".to_string(),
                path: PathBuf::from("/kids"),
            },
        ];

        assert_eq!(
            find_library_by_name(&libraries, "kids").map(|l| l.path.as_path()),
            Some(Path::new("/kids"))
        );
        assert!(find_library_by_name(&libraries, "Audiobooks").is_none());
    }
}
