use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::KiraError;

pub const LOCAL_CONFIG_FILE: &str = "kira-geo.json";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Root of the series tree on the GEO file server.
    pub ftp_base_url: String,
    /// Accession page used for `--info`.
    pub info_base_url: String,
    pub user_agent: String,
    pub listing_timeout_secs: u64,
    pub download_connect_timeout_secs: u64,
    pub download_timeout_secs: u64,
    pub chunk_size: usize,
    pub matrix_keyword: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ftp_base_url: "https://ftp.ncbi.nlm.nih.gov/geo/series".to_string(),
            info_base_url: "https://www.ncbi.nlm.nih.gov/geo/query/acc.cgi".to_string(),
            user_agent: "Mozilla/5.0".to_string(),
            listing_timeout_secs: 15,
            download_connect_timeout_secs: 30,
            download_timeout_secs: 3600,
            chunk_size: 8192,
            matrix_keyword: "series_matrix".to_string(),
        }
    }
}

impl Settings {
    pub fn listing_timeout(&self) -> Duration {
        Duration::from_secs(self.listing_timeout_secs)
    }

    pub fn download_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.download_connect_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// An explicit path must exist. Without one, `./kira-geo.json` and then the
    /// user config directory are consulted, falling back to defaults.
    pub fn resolve(path: Option<&Path>) -> Result<Settings, KiraError> {
        if let Some(path) = path {
            return Self::load(path);
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            return Self::load(&local);
        }

        if let Some(user) = user_config_path()
            && user.exists()
        {
            return Self::load(&user);
        }

        tracing::debug!("no settings file found, using defaults");
        Ok(Settings::default())
    }

    pub fn load(path: &Path) -> Result<Settings, KiraError> {
        let content =
            fs::read_to_string(path).map_err(|_| KiraError::ConfigRead(path.to_path_buf()))?;
        let settings = Self::parse(&content)?;
        tracing::debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    pub fn parse(content: &str) -> Result<Settings, KiraError> {
        let settings: Settings = serde_json::from_str(content)
            .map_err(|err| KiraError::ConfigParse(err.to_string()))?;
        if settings.chunk_size == 0 {
            return Err(KiraError::ConfigParse(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        Ok(settings)
    }
}

fn user_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "kira-geo").map(|dirs| dirs.config_dir().join("config.json"))
}
