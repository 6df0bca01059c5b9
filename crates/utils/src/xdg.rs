use std::env;
use std::path::PathBuf;

const APP_DIR: &str = "pincache";

/// XDG Base Directory paths for pincache
pub struct XdgPaths;

impl XdgPaths {
    /// Get XDG_CONFIG_HOME/pincache or fallback
    pub fn config_dir() -> PathBuf {
        base_dir("XDG_CONFIG_HOME", ".config").join(APP_DIR)
    }

    /// Get XDG_DATA_HOME/pincache or fallback
    pub fn data_dir() -> PathBuf {
        base_dir("XDG_DATA_HOME", ".local/share").join(APP_DIR)
    }

    /// Get XDG_CACHE_HOME/pincache or fallback
    pub fn cache_dir() -> PathBuf {
        base_dir("XDG_CACHE_HOME", ".cache").join(APP_DIR)
    }

    /// Directory holding one file per cached CID
    pub fn content_dir() -> PathBuf {
        Self::cache_dir().join("ipfs_cache")
    }

    /// SQLite database with per-CID metadata
    pub fn metadata_db() -> PathBuf {
        Self::data_dir().join("cid_metadata.sqlite")
    }

    /// Default JSON configuration file
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.json")
    }
}

fn base_dir(var: &str, home_relative: &str) -> PathBuf {
    env::var(var)
        .ok()
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            dirs::home_dir()
                .map(|home| home.join(home_relative))
                .unwrap_or_else(|| PathBuf::from(home_relative))
        })
}
