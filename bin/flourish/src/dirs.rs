//! Data directory layout.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use eyre::{Result, eyre};

/// Returns the default data directory path.
pub(crate) fn default_data_dir() -> Option<PathBuf> {
    ProjectDirs::from("org", "flourish", "flourish").map(|dirs| dirs.data_dir().to_path_buf())
}

pub(crate) struct DataDirs {
    root: PathBuf,
}

impl DataDirs {
    /// Use `datadir`, or the platform default, creating it if needed.
    pub(crate) fn new(datadir: Option<PathBuf>) -> Result<Self> {
        let root = datadir
            .unwrap_or_else(|| default_data_dir().unwrap_or_else(|| PathBuf::from(".flourish")));

        fs::create_dir_all(root.join("state"))
            .map_err(|e| eyre!("Failed to create directory {}: {}", root.display(), e))?;

        Ok(Self { root })
    }

    pub(crate) fn root(&self) -> &Path {
        &self.root
    }

    pub(crate) fn config_file(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    pub(crate) fn state_dir(&self) -> PathBuf {
        self.root.join("state")
    }

    /// Default location of the score store.
    pub(crate) fn store_file(&self) -> PathBuf {
        self.state_dir().join("store.json")
    }

    /// Anonymous user id issued on first run.
    pub(crate) fn user_id_file(&self) -> PathBuf {
        self.state_dir().join("user_id")
    }

    /// Journal, wallet and garden.
    pub(crate) fn session_file(&self) -> PathBuf {
        self.state_dir().join("session.json")
    }
}
