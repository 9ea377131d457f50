//! Figment-based configuration loading.
//!
//! Configuration priority (highest wins):
//! 1. CLI arguments (applied after Figment load)
//! 2. Config file (TOML)
//! 3. Environment variables (`FLOURISH_` prefix, `__` between sections,
//!    e.g. `FLOURISH_ORACLE__API_KEY`)
//! 4. Defaults

use std::path::{Path, PathBuf};

use eyre::{Result, WrapErr};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use flourish_leaderboard::LeaderboardConfig;
use flourish_ledger::LedgerConfig;
use flourish_oracle::OracleConfig;
use serde::{Deserialize, Serialize};

/// Complete configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct FlourishConfig {
    pub(crate) store: StoreConfig,
    pub(crate) identity: IdentityConfig,
    pub(crate) ledger: LedgerConfig,
    pub(crate) leaderboard: LeaderboardConfig,
    pub(crate) oracle: OracleConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct StoreConfig {
    /// Score store file; defaults to `<datadir>/state/store.json`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct IdentityConfig {
    /// Fixed user id; otherwise an anonymous id is issued and saved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) user_id: Option<String>,
}

impl FlourishConfig {
    /// Load configuration from defaults, environment, and config file.
    /// CLI overrides should be applied separately after loading.
    pub(crate) fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Env::prefixed("FLOURISH_").split("__"));

        if let Some(path) = config_path {
            if path.exists() {
                figment = figment.merge(Toml::file(path));
            }
        }

        figment.extract().wrap_err("Failed to load configuration")
    }
}
