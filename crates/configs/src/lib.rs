//! # configs
//!
//! Layered application settings: compiled defaults, then an optional
//! `erie.toml`, then `ERIE__SECTION__KEY` environment variables (a `.env`
//! file is loaded first when present).
//!
//! These are deployment settings. The economy knobs an operator edits at
//! runtime (`SystemConfig`) live in the record store instead.

use std::path::{Path, PathBuf};

use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ConfigsError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process memory; nothing survives a restart
    Memory,
    /// One JSON file per key under `data_dir`
    Local,
}

#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub data_dir: Option<PathBuf>,
    /// Byte limit across all keys, mirroring the browser storage quota
    pub quota_bytes: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct AdminConfig {
    pub emails: Vec<String>,
    /// Argon2 PHC string. Without it the console cannot be opened.
    pub passphrase_hash: Option<SecretString>,
}

#[derive(Debug, Deserialize)]
pub struct RewardsConfig {
    pub check_in_bonus: Decimal,
    /// Simulated ad length before the reward is credited
    pub ad_reward_delay_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub admin: AdminConfig,
    pub rewards: RewardsConfig,
    pub log: LogConfig,
}

impl AppConfig {
    /// Loads `./erie.toml` (optional) and the environment.
    pub fn load() -> Result<Self, ConfigsError> {
        dotenvy::dotenv().ok();
        let builder = defaults()?
            .add_source(File::with_name("erie").required(false))
            .add_source(env_source());
        Self::build(builder)
    }

    /// Loads an explicit file (required) and the environment.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigsError> {
        dotenvy::dotenv().ok();
        let builder = defaults()?
            .add_source(File::from(path).required(true))
            .add_source(env_source());
        Self::build(builder)
    }

    /// Defaults overlaid with TOML text only. No environment lookup.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigsError> {
        let builder = defaults()?.add_source(File::from_str(toml, FileFormat::Toml));
        Self::build(builder)
    }

    fn build(builder: ConfigBuilder<config::builder::DefaultState>) -> Result<Self, ConfigsError> {
        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        debug!(backend = ?config.storage.backend, "configuration loaded");
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigsError> {
        if self.storage.backend == StorageBackend::Local && self.storage.data_dir.is_none() {
            return Err(ConfigsError::Invalid(
                "storage.data_dir is required for the local backend".into(),
            ));
        }
        if self.rewards.check_in_bonus < Decimal::ZERO {
            return Err(ConfigsError::Invalid(
                "rewards.check_in_bonus must not be negative".into(),
            ));
        }
        if self.admin.passphrase_hash.is_some() && self.admin.emails.is_empty() {
            return Err(ConfigsError::Invalid(
                "admin.emails must list at least one address when a passphrase hash is set".into(),
            ));
        }
        Ok(())
    }
}

fn defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigsError> {
    Ok(Config::builder()
        .set_default("storage.backend", "local")?
        .set_default("storage.data_dir", "./data")?
        .set_default("admin.emails", vec!["admin@erie.com"])?
        .set_default("rewards.check_in_bonus", "0.50")?
        .set_default("rewards.ad_reward_delay_ms", 15_000)?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?)
}

fn env_source() -> Environment {
    Environment::with_prefix("ERIE")
        .prefix_separator("__")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("admin.emails")
        .try_parsing(true)
}
