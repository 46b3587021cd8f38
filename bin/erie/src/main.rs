//! # ERIE Binary
//!
//! Operator tooling over the record store. Backends are chosen at compile
//! time through features and at run time through `configs`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use configs::{AdminConfig, AppConfig, LogConfig, RewardsConfig, StorageBackend, StorageConfig};
use erie_core::traits::{BlobStore, CredentialVerifier};
use erie_core::{MemoryBlobStore, RecordStore};
use erie_services::{admin, AppContext, RewardSettings};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// Feature-gated plugins
#[cfg(feature = "store-local")]
use erie_store_local::LocalBlobStore;

#[cfg(feature = "auth-simple")]
use erie_auth_simple::{hash_passphrase, Argon2AdminVerifier, DisabledAdminVerifier};

/// ERIE record store tooling.
#[derive(Parser, Debug)]
#[command(name = "erie", version, about, long_about = None)]
struct Cli {
    /// Settings file. Defaults to `./erie.toml` when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Operator credentials, checked against `admin.passphrase_hash`.
#[derive(Args, Debug)]
struct Operator {
    #[arg(long, env = "ERIE_ADMIN_EMAIL")]
    email: String,
    #[arg(long, env = "ERIE_ADMIN_PASSPHRASE", hide_env_values = true)]
    passphrase: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create every missing collection and the default config.
    Init,
    /// Print the console dashboard counters as JSON.
    Stats(Operator),
    /// Print every account as JSON, newest first.
    Users(Operator),
    /// Print pending withdrawal requests as JSON, oldest first.
    Withdrawals(Operator),
    /// Print an Argon2 hash for `admin.passphrase_hash`.
    HashPassphrase {
        /// Read from stdin when omitted.
        passphrase: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from_path(path),
        None => AppConfig::load(),
    }
    .context("loading configuration")?;
    init_tracing(&config.log);

    let AppConfig {
        storage,
        admin: admin_config,
        rewards,
        ..
    } = config;

    match cli.command {
        Commands::HashPassphrase { passphrase } => print_hash(passphrase),
        Commands::Init => {
            let store = RecordStore::new(open_blobs(&storage).await?);
            let created = store.ensure_defaults().await?;
            info!(created, "store initialized");
            println!("{created} key(s) created");
            Ok(())
        }
        Commands::Stats(op) => {
            let ctx = build_context(&storage, admin_config, &rewards).await?;
            let console = admin::console_with_credentials(&ctx, &op.email, &op.passphrase).await?;
            print_json(&console.stats().await?)
        }
        Commands::Users(op) => {
            let ctx = build_context(&storage, admin_config, &rewards).await?;
            let console = admin::console_with_credentials(&ctx, &op.email, &op.passphrase).await?;
            print_json(&console.users().await?)
        }
        Commands::Withdrawals(op) => {
            let ctx = build_context(&storage, admin_config, &rewards).await?;
            let console = admin::console_with_credentials(&ctx, &op.email, &op.passphrase).await?;
            print_json(&console.pending_withdrawals().await?)
        }
    }
}

async fn build_context(
    storage: &StorageConfig,
    admin: AdminConfig,
    rewards: &RewardsConfig,
) -> Result<AppContext> {
    // 1. Storage backend
    let store = Arc::new(RecordStore::new(open_blobs(storage).await?));

    // 2. Credential verifier
    let auth = admin_verifier(admin)?;

    // 3. Context
    Ok(AppContext::new(store, auth).with_rewards(RewardSettings {
        check_in_bonus: rewards.check_in_bonus,
        ad_reward_delay: Duration::from_millis(rewards.ad_reward_delay_ms),
    }))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn open_blobs(storage: &StorageConfig) -> Result<Arc<dyn BlobStore>> {
    match storage.backend {
        StorageBackend::Memory => {
            warn!("memory backend selected, nothing will be persisted");
            let blobs = match storage.quota_bytes {
                Some(limit) => MemoryBlobStore::with_quota(limit as usize),
                None => MemoryBlobStore::new(),
            };
            Ok(Arc::new(blobs))
        }
        #[cfg(feature = "store-local")]
        StorageBackend::Local => {
            let dir = storage
                .data_dir
                .clone()
                .context("storage.data_dir is not set")?;
            let blobs = LocalBlobStore::open(dir, storage.quota_bytes)
                .await
                .context("opening the data directory")?;
            Ok(Arc::new(blobs))
        }
        #[cfg(not(feature = "store-local"))]
        StorageBackend::Local => bail!("this build has no local storage backend (feature store-local)"),
    }
}

#[cfg(feature = "auth-simple")]
fn admin_verifier(admin: AdminConfig) -> Result<Arc<dyn CredentialVerifier>> {
    Ok(match admin.passphrase_hash {
        Some(hash) => Arc::new(Argon2AdminVerifier::new(admin.emails, hash)),
        None => {
            warn!("admin.passphrase_hash is not set, the console is locked");
            Arc::new(DisabledAdminVerifier)
        }
    })
}

#[cfg(not(feature = "auth-simple"))]
fn admin_verifier(_admin: AdminConfig) -> Result<Arc<dyn CredentialVerifier>> {
    bail!("this build has no credential verifier (feature auth-simple)")
}

#[cfg(feature = "auth-simple")]
fn print_hash(passphrase: Option<String>) -> Result<()> {
    let passphrase = match passphrase {
        Some(p) => p,
        None => {
            let mut line = String::new();
            std::io::stdin()
                .read_line(&mut line)
                .context("reading passphrase from stdin")?;
            line.trim_end_matches(['\r', '\n']).to_string()
        }
    };
    if passphrase.is_empty() {
        bail!("passphrase must not be empty");
    }
    let hash = hash_passphrase(&passphrase).map_err(|e| anyhow::anyhow!("hashing failed: {e}"))?;
    println!("{hash}");
    Ok(())
}

#[cfg(not(feature = "auth-simple"))]
fn print_hash(_passphrase: Option<String>) -> Result<()> {
    bail!("this build has no password hasher (feature auth-simple)")
}

/// Logs go to stderr so command output stays parseable.
fn init_tracing(log: &LogConfig) {
    let level = &log.level;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "erie={level},erie_core={level},erie_services={level},erie_store_local={level},warn"
        ))
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);
    if log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_commands_parse() {
        let cli = Cli::try_parse_from([
            "erie",
            "stats",
            "--email",
            "ops@erie.com",
            "--passphrase",
            "pw",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Stats(ref op) if op.email == "ops@erie.com"));

        let cli = Cli::try_parse_from(["erie", "--config", "erie.toml", "init"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("erie.toml")));
        assert!(matches!(cli.command, Commands::Init));
    }

    #[tokio::test]
    async fn memory_backend_honours_the_quota() {
        let storage = StorageConfig {
            backend: StorageBackend::Memory,
            data_dir: None,
            quota_bytes: Some(8),
        };
        let blobs = open_blobs(&storage).await.unwrap();
        assert!(blobs.write("erie_posts", "[]").await.is_err());
    }
}
