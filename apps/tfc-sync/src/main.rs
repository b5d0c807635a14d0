//! Run one Terraform Cloud identity-sync pass and print the snapshot as JSON.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use identity_sync_sdk::{SyncOptions, Syncer};
use terraform_cloud_connector::{TerraformCloudConfig, TerraformCloudConnector};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;

/// Terraform Cloud identity sync.
#[derive(Debug, Parser)]
#[command(version, long_about = None)]
struct Cli {
    /// YAML configuration file; `TFC_*` environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Terraform Cloud or Enterprise address; overrides the configuration.
    #[arg(long)]
    address: Option<String>,

    /// Resources whose entitlements and grants are fetched concurrently.
    #[arg(long, default_value_t = 8)]
    concurrency: usize,

    /// Print the expanded (entitlement, user) pairs instead of the raw snapshot.
    #[arg(long)]
    expand: bool,

    /// Emit logs as JSON.
    #[arg(long, env = "TFC_LOG_JSON")]
    log_json: bool,
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    let mut cfg: TerraformCloudConfig = config::load(cli.config.as_deref())?;
    if let Some(address) = cli.address {
        cfg.address = address;
    }
    let connector = TerraformCloudConnector::new(&cfg).context("failed to set up connector")?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; cancelling sync");
            on_signal.cancel();
        }
    });

    let options = SyncOptions {
        concurrency: cli.concurrency,
        ..SyncOptions::default()
    };
    let snapshot = Syncer::new(Arc::new(connector))
        .with_options(options)
        .run(&cancel)
        .await
        .context("sync failed")?;

    let out = if cli.expand {
        serde_json::to_vec_pretty(&snapshot.expand_grants())?
    } else {
        serde_json::to_vec_pretty(&snapshot)?
    };
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&out)?;
    writeln!(stdout)?;
    info!("Done");
    Ok(())
}
