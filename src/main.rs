//! rt2jira - Request Tracker to JIRA sync
//!
//! Main entry point for the rt2jira CLI. Runs a single sync pass and exits.

use clap::Parser;
use rt2jira::config::{validate_config_result, Rt2JiraConfig, DEFAULT_CONFIG_FILE};
use rt2jira::integrations::{JiraAdapter, RtClient};
use rt2jira::sync::{ConfigFileWatermarkStore, SyncDriver, SyncSettings, SyncStats};
use rt2jira::Rt2JiraError;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

/// rt2jira - copy RT tickets and their comments into JIRA
#[derive(Parser, Debug)]
#[command(name = "rt2jira")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to config file; also where the last fetched timestamp is stored
    #[arg(short, long, env = "RT2JIRA_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    // Initialize logging
    if let Err(e) = rt2jira::logging::init() {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let cli = Cli::parse();

    match run(cli).await {
        Ok(stats) => {
            if stats.persist_failed {
                tracing::warn!("Sync finished but the last fetched timestamp was not saved");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Sync aborted");
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> rt2jira::Result<SyncStats> {
    let config = Rt2JiraConfig::load(&cli.config)?;
    config.require_reviewed(&cli.config)?;
    validate_config_result(&config)?;

    let tracker = RtClient::connect(&config.rt, &config.http)
        .await
        .map_err(|e| Rt2JiraError::Connection(format!("RT: {}", e)))?;

    let board = JiraAdapter::connect(&config.jira, &config.http)
        .await
        .map_err(|e| Rt2JiraError::Connection(format!("JIRA: {}", e)))?;

    let driver = SyncDriver::new(
        Arc::new(tracker),
        Arc::new(board),
        Arc::new(ConfigFileWatermarkStore::new(&cli.config)),
        SyncSettings::from_config(&config),
    );

    driver.run().await
}
