//! Dry-run driver: replays a migration snapshot against in-process contracts
//!
//! Usage: `stake_migrator <positions.json> [vaults.json]`

use std::{env, fs, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::info;

use stake_migrator::{
    mock_services::{MockDepositContract, MockTokenProvider},
    status_icons::icons_for,
    tracing_logger, Destinations, ExecutorSettings, MigrateStatus, MigrationStatusStore, MigrationStep,
    MigratorConfig, Position, QueueDriver, QueuePolicy, StepExecutor, VaultInfo,
};

fn read_json<T: DeserializeOwned>(path: &str) -> Result<T> {
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let config_path = env::var("MIGRATOR_CONFIG").ok().map(PathBuf::from);
    let config = MigratorConfig::load(config_path.as_deref()).context("Failed to load migrator configuration")?;
    tracing_logger::init_subscriber(&config.log_level);

    let mut args = env::args().skip(1);
    let positions_path = args
        .next()
        .context("usage: stake_migrator <positions.json> [vaults.json]")?;
    let positions: Vec<Position> = read_json(&positions_path)?;
    let vaults: Vec<VaultInfo> = match args.next() {
        Some(path) => read_json(&path)?,
        None => Vec::new(),
    };

    info!(
        positions = positions.len(),
        vaults = vaults.len(),
        chain_id = config.chain_id,
        "Starting dry-run migration"
    );

    let store = Arc::new(MigrationStatusStore::new());
    store.initialize(positions.iter().map(|p| &p.id));

    let destinations = Destinations {
        farm: Arc::new(MockDepositContract::new("master_ape_v2")),
        vault: Arc::new(MockDepositContract::new("vault_ape_v3")),
    };
    let executor = Arc::new(StepExecutor::new(
        store.clone(),
        destinations,
        Arc::new(MockTokenProvider::permissive()),
        vaults,
        ExecutorSettings::from_config(&config),
    ));
    let driver = QueueDriver::new(executor, QueuePolicy::from_config(&config));

    let approve = driver.run(MigrationStep::Approve, &positions).await;

    // Staking without an allowance would revert
    let approved: Vec<Position> = positions
        .iter()
        .filter(|p| store.get_status(&p.id).approve.status == MigrateStatus::Complete)
        .cloned()
        .collect();
    let stake = driver.run(MigrationStep::Stake, &approved).await;

    let statuses: Vec<_> = store
        .all_statuses()
        .into_iter()
        .map(|status| json!({ "icons": icons_for(&status), "status": status }))
        .collect();

    let summary = json!({
        "approve": approve,
        "stake": stake,
        "statuses": statuses,
        "transactions": store.transactions().await,
        "completion_log": store.completion_log().await,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
