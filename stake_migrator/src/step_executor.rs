//! Step executor
//!
//! Runs one migration step (approve or stake) for one position and records
//! the outcome in the status store. Failures never escape: every error is
//! turned into an `INVALID` status with a display message.

use std::sync::Arc;

use chrono::Utc;
use ethereum_types::U256;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::contracts::{DepositContract, TokenProvider, VaultInfo};
use crate::destination::resolve_destination;
use crate::environment_config::MigratorConfig;
use crate::status_store::MigrationStatusStore;
use crate::typed_errors::{RejectionMatcher, StepFailure};
use crate::types::{
    Destination, MigrateStatus, MigrateTransaction, MigrationCompleteLog, MigrationStep, Position, TxHash,
};
use crate::units::{calculate_gas_margin, to_base_units};

/// Tunables read by the executor
#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    pub chain_id: u64,
    pub prefer_vaults: bool,
    pub token_decimals: u32,
    pub gas_margin_bps: u64,
    pub rejection: RejectionMatcher,
}

impl ExecutorSettings {
    pub fn from_config(config: &MigratorConfig) -> Self {
        Self {
            chain_id: config.chain_id,
            prefer_vaults: config.prefer_vaults,
            token_decimals: config.token_decimals,
            gas_margin_bps: config.gas.margin_bps,
            rejection: config.wallet.rejection_matcher(),
        }
    }
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self::from_config(&MigratorConfig::default())
    }
}

/// Handles to the two possible destinations
#[derive(Clone)]
pub struct Destinations {
    pub farm: Arc<dyn DepositContract>,
    pub vault: Arc<dyn DepositContract>,
}

impl Destinations {
    fn contract(&self, destination: Destination) -> &Arc<dyn DepositContract> {
        match destination {
            Destination::Vault { .. } => &self.vault,
            Destination::Farm { .. } | Destination::Pool => &self.farm,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum StepOutcome {
    Submitted {
        hash: TxHash,
        destination: Destination,
    },
    Failed {
        destination: Destination,
        failure: StepFailure,
    },
}

impl StepOutcome {
    pub fn is_submitted(&self) -> bool {
        matches!(self, StepOutcome::Submitted { .. })
    }
}

pub struct StepExecutor {
    store: Arc<MigrationStatusStore>,
    destinations: Destinations,
    tokens: Arc<dyn TokenProvider>,
    vaults: Vec<VaultInfo>,
    settings: ExecutorSettings,
}

impl StepExecutor {
    pub fn new(
        store: Arc<MigrationStatusStore>,
        destinations: Destinations,
        tokens: Arc<dyn TokenProvider>,
        vaults: Vec<VaultInfo>,
        settings: ExecutorSettings,
    ) -> Self {
        Self {
            store,
            destinations,
            tokens,
            vaults,
            settings,
        }
    }

    /// Where `position` would be deposited under the current vault snapshot
    pub fn resolve(&self, position: &Position) -> Destination {
        resolve_destination(
            position,
            &self.vaults,
            self.settings.chain_id,
            self.settings.prefer_vaults,
        )
    }

    /// Runs `step` for `position`. Each call is a fresh attempt; concurrent
    /// attempts for the same position are not deduplicated.
    pub async fn execute(&self, step: MigrationStep, position: &Position) -> StepOutcome {
        let destination = self.resolve(position);

        debug!(
            position_id = %position.id,
            step = %step,
            destination = %destination.kind(),
            pid = destination.pid(),
            "Executing migration step"
        );

        self.set_status(position, step, MigrateStatus::Pending, format!("{} Pending", step.label()));

        let result = match step {
            MigrationStep::Approve => self.approve(position, destination).await,
            MigrationStep::Stake => self.stake(position, destination).await,
        };

        match result {
            Ok(hash) => {
                self.record_submission(step, position, destination, hash).await;
                self.set_status(position, step, MigrateStatus::Complete, format!("{} Complete", step.label()));

                info!(
                    position_id = %position.id,
                    step = %step,
                    destination = %destination.kind(),
                    tx_hash = ?hash,
                    "Migration step submitted"
                );

                StepOutcome::Submitted { hash, destination }
            }
            Err(failure) => {
                warn!(
                    position_id = %position.id,
                    step = %step,
                    destination = %destination.kind(),
                    failure = ?failure,
                    "Migration step failed"
                );

                self.set_status(position, step, MigrateStatus::Invalid, failure.user_message().to_string());

                StepOutcome::Failed { destination, failure }
            }
        }
    }

    async fn stake(&self, position: &Position, destination: Destination) -> Result<TxHash, StepFailure> {
        let amount = to_base_units(&position.wallet_balance, self.settings.token_decimals).map_err(pre_submission)?;
        let contract = self.destinations.contract(destination);
        let pid = destination.pid();

        let estimate = contract.estimate_deposit(pid, amount).await.map_err(pre_submission)?;
        let gas_limit = calculate_gas_margin(estimate, self.settings.gas_margin_bps);

        contract
            .deposit(pid, amount, gas_limit)
            .await
            .map_err(|e| self.settings.rejection.classify_submission(&e))
    }

    async fn approve(&self, position: &Position, destination: Destination) -> Result<TxHash, StepFailure> {
        let token = self.tokens.token(&position.lp_address).ok_or_else(|| StepFailure::PreSubmission {
            reason: format!("no token handle for {}", position.lp_address),
        })?;
        let spender = self.destinations.contract(destination).address();

        let estimate = token.estimate_approve(spender, U256::MAX).await.map_err(pre_submission)?;
        let gas_limit = calculate_gas_margin(estimate, self.settings.gas_margin_bps);

        token
            .approve(spender, U256::MAX, gas_limit)
            .await
            .map_err(|e| self.settings.rejection.classify_submission(&e))
    }

    async fn record_submission(
        &self,
        step: MigrationStep,
        position: &Position,
        destination: Destination,
        hash: TxHash,
    ) {
        let lp_symbol = position.lp_symbol();

        self.store
            .append_transaction(MigrateTransaction {
                hash,
                id: position.id.clone(),
                step,
                lp_address: position.lp_address.clone(),
                location: destination.kind(),
                lp_symbol: lp_symbol.clone(),
                lp_amount: position.wallet_balance.clone(),
                lp_value_usd: position.lp_value_usd,
                v2_farm_pid: position.farm_pid,
                submitted_at: Utc::now(),
            })
            .await;

        if step == MigrationStep::Stake {
            self.store
                .append_completion_log(MigrationCompleteLog {
                    lp_symbol,
                    location: destination.kind(),
                    stake_amount: position.wallet_balance.clone(),
                })
                .await;
        }
    }

    fn set_status(&self, position: &Position, step: MigrationStep, status: MigrateStatus, message: String) {
        if let Err(e) = self.store.update_status(&position.id, step, status, message) {
            warn!(position_id = %position.id, error = %e, "Status update dropped");
        }
    }
}

fn pre_submission(error: impl std::fmt::Display) -> StepFailure {
    StepFailure::PreSubmission {
        reason: error.to_string(),
    }
}
