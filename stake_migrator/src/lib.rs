//! Stake migration orchestrator
//!
//! Moves a user's unmigrated LP positions from the old staking contract into
//! the new farm or vault, one step at a time, and tracks per position status
//! for the UI.

pub mod contracts;
pub mod destination;
pub mod environment_config;
pub mod mock_services;
pub mod queue;
pub mod status_icons;
pub mod status_store;
pub mod step_executor;
pub mod tracing_logger;
pub mod typed_errors;
pub mod types;
pub mod units;
pub mod zap;

pub use contracts::{DepositContract, Erc20Contract, TokenProvider, VaultInfo, WalletCapabilities};
pub use environment_config::MigratorConfig;
pub use queue::{QueueDriver, QueuePolicy, RunPhase, RunReport};
pub use status_store::{MigrationStatusStore, StatusEvent};
pub use step_executor::{Destinations, ExecutorSettings, StepExecutor, StepOutcome};
pub use typed_errors::{ContractError, StepFailure};
pub use types::{
    Destination, DestinationKind, MigrateStatus, MigrateTransaction, MigrationCompleteLog, MigrationStep, Position,
    PositionId,
};
pub use zap::{derive_zap_migration, DerivedZapInfo, PairReserves, ZapField, ZapInput};
