//! Core migration types
//!
//! Positions handed in by the frontend snapshot, the resolved destination,
//! per-step statuses and the append-only records kept for the history view.

use std::fmt;

use chrono::{DateTime, Utc};
use ethereum_types::H256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Transaction hash returned by the wallet once a submission is accepted
pub type TxHash = H256;

/// Identifier of a migratable position (the v1 pid rendered as text)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PositionId(pub String);

impl PositionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PositionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRef {
    pub symbol: String,
}

/// A stake that can be moved to the new farm or vault.
///
/// Built once per session from on-chain balances and never mutated during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub lp_address: String,
    /// Human readable amount, e.g. `"12.5"`
    pub wallet_balance: String,
    /// Pid of the matching farm on the new farm contract; `0` is the single asset pool
    pub farm_pid: u64,
    pub token0: TokenRef,
    #[serde(default)]
    pub token1: Option<TokenRef>,
    #[serde(default)]
    pub lp_value_usd: Option<Decimal>,
}

impl Position {
    /// Display symbol: `"BANANA"` for single sided positions, `"BANANA - BNB"` for pairs
    pub fn lp_symbol(&self) -> String {
        match &self.token1 {
            Some(token1) => format!("{} - {}", self.token0.symbol, token1.symbol),
            None => self.token0.symbol.clone(),
        }
    }
}

/// Where a position ends up after migration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Destination {
    Vault { pid: u64 },
    Farm { pid: u64 },
    Pool,
}

impl Destination {
    pub fn kind(&self) -> DestinationKind {
        match self {
            Destination::Vault { .. } => DestinationKind::Vault,
            Destination::Farm { .. } => DestinationKind::Farm,
            Destination::Pool => DestinationKind::Pool,
        }
    }

    /// Pid passed to the destination contract's `deposit`
    pub fn pid(&self) -> u64 {
        match self {
            Destination::Vault { pid } | Destination::Farm { pid } => *pid,
            Destination::Pool => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DestinationKind {
    Pool,
    Farm,
    Vault,
}

impl fmt::Display for DestinationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DestinationKind::Pool => "pool",
            DestinationKind::Farm => "farm",
            DestinationKind::Vault => "vault",
        })
    }
}

/// Migration step a status is tracked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationStep {
    Approve,
    Stake,
}

impl MigrationStep {
    /// Render order used by the status icons
    pub const ALL: [MigrationStep; 2] = [MigrationStep::Approve, MigrationStep::Stake];

    pub fn label(&self) -> &'static str {
        match self {
            MigrationStep::Approve => "Approve",
            MigrationStep::Stake => "Stake",
        }
    }
}

impl fmt::Display for MigrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MigrationStep::Approve => "approve",
            MigrationStep::Stake => "stake",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MigrateStatus {
    #[default]
    Incomplete,
    Pending,
    Complete,
    Invalid,
}

impl MigrateStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MigrateStatus::Complete | MigrateStatus::Invalid)
    }

    /// Forward-only transitions. A new attempt may start from anywhere;
    /// only an in-flight step can settle.
    pub fn can_transition_to(&self, next: MigrateStatus) -> bool {
        match next {
            MigrateStatus::Pending => true,
            MigrateStatus::Complete | MigrateStatus::Invalid => *self == MigrateStatus::Pending,
            MigrateStatus::Incomplete => *self == MigrateStatus::Incomplete,
        }
    }
}

/// Status and display message of one step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepState {
    pub status: MigrateStatus,
    pub message: String,
}

/// Per position view rendered by the UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrateLpStatus {
    pub id: PositionId,
    pub approve: StepState,
    pub stake: StepState,
}

impl MigrateLpStatus {
    pub fn new(id: PositionId) -> Self {
        Self {
            id,
            approve: StepState::default(),
            stake: StepState::default(),
        }
    }

    pub fn step(&self, step: MigrationStep) -> &StepState {
        match step {
            MigrationStep::Approve => &self.approve,
            MigrationStep::Stake => &self.stake,
        }
    }

    pub fn step_mut(&mut self, step: MigrationStep) -> &mut StepState {
        match step {
            MigrationStep::Approve => &mut self.approve,
            MigrationStep::Stake => &mut self.stake,
        }
    }
}

/// Submitted (not yet confirmed) transaction, kept for the history view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrateTransaction {
    pub hash: TxHash,
    pub id: PositionId,
    pub step: MigrationStep,
    pub lp_address: String,
    pub location: DestinationKind,
    pub lp_symbol: String,
    pub lp_amount: String,
    pub lp_value_usd: Option<Decimal>,
    pub v2_farm_pid: u64,
    pub submitted_at: DateTime<Utc>,
}

/// Entry of the running "what was migrated" summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationCompleteLog {
    pub lp_symbol: String,
    pub location: DestinationKind,
    pub stake_amount: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(token1: Option<&str>) -> Position {
        Position {
            id: PositionId::new("7"),
            lp_address: "0xabc".to_string(),
            wallet_balance: "1".to_string(),
            farm_pid: 3,
            token0: TokenRef { symbol: "BANANA".to_string() },
            token1: token1.map(|symbol| TokenRef { symbol: symbol.to_string() }),
            lp_value_usd: None,
        }
    }

    #[test]
    fn test_lp_symbol() {
        assert_eq!(position(None).lp_symbol(), "BANANA");
        assert_eq!(position(Some("BNB")).lp_symbol(), "BANANA - BNB");
    }

    #[test]
    fn test_status_transitions() {
        use MigrateStatus::*;

        assert!(Incomplete.can_transition_to(Pending));
        assert!(Pending.can_transition_to(Complete));
        assert!(Pending.can_transition_to(Invalid));
        assert!(Invalid.can_transition_to(Pending));

        assert!(!Incomplete.can_transition_to(Complete));
        assert!(!Invalid.can_transition_to(Complete));
        assert!(!Complete.can_transition_to(Invalid));
        assert!(!Complete.can_transition_to(Incomplete));
    }

    #[test]
    fn test_destination_pid() {
        assert_eq!(Destination::Vault { pid: 4 }.pid(), 4);
        assert_eq!(Destination::Farm { pid: 9 }.pid(), 9);
        assert_eq!(Destination::Pool.pid(), 0);
        assert_eq!(Destination::Pool.kind(), DestinationKind::Pool);
    }

    #[test]
    fn test_position_deserialization() {
        let json = r#"{
            "id": "12",
            "lp_address": "0xF65C1C0478eFDe3c19b49EcBE7ACc57BB6B1D713",
            "wallet_balance": "12.5",
            "farm_pid": 1,
            "token0": { "symbol": "BANANA" },
            "token1": { "symbol": "BNB" },
            "lp_value_usd": "431.20"
        }"#;

        let position: Position = serde_json::from_str(json).unwrap();
        assert_eq!(position.id, PositionId::new("12"));
        assert_eq!(position.lp_symbol(), "BANANA - BNB");
        assert_eq!(position.lp_value_usd, Some(Decimal::new(43120, 2)));
    }
}
