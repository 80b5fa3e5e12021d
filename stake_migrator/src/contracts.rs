//! Boundary traits for the destination contracts, LP tokens and wallet
//!
//! Real bindings (JSON-RPC, wallet extensions) live outside this crate.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use ethereum_types::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::typed_errors::ContractError;
use crate::types::TxHash;

/// A staking destination: the v2 farm contract or the vault contract
#[async_trait]
pub trait DepositContract: Send + Sync {
    /// Address approved as spender for the LP token
    fn address(&self) -> Address;

    async fn estimate_deposit(&self, pid: u64, amount: U256) -> Result<U256, ContractError>;

    /// Resolves once the wallet has signed and the node accepted the transaction
    async fn deposit(&self, pid: u64, amount: U256, gas_limit: U256) -> Result<TxHash, ContractError>;
}

/// The LP token being migrated
#[async_trait]
pub trait Erc20Contract: Send + Sync {
    async fn estimate_approve(&self, spender: Address, amount: U256) -> Result<U256, ContractError>;

    async fn approve(&self, spender: Address, amount: U256, gas_limit: U256) -> Result<TxHash, ContractError>;
}

/// Looks up an ERC20 handle for an LP address
pub trait TokenProvider: Send + Sync {
    fn token(&self, lp_address: &str) -> Option<Arc<dyn Erc20Contract>>;
}

/// Entry of the vault registry snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultInfo {
    pub pid: u64,
    /// Stake token address per chain id
    pub stake_token_address: HashMap<u64, String>,
    #[serde(default)]
    pub inactive: bool,
}

impl VaultInfo {
    pub fn stake_token_on(&self, chain_id: u64) -> Option<&str> {
        self.stake_token_address.get(&chain_id).map(String::as_str)
    }
}

/// What the connected wallet can cope with
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletCapabilities {
    /// The extension queues overlapping signature requests
    pub supports_parallel_signing: bool,
    pub is_mobile: bool,
}
