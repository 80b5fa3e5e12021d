//! Mock contract implementations
//!
//! In-process stand-ins for the farm, vault and LP token contracts. Used by
//! the test suites and by the binary's dry run.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use ethereum_types::{Address, H256, U256};
use tokio::sync::{Mutex, Semaphore};
use tokio::time::{Instant, Duration};
use tracing::debug;

use crate::contracts::{DepositContract, Erc20Contract, TokenProvider};
use crate::typed_errors::ContractError;
use crate::types::TxHash;

static NONCE: AtomicU64 = AtomicU64::new(1);

fn next_hash() -> TxHash {
    H256::from_low_u64_be(NONCE.fetch_add(1, Ordering::SeqCst))
}

fn address_for(name: &str) -> Address {
    let seed = name
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325u64, |acc, b| (acc ^ b as u64).wrapping_mul(0x0100_0000_01b3));
    Address::from_low_u64_be(seed)
}

/// A deposit the mock accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositCall {
    pub pid: u64,
    pub amount: U256,
    pub gas_limit: U256,
    pub hash: TxHash,
}

/// When a call reached the contract and when it settled
#[derive(Debug, Clone, Copy)]
pub struct CallTiming {
    pub pid: u64,
    pub initiated_at: Instant,
    pub settled_at: Option<Instant>,
}

#[derive(Default)]
struct DepositState {
    gas_estimate: Option<U256>,
    estimate_error: Option<ContractError>,
    deposit_error: Option<ContractError>,
    deposits: Vec<DepositCall>,
    timings: Vec<CallTiming>,
}

/// Farm or vault contract that records deposits
pub struct MockDepositContract {
    name: String,
    address: Address,
    state: Mutex<DepositState>,
    estimate_calls: AtomicUsize,
    deposits_started: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
    latency: Option<Duration>,
}

impl MockDepositContract {
    /// Create a mock contract whose address is derived from `name`
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            address: address_for(name),
            state: Mutex::new(DepositState::default()),
            estimate_calls: AtomicUsize::new(0),
            deposits_started: AtomicUsize::new(0),
            gate: None,
            latency: None,
        }
    }

    /// Deposits wait for a permit, like a signature prompt left open
    pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Deposits take `latency` to be accepted
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Gas estimate returned instead of the 200k default
    pub async fn set_gas_estimate(&self, estimate: U256) {
        self.state.lock().await.gas_estimate = Some(estimate);
    }

    /// Every later estimate fails with `error`
    pub async fn fail_estimates_with(&self, error: ContractError) {
        self.state.lock().await.estimate_error = Some(error);
    }

    /// Every later deposit fails with `error` after settling
    pub async fn fail_deposits_with(&self, error: ContractError) {
        self.state.lock().await.deposit_error = Some(error);
    }

    /// Accepted deposits in acceptance order
    pub async fn deposits(&self) -> Vec<DepositCall> {
        self.state.lock().await.deposits.clone()
    }

    /// Per call timings in initiation order
    pub async fn timings(&self) -> Vec<CallTiming> {
        self.state.lock().await.timings.clone()
    }

    pub async fn estimate_calls(&self) -> usize {
        self.estimate_calls.load(Ordering::SeqCst)
    }

    /// Deposits that reached the contract, settled or not
    pub fn deposits_started(&self) -> usize {
        self.deposits_started.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DepositContract for MockDepositContract {
    fn address(&self) -> Address {
        self.address
    }

    async fn estimate_deposit(&self, pid: u64, amount: U256) -> Result<U256, ContractError> {
        self.estimate_calls.fetch_add(1, Ordering::SeqCst);

        let mut state = self.state.lock().await;
        state.timings.push(CallTiming {
            pid,
            initiated_at: Instant::now(),
            settled_at: None,
        });

        if let Some(error) = &state.estimate_error {
            return Err(error.clone());
        }

        debug!(contract = %self.name, pid, amount = %amount, "Mock gas estimate");
        Ok(state.gas_estimate.unwrap_or_else(|| U256::from(200_000u64)))
    }

    async fn deposit(&self, pid: u64, amount: U256, gas_limit: U256) -> Result<TxHash, ContractError> {
        self.deposits_started.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|_| ContractError::new("wallet closed"))?
                .forget();
        }
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.lock().await;
        let now = Instant::now();
        if let Some(timing) = state
            .timings
            .iter_mut()
            .find(|t| t.pid == pid && t.settled_at.is_none())
        {
            timing.settled_at = Some(now);
        }

        if let Some(error) = &state.deposit_error {
            return Err(error.clone());
        }

        let hash = next_hash();
        state.deposits.push(DepositCall {
            pid,
            amount,
            gas_limit,
            hash,
        });
        debug!(contract = %self.name, pid, tx_hash = ?hash, "Mock deposit accepted");
        Ok(hash)
    }
}

/// An approval the mock token accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApproveCall {
    pub spender: Address,
    pub amount: U256,
    pub gas_limit: U256,
}

#[derive(Default)]
struct TokenState {
    approve_error: Option<ContractError>,
    approvals: Vec<ApproveCall>,
}

#[derive(Default)]
pub struct MockErc20 {
    state: Mutex<TokenState>,
}

impl MockErc20 {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every later approval fails with `error`
    pub async fn fail_approvals_with(&self, error: ContractError) {
        self.state.lock().await.approve_error = Some(error);
    }

    pub async fn approvals(&self) -> Vec<ApproveCall> {
        self.state.lock().await.approvals.clone()
    }
}

#[async_trait]
impl Erc20Contract for MockErc20 {
    async fn estimate_approve(&self, _spender: Address, _amount: U256) -> Result<U256, ContractError> {
        Ok(U256::from(46_000u64))
    }

    async fn approve(&self, spender: Address, amount: U256, gas_limit: U256) -> Result<TxHash, ContractError> {
        let mut state = self.state.lock().await;
        if let Some(error) = &state.approve_error {
            return Err(error.clone());
        }
        state.approvals.push(ApproveCall {
            spender,
            amount,
            gas_limit,
        });
        Ok(next_hash())
    }
}

/// Token lookup keyed by lowercase LP address
#[derive(Default)]
pub struct MockTokenProvider {
    tokens: DashMap<String, Arc<MockErc20>>,
    create_missing: bool,
}

impl MockTokenProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider that hands out a fresh token for any address
    pub fn permissive() -> Self {
        Self {
            tokens: DashMap::new(),
            create_missing: true,
        }
    }

    /// Registers a token for `lp_address`, returning the existing one if present
    pub fn register(&self, lp_address: &str) -> Arc<MockErc20> {
        self.tokens
            .entry(lp_address.to_lowercase())
            .or_insert_with(|| Arc::new(MockErc20::new()))
            .clone()
    }
}

impl TokenProvider for MockTokenProvider {
    fn token(&self, lp_address: &str) -> Option<Arc<dyn Erc20Contract>> {
        let key = lp_address.to_lowercase();
        if let Some(token) = self.tokens.get(&key) {
            let token: Arc<dyn Erc20Contract> = token.value().clone();
            return Some(token);
        }
        if self.create_missing {
            let token: Arc<dyn Erc20Contract> = self.register(&key);
            return Some(token);
        }
        None
    }
}
