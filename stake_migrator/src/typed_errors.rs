//! Typed errors for contract calls, the status store and amount conversion

use serde::{Deserialize, Serialize};

use crate::types::{MigrateStatus, MigrationStep, PositionId};

/// Error surfaced by a wallet or node while estimating or submitting a call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ContractError {
    /// Provider error code when the wallet exposes one (EIP-1193 uses 4001 for user rejection)
    pub code: Option<i64>,
    pub message: String,
}

impl ContractError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: i64, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("illegal status transition for {id}/{step}: {from:?} -> {to:?}")]
    IllegalTransition {
        id: PositionId,
        step: MigrationStep,
        from: MigrateStatus,
        to: MigrateStatus,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnitsError {
    #[error("empty amount")]
    Empty,

    #[error("invalid decimal amount: {0}")]
    InvalidFormat(String),

    #[error("amount {amount} has more than {decimals} fractional digits")]
    TooPrecise { amount: String, decimals: u32 },

    #[error("amount {0} does not fit in 256 bits")]
    Overflow(String),

    #[error("unsupported decimals: {0}")]
    UnsupportedDecimals(u32),
}

/// Why a step ended up `INVALID`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepFailure {
    /// Conversion, missing handle or gas estimation failed; nothing was submitted
    PreSubmission { reason: String },
    /// The user declined the signature prompt
    Rejected,
    /// Wallet or node refused the submission
    Submission { message: String },
}

impl StepFailure {
    pub const GENERIC_MESSAGE: &'static str = "Something went wrong please try refreshing";
    pub const REJECTED_MESSAGE: &'static str = "Transaction rejected in wallet";

    /// Message stored next to the `INVALID` status
    pub fn user_message(&self) -> &str {
        match self {
            StepFailure::PreSubmission { .. } => Self::GENERIC_MESSAGE,
            StepFailure::Rejected => Self::REJECTED_MESSAGE,
            StepFailure::Submission { message } => message,
        }
    }
}

/// Decides whether a submission error is the user declining in their wallet.
///
/// Structured codes are checked first; the message list is the fallback for
/// wallets that only report text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectionMatcher {
    codes: Vec<i64>,
    messages: Vec<String>,
}

impl RejectionMatcher {
    pub fn new(codes: Vec<i64>, messages: Vec<String>) -> Self {
        Self { codes, messages }
    }

    pub fn is_rejection(&self, error: &ContractError) -> bool {
        if let Some(code) = error.code {
            if self.codes.contains(&code) {
                return true;
            }
        }
        self.messages.iter().any(|m| *m == error.message)
    }

    /// Classifies an error raised by the submission call itself
    pub fn classify_submission(&self, error: &ContractError) -> StepFailure {
        if self.is_rejection(error) {
            StepFailure::Rejected
        } else {
            StepFailure::Submission {
                message: error.message.clone(),
            }
        }
    }
}

impl Default for RejectionMatcher {
    fn default() -> Self {
        Self::new(
            vec![4001],
            vec!["MetaMask Tx Signature: User denied transaction signature.".to_string()],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_by_message() {
        let matcher = RejectionMatcher::default();
        let error = ContractError::new("MetaMask Tx Signature: User denied transaction signature.");

        assert_eq!(matcher.classify_submission(&error), StepFailure::Rejected);
        assert_eq!(
            matcher.classify_submission(&error).user_message(),
            "Transaction rejected in wallet"
        );
    }

    #[test]
    fn test_rejection_by_code() {
        let matcher = RejectionMatcher::default();
        let error = ContractError::with_code(4001, "User rejected the request.");

        assert!(matcher.is_rejection(&error));
    }

    #[test]
    fn test_other_errors_keep_raw_message() {
        let matcher = RejectionMatcher::default();
        let error = ContractError::with_code(-32000, "execution reverted: insufficient allowance");

        let failure = matcher.classify_submission(&error);
        assert_eq!(failure.user_message(), "execution reverted: insufficient allowance");
    }

    #[test]
    fn test_message_match_is_exact() {
        let matcher = RejectionMatcher::default();
        let error = ContractError::new("metamask tx signature: user denied transaction signature");

        assert!(!matcher.is_rejection(&error));
    }
}
