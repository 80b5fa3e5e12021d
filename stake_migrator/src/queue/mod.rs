//! Queue driving a migration step across a position list
//!
//! Two policies: fire-and-continue for wallets that queue overlapping
//! signature prompts, and serialized with a pause between positions for
//! everything else.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::contracts::WalletCapabilities;
use crate::environment_config::MigratorConfig;

pub mod driver;

pub use driver::{QueueDriver, RunPhase, RunReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum QueuePolicy {
    /// Start every position without waiting for the previous submission
    FireAndContinue,
    /// Wait for each submission to settle, then pause `delay` before the next
    Serialized {
        #[serde(with = "humantime_serde")]
        delay: Duration,
    },
}

impl QueuePolicy {
    /// Fire-and-continue only for a desktop wallet known to queue prompts
    pub fn for_wallet(capabilities: WalletCapabilities, delay: Duration) -> Self {
        if capabilities.supports_parallel_signing && !capabilities.is_mobile {
            QueuePolicy::FireAndContinue
        } else {
            QueuePolicy::Serialized { delay }
        }
    }

    pub fn from_config(config: &MigratorConfig) -> Self {
        Self::for_wallet(config.wallet.capabilities(), config.queue.serial_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(2000);

    fn caps(supports_parallel_signing: bool, is_mobile: bool) -> WalletCapabilities {
        WalletCapabilities {
            supports_parallel_signing,
            is_mobile,
        }
    }

    #[test]
    fn test_policy_selection() {
        assert_eq!(QueuePolicy::for_wallet(caps(true, false), DELAY), QueuePolicy::FireAndContinue);
        assert_eq!(
            QueuePolicy::for_wallet(caps(true, true), DELAY),
            QueuePolicy::Serialized { delay: DELAY }
        );
        assert_eq!(
            QueuePolicy::for_wallet(caps(false, false), DELAY),
            QueuePolicy::Serialized { delay: DELAY }
        );
        assert_eq!(
            QueuePolicy::for_wallet(caps(false, true), DELAY),
            QueuePolicy::Serialized { delay: DELAY }
        );
    }

    #[test]
    fn test_default_config_is_serialized() {
        let policy = QueuePolicy::from_config(&MigratorConfig::default());
        assert_eq!(policy, QueuePolicy::Serialized { delay: DELAY });
    }
}
