//! Migrator configuration
//!
//! Defaults, then an optional TOML file, then `MIGRATOR_*` environment
//! overrides, then validation.

use std::{env, fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::contracts::WalletCapabilities;
use crate::typed_errors::RejectionMatcher;
use crate::units::DEFAULT_DECIMALS;

const ENV_PREFIX: &str = "MIGRATOR_";

/// BNB Smart Chain
const DEFAULT_CHAIN_ID: u64 = 56;

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("Configuration file error: {0}")]
    FileError(String),

    #[error("Environment variable error: {0}")]
    EnvError(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigratorConfig {
    pub chain_id: u64,
    /// Route positions into vaults when a matching active vault exists
    pub prefer_vaults: bool,
    pub token_decimals: u32,
    pub gas: GasConfig,
    pub queue: QueueSettings,
    pub wallet: WalletConfig,
    pub zap: ZapConfig,
    pub log_level: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GasConfig {
    /// Extra gas on top of the estimate, in basis points
    pub margin_bps: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    /// Pause between positions when signatures must happen one at a time
    #[serde(with = "humantime_serde")]
    pub serial_delay: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZapConfig {
    /// Allowed slippage on each leg of a zap migration, in basis points
    pub slippage_bps: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    pub rejection_codes: Vec<i64>,
    pub rejection_messages: Vec<String>,
    pub supports_parallel_signing: bool,
    pub is_mobile: bool,
}

impl Default for MigratorConfig {
    fn default() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID,
            prefer_vaults: false,
            token_decimals: DEFAULT_DECIMALS,
            gas: GasConfig::default(),
            queue: QueueSettings::default(),
            wallet: WalletConfig::default(),
            zap: ZapConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for GasConfig {
    fn default() -> Self {
        Self { margin_bps: 1000 }
    }
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            serial_delay: Duration::from_millis(2000),
        }
    }
}

impl Default for ZapConfig {
    fn default() -> Self {
        Self { slippage_bps: 50 }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            rejection_codes: vec![4001],
            rejection_messages: vec!["MetaMask Tx Signature: User denied transaction signature.".to_string()],
            supports_parallel_signing: false,
            is_mobile: false,
        }
    }
}

impl WalletConfig {
    pub fn rejection_matcher(&self) -> RejectionMatcher {
        RejectionMatcher::new(self.rejection_codes.clone(), self.rejection_messages.clone())
    }

    pub fn capabilities(&self) -> WalletCapabilities {
        WalletCapabilities {
            supports_parallel_signing: self.supports_parallel_signing,
            is_mobile: self.is_mobile,
        }
    }
}

impl MigratorConfig {
    /// Loads defaults, the optional TOML file and environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        config.apply_env_overrides()?;
        config.validate()?;

        info!(
            chain_id = config.chain_id,
            prefer_vaults = config.prefer_vaults,
            margin_bps = config.gas.margin_bps,
            serial_delay_ms = config.queue.serial_delay.as_millis() as u64,
            "Migrator configuration loaded"
        );

        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::FileError(format!("Failed to read {}: {}", path.display(), e)))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::FileError(format!("Failed to parse {}: {}", path.display(), e)))
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(chain_id) = env_parse::<u64>("CHAIN_ID")? {
            self.chain_id = chain_id;
        }
        if let Some(prefer_vaults) = env_parse::<bool>("PREFER_VAULTS")? {
            self.prefer_vaults = prefer_vaults;
        }
        if let Some(decimals) = env_parse::<u32>("TOKEN_DECIMALS")? {
            self.token_decimals = decimals;
        }
        if let Some(margin) = env_parse::<u64>("GAS_MARGIN_BPS")? {
            self.gas.margin_bps = margin;
        }
        if let Some(delay_ms) = env_parse::<u64>("SERIAL_DELAY_MS")? {
            self.queue.serial_delay = Duration::from_millis(delay_ms);
        }
        if let Some(parallel) = env_parse::<bool>("PARALLEL_SIGNING")? {
            self.wallet.supports_parallel_signing = parallel;
        }
        if let Some(mobile) = env_parse::<bool>("MOBILE")? {
            self.wallet.is_mobile = mobile;
        }
        if let Some(slippage) = env_parse::<u64>("SLIPPAGE_BPS")? {
            self.zap.slippage_bps = slippage;
        }
        if let Ok(level) = env::var(format!("{}LOG_LEVEL", ENV_PREFIX)) {
            self.log_level = level;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chain_id == 0 {
            return Err(ConfigError::InvalidValue("chain_id must be positive".to_string()));
        }
        if self.token_decimals > 77 {
            return Err(ConfigError::InvalidValue(format!(
                "token_decimals {} exceeds 77",
                self.token_decimals
            )));
        }
        if self.gas.margin_bps > 10_000 {
            return Err(ConfigError::InvalidValue(format!(
                "gas.margin_bps {} exceeds 10000",
                self.gas.margin_bps
            )));
        }
        if self.zap.slippage_bps > 10_000 {
            return Err(ConfigError::InvalidValue(format!(
                "zap.slippage_bps {} exceeds 10000",
                self.zap.slippage_bps
            )));
        }
        Ok(())
    }
}

fn env_parse<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let name = format!("{}{}", ENV_PREFIX, key);
    match env::var(&name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::EnvError(format!("{}={}: {}", name, raw, e))),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(ConfigError::EnvError(format!("{}: {}", name, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    struct EnvRestore {
        backups: Vec<(String, Option<String>)>,
    }

    impl EnvRestore {
        fn set(vars: &[(&str, Option<&str>)]) -> Self {
            let backups = vars
                .iter()
                .map(|(key, _)| (key.to_string(), env::var(key).ok()))
                .collect();

            for (key, value) in vars {
                match value {
                    Some(value) => env::set_var(key, value),
                    None => env::remove_var(key),
                }
            }

            Self { backups }
        }
    }

    impl Drop for EnvRestore {
        fn drop(&mut self) {
            for (key, value) in self.backups.drain(..) {
                match value {
                    Some(value) => env::set_var(key, value),
                    None => env::remove_var(key),
                }
            }
        }
    }

    #[test]
    fn test_defaults() {
        let config = MigratorConfig::default();

        assert_eq!(config.chain_id, 56);
        assert_eq!(config.token_decimals, 18);
        assert_eq!(config.gas.margin_bps, 1000);
        assert_eq!(config.queue.serial_delay, Duration::from_secs(2));
        assert_eq!(config.zap.slippage_bps, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
prefer_vaults = true

[queue]
serial_delay = "500ms"

[wallet]
rejection_messages = ["User rejected the request."]
"#
        )
        .unwrap();

        let config = MigratorConfig::from_file(file.path()).unwrap();
        assert!(config.prefer_vaults);
        assert_eq!(config.queue.serial_delay, Duration::from_millis(500));
        assert_eq!(config.wallet.rejection_messages, vec!["User rejected the request."]);
        assert_eq!(config.wallet.rejection_codes, vec![4001]);
        assert_eq!(config.gas.margin_bps, 1000);
    }

    #[test]
    fn test_env_overrides() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _restore = EnvRestore::set(&[
            ("MIGRATOR_CHAIN_ID", Some("97")),
            ("MIGRATOR_GAS_MARGIN_BPS", Some("2500")),
            ("MIGRATOR_SERIAL_DELAY_MS", Some("100")),
            ("MIGRATOR_PARALLEL_SIGNING", Some("true")),
            ("MIGRATOR_SLIPPAGE_BPS", Some("80")),
        ]);

        let config = MigratorConfig::load(None).unwrap();
        assert_eq!(config.chain_id, 97);
        assert_eq!(config.gas.margin_bps, 2500);
        assert_eq!(config.queue.serial_delay, Duration::from_millis(100));
        assert!(config.wallet.capabilities().supports_parallel_signing);
        assert_eq!(config.zap.slippage_bps, 80);
    }

    #[test]
    fn test_bad_env_value() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _restore = EnvRestore::set(&[("MIGRATOR_GAS_MARGIN_BPS", Some("lots"))]);

        assert!(matches!(MigratorConfig::load(None), Err(ConfigError::EnvError(_))));
    }

    #[test]
    fn test_validation() {
        let mut config = MigratorConfig::default();
        config.gas.margin_bps = 20_000;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));

        let mut config = MigratorConfig::default();
        config.token_decimals = 80;
        assert!(config.validate().is_err());

        let mut config = MigratorConfig::default();
        config.zap.slippage_bps = 10_001;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));
    }
}
