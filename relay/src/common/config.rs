//! Environment-based Configuration for the SPV Relay
//!
//! # Environment Variables
//!
//! - `RELAY_NETWORK` - "mainnet", "testnet", or "regtest" (default: "regtest").
//!   Selects the proof-of-work limit applied to retargets.
//! - `RELAY_PROOF_LOOKBACK` - How many links behind the last reorg LCA a
//!   confirming header may sit (default: 240)
//! - `RELAY_DB_PATH` - SQLite database file; an in-memory store is used when unset
//! - `RELAY_LOG_LEVEL` - Logging level (trace, debug, info, warn, error)
//! - `RELAY_LOG_JSON` - Set to "1" for JSON log output

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use primitive_types::U256;
use thiserror::Error;

use crate::pow;
use crate::relay::RelayParams;

/// Default lookback bound for confirming headers
pub const DEFAULT_PROOF_LOOKBACK: u32 = 240;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Bitcoin network the relay follows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Network {
    Mainnet,
    Testnet,
    #[default]
    Regtest,
}

impl FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" | "main" | "bitcoin" => Ok(Network::Mainnet),
            "testnet" | "test" => Ok(Network::Testnet),
            "regtest" | "reg" => Ok(Network::Regtest),
            _ => Err(ConfigError::InvalidValue(
                "RELAY_NETWORK".to_string(),
                format!("unknown network: {}", s),
            )),
        }
    }
}

impl Network {
    /// Compact encoding of the easiest target a retarget may produce
    pub fn pow_limit_bits(&self) -> u32 {
        match self {
            Network::Mainnet | Network::Testnet => 0x1d00ffff,
            Network::Regtest => 0x207fffff,
        }
    }

    /// Easiest target a retarget may produce
    pub fn pow_limit(&self) -> U256 {
        pow::target_from_bits(self.pow_limit_bits())
    }
}

/// Main configuration struct
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Network whose retarget limit applies
    pub network: Network,

    /// Lookback bound for confirming headers
    pub proof_lookback: u32,

    /// SQLite database path (None = in-memory)
    pub db_path: Option<PathBuf>,

    /// Log level
    pub log_level: String,

    /// Emit JSON logs
    pub json_logs: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            network: Network::default(),
            proof_lookback: DEFAULT_PROOF_LOOKBACK,
            db_path: None,
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl RelayConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let network: Network = env::var("RELAY_NETWORK")
            .unwrap_or_else(|_| "regtest".to_string())
            .parse()?;

        let proof_lookback = match env::var("RELAY_PROOF_LOOKBACK") {
            Ok(value) => parse_lookback(&value)?,
            Err(_) => DEFAULT_PROOF_LOOKBACK,
        };

        let db_path = env::var("RELAY_DB_PATH")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        let log_level = env::var("RELAY_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let json_logs = env::var("RELAY_LOG_JSON").map(|v| v == "1").unwrap_or(false);

        Ok(Self {
            network,
            proof_lookback,
            db_path,
            log_level,
            json_logs,
        })
    }

    /// Parameters consumed by the relay core
    pub fn params(&self) -> RelayParams {
        RelayParams {
            proof_lookback: self.proof_lookback,
            pow_limit: self.network.pow_limit(),
        }
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("=== SPV Relay Configuration ===");
        println!("Network: {:?}", self.network);
        println!("Proof Lookback: {}", self.proof_lookback);
        match &self.db_path {
            Some(path) => println!("Database: {}", path.display()),
            None => println!("Database: in-memory"),
        }
        println!("Log Level: {}", self.log_level);
        println!("JSON Logs: {}", self.json_logs);
        println!("===============================");
    }
}

fn parse_lookback(value: &str) -> Result<u32, ConfigError> {
    let lookback: u32 = value.trim().parse().map_err(|_| {
        ConfigError::InvalidValue(
            "RELAY_PROOF_LOOKBACK".to_string(),
            "must be a number".to_string(),
        )
    })?;

    if lookback == 0 {
        return Err(ConfigError::InvalidValue(
            "RELAY_PROOF_LOOKBACK".to_string(),
            "must be greater than zero".to_string(),
        ));
    }

    Ok(lookback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_parsing() {
        assert!(matches!("mainnet".parse::<Network>(), Ok(Network::Mainnet)));
        assert!(matches!("TESTNET".parse::<Network>(), Ok(Network::Testnet)));
        assert!(matches!("regtest".parse::<Network>(), Ok(Network::Regtest)));
        assert!("signet".parse::<Network>().is_err());
    }

    #[test]
    fn test_pow_limits() {
        assert!(Network::Regtest.pow_limit() > Network::Mainnet.pow_limit());
        assert_eq!(Network::Mainnet.pow_limit(), Network::Testnet.pow_limit());
        assert_eq!(
            Network::Regtest.pow_limit(),
            U256::from(0x7fffffu32) << 232u32
        );
    }

    #[test]
    fn test_lookback_parsing() {
        assert_eq!(parse_lookback("240").unwrap(), 240);
        assert_eq!(parse_lookback(" 6 ").unwrap(), 6);
        assert!(parse_lookback("0").is_err());
        assert!(parse_lookback("many").is_err());
    }

    #[test]
    fn test_params_follow_config() {
        let config = RelayConfig {
            network: Network::Mainnet,
            proof_lookback: 12,
            ..RelayConfig::default()
        };
        let params = config.params();
        assert_eq!(params.proof_lookback, 12);
        assert_eq!(params.pow_limit, Network::Mainnet.pow_limit());
    }
}
