//! Common Infrastructure Module
//!
//! This module contains:
//! - Configuration loading from environment variables
//! - Structured logging setup
//! - The relay error taxonomy

pub mod config;
pub mod error;
pub mod logging;

// Re-exports for convenience
pub use config::{ConfigError, Network, RelayConfig, DEFAULT_PROOF_LOOKBACK};
pub use error::{RelayError, Result};
pub use logging::{
    init_from_config, init_logging, log_operation, log_relay_event, ErrorDetails, EventCategory,
    LogEvent, LogLevel, LoggingError,
};
