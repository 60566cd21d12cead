//! Structured Logging for the SPV Relay
//!
//! Provides structured logging with:
//! - JSON output for log aggregation
//! - One record per applied operation, carrying its stable error code
//! - One record per committed relay event
//!
//! # Usage
//!
//! ```no_run
//! use spv_relay::common::logging::{init_logging, LogLevel};
//!
//! init_logging(LogLevel::Info, true).unwrap();
//! tracing::info!(target: "relay::host", "ready");
//! ```

use serde::Serialize;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use super::config::RelayConfig;
use super::error::RelayError;
use crate::types::RelayEvent;

// ============================================================================
// Log Levels
// ============================================================================

/// Application log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl From<&str> for LogLevel {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "trace" => LogLevel::Trace,
            "debug" => LogLevel::Debug,
            "info" => LogLevel::Info,
            "warn" | "warning" => LogLevel::Warn,
            "error" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

// ============================================================================
// Structured Event Types
// ============================================================================

/// Event categories for structured logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// Header ingestion and retargets
    Headers,
    /// Tip changes
    Reorg,
    /// Request registration
    Request,
    /// Proof submission
    Proof,
    /// System events (startup, bootstrap)
    System,
}

impl EventCategory {
    fn target(&self) -> &'static str {
        match self {
            EventCategory::Headers => "relay::headers",
            EventCategory::Reorg => "relay::reorg",
            EventCategory::Request => "relay::requests",
            EventCategory::Proof => "relay::proofs",
            EventCategory::System => "relay::system",
        }
    }
}

/// Structured log event
#[derive(Debug, Serialize)]
pub struct LogEvent {
    /// Event timestamp (RFC 3339)
    pub timestamp: String,
    pub level: String,
    pub category: EventCategory,
    pub message: String,
    /// Authenticated account that submitted the operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_us: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetails>,
}

/// Error details for rejected operations
#[derive(Debug, Serialize)]
pub struct ErrorDetails {
    pub code: u32,
    pub message: String,
    pub fatal: bool,
}

impl LogEvent {
    /// Create a new log event
    pub fn new(level: LogLevel, category: EventCategory, message: impl Into<String>) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            level: format!("{:?}", level).to_uppercase(),
            category,
            message: message.into(),
            signer: None,
            data: None,
            duration_us: None,
            error: None,
        }
    }

    pub fn with_signer(mut self, signer: impl Into<String>) -> Self {
        self.signer = Some(signer.into());
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_duration(mut self, duration_us: u64) -> Self {
        self.duration_us = Some(duration_us);
        self
    }

    pub fn with_error(mut self, err: &RelayError) -> Self {
        self.error = Some(ErrorDetails {
            code: err.code(),
            message: err.to_string(),
            fatal: err.is_fatal(),
        });
        self
    }

    /// Render as a single JSON line
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                "{{\"error\": \"failed to serialize log\", \"message\": \"{}\"}}",
                self.message
            )
        })
    }
}

// ============================================================================
// Relay Event Logging
// ============================================================================

/// Log the outcome of one applied operation
pub fn log_operation(
    operation: &str,
    category: EventCategory,
    signer: &str,
    duration_us: u64,
    outcome: Result<usize, &RelayError>,
) {
    match outcome {
        Ok(events) => {
            let event = LogEvent::new(LogLevel::Info, category, operation)
                .with_signer(signer)
                .with_duration(duration_us)
                .with_data(serde_json::json!({ "success": true, "events": events }));
            tracing::info!(target: "relay::host", "{}", event.to_json());
        }
        Err(err) if err.is_fatal() => {
            let event = LogEvent::new(LogLevel::Error, category, operation)
                .with_signer(signer)
                .with_duration(duration_us)
                .with_error(err);
            tracing::error!(target: "relay::host", "{}", event.to_json());
        }
        Err(err) => {
            let event = LogEvent::new(LogLevel::Warn, category, operation)
                .with_signer(signer)
                .with_duration(duration_us)
                .with_error(err);
            tracing::warn!(target: "relay::host", "{}", event.to_json());
        }
    }
}

/// Log one committed relay event
pub fn log_relay_event(event: &RelayEvent) {
    let category = match event {
        RelayEvent::Extension { .. } => EventCategory::Headers,
        RelayEvent::Reorg { .. } => EventCategory::Reorg,
        RelayEvent::ProofRequest { .. } => EventCategory::Request,
        RelayEvent::ProofProvided { .. } => EventCategory::Proof,
    };

    let attributes: serde_json::Map<String, serde_json::Value> = event
        .attributes()
        .into_iter()
        .map(|(key, value)| (key.to_string(), serde_json::Value::String(value)))
        .collect();

    let log = LogEvent::new(LogLevel::Info, category, event.kind())
        .with_data(serde_json::Value::Object(attributes));

    tracing::info!(target: "relay::events", category = category.target(), "{}", log.to_json());
}

// ============================================================================
// Initialization
// ============================================================================

/// Initialize the logging system
///
/// `RUST_LOG` overrides `level` when set.
pub fn init_logging(level: LogLevel, json_format: bool) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = format!("{:?}", level).to_lowercase();
        EnvFilter::new(format!("relay={},spv_relay={},relay_replay={}", level, level, level))
    });

    if json_format {
        let subscriber = tracing_subscriber::registry().with(filter).with(
            fmt::layer()
                .json()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_span_events(FmtSpan::CLOSE)
                .with_writer(std::io::stderr),
        );

        subscriber
            .try_init()
            .map_err(|e| LoggingError::InitFailed(e.to_string()))?;
    } else {
        let subscriber = tracing_subscriber::registry().with(filter).with(
            fmt::layer()
                .pretty()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_span_events(FmtSpan::CLOSE)
                .with_writer(std::io::stderr),
        );

        subscriber
            .try_init()
            .map_err(|e| LoggingError::InitFailed(e.to_string()))?;
    }

    Ok(())
}

/// Initialize logging from RelayConfig
pub fn init_from_config(config: &RelayConfig) -> Result<(), LoggingError> {
    init_logging(LogLevel::from(config.log_level.as_str()), config.json_logs)
}

/// Logging errors
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("failed to initialize logging: {0}")]
    InitFailed(String),
}
