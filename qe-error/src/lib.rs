//! Unified error handling for qwiic-exporter
//!
//! A single error type used by the core library and the exporter binary.
//! Index desynchronisation is not an error here: the ingestor reports it as
//! a regular outcome so the read loop can recover on its own.

use std::io;
use std::path::PathBuf;

/// Result type alias using QwiicError
pub type Result<T> = std::result::Result<T, QwiicError>;

/// Unified error type for all qwiic-exporter operations
#[derive(thiserror::Error, Debug)]
pub enum QwiicError {
    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to open serial port {path}: {source}")]
    SerialOpen {
        path: PathBuf,
        source: io::Error,
    },

    #[error("Failed to configure serial port {path}: {reason}")]
    SerialConfigure {
        path: PathBuf,
        reason: String,
    },

    #[error("Failed to write textfile {path}: {source}")]
    TextfileWrite {
        path: PathBuf,
        source: io::Error,
    },

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidConfig {
        field: String,
        reason: String,
    },

    #[error("Missing required configuration: {0}")]
    MissingConfig(String),

    // ============================================================================
    // Sensor Resolution and Ingest Errors
    // ============================================================================
    #[error("Unable to find a matching sensor for header columns {}", .remaining.join(","))]
    UnrecognizedSignature {
        remaining: Vec<String>,
    },

    #[error("Malformed reading {token:?} in data column {column}")]
    MalformedReading {
        column: usize,
        token: String,
    },

    // ============================================================================
    // Metrics Errors
    // ============================================================================
    #[error("Metrics registry error: {0}")]
    Metrics(#[from] prometheus::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Generic(String),
}

impl QwiicError {
    /// Create a generic error from a string
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Generic(msg.into())
    }

    /// Create a config error from a string
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid config error for a named field
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Whether the read loop can keep going after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::UnrecognizedSignature { .. })
    }
}

impl From<String> for QwiicError {
    fn from(s: String) -> Self {
        Self::Generic(s)
    }
}

impl From<&str> for QwiicError {
    fn from(s: &str) -> Self {
        Self::Generic(s.to_string())
    }
}
