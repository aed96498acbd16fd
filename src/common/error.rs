//! Error types for the preference harness
//!
//! The taxonomy distinguishes fatal startup failures, per-variation
//! assertion failures, and automation driver failures; only startup
//! failures abort the whole run.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the preference harness
#[derive(Error, Debug)]
pub enum Error {
    // === Startup Errors ===
    #[error("Browser session failed to start within {0} seconds")]
    StartupTimeout(u64),

    #[error("Automation driver not found. Configure [driver] path or put '{0}' on PATH")]
    DriverNotFound(String),

    #[error("Failed to start automation driver: {0}")]
    DriverStartFailed(String),

    // === Driver Errors ===
    #[error("Automation driver exited unexpectedly")]
    DriverCrashed,

    #[error("Driver protocol error: {0}")]
    Protocol(String),

    #[error("Driver request '{command}' failed: {message}")]
    RequestFailed { command: String, message: String },

    #[error("Driver request timed out after {0} seconds")]
    Timeout(u64),

    // === Assertion Errors ===
    #[error("Variation '{variation}', pref '{pref}': {detail}")]
    Assertion {
        variation: String,
        pref: String,
        detail: String,
    },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a driver request failed error
    pub fn request_failed(command: &str, message: &str) -> Self {
        Self::RequestFailed {
            command: command.to_string(),
            message: message.to_string(),
        }
    }

    /// Create an assertion failure naming the variation and preference
    pub fn assertion(variation: &str, pref: &str, detail: impl Into<String>) -> Self {
        Self::Assertion {
            variation: variation.to_string(),
            pref: pref.to_string(),
            detail: detail.into(),
        }
    }

    /// Whether this error is a preference assertion failure, as opposed
    /// to an automation or harness fault
    pub fn is_assertion(&self) -> bool {
        matches!(self, Self::Assertion { .. })
    }
}
