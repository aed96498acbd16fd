//! Configuration file handling

use serde::Deserialize;
use std::path::PathBuf;

use super::paths::config_path;
use super::{Error, Result};

/// Default name of the automation driver executable
pub const DEFAULT_DRIVER_NAME: &str = "prefharness-driver";

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct HarnessConfig {
    /// Automation driver settings
    #[serde(default)]
    pub driver: DriverConfig,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,

    /// Tracked preference settings
    #[serde(default)]
    pub prefs: PrefsConfig,
}

/// Configuration for the automation driver subprocess
#[derive(Debug, Deserialize, Default, Clone)]
pub struct DriverConfig {
    /// Path to the driver executable (resolved via PATH if unset)
    pub path: Option<PathBuf>,

    /// Additional arguments to pass to the driver
    #[serde(default)]
    pub args: Vec<String>,
}

/// Timeout settings
#[derive(Debug, Deserialize, Clone)]
pub struct Timeouts {
    /// Deadline for the browser session to come up
    #[serde(default = "default_startup")]
    pub startup_secs: u64,

    /// Timeout for individual driver requests
    #[serde(default = "default_request")]
    pub request_secs: u64,

    /// Settle delay after installing the extension, the assumed upper
    /// bound on its asynchronous preference writes
    #[serde(default = "default_settle")]
    pub settle_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            startup_secs: default_startup(),
            request_secs: default_request(),
            settle_ms: default_settle(),
        }
    }
}

fn default_startup() -> u64 {
    15
}
fn default_request() -> u64 {
    30
}
fn default_settle() -> u64 {
    500
}

/// Tracked preference configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PrefsConfig {
    /// The closed set of preference names the harness asserts over.
    /// A tracked pref not named by the active variation must be at its
    /// platform default.
    #[serde(default = "default_tracked")]
    pub tracked: Vec<String>,
}

impl Default for PrefsConfig {
    fn default() -> Self {
        Self {
            tracked: default_tracked(),
        }
    }
}

fn default_tracked() -> Vec<String> {
    vec![
        "pref1".to_string(),
        "pref2".to_string(),
        "pref3".to_string(),
    ]
}

impl HarnessConfig {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                let content =
                    std::fs::read_to_string(&path).map_err(|e| Error::FileRead {
                        path: path.display().to_string(),
                        error: e.to_string(),
                    })?;
                return toml::from_str(&content)
                    .map_err(|e| Error::ConfigParse(e.to_string()));
            }
        }
        Ok(Self::default())
    }

    /// Resolve the driver executable path
    ///
    /// Falls back to searching PATH if not explicitly configured
    pub fn resolve_driver(&self) -> Result<PathBuf> {
        if let Some(path) = &self.driver.path {
            return Ok(path.clone());
        }
        which::which(DEFAULT_DRIVER_NAME)
            .map_err(|_| Error::DriverNotFound(DEFAULT_DRIVER_NAME.to_string()))
    }
}
