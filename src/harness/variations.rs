//! Variation table model
//!
//! A variation names the preference effects expected from installing
//! the extension configured to it: `setValues` while installed, and a
//! post-removal spec (`resetDefaults` / `resetValues`) after uninstall.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::common::{Error, Result};
use crate::driver::types::PrefValue;

/// The variation table, keyed by variation name
///
/// BTreeMap so iteration order is deterministic; the isolation
/// guarantees make run order irrelevant to outcomes either way.
pub type VariationTable = BTreeMap<String, Variation>;

/// One entry of the variation table
#[derive(Debug, Clone, Deserialize)]
pub struct Variation {
    /// Assignment weight used by the extension's experiment logic;
    /// parsed for completeness, not consulted by the harness
    #[serde(default)]
    pub weight: Option<u32>,
    /// Expected preference effects
    pub prefs: VariationPrefs,
}

/// Declared preference effects of a variation
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariationPrefs {
    /// Preference values expected after install
    #[serde(default)]
    pub set_values: BTreeMap<String, PrefValue>,

    /// Preferences expected back at their default after uninstall
    #[serde(default)]
    pub reset_defaults: Vec<String>,

    /// Preferences expected to retain a specific value after uninstall
    #[serde(default)]
    pub reset_values: BTreeMap<String, PrefValue>,
}

impl VariationPrefs {
    /// Compute the expected preference state after uninstall
    ///
    /// Three-layer override, in precedence order: defaults < setValues
    /// < resetDefaults-clears < resetValues. A pref absent from the
    /// returned map is expected to be at its platform default.
    /// resetValues wins over resetDefaults when a pref is listed in
    /// both; `lint` flags that double listing.
    pub fn expected_after_uninstall(&self) -> BTreeMap<String, PrefValue> {
        let mut expected = self.set_values.clone();
        for pref in &self.reset_defaults {
            expected.remove(pref);
        }
        for (pref, value) in &self.reset_values {
            expected.insert(pref.clone(), value.clone());
        }
        expected
    }

    /// Report configuration errors in this variation's pref spec
    pub fn lint(&self, tracked: &[String]) -> Vec<String> {
        let mut findings = Vec::new();

        for pref in &self.reset_defaults {
            if self.reset_values.contains_key(pref) {
                findings.push(format!(
                    "'{}' listed in both resetDefaults and resetValues; resetValues wins",
                    pref
                ));
            }
        }

        let referenced = self
            .set_values
            .keys()
            .chain(self.reset_values.keys())
            .chain(self.reset_defaults.iter());
        for pref in referenced {
            if !tracked.iter().any(|t| t == pref) {
                findings.push(format!("'{}' is not a tracked preference", pref));
            }
        }

        findings
    }
}

/// Load a variation table from a JSON file
pub fn load_variations(path: &Path) -> Result<VariationTable> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;

    serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse variation table: {}", e)))
}
