//! Driver message types
//!
//! The command set mirrors the operations a browser automation client
//! exposes for extension and preference management: session lifecycle,
//! install/uninstall, and preference read/write/clear/query.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A preference value as the browser stores it
///
/// Browser prefs are bool, integer, or string; anything else in a
/// variations file is a configuration error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrefValue {
    Bool(bool),
    Int(i64),
    String(String),
}

impl fmt::Display for PrefValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrefValue::Bool(b) => write!(f, "{}", b),
            PrefValue::Int(i) => write!(f, "{}", i),
            PrefValue::String(s) => write!(f, "\"{}\"", s),
        }
    }
}

impl From<&str> for PrefValue {
    fn from(s: &str) -> Self {
        PrefValue::String(s.to_string())
    }
}

impl From<bool> for PrefValue {
    fn from(b: bool) -> Self {
        PrefValue::Bool(b)
    }
}

impl From<i64> for PrefValue {
    fn from(i: i64) -> Self {
        PrefValue::Int(i)
    }
}

/// Commands the harness sends to the automation driver
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", content = "arguments", rename_all = "camelCase")]
pub enum Command {
    /// Launch the browser with the given startup preference profile
    StartSession { prefs: BTreeMap<String, PrefValue> },
    /// Terminate the browser session
    StopSession,
    /// Install the extension package; responds with `addonId`
    InstallExtension,
    /// Uninstall a previously installed extension
    #[serde(rename_all = "camelCase")]
    UninstallExtension { addon_id: String },
    /// Read a preference; responds with `value` (null when unset)
    GetPreference { name: String },
    /// Write a user value for a preference
    SetPreference { name: String, value: PrefValue },
    /// Drop the user value for a preference, reverting it to default
    ClearPreference { name: String },
    /// Responds with `hasUserValue`: whether the pref is user-overridden
    HasUserValue { name: String },
}

impl Command {
    /// Wire name of this command, for diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            Command::StartSession { .. } => "startSession",
            Command::StopSession => "stopSession",
            Command::InstallExtension => "installExtension",
            Command::UninstallExtension { .. } => "uninstallExtension",
            Command::GetPreference { .. } => "getPreference",
            Command::SetPreference { .. } => "setPreference",
            Command::ClearPreference { .. } => "clearPreference",
            Command::HasUserValue { .. } => "hasUserValue",
        }
    }
}

/// Request envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub seq: i64,
    #[serde(flatten)]
    pub command: Command,
}

/// Response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub seq: i64,
    pub request_seq: i64,
    pub success: bool,
    #[serde(default)]
    pub body: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pref_value_untagged() {
        assert_eq!(
            serde_json::from_str::<PrefValue>("true").unwrap(),
            PrefValue::Bool(true)
        );
        assert_eq!(
            serde_json::from_str::<PrefValue>("42").unwrap(),
            PrefValue::Int(42)
        );
        assert_eq!(
            serde_json::from_str::<PrefValue>("\"on\"").unwrap(),
            PrefValue::String("on".to_string())
        );
    }

    #[test]
    fn test_command_wire_format() {
        let req = Request {
            seq: 3,
            command: Command::SetPreference {
                name: "pref1".to_string(),
                value: PrefValue::from("on"),
            },
        };
        let json: Value = serde_json::to_value(&req).unwrap();
        assert_eq!(json["seq"], 3);
        assert_eq!(json["command"], "setPreference");
        assert_eq!(json["arguments"]["name"], "pref1");
        assert_eq!(json["arguments"]["value"], "on");
    }

    #[test]
    fn test_uninstall_uses_camel_case() {
        let req = Request {
            seq: 1,
            command: Command::UninstallExtension {
                addon_id: "multipreffer@test".to_string(),
            },
        };
        let json: Value = serde_json::to_value(&req).unwrap();
        assert_eq!(json["arguments"]["addonId"], "multipreffer@test");
    }

    #[test]
    fn test_response_defaults() {
        let resp: Response = serde_json::from_str(
            r#"{"seq": 2, "requestSeq": 1, "success": true}"#,
        )
        .unwrap();
        assert!(resp.success);
        assert!(resp.body.is_null());
        assert!(resp.message.is_none());
    }
}
