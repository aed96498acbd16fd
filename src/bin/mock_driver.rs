//! Mock automation driver binary for integration testing
//!
//! Implements the driver protocol over stdin/stdout and simulates a
//! browser plus the extension-under-test: installing applies the
//! selected variation's setValues, uninstalling applies its reset
//! spec. Takes the variations file as its only argument so the mock
//! and the harness read the same table.

use serde_json::{json, Value};
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};

const SELECTOR_PREF: &str = "extensions.multipreffer.test.variationName";

fn main() {
    let mut variations_path = None;
    let mut hang_startup = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--hang-startup" => hang_startup = true,
            _ => variations_path = Some(arg),
        }
    }
    let variations_path = variations_path.unwrap_or_else(|| {
        eprintln!("usage: mock_driver <variations.json> [--hang-startup]");
        std::process::exit(2);
    });

    let variations: Value = match std::fs::read_to_string(&variations_path)
        .map_err(|e| e.to_string())
        .and_then(|s| serde_json::from_str(&s).map_err(|e| e.to_string()))
    {
        Ok(v) => v,
        Err(e) => {
            eprintln!("mock_driver: cannot load '{}': {}", variations_path, e);
            std::process::exit(2);
        }
    };

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut reader = BufReader::new(stdin.lock());
    let mut writer = stdout.lock();

    let mut state = MockState::new(variations, hang_startup);

    loop {
        // Read Content-Length header
        let mut header_line = String::new();
        if reader.read_line(&mut header_line).unwrap_or(0) == 0 {
            break; // EOF
        }

        if !header_line.starts_with("Content-Length:") {
            continue;
        }

        let content_length: usize = header_line
            .trim_start_matches("Content-Length:")
            .trim()
            .parse()
            .unwrap_or(0);

        // Read empty line
        let mut empty_line = String::new();
        reader.read_line(&mut empty_line).ok();

        // Read JSON body
        let mut body = vec![0u8; content_length];
        if reader.read_exact(&mut body).is_err() {
            break;
        }

        let message: Value = match serde_json::from_slice(&body) {
            Ok(v) => v,
            Err(_) => continue,
        };

        if let Some(response) = state.process_message(&message) {
            send_message(&mut writer, &response);
        }
    }
}

fn send_message<W: Write>(writer: &mut W, message: &Value) {
    let body = serde_json::to_string(message).unwrap();
    let header = format!("Content-Length: {}\r\n\r\n", body.len());
    writer.write_all(header.as_bytes()).ok();
    writer.write_all(body.as_bytes()).ok();
    writer.flush().ok();
}

struct MockState {
    seq: i64,
    /// Declared variation table, same file the harness reads
    variations: Value,
    /// Profile prefs from startSession; kept apart from user values
    profile: HashMap<String, Value>,
    /// User-set preference values; absence means platform default
    prefs: HashMap<String, Value>,
    session_started: bool,
    installed: Option<String>,
    install_count: u32,
    /// Never answer startSession, simulating a browser that hangs
    /// while coming up
    hang_startup: bool,
}

impl MockState {
    fn new(variations: Value, hang_startup: bool) -> Self {
        Self {
            seq: 0,
            variations,
            profile: HashMap::new(),
            prefs: HashMap::new(),
            session_started: false,
            installed: None,
            install_count: 0,
            hang_startup,
        }
    }

    fn next_seq(&mut self) -> i64 {
        self.seq += 1;
        self.seq
    }

    /// The prefs spec of the variation the selector currently names
    fn selected_prefs(&self) -> Option<&Value> {
        let name = self.prefs.get(SELECTOR_PREF)?.as_str()?;
        self.variations.get(name)?.get("prefs")
    }

    fn process_message(&mut self, message: &Value) -> Option<Value> {
        let command = message.get("command")?.as_str()?;
        let request_seq = message.get("seq")?.as_i64()?;
        let arguments = message.get("arguments").cloned().unwrap_or(json!({}));

        if self.hang_startup && command == "startSession" {
            return None;
        }

        let (success, body, error) = if !self.session_started && command != "startSession" {
            (false, json!(null), Some("no session".to_string()))
        } else {
            self.handle_command(command, &arguments)
        };

        let seq = self.next_seq();
        let mut response = json!({
            "seq": seq,
            "requestSeq": request_seq,
            "success": success,
            "body": body
        });
        if let Some(text) = error {
            response["message"] = json!(text);
        }
        Some(response)
    }

    fn handle_command(
        &mut self,
        command: &str,
        arguments: &Value,
    ) -> (bool, Value, Option<String>) {
        match command {
            "startSession" => {
                if let Some(prefs) = arguments.get("prefs").and_then(|p| p.as_object()) {
                    for (name, value) in prefs {
                        self.profile.insert(name.clone(), value.clone());
                    }
                }
                self.session_started = true;
                (true, json!(null), None)
            }
            "stopSession" => {
                self.session_started = false;
                (true, json!(null), None)
            }
            "installExtension" => {
                if self.installed.is_some() {
                    return (false, json!(null), Some("extension already installed".into()));
                }
                if let Some(spec) = self.selected_prefs() {
                    let set_values = spec
                        .get("setValues")
                        .and_then(|v| v.as_object())
                        .cloned()
                        .unwrap_or_default();
                    for (name, value) in set_values {
                        self.prefs.insert(name, value);
                    }
                }
                self.install_count += 1;
                let addon_id = format!("multipreffer@test.{}", self.install_count);
                self.installed = Some(addon_id.clone());
                (true, json!({ "addonId": addon_id }), None)
            }
            "uninstallExtension" => {
                let addon_id = arguments.get("addonId").and_then(|a| a.as_str());
                if addon_id != self.installed.as_deref() {
                    return (false, json!(null), Some("unknown addon id".into()));
                }
                if let Some(spec) = self.selected_prefs().cloned() {
                    let reset_defaults = spec
                        .get("resetDefaults")
                        .and_then(|v| v.as_array())
                        .cloned()
                        .unwrap_or_default();
                    for pref in reset_defaults {
                        if let Some(name) = pref.as_str() {
                            self.prefs.remove(name);
                        }
                    }
                    let reset_values = spec
                        .get("resetValues")
                        .and_then(|v| v.as_object())
                        .cloned()
                        .unwrap_or_default();
                    for (name, value) in reset_values {
                        self.prefs.insert(name, value);
                    }
                }
                self.installed = None;
                (true, json!(null), None)
            }
            "getPreference" => {
                let name = arguments.get("name").and_then(|n| n.as_str()).unwrap_or("");
                // User value wins; profile prefs read back like
                // defaults and never count as user-set
                let value = self
                    .prefs
                    .get(name)
                    .or_else(|| self.profile.get(name))
                    .cloned()
                    .unwrap_or(Value::Null);
                (true, json!({ "value": value }), None)
            }
            "setPreference" => {
                let name = arguments.get("name").and_then(|n| n.as_str()).unwrap_or("");
                let value = arguments.get("value").cloned().unwrap_or(Value::Null);
                self.prefs.insert(name.to_string(), value);
                (true, json!(null), None)
            }
            "clearPreference" => {
                let name = arguments.get("name").and_then(|n| n.as_str()).unwrap_or("");
                self.prefs.remove(name);
                (true, json!(null), None)
            }
            "hasUserValue" => {
                let name = arguments.get("name").and_then(|n| n.as_str()).unwrap_or("");
                (
                    true,
                    json!({ "hasUserValue": self.prefs.contains_key(name) }),
                    None,
                )
            }
            _ => (
                false,
                json!(null),
                Some(format!("Unknown command: {}", command)),
            ),
        }
    }
}
