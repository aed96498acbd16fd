//! Scenario runner
//!
//! Runs every variation through the same strictly linear pipeline:
//! selector-set, install, settle, assert, uninstall, assert,
//! selector-clear. Variations run sequentially because they share one
//! mutable browser session; a failing variation never aborts its
//! siblings.

use std::collections::BTreeMap;

use colored::Colorize;

use crate::common::{Error, Result};
use crate::driver::types::PrefValue;

use super::session::{ExtensionHost, PreferenceStore};
use super::variations::{VariationPrefs, VariationTable};

/// Preference the extension reads to pick which variation to apply.
/// Cleared after every variation so scenario order cannot affect
/// outcomes.
pub const SELECTOR_PREF: &str = "extensions.multipreffer.test.variationName";

/// Result of one variation's two assertion phases
#[derive(Debug)]
pub struct VariationOutcome {
    pub name: String,
    /// Failure of the after-install check, if any
    pub install_error: Option<String>,
    /// Failure of the after-uninstall check, if any
    pub uninstall_error: Option<String>,
}

impl VariationOutcome {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            install_error: None,
            uninstall_error: None,
        }
    }

    pub fn passed(&self) -> bool {
        self.install_error.is_none() && self.uninstall_error.is_none()
    }
}

/// Aggregated result of a full run
#[derive(Debug, Default)]
pub struct RunReport {
    pub outcomes: Vec<VariationOutcome>,
}

impl RunReport {
    pub fn passed(&self) -> bool {
        self.outcomes.iter().all(VariationOutcome::passed)
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.passed()).count()
    }
}

/// Check every tracked preference against an expected state
///
/// A pref present in `expected` must hold exactly that value; a pref
/// absent from it must have no user-set override. Read-only, so
/// repeating the check without intervening mutation gives the same
/// result.
pub async fn check_prefs<S: PreferenceStore + ?Sized>(
    store: &mut S,
    variation: &str,
    expected: &BTreeMap<String, PrefValue>,
    tracked: &[String],
) -> Result<()> {
    for pref in tracked {
        match expected.get(pref) {
            Some(want) => match store.get_preference(pref).await? {
                Some(ref got) if got == want => {}
                Some(got) => {
                    return Err(Error::assertion(
                        variation,
                        pref,
                        format!("expected {}, observed {}", want, got),
                    ));
                }
                None => {
                    return Err(Error::assertion(
                        variation,
                        pref,
                        format!("expected {}, observed default", want),
                    ));
                }
            },
            None => {
                if store.has_user_value(pref).await? {
                    return Err(Error::assertion(
                        variation,
                        pref,
                        "expected default, found a user-set value",
                    ));
                }
            }
        }
    }
    Ok(())
}

/// Run one variation's install/verify/uninstall/verify cycle
///
/// The selector preference is cleared on the way out regardless of how
/// the phases went. Assertion A still being wrong does not skip the
/// uninstall phase; only a failed install does.
pub async fn run_variation<H: ExtensionHost + ?Sized>(
    host: &mut H,
    name: &str,
    prefs: &VariationPrefs,
    tracked: &[String],
) -> VariationOutcome {
    let mut outcome = VariationOutcome::new(name);

    // The extension must observe the selector before install completes
    if let Err(e) = host
        .set_preference(SELECTOR_PREF, PrefValue::from(name))
        .await
    {
        outcome.install_error = Some(record_failure("set selector", &e));
        outcome.uninstall_error = Some("skipped: selector was never set".to_string());
        return outcome;
    }

    let handle = match host.install_extension().await {
        Ok(handle) => Some(handle),
        Err(e) => {
            outcome.install_error = Some(record_failure("install", &e));
            None
        }
    };

    if handle.is_some() {
        host.settle().await;

        // Assertion A: state after install
        if let Err(e) = check_prefs(host, name, &prefs.set_values, tracked).await {
            outcome.install_error = Some(record_failure("after install", &e));
        }
    }

    match handle {
        Some(handle) => match host.uninstall_extension(handle).await {
            Ok(()) => {
                // Assertion B: state after uninstall
                let expected = prefs.expected_after_uninstall();
                if let Err(e) = check_prefs(host, name, &expected, tracked).await {
                    outcome.uninstall_error = Some(record_failure("after uninstall", &e));
                }
            }
            Err(e) => {
                outcome.uninstall_error = Some(record_failure("uninstall", &e));
            }
        },
        None => {
            outcome.uninstall_error =
                Some("skipped: extension was never installed".to_string());
        }
    }

    // Isolation: the selector must not leak into the next variation
    if let Err(e) = host.clear_preference(SELECTOR_PREF).await {
        let msg = record_failure("clear selector", &e);
        if outcome.uninstall_error.is_none() {
            outcome.uninstall_error = Some(msg);
        }
    }

    outcome
}

/// Record a phase failure, routing automation faults (anything that is
/// not a preference assertion) to the diagnostic stream as well
fn record_failure(phase: &str, error: &Error) -> String {
    if !error.is_assertion() {
        tracing::error!("automation failure during {}: {}", phase, error);
    }
    format!("{}: {}", phase, error)
}

/// Drives a full run over a variation table
pub struct ScenarioRunner {
    tracked: Vec<String>,
}

impl ScenarioRunner {
    pub fn new(tracked: Vec<String>) -> Self {
        Self { tracked }
    }

    /// Run every variation in the table, sequentially
    pub async fn run_all<H: ExtensionHost + ?Sized>(
        &self,
        host: &mut H,
        table: &VariationTable,
    ) -> RunReport {
        let mut report = RunReport::default();

        println!(
            "\n{} {} variation(s)",
            "Running".blue().bold(),
            table.len()
        );

        for (name, variation) in table {
            println!("\n{} {}", "Variation:".cyan(), name.white().bold());

            let outcome = run_variation(host, name, &variation.prefs, &self.tracked).await;
            print_phase("after install", &outcome.install_error);
            print_phase("after uninstall", &outcome.uninstall_error);
            report.outcomes.push(outcome);
        }

        if report.passed() {
            println!("\n{} {}\n", "✓".green().bold(), "All variations passed".green().bold());
        } else {
            println!(
                "\n{} {} of {} variation(s) failed\n",
                "✗".red().bold(),
                report.failed_count(),
                report.outcomes.len()
            );
        }

        report
    }
}

fn print_phase(phase: &str, error: &Option<String>) {
    match error {
        None => println!("  {} {}", "✓".green(), phase.dimmed()),
        Some(e) => println!("  {} {}: {}", "✗".red(), phase, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::session::ExtensionHandle;
    use crate::harness::variations::Variation;
    use async_trait::async_trait;

    /// In-memory host emulating the extension-under-test: install
    /// applies the selected variation's setValues, uninstall applies
    /// the reset spec.
    struct FakeHost {
        prefs: BTreeMap<String, PrefValue>,
        table: VariationTable,
        installs: u32,
    }

    impl FakeHost {
        fn new(table: VariationTable) -> Self {
            Self {
                prefs: BTreeMap::new(),
                table,
                installs: 0,
            }
        }

        fn active_variation(&self) -> Option<&Variation> {
            let name = match self.prefs.get(SELECTOR_PREF)? {
                PrefValue::String(s) => s.clone(),
                _ => return None,
            };
            self.table.get(&name)
        }
    }

    #[async_trait]
    impl PreferenceStore for FakeHost {
        async fn get_preference(&mut self, name: &str) -> Result<Option<PrefValue>> {
            Ok(self.prefs.get(name).cloned())
        }

        async fn set_preference(&mut self, name: &str, value: PrefValue) -> Result<()> {
            self.prefs.insert(name.to_string(), value);
            Ok(())
        }

        async fn clear_preference(&mut self, name: &str) -> Result<()> {
            self.prefs.remove(name);
            Ok(())
        }

        async fn has_user_value(&mut self, name: &str) -> Result<bool> {
            Ok(self.prefs.contains_key(name))
        }
    }

    #[async_trait]
    impl ExtensionHost for FakeHost {
        async fn install_extension(&mut self) -> Result<ExtensionHandle> {
            self.installs += 1;
            if let Some(variation) = self.active_variation() {
                let to_apply = variation.prefs.set_values.clone();
                self.prefs.extend(to_apply);
            }
            Ok(ExtensionHandle(format!("fake-addon-{}", self.installs)))
        }

        async fn uninstall_extension(&mut self, _handle: ExtensionHandle) -> Result<()> {
            if let Some(variation) = self.active_variation() {
                let spec = variation.prefs.clone();
                for pref in &spec.reset_defaults {
                    self.prefs.remove(pref);
                }
                for (pref, value) in &spec.reset_values {
                    self.prefs.insert(pref.clone(), value.clone());
                }
            }
            Ok(())
        }

        async fn settle(&mut self) {}
    }

    fn tracked() -> Vec<String> {
        vec!["pref1".into(), "pref2".into(), "pref3".into()]
    }

    fn table(json: &str) -> VariationTable {
        serde_json::from_str(json).unwrap()
    }

    #[tokio::test]
    async fn test_control_variation_passes() {
        let table = table(
            r#"{"control": {"prefs": {
                "setValues": {"pref1": "on"},
                "resetDefaults": ["pref1"]
            }}}"#,
        );
        let mut host = FakeHost::new(table.clone());

        let outcome =
            run_variation(&mut host, "control", &table["control"].prefs, &tracked()).await;
        assert!(outcome.passed(), "{:?}", outcome);
    }

    #[tokio::test]
    async fn test_retain_variation_keeps_reset_value() {
        let table = table(
            r#"{"retain": {"prefs": {
                "setValues": {"pref2": "v2"},
                "resetValues": {"pref2": "v2-kept"}
            }}}"#,
        );
        let mut host = FakeHost::new(table.clone());

        let outcome =
            run_variation(&mut host, "retain", &table["retain"].prefs, &tracked()).await;
        assert!(outcome.passed(), "{:?}", outcome);
        assert_eq!(host.prefs.get("pref2"), Some(&PrefValue::from("v2-kept")));
    }

    #[tokio::test]
    async fn test_mismatch_names_the_pref() {
        // The expectation table disagrees with what the (fake)
        // extension actually applies
        let applied = table(
            r#"{"control": {"prefs": {"setValues": {"pref1": "actually-off"}}}}"#,
        );
        let claimed = table(
            r#"{"control": {"prefs": {"setValues": {"pref1": "on"}}}}"#,
        );
        let mut host = FakeHost::new(applied);

        let outcome =
            run_variation(&mut host, "control", &claimed["control"].prefs, &tracked()).await;
        assert!(!outcome.passed());
        let error = outcome.install_error.unwrap();
        assert!(error.contains("pref1"), "{}", error);
        assert!(error.contains("control"), "{}", error);
    }

    #[tokio::test]
    async fn test_unexpected_user_value_fails_default_check() {
        let table = table(r#"{"control": {"prefs": {"setValues": {"pref1": "on"}}}}"#);
        let mut host = FakeHost::new(table.clone());
        // A stray override on a pref the variation never touches
        host.prefs
            .insert("pref3".to_string(), PrefValue::from("stray"));

        let outcome =
            run_variation(&mut host, "control", &table["control"].prefs, &tracked()).await;
        assert!(!outcome.passed());
        assert!(outcome.install_error.unwrap().contains("pref3"));
    }

    #[tokio::test]
    async fn test_selector_cleared_after_variation() {
        let table = table(r#"{"control": {"prefs": {"setValues": {"pref1": "on"}, "resetDefaults": ["pref1"]}}}"#);
        let mut host = FakeHost::new(table.clone());

        let _ = run_variation(&mut host, "control", &table["control"].prefs, &tracked()).await;
        assert!(!host.prefs.contains_key(SELECTOR_PREF));
    }

    #[tokio::test]
    async fn test_check_prefs_is_idempotent() {
        let mut host = FakeHost::new(BTreeMap::new());
        host.prefs.insert("pref1".to_string(), PrefValue::from("on"));
        let mut expected = BTreeMap::new();
        expected.insert("pref1".to_string(), PrefValue::from("on"));

        let first = check_prefs(&mut host, "v", &expected, &tracked()).await;
        let second = check_prefs(&mut host, "v", &expected, &tracked()).await;
        assert!(first.is_ok());
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn test_run_all_continues_past_failures() {
        // "bad" claims a value the fake never applies; "good" is
        // consistent. Both must be reported.
        let applied = table(
            r#"{
                "bad": {"prefs": {"setValues": {"pref1": "real"}, "resetDefaults": ["pref1"]}},
                "good": {"prefs": {"setValues": {"pref2": "v"}, "resetDefaults": ["pref2"]}}
            }"#,
        );
        let mut claimed = applied.clone();
        claimed.get_mut("bad").unwrap().prefs.set_values.insert(
            "pref1".to_string(),
            PrefValue::from("claimed"),
        );

        let mut host = FakeHost::new(applied);
        let runner = ScenarioRunner::new(tracked());
        let report = runner.run_all(&mut host, &claimed).await;

        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.failed_count(), 1);
        assert!(!report.outcomes[0].passed()); // "bad" sorts first
        assert!(report.outcomes[1].passed());
    }

    #[tokio::test]
    async fn test_order_independence() {
        let table = table(
            r#"{
                "alpha": {"prefs": {"setValues": {"pref1": "a"}, "resetDefaults": ["pref1"]}},
                "beta": {"prefs": {"setValues": {"pref2": "b"}, "resetDefaults": ["pref2"]}}
            }"#,
        );

        let mut host = FakeHost::new(table.clone());
        let forward = [
            run_variation(&mut host, "alpha", &table["alpha"].prefs, &tracked())
                .await
                .passed(),
            run_variation(&mut host, "beta", &table["beta"].prefs, &tracked())
                .await
                .passed(),
        ];

        let mut host = FakeHost::new(table.clone());
        let reverse = [
            run_variation(&mut host, "beta", &table["beta"].prefs, &tracked())
                .await
                .passed(),
            run_variation(&mut host, "alpha", &table["alpha"].prefs, &tracked())
                .await
                .passed(),
        ];

        assert_eq!(forward, [true, true]);
        assert_eq!(reverse, [true, true]);
    }
}
