//! Scenario harness
//!
//! Owns the variation data model, the browser session lifecycle, and
//! the per-variation install/verify/uninstall/verify runner.

pub mod runner;
pub mod session;
pub mod variations;

pub use runner::{RunReport, ScenarioRunner};
pub use session::{BrowserSession, ExtensionHandle, ExtensionHost, PreferenceStore};
