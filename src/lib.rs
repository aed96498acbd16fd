//! Extension preference harness
//!
//! Drives a browser session through install/verify/uninstall/verify
//! cycles to check that an extension applies and resets user
//! preferences according to its declared variation table.

pub mod cli;
pub mod commands;
pub mod common;
pub mod driver;
pub mod harness;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use driver::types::PrefValue;
pub use harness::variations::{Variation, VariationTable};
