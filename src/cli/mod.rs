//! CLI command handling
//!
//! Dispatches CLI commands and formats output.

use std::path::PathBuf;

use colored::Colorize;

use crate::commands::Commands;
use crate::common::config::HarnessConfig;
use crate::common::{Error, Result};
use crate::harness::variations::load_variations;
use crate::harness::{BrowserSession, ScenarioRunner};

/// Dispatch a CLI command
///
/// Returns `Ok(exit_code)`; harness-level failures (as opposed to
/// failing variations) surface as `Err`.
pub async fn dispatch(command: Commands) -> Result<i32> {
    match command {
        Commands::Run {
            variations,
            driver,
            driver_args,
            startup_secs,
        } => run(variations, driver, driver_args, startup_secs).await,

        Commands::List { variations } => {
            let table = load_variations(&variations)?;

            println!("{} variation(s):", table.len());
            for (name, variation) in &table {
                let prefs = &variation.prefs;
                println!(
                    "  {}: sets {}, resets {} to default, retains {}",
                    name.white().bold(),
                    prefs.set_values.len(),
                    prefs.reset_defaults.len(),
                    prefs.reset_values.len()
                );
            }

            Ok(0)
        }

        Commands::Check { variations } => {
            let config = HarnessConfig::load()?;
            let table = load_variations(&variations)?;

            let mut findings = 0;
            for (name, variation) in &table {
                for finding in variation.prefs.lint(&config.prefs.tracked) {
                    findings += 1;
                    println!("  {} {}: {}", "✗".red(), name, finding);
                }
            }

            if findings == 0 {
                println!(
                    "{} {} variation(s) OK",
                    "✓".green(),
                    table.len()
                );
                Ok(0)
            } else {
                println!("{} finding(s)", findings);
                Ok(1)
            }
        }
    }
}

async fn run(
    variations: PathBuf,
    driver: Option<PathBuf>,
    driver_args: Vec<String>,
    startup_secs: Option<u64>,
) -> Result<i32> {
    let mut config = HarnessConfig::load()?;
    if let Some(path) = driver {
        config.driver.path = Some(path);
    }
    if !driver_args.is_empty() {
        config.driver.args = driver_args;
    }
    if let Some(secs) = startup_secs {
        config.timeouts.startup_secs = secs;
    }

    let table = load_variations(&variations)?;
    if table.is_empty() {
        return Err(Error::Config(format!(
            "No variations declared in '{}'",
            variations.display()
        )));
    }

    // Startup failure is fatal: no session, no partial results
    let mut session = BrowserSession::start(&config).await?;

    let runner = ScenarioRunner::new(config.prefs.tracked.clone());
    let report = runner.run_all(&mut session, &table).await;

    // Teardown runs no matter how the variations went
    session.quit().await;

    Ok(if report.passed() { 0 } else { 1 })
}
