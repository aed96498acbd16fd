//! Extension preference harness CLI
//!
//! Drives a browser through an automation driver to verify that
//! installing and uninstalling the extension-under-test applies and
//! resets preferences exactly as its variations table declares.

use clap::Parser;
use prefharness::commands::Commands;
use prefharness::{cli, common};

#[derive(Parser)]
#[command(name = "prefharness", about = "Extension preference-variation test harness")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    common::logging::init_cli();

    let cli = Cli::parse();

    match cli::dispatch(cli.command).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
