//! CLI command definitions

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full install/uninstall cycle for every variation
    Run {
        /// Path to the variations file (variations.json)
        #[arg(long, short = 'v')]
        variations: PathBuf,

        /// Automation driver executable (overrides config and PATH lookup)
        #[arg(long)]
        driver: Option<PathBuf>,

        /// Extra argument passed to the driver; repeatable
        #[arg(long = "driver-arg", allow_hyphen_values = true)]
        driver_args: Vec<String>,

        /// Startup deadline in seconds (overrides config)
        #[arg(long)]
        startup_secs: Option<u64>,
    },

    /// List the variations declared in a variations file
    List {
        /// Path to the variations file
        #[arg(long, short = 'v')]
        variations: PathBuf,
    },

    /// Validate a variations file without running anything
    Check {
        /// Path to the variations file
        #[arg(long, short = 'v')]
        variations: PathBuf,
    },
}
