//! Command-Line Interface

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Default report path for `analyze`
pub const DEFAULT_REPORT_PATH: &str = "tower_jumps_analysis.csv";

/// Tower Jumps - Detect implausible cell-tower relocations in carrier records
#[derive(Parser, Debug)]
#[command(name = "tower-jumps")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a carrier CSV export and write an interval report
    Analyze {
        /// Input CSV file
        input: PathBuf,

        /// Output report path
        #[arg(short, long, default_value = DEFAULT_REPORT_PATH)]
        output: PathBuf,

        /// Window size in minutes (config default if omitted)
        #[arg(short, long)]
        window: Option<u32>,

        /// Maximum plausible speed in mph (config default if omitted)
        #[arg(short = 's', long)]
        max_speed: Option<f64>,

        /// Minimum confidence for a reliable interval (config default if omitted)
        #[arg(short = 't', long)]
        confidence_threshold: Option<f64>,

        /// Suppress per-interval output
        #[arg(short, long)]
        quiet: bool,
    },

    /// Show dataset statistics without analyzing
    Validate {
        /// Input CSV file
        input: PathBuf,
    },

    /// Run the HTTP streaming server
    Serve {
        /// Bind address (config / HOST default if omitted)
        #[arg(long)]
        host: Option<String>,

        /// Bind port (config / PORT default if omitted)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Initialize configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// View configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Get a specific configuration value
    Get {
        /// Configuration key (e.g., "analysis.window_minutes")
        key: String,
    },

    /// Reset configuration to defaults
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
