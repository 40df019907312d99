//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();
/// Participant of the session being run (for JSON error details).
pub static LAST_PARTICIPANT: OnceLock<String> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "steer", version, about = "Circular tunnel steering experiment")]
pub struct Cli {
    /// Path to config TOML; built-in defaults are used when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log and report as JSON lines instead of pretty text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one experimental session for a participant
    Run {
        /// Participant identifier used in file names and every data row
        #[arg(long, value_name = "ID")]
        participant: String,
        /// Drive the session with a simulated participant instead of a tablet
        #[arg(long, action = ArgAction::SetTrue)]
        sim: bool,
        /// Seed for the trial order (overrides session.seed)
        #[arg(long, value_name = "N")]
        seed: Option<u64>,
        /// Directory for RAW and SCORES files (overrides storage.raw_dir)
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,
        /// Pace the simulated session in wall-clock time
        #[arg(long, action = ArgAction::SetTrue, requires = "sim")]
        realtime: bool,
    },
    /// Clean recorded sessions and extract per-trial features
    Process {
        /// Directory holding `<ID>_RAW.csv` files
        #[arg(long, value_name = "DIR")]
        input: PathBuf,
        /// Participant table with headers ID,Group,ProficiencyScore
        #[arg(long, value_name = "FILE")]
        metadata: Option<PathBuf>,
        /// Output root; receives clean/ and features/
        #[arg(long, value_name = "DIR")]
        out: PathBuf,
        /// Worker threads (overrides analysis.workers)
        #[arg(long, value_name = "N")]
        workers: Option<usize>,
    },
    /// Validate the configuration and exercise the simulated backend
    SelfCheck,
}
