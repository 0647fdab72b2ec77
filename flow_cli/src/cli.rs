//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[inline]
pub fn json_mode() -> bool {
    JSON_MODE.get().copied().unwrap_or(false)
}

#[derive(Parser, Debug)]
#[command(name = "flowmeter", version, about = "Flow meter pour detector")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/flowmeter.toml")]
    pub config: PathBuf,

    /// Emit events and errors as JSON lines instead of text
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
    /// Watch every configured channel and report pours until Ctrl-C
    Run {
        /// Stop on its own after this many milliseconds
        #[arg(long, value_name = "MS")]
        duration_ms: Option<u64>,
    },
    /// Feed simulated pulses into one channel and wait for the pour to complete
    Simulate {
        /// Channel id from the config
        #[arg(long, value_name = "ID")]
        channel: u32,
        /// Number of pulses to inject
        #[arg(long, value_name = "N")]
        pulses: u32,
        /// Gap between pulses
        #[arg(long, value_name = "MS", default_value_t = 2)]
        spacing_ms: u64,
        /// Give up if no completion arrives within this time
        #[arg(long, value_name = "MS", default_value_t = 10_000)]
        timeout_ms: u64,
    },
    /// Validate the config and bind every channel, then exit
    SelfCheck,
}
