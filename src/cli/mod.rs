//! Command-line interface

use crate::types::{ExecutionMode, PingMethod};
use clap::Parser;

/// Network Speed Tester - measure download, upload and latency against a speed test server
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "nst")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Base URL of the speed test API (e.g. http://localhost:3000/api/)
    #[arg(long)]
    pub url: Option<String>,

    /// Measurement cycles in the session
    #[arg(short = 'n', long)]
    pub cycles: Option<u32>,

    /// Trials per payload size
    #[arg(short, long)]
    pub trials: Option<u32>,

    /// Ping attempts per cycle
    #[arg(short, long)]
    pub pings: Option<u32>,

    /// Download sizes in megabytes (comma-separated)
    #[arg(long, value_name = "MB,..")]
    pub download_sizes: Option<String>,

    /// Upload sizes in megabytes (comma-separated)
    #[arg(long, value_name = "MB,..")]
    pub upload_sizes: Option<String>,

    /// Download and ping timeout in seconds
    #[arg(long, value_parser = parse_duration)]
    pub timeout: Option<u64>,

    /// Upload timeout in seconds
    #[arg(long, value_parser = parse_duration)]
    pub upload_timeout: Option<u64>,

    /// Run download, upload and ping one after another, and trials of a size one at a time
    #[arg(long)]
    pub sequential: bool,

    /// Request method for the ping endpoint (HEAD or GET)
    #[arg(long, value_parser = parse_ping_method)]
    pub ping_method: Option<PingMethod>,

    /// Trials of one size allowed in flight at once
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Give up on a size after this many discarded trials
    #[arg(long)]
    pub max_failed_trials: Option<u32>,

    /// Print the session report as JSON
    #[arg(long)]
    pub json: bool,

    /// Force colored output
    #[arg(long)]
    pub color: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,

    /// Print an example .env file and exit
    #[arg(long)]
    pub env_example: bool,
}

impl Cli {
    /// Validate CLI arguments for conflicts
    pub fn validate(&self) -> Result<(), String> {
        if self.color && self.no_color {
            return Err("Cannot specify both --color and --no-color".to_string());
        }

        if self.concurrency == Some(0) {
            return Err("--concurrency must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Execution mode requested on the command line, if any
    pub fn execution_mode(&self) -> Option<ExecutionMode> {
        self.sequential.then_some(ExecutionMode::Sequential)
    }

    /// Explicit color choice, `None` when left to config and terminal detection
    pub fn color_override(&self) -> Option<bool> {
        if self.color {
            Some(true)
        } else if self.no_color {
            Some(false)
        } else if !supports_color() {
            Some(false)
        } else {
            None
        }
    }
}

/// Parse duration from seconds string
fn parse_duration(s: &str) -> Result<u64, String> {
    if s.starts_with('+') || s.starts_with("0x") || s.starts_with("0X") {
        return Err(format!("Invalid duration: {}", s));
    }

    s.parse::<u64>()
        .map_err(|_| format!("Invalid duration: {}", s))
        .and_then(|secs| {
            if secs == 0 {
                Err("Duration must be greater than 0".to_string())
            } else if secs > 300 {
                Err("Duration cannot exceed 300 seconds".to_string())
            } else {
                Ok(secs)
            }
        })
}

fn parse_ping_method(s: &str) -> Result<PingMethod, String> {
    s.parse().map_err(|e: crate::error::AppError| e.to_string())
}

/// Check if the terminal supports color output
fn supports_color() -> bool {
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    true
}
