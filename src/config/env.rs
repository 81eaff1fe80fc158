//! Environment variable handling and .env file management

use crate::{
    error::{AppError, Result},
    models::config::parse_size_list,
    types::{ExecutionMode, PingMethod},
};
use std::path::Path;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load .env file if it exists
    pub fn load_env_file(debug: bool) -> Result<()> {
        if Path::new(".env").exists() {
            dotenv::from_filename(".env")
                .map_err(|e| AppError::config(format!("Failed to load .env file: {}", e)))?;

            if debug {
                eprintln!("Loaded configuration from .env file");
            }
        } else if debug {
            eprintln!("No .env file found, using defaults and CLI arguments");
        }

        Ok(())
    }

    /// Example .env file content
    pub fn create_example_env_content() -> String {
        let mut content = String::from(
            "# Network Speed Tester Configuration\n\
             #\n\
             # Values here act as defaults and are overridden by command-line arguments.\n\n",
        );

        for (var, description, example) in Self::get_supported_env_vars() {
            content.push_str(&format!("# {}\n# {}={}\n\n", description, var, example));
        }

        content
    }

    /// Save example .env file to disk
    pub fn save_example_env_file(path: &Path) -> Result<()> {
        std::fs::write(path, Self::create_example_env_content())
            .map_err(|e| AppError::config(format!("Failed to write example .env file: {}", e)))
    }

    /// Validate environment variable format before parsing
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "SPEED_BASE_URL" => {
                let parsed = url::Url::parse(value)
                    .map_err(|e| AppError::config(format!("Invalid SPEED_BASE_URL '{}': {}", value, e)))?;
                if parsed.scheme() != "http" && parsed.scheme() != "https" {
                    return Err(AppError::config(format!("SPEED_BASE_URL must use http or https: {}", value)));
                }
            }
            "DOWNLOAD_SIZES_MB" | "UPLOAD_SIZES_MB" => {
                let sizes = parse_size_list(value)
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
                if sizes.is_empty() || sizes.iter().any(|size| *size <= 0.0) {
                    return Err(AppError::config(format!("{} must list positive sizes, got: {}", key, value)));
                }
            }
            "TRIALS_PER_SIZE" | "PING_ATTEMPTS" | "CYCLE_COUNT" => {
                let count: u32 = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
                let max = if key == "TRIALS_PER_SIZE" { 50 } else { 100 };
                if count == 0 || count > max {
                    return Err(AppError::config(format!("{} must be between 1 and {}, got: {}", key, max, count)));
                }
            }
            "TIMEOUT_SECONDS" | "UPLOAD_TIMEOUT_SECONDS" => {
                let timeout: u64 = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
                if timeout == 0 || timeout > 300 {
                    return Err(AppError::config(format!("{} must be between 1 and 300, got: {}", key, timeout)));
                }
            }
            "MAX_CONCURRENCY" => {
                let limit: usize = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid MAX_CONCURRENCY value '{}': {}", value, e)))?;
                if limit == 0 {
                    return Err(AppError::config("MAX_CONCURRENCY must be greater than 0"));
                }
            }
            "EXECUTION_MODE" => {
                value.parse::<ExecutionMode>()?;
            }
            "PING_METHOD" => {
                value.parse::<PingMethod>()?;
            }
            "ENABLE_COLOR" => {
                value
                    .parse::<bool>()
                    .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", value, e)))?;
            }
            _ => {}
        }

        Ok(())
    }

    /// Supported environment variables with descriptions and examples
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("SPEED_BASE_URL", "Base URL of the speed test API", "http://localhost:3000/api/"),
            ("DOWNLOAD_SIZES_MB", "Comma-separated download sizes in MB", "2,5"),
            ("UPLOAD_SIZES_MB", "Comma-separated upload sizes in MB", "2,5"),
            ("TRIALS_PER_SIZE", "Trials per payload size (1-50)", "2"),
            ("PING_ATTEMPTS", "Ping attempts per cycle (1-100)", "8"),
            ("CYCLE_COUNT", "Measurement cycles per session (1-100)", "10"),
            ("TIMEOUT_SECONDS", "Download and ping timeout in seconds (1-300)", "30"),
            ("UPLOAD_TIMEOUT_SECONDS", "Upload timeout in seconds (1-300)", "30"),
            ("EXECUTION_MODE", "concurrent or sequential", "concurrent"),
            ("PING_METHOD", "HEAD or GET", "HEAD"),
            ("MAX_CONCURRENCY", "Trials of one size in flight at once", "4"),
            ("ENABLE_COLOR", "Enable colored output", "true"),
        ]
    }

    /// Validate all currently set environment variables
    pub fn validate_current_env() -> Vec<String> {
        Self::validate_with_lookup(|key| std::env::var(key).ok())
    }

    /// Warnings for every supported variable `lookup` yields an invalid value for
    pub fn validate_with_lookup<F>(lookup: F) -> Vec<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::get_supported_env_vars()
            .into_iter()
            .filter_map(|(var, _, _)| {
                let value = lookup(var)?;
                Self::validate_env_var(var, &value)
                    .err()
                    .map(|e| format!("Warning: {}", e))
            })
            .collect()
    }
}
