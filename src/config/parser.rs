//! Configuration parsing from CLI arguments and environment variables

use crate::{
    cli::Cli,
    config::env::EnvManager,
    error::{AppError, Result},
    models::{config::parse_size_list, Config},
};

/// Configuration parser that combines CLI arguments with environment variables
pub struct ConfigParser {
    cli: Cli,
}

impl ConfigParser {
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Defaults, then `.env` and the process environment, then CLI flags
    pub fn parse(&self) -> Result<Config> {
        EnvManager::load_env_file(self.cli.debug)?;
        self.build(|key| std::env::var(key).ok())
    }

    /// Same layering as [`parse`](Self::parse) with an explicit variable lookup
    pub fn build<F>(&self, lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        config.merge_from_lookup(lookup)?;
        self.apply_cli_overrides(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_cli_overrides(&self, config: &mut Config) -> Result<()> {
        let cli = &self.cli;
        cli.validate().map_err(AppError::validation)?;

        if let Some(url) = &cli.url {
            config.base_url = url.trim().to_string();
        }
        if let Some(cycles) = cli.cycles {
            config.cycles = cycles;
        }
        if let Some(trials) = cli.trials {
            config.trials_per_size = trials;
        }
        if let Some(pings) = cli.pings {
            config.ping_attempts = pings;
        }
        if let Some(sizes) = &cli.download_sizes {
            config.download_sizes_mb = parse_size_list(sizes)
                .map_err(|e| AppError::config(format!("Invalid --download-sizes '{}': {}", sizes, e)))?;
        }
        if let Some(sizes) = &cli.upload_sizes {
            config.upload_sizes_mb = parse_size_list(sizes)
                .map_err(|e| AppError::config(format!("Invalid --upload-sizes '{}': {}", sizes, e)))?;
        }
        if let Some(timeout) = cli.timeout {
            config.timeout_seconds = timeout;
        }
        if let Some(timeout) = cli.upload_timeout {
            config.upload_timeout_seconds = timeout;
        }
        if let Some(mode) = cli.execution_mode() {
            config.execution_mode = mode;
        }
        if let Some(method) = cli.ping_method {
            config.ping_method = method;
        }
        if let Some(concurrency) = cli.concurrency {
            config.max_concurrency = concurrency;
        }
        if let Some(limit) = cli.max_failed_trials {
            config.max_failed_trials = Some(limit);
        }
        if let Some(enable_color) = cli.color_override() {
            config.enable_color = enable_color;
        }

        // CLI-only flags
        config.json_output = cli.json;
        config.verbose = cli.verbose;
        config.debug = cli.debug;

        Ok(())
    }
}

/// Load the complete configuration for a CLI invocation
pub fn load_config(cli: Cli) -> Result<Config> {
    ConfigParser::new(cli).parse()
}

/// Configuration summary for debug output
pub fn display_config_summary(config: &Config) -> String {
    let sizes = |sizes: &[f64]| {
        sizes
            .iter()
            .map(|size| format!("{}", size))
            .collect::<Vec<_>>()
            .join(", ")
    };

    [
        format!("Base URL: {}", config.base_url),
        format!("Download sizes (MB): {}", sizes(&config.download_sizes_mb)),
        format!("Upload sizes (MB): {}", sizes(&config.upload_sizes_mb)),
        format!("Trials per size: {}", config.trials_per_size),
        format!("Ping attempts: {} ({})", config.ping_attempts, config.ping_method),
        format!("Cycles: {}", config.cycles),
        format!("Execution mode: {} (max {} in flight)", config.execution_mode, config.max_concurrency),
        format!("Timeouts: {}s trial, {}s upload", config.timeout_seconds, config.upload_timeout_seconds),
        format!("Color Output: {}", config.enable_color),
        format!("Verbose: {}", config.verbose),
        format!("Debug: {}", config.debug),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ExecutionMode, PingMethod};
    use clap::Parser;
    use std::collections::HashMap;

    fn build(args: &[&str], env: &[(&str, &str)]) -> Result<Config> {
        let env: HashMap<String, String> = env.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        let mut argv = vec!["nst"];
        argv.extend_from_slice(args);
        ConfigParser::new(Cli::parse_from(argv)).build(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults_without_overrides() {
        let config = build(&[], &[]).unwrap();
        assert_eq!(config.base_url, crate::defaults::DEFAULT_BASE_URL);
        assert_eq!(config.cycles, crate::defaults::DEFAULT_CYCLES);
        assert_eq!(config.execution_mode, ExecutionMode::Concurrent);
        assert!(!config.json_output);
    }

    #[test]
    fn test_cli_overrides() {
        let config = build(
            &["--url", "http://10.0.0.5:3000/api", "-n", "3", "--sequential", "--ping-method", "GET", "--json"],
            &[],
        )
        .unwrap();

        assert_eq!(config.base_url, "http://10.0.0.5:3000/api");
        assert_eq!(config.cycles, 3);
        assert_eq!(config.execution_mode, ExecutionMode::Sequential);
        assert_eq!(config.ping_method, PingMethod::Get);
        assert!(config.json_output);
    }

    #[test]
    fn test_cli_overrides_env_vars() {
        let config = build(
            &["--trials", "4", "--download-sizes", "1,3"],
            &[("TRIALS_PER_SIZE", "6"), ("DOWNLOAD_SIZES_MB", "8"), ("PING_ATTEMPTS", "12")],
        )
        .unwrap();

        assert_eq!(config.trials_per_size, 4);
        assert_eq!(config.download_sizes_mb, vec![1.0, 3.0]);
        // Untouched by the CLI, so the environment wins
        assert_eq!(config.ping_attempts, 12);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(build(&["--download-sizes", "two"], &[]).is_err());
        assert!(build(&["-n", "0"], &[]).is_err());
        assert!(build(&["--url", "ftp://example.com/"], &[]).is_err());
        assert!(build(&[], &[("CYCLE_COUNT", "many")]).is_err());
        assert!(build(&["--color", "--no-color"], &[]).is_err());
    }

    #[test]
    fn test_no_color_flag() {
        let config = build(&["--no-color"], &[("ENABLE_COLOR", "true")]).unwrap();
        assert!(!config.enable_color);
    }

    #[test]
    fn test_config_summary() {
        let summary = display_config_summary(&Config::default());
        assert!(summary.contains("Base URL:"));
        assert!(summary.contains("Download sizes (MB): 2, 5"));
        assert!(summary.contains("Ping attempts: 8 (HEAD)"));
    }
}
