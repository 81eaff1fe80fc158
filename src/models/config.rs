//! Configuration data model and validation

use crate::types::{AppError, ExecutionMode, PingMethod, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL the download, upload and ping endpoints hang off
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Download payload sizes in megabytes, probed in order
    #[serde(default = "default_download_sizes")]
    pub download_sizes_mb: Vec<f64>,

    /// Upload payload sizes in megabytes, probed in order
    #[serde(default = "default_upload_sizes")]
    pub upload_sizes_mb: Vec<f64>,

    /// Trials run for every payload size
    #[serde(default = "default_trials_per_size")]
    pub trials_per_size: u32,

    /// Ping attempts per cycle
    #[serde(default = "default_ping_attempts")]
    pub ping_attempts: u32,

    /// Measurement cycles per session
    #[serde(default = "default_cycles")]
    pub cycles: u32,

    /// Leading samples per size ignored as connection warm-up
    #[serde(default = "default_cold_start_drop")]
    pub cold_start_drop: usize,

    /// Discarded trials tolerated per size before the size is given up
    #[serde(default)]
    pub max_failed_trials: Option<u32>,

    /// Download and ping trial timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_seconds: u64,

    /// Upload trial timeout
    #[serde(default = "default_upload_timeout_secs")]
    pub upload_timeout_seconds: u64,

    /// Pause after a cycle where every metric was zero
    #[serde(default = "default_zero_cycle_backoff_ms")]
    pub zero_cycle_backoff_ms: u64,

    /// Trials of one size allowed in flight at once
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    #[serde(default)]
    pub execution_mode: ExecutionMode,

    #[serde(default)]
    pub ping_method: PingMethod,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Print the session report as JSON
    #[serde(default)]
    pub json_output: bool,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            download_sizes_mb: default_download_sizes(),
            upload_sizes_mb: default_upload_sizes(),
            trials_per_size: default_trials_per_size(),
            ping_attempts: default_ping_attempts(),
            cycles: default_cycles(),
            cold_start_drop: default_cold_start_drop(),
            max_failed_trials: None,
            timeout_seconds: default_timeout_secs(),
            upload_timeout_seconds: default_upload_timeout_secs(),
            zero_cycle_backoff_ms: default_zero_cycle_backoff_ms(),
            max_concurrency: default_max_concurrency(),
            execution_mode: ExecutionMode::default(),
            ping_method: PingMethod::default(),
            enable_color: default_enable_color(),
            json_output: false,
            verbose: false,
            debug: false,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trial_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_seconds)
    }

    pub fn zero_cycle_backoff(&self) -> Duration {
        Duration::from_millis(self.zero_cycle_backoff_ms)
    }

    /// Parsed base URL with a trailing slash so endpoint names join beneath it
    pub fn endpoint_base(&self) -> Result<Url> {
        let mut url = Url::parse(self.base_url.trim())
            .map_err(|e| AppError::config(format!("Invalid base URL '{}': {}", self.base_url, e)))?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    /// Validate the configuration and return the first problem found
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(AppError::config("Base URL cannot be empty"));
        }

        let base = self.endpoint_base()?;
        if base.scheme() != "http" && base.scheme() != "https" {
            return Err(AppError::config(format!(
                "Base URL must use http or https: {}",
                self.base_url
            )));
        }

        validate_sizes("Download", &self.download_sizes_mb)?;
        validate_sizes("Upload", &self.upload_sizes_mb)?;

        if self.trials_per_size == 0 {
            return Err(AppError::config("Trials per size must be greater than 0"));
        }

        if self.trials_per_size > 50 {
            return Err(AppError::config("Trials per size cannot exceed 50"));
        }

        if self.ping_attempts == 0 {
            return Err(AppError::config("Ping attempts must be greater than 0"));
        }

        if self.ping_attempts > 100 {
            return Err(AppError::config("Ping attempts cannot exceed 100"));
        }

        if self.cycles == 0 {
            return Err(AppError::config("Cycle count must be greater than 0"));
        }

        if self.cycles > 100 {
            return Err(AppError::config("Cycle count cannot exceed 100"));
        }

        for (name, seconds) in [
            ("Timeout", self.timeout_seconds),
            ("Upload timeout", self.upload_timeout_seconds),
        ] {
            if seconds == 0 {
                return Err(AppError::config(format!("{} must be greater than 0", name)));
            }
            if seconds > 300 {
                return Err(AppError::config(format!("{} cannot exceed 300 seconds", name)));
            }
        }

        if self.max_concurrency == 0 {
            return Err(AppError::config("Max concurrency must be greater than 0"));
        }

        if self.zero_cycle_backoff_ms > 60_000 {
            return Err(AppError::config("Zero-cycle backoff cannot exceed 60000 ms"));
        }

        Ok(())
    }

    /// Merge environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        self.merge_from_lookup(|key| std::env::var(key).ok())
    }

    /// Merge values from any key lookup using the environment variable names
    pub fn merge_from_lookup<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = lookup("SPEED_BASE_URL") {
            self.base_url = base_url.trim().to_string();
        }

        if let Some(sizes) = lookup("DOWNLOAD_SIZES_MB") {
            self.download_sizes_mb = parse_size_list(&sizes)
                .map_err(|e| AppError::config(format!("Invalid DOWNLOAD_SIZES_MB value '{}': {}", sizes, e)))?;
        }

        if let Some(sizes) = lookup("UPLOAD_SIZES_MB") {
            self.upload_sizes_mb = parse_size_list(&sizes)
                .map_err(|e| AppError::config(format!("Invalid UPLOAD_SIZES_MB value '{}': {}", sizes, e)))?;
        }

        if let Some(trials) = lookup("TRIALS_PER_SIZE") {
            self.trials_per_size = trials.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid TRIALS_PER_SIZE value '{}': {}", trials, e)))?;
        }

        if let Some(attempts) = lookup("PING_ATTEMPTS") {
            self.ping_attempts = attempts.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid PING_ATTEMPTS value '{}': {}", attempts, e)))?;
        }

        if let Some(cycles) = lookup("CYCLE_COUNT") {
            self.cycles = cycles.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid CYCLE_COUNT value '{}': {}", cycles, e)))?;
        }

        if let Some(timeout) = lookup("TIMEOUT_SECONDS") {
            self.timeout_seconds = timeout.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid TIMEOUT_SECONDS value '{}': {}", timeout, e)))?;
        }

        if let Some(timeout) = lookup("UPLOAD_TIMEOUT_SECONDS") {
            self.upload_timeout_seconds = timeout.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid UPLOAD_TIMEOUT_SECONDS value '{}': {}", timeout, e)))?;
        }

        if let Some(mode) = lookup("EXECUTION_MODE") {
            self.execution_mode = mode.parse()
                .map_err(|e| AppError::config(format!("Invalid EXECUTION_MODE value '{}': {}", mode, e)))?;
        }

        if let Some(method) = lookup("PING_METHOD") {
            self.ping_method = method.parse()
                .map_err(|e| AppError::config(format!("Invalid PING_METHOD value '{}': {}", method, e)))?;
        }

        if let Some(concurrency) = lookup("MAX_CONCURRENCY") {
            self.max_concurrency = concurrency.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid MAX_CONCURRENCY value '{}': {}", concurrency, e)))?;
        }

        if let Some(enable_color) = lookup("ENABLE_COLOR") {
            self.enable_color = enable_color.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", enable_color, e)))?;
        }

        Ok(())
    }
}

/// Parse a comma separated list of megabyte sizes such as `2,5` or `0.5, 1`
pub fn parse_size_list(raw: &str) -> Result<Vec<f64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<f64>().map_err(AppError::from))
        .collect()
}

fn validate_sizes(label: &str, sizes: &[f64]) -> Result<()> {
    if sizes.is_empty() {
        return Err(AppError::config(format!("{} sizes cannot be empty", label)));
    }

    for size in sizes {
        if !size.is_finite() || *size <= 0.0 {
            return Err(AppError::config(format!(
                "{} size must be a positive number of megabytes, got {}",
                label, size
            )));
        }
        if *size > crate::defaults::MAX_PAYLOAD_MB {
            return Err(AppError::config(format!(
                "{} size {} MB exceeds the {} MB limit",
                label,
                size,
                crate::defaults::MAX_PAYLOAD_MB
            )));
        }
    }

    Ok(())
}

// Default value functions for serde
fn default_base_url() -> String {
    crate::defaults::DEFAULT_BASE_URL.to_string()
}

fn default_download_sizes() -> Vec<f64> {
    crate::defaults::DEFAULT_DOWNLOAD_SIZES_MB.to_vec()
}

fn default_upload_sizes() -> Vec<f64> {
    crate::defaults::DEFAULT_UPLOAD_SIZES_MB.to_vec()
}

fn default_trials_per_size() -> u32 {
    crate::defaults::DEFAULT_TRIALS_PER_SIZE
}

fn default_ping_attempts() -> u32 {
    crate::defaults::DEFAULT_PING_ATTEMPTS
}

fn default_cycles() -> u32 {
    crate::defaults::DEFAULT_CYCLES
}

fn default_cold_start_drop() -> usize {
    crate::stats::COLD_START_DROP
}

fn default_timeout_secs() -> u64 {
    crate::defaults::DEFAULT_TRIAL_TIMEOUT.as_secs()
}

fn default_upload_timeout_secs() -> u64 {
    crate::defaults::DEFAULT_UPLOAD_TIMEOUT.as_secs()
}

fn default_zero_cycle_backoff_ms() -> u64 {
    crate::defaults::DEFAULT_ZERO_CYCLE_BACKOFF.as_millis() as u64
}

fn default_max_concurrency() -> usize {
    crate::defaults::default_max_concurrency()
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.download_sizes_mb, vec![2.0, 5.0]);
        assert_eq!(config.trials_per_size, 2);
        assert_eq!(config.ping_attempts, 8);
        assert_eq!(config.cycles, 10);
        assert_eq!(config.upload_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_endpoint_base_gets_trailing_slash() {
        let mut config = Config::default();
        config.base_url = "https://speed.example.com/api".to_string();
        let base = config.endpoint_base().unwrap();
        assert_eq!(base.as_str(), "https://speed.example.com/api/");
        assert_eq!(base.join("ping").unwrap().as_str(), "https://speed.example.com/api/ping");
    }

    #[test]
    fn test_invalid_base_url() {
        let mut config = Config::default();
        config.base_url = "not-a-url".to_string();
        assert!(config.validate().is_err());

        config.base_url = "ftp://example.com/".to_string();
        assert!(config.validate().is_err());

        config.base_url = "   ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_sizes() {
        let mut config = Config::default();
        config.download_sizes_mb = vec![];
        assert!(config.validate().is_err());

        config.download_sizes_mb = vec![2.0, -1.0];
        assert!(config.validate().is_err());

        config.download_sizes_mb = vec![2.0];
        config.upload_sizes_mb = vec![500.0];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_count_limits() {
        let mut config = Config::default();
        config.trials_per_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.ping_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.cycles = 101;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.upload_timeout_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.max_concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_merge_from_lookup() {
        let mut config = Config::default();
        config
            .merge_from_lookup(lookup_from(&[
                ("SPEED_BASE_URL", " http://10.0.0.5:3000/api/ "),
                ("DOWNLOAD_SIZES_MB", "0.5, 1, 2"),
                ("TRIALS_PER_SIZE", "3"),
                ("PING_ATTEMPTS", "10"),
                ("CYCLE_COUNT", "4"),
                ("EXECUTION_MODE", "sequential"),
                ("PING_METHOD", "get"),
                ("ENABLE_COLOR", "false"),
            ]))
            .unwrap();

        assert_eq!(config.base_url, "http://10.0.0.5:3000/api/");
        assert_eq!(config.download_sizes_mb, vec![0.5, 1.0, 2.0]);
        assert_eq!(config.upload_sizes_mb, vec![2.0, 5.0]);
        assert_eq!(config.trials_per_size, 3);
        assert_eq!(config.ping_attempts, 10);
        assert_eq!(config.cycles, 4);
        assert_eq!(config.execution_mode, ExecutionMode::Sequential);
        assert_eq!(config.ping_method, PingMethod::Get);
        assert!(!config.enable_color);
    }

    #[test]
    fn test_merge_from_lookup_rejects_bad_values() {
        let mut config = Config::default();
        let err = config
            .merge_from_lookup(lookup_from(&[("UPLOAD_SIZES_MB", "2;5")]))
            .unwrap_err();
        assert_eq!(err.category(), "CONFIG");
        assert!(err.to_string().contains("UPLOAD_SIZES_MB"));

        let mut config = Config::default();
        assert!(config
            .merge_from_lookup(lookup_from(&[("CYCLE_COUNT", "ten")]))
            .is_err());
    }

    #[test]
    fn test_parse_size_list() {
        assert_eq!(parse_size_list("2,5").unwrap(), vec![2.0, 5.0]);
        assert_eq!(parse_size_list(" 0.5 , ,3 ").unwrap(), vec![0.5, 3.0]);
        assert!(parse_size_list("two").is_err());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: Config = serde_json::from_str(r#"{"cycles": 3, "execution_mode": "sequential"}"#).unwrap();
        assert_eq!(config.cycles, 3);
        assert_eq!(config.execution_mode, ExecutionMode::Sequential);
        assert_eq!(config.ping_attempts, 8);
    }
}
