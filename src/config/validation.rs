//! Configuration validation utilities and rules

use crate::{
    defaults::{SERVER_MAX_SIZE_MB, SERVER_MIN_SIZE_MB, SERVER_UPLOAD_CAP_MB},
    error::Result,
    models::Config,
};
use colored::Colorize;
use std::time::Duration;

/// Sessions expected to take longer than this get a warning
const LONG_SESSION: Duration = Duration::from_secs(2 * 60 * 60);

/// Configuration validator producing non-fatal warnings
pub struct ConfigValidator;

impl ConfigValidator {
    /// Run `Config::validate`, then collect advisory warnings
    pub fn validate_comprehensive(config: &Config) -> Result<Vec<ValidationWarning>> {
        config.validate()?;

        let mut warnings = Vec::new();
        warnings.extend(Self::validate_base_url(config)?);
        warnings.extend(Self::validate_sizes(config));
        warnings.extend(Self::validate_session_settings(config));

        Ok(warnings)
    }

    fn validate_base_url(config: &Config) -> Result<Vec<ValidationWarning>> {
        let mut warnings = Vec::new();
        let url = config.endpoint_base()?;

        let is_local = match url.host() {
            Some(url::Host::Domain(domain)) => domain == "localhost" || domain.ends_with(".local"),
            Some(url::Host::Ipv4(ip)) => ip.is_loopback() || ip.is_private(),
            Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
            None => false,
        };

        if url.scheme() == "http" && !is_local {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Base URL '{}' uses plain HTTP over a non-local network; proxies may cache or rewrite payloads", url),
            ));
        }

        if url.query().is_some() {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!("Base URL '{}' has a query string, which is dropped when endpoints are joined", url),
            ));
        }

        Ok(warnings)
    }

    fn validate_sizes(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        for (label, sizes) in [("Download", &config.download_sizes_mb), ("Upload", &config.upload_sizes_mb)] {
            for &size in sizes.iter() {
                if !(SERVER_MIN_SIZE_MB..=SERVER_MAX_SIZE_MB).contains(&size) {
                    warnings.push(ValidationWarning::new(
                        ValidationLevel::Warning,
                        format!(
                            "{} size {} MB is outside the {}-{} MB range the server serves; it may be clamped",
                            label, size, SERVER_MIN_SIZE_MB, SERVER_MAX_SIZE_MB
                        ),
                    ));
                }
            }
        }

        for &size in &config.upload_sizes_mb {
            if size > SERVER_UPLOAD_CAP_MB {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Info,
                    format!(
                        "Upload size {} MB exceeds the {} MB cap some deployments enforce; expect 413 responses",
                        size, SERVER_UPLOAD_CAP_MB
                    ),
                ));
            }
        }

        warnings
    }

    fn validate_session_settings(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.trials_per_size <= config.cold_start_drop as u32 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "{} trial(s) per size with a cold-start drop of {} leaves a single sample per size",
                    config.trials_per_size, config.cold_start_drop
                ),
            ));
        }

        if config.ping_attempts <= 2 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!("{} ping attempt(s) are too few for first/last trimming", config.ping_attempts),
            ));
        }

        let worst_case = Self::worst_case_duration(config);
        if worst_case > LONG_SESSION {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "Session could take up to {} minutes if every trial times out",
                    worst_case.as_secs() / 60
                ),
            ));
        }

        warnings
    }

    /// Upper bound on session length when every trial runs into its timeout
    pub fn worst_case_duration(config: &Config) -> Duration {
        let trials = config.trials_per_size;
        let download = config.trial_timeout() * trials * config.download_sizes_mb.len() as u32;
        let upload = config.upload_timeout() * trials * config.upload_sizes_mb.len() as u32;
        let ping = config.trial_timeout() * config.ping_attempts;
        (download + upload + ping + config.zero_cycle_backoff()) * config.cycles
    }
}

/// Validation warning levels
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValidationLevel {
    Info,
    Warning,
}

impl ValidationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
        }
    }
}

/// Configuration validation warning
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub level: ValidationLevel,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(level: ValidationLevel, message: String) -> Self {
        Self { level, message }
    }

    /// Format warning for display
    pub fn format(&self, use_color: bool) -> String {
        let tag = format!("[{}]", self.level.as_str());
        if !use_color {
            return format!("{} {}", tag, self.message);
        }
        let tag = match self.level {
            ValidationLevel::Info => tag.blue(),
            ValidationLevel::Warning => tag.yellow(),
        };
        format!("{} {}", tag, self.message)
    }
}

/// Convenience function for comprehensive configuration validation
pub fn validate_config(config: &Config) -> Result<Vec<ValidationWarning>> {
    ConfigValidator::validate_comprehensive(config)
}
