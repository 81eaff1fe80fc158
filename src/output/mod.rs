//! Output formatting and display system
//!
//! Plain and colored renderings of live progress and the final session
//! report, plus the JSON form of the report.

mod colored;
mod formatter;

pub use colored::{ColorScheme, ColoredFormatter, SpeedLevel};
pub use formatter::{
    align_text, describe_summary, describe_trial, format_duration, format_mbps, format_ping, Alignment, Column,
    FormattingOptions, OutputFormatter, PlainFormatter, RowData, TableFormat,
};

use crate::{error::Result, measure::ProgressEvent, models::SeriesReport};

/// Output formatting factory for creating appropriate formatters
pub struct OutputFormatterFactory;

impl OutputFormatterFactory {
    /// Create a formatter based on color support and preferences
    pub fn create_formatter(enable_color: bool, verbose: bool) -> Box<dyn OutputFormatter> {
        let options = FormattingOptions {
            enable_color,
            verbose_mode: verbose,
            table_borders: !enable_color,
        };

        if enable_color {
            Box::new(ColoredFormatter::new(options))
        } else {
            Box::new(PlainFormatter::new(options))
        }
    }

    /// Create a plain text formatter for scripts/logs
    pub fn create_plain_formatter() -> Box<dyn OutputFormatter> {
        Self::create_formatter(false, false)
    }
}

/// Main output coordinator that handles all result display
pub struct OutputCoordinator {
    formatter: Box<dyn OutputFormatter>,
    json: bool,
}

impl OutputCoordinator {
    pub fn new(formatter: Box<dyn OutputFormatter>) -> Self {
        Self { formatter, json: false }
    }

    /// Coordinator printing the report as JSON and suppressing live progress
    pub fn json() -> Self {
        Self {
            formatter: OutputFormatterFactory::create_plain_formatter(),
            json: true,
        }
    }

    pub fn is_json(&self) -> bool {
        self.json
    }

    pub fn display_header(&self, title: &str) -> Result<String> {
        self.formatter.format_header(title)
    }

    /// Line to print for a progress event, if any
    pub fn display_progress(&self, event: &ProgressEvent) -> Result<Option<String>> {
        if self.json {
            return Ok(None);
        }
        self.formatter.format_progress(event)
    }

    /// Complete rendering of a finished session
    pub fn display_report(&self, report: &SeriesReport) -> Result<String> {
        if self.json {
            return format_json(report);
        }

        let mut output = String::new();
        output.push_str(&self.formatter.format_cycle_table(report)?);
        output.push_str("\n\n");
        output.push_str(&self.formatter.format_summary(report)?);
        Ok(output)
    }

    pub fn display_warning(&self, warning: &str) -> Result<String> {
        self.formatter.format_warning(warning)
    }

    pub fn display_error(&self, error: &str) -> Result<String> {
        self.formatter.format_error(error)
    }
}

/// Pretty-printed JSON of a session report
pub fn format_json(report: &SeriesReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}
