//! Colored formatter implementation with terminal color support
//!
//! Wraps the plain formatter's layout and color codes the measured values
//! by how fast the link is.

use super::formatter::{
    align_text, describe_summary, describe_trial, fmt_err, format_duration, format_mbps, format_ping, FormattingOptions,
    OutputFormatter, PlainFormatter,
};
use crate::{
    error::Result,
    measure::ProgressEvent,
    models::{SeriesPoint, SeriesReport},
    types::TrialStatus,
};
use colored::*;
use std::fmt::Write as _;

/// Speed classification for color coding
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpeedLevel {
    Excellent,
    Good,
    Fair,
    Poor,
    None,
}

impl SpeedLevel {
    /// Classify a throughput in Mbit/s
    pub fn from_mbps(mbps: f64) -> Self {
        if mbps <= 0.0 {
            Self::None
        } else if mbps >= 100.0 {
            Self::Excellent
        } else if mbps >= 25.0 {
            Self::Good
        } else if mbps >= 5.0 {
            Self::Fair
        } else {
            Self::Poor
        }
    }

    /// Classify a round-trip latency in milliseconds
    pub fn from_ping(ms: f64) -> Self {
        if ms <= 0.0 {
            Self::None
        } else if ms < 20.0 {
            Self::Excellent
        } else if ms < 60.0 {
            Self::Good
        } else if ms < 150.0 {
            Self::Fair
        } else {
            Self::Poor
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Self::Excellent => Color::Green,
            Self::Good => Color::Cyan,
            Self::Fair => Color::Yellow,
            Self::Poor => Color::Red,
            Self::None => Color::BrightBlack,
        }
    }
}

/// Color scheme configuration
#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub header: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub muted: Color,
    pub border: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            header: Color::Blue,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
            muted: Color::BrightBlack,
            border: Color::BrightBlack,
        }
    }
}

/// Colored formatter implementation
pub struct ColoredFormatter {
    plain_formatter: PlainFormatter,
    options: FormattingOptions,
    color_scheme: ColorScheme,
}

impl ColoredFormatter {
    pub fn new(options: FormattingOptions) -> Self {
        Self::with_color_scheme(options, ColorScheme::default())
    }

    pub fn with_color_scheme(options: FormattingOptions, color_scheme: ColorScheme) -> Self {
        Self {
            plain_formatter: PlainFormatter::new(options.clone()),
            options,
            color_scheme,
        }
    }

    /// Apply color to text if colors are enabled
    fn colorize(&self, text: &str, color: Color) -> ColoredString {
        if self.options.enable_color {
            text.color(color)
        } else {
            text.normal()
        }
    }

    fn bold(&self, text: &str) -> ColoredString {
        if self.options.enable_color {
            text.bold()
        } else {
            text.normal()
        }
    }

    fn heading(&self, text: &str) -> ColoredString {
        if self.options.enable_color {
            text.bold().color(self.color_scheme.header)
        } else {
            text.normal()
        }
    }

    fn mbps(&self, value: f64) -> ColoredString {
        self.colorize(&format_mbps(value), SpeedLevel::from_mbps(value).color())
    }

    fn ping(&self, value: f64) -> ColoredString {
        self.colorize(&format_ping(value), SpeedLevel::from_ping(value).color())
    }

    /// Pad before coloring so escape codes do not skew column widths
    fn cell(&self, text: &str, width: usize, color: Color) -> ColoredString {
        let padded = align_text(text, width, &super::formatter::Alignment::Right);
        self.colorize(&padded, color)
    }

    fn point_line(&self, point: &SeriesPoint) -> String {
        format!(
            "{:>5}  {}  {}  {}  {}",
            point.cycle,
            self.cell(&format_mbps(point.download_mbps), 12, SpeedLevel::from_mbps(point.download_mbps).color()),
            self.cell(&format_mbps(point.upload_mbps), 12, SpeedLevel::from_mbps(point.upload_mbps).color()),
            self.cell(&format_ping(point.ping_ms), 9, SpeedLevel::from_ping(point.ping_ms).color()),
            if point.skipped {
                self.colorize("skipped", self.color_scheme.warning)
            } else {
                self.colorize("ok", self.color_scheme.success)
            }
        )
    }
}

impl OutputFormatter for ColoredFormatter {
    fn format_header(&self, title: &str) -> Result<String> {
        let rule = "━".repeat(title.chars().count() + 4);
        Ok(format!(
            "{}\n  {}\n{}",
            self.colorize(&rule, self.color_scheme.border),
            self.heading(title),
            self.colorize(&rule, self.color_scheme.border)
        ))
    }

    fn format_progress(&self, event: &ProgressEvent) -> Result<Option<String>> {
        let line = match event {
            ProgressEvent::TrialCompleted { cycle, record } => {
                if !self.options.verbose_mode {
                    return Ok(None);
                }
                let color = match record.status {
                    TrialStatus::Success => self.color_scheme.muted,
                    TrialStatus::RateLimited | TrialStatus::Zero => self.color_scheme.warning,
                    TrialStatus::Failed | TrialStatus::Timeout => self.color_scheme.error,
                };
                format!("  [{}] {}", cycle, self.colorize(&describe_trial(record), color))
            }
            ProgressEvent::MetricCompleted { .. } => return Ok(None),
            ProgressEvent::CycleCompleted { point, summary } => format!(
                "{} down {} | up {} | ping {}  {}",
                self.bold(&format!("Cycle {}:", point.cycle)),
                self.mbps(point.download_mbps),
                self.mbps(point.upload_mbps),
                self.ping(point.ping_ms),
                self.colorize(&format!("({})", describe_summary(summary)), self.color_scheme.muted)
            ),
            ProgressEvent::CycleSkipped { cycle, backoff_ms } => format!(
                "{} {}",
                self.bold(&format!("Cycle {}:", cycle)),
                self.colorize(
                    &format!(
                        "all metrics zero, possible rate limit; waiting {}",
                        format_duration(*backoff_ms as f64)
                    ),
                    self.color_scheme.warning
                )
            ),
        };

        Ok(Some(line))
    }

    fn format_cycle_table(&self, report: &SeriesReport) -> Result<String> {
        if report.points.is_empty() {
            return Ok(self.colorize("No cycles completed.", self.color_scheme.muted).to_string());
        }

        let mut output = String::new();
        let header = format!(
            "{:>5}  {:>12}  {:>12}  {:>9}  {}",
            "Cycle", "Download", "Upload", "Ping", "Status"
        );
        writeln!(output, "{}", self.bold(&header)).map_err(fmt_err)?;
        writeln!(output, "{}", self.colorize(&"─".repeat(52), self.color_scheme.border)).map_err(fmt_err)?;

        for point in &report.points {
            writeln!(output, "{}", self.point_line(point)).map_err(fmt_err)?;
        }

        Ok(output.trim_end().to_string())
    }

    fn format_summary(&self, report: &SeriesReport) -> Result<String> {
        if !self.options.enable_color {
            return self.plain_formatter.format_summary(report);
        }

        let summary = &report.summary;
        let mut output = String::new();

        writeln!(output, "{}", self.heading("Summary")).map_err(fmt_err)?;
        writeln!(output, "  Download (mean):  {}", self.mbps(summary.mean_download_mbps)).map_err(fmt_err)?;
        writeln!(output, "  Upload (mean):    {}", self.mbps(summary.mean_upload_mbps)).map_err(fmt_err)?;
        writeln!(output, "  Ping (median):    {}", self.ping(summary.median_ping_ms)).map_err(fmt_err)?;

        let skipped = if summary.skipped_cycles > 0 {
            self.colorize(&format!("{} skipped", summary.skipped_cycles), self.color_scheme.warning)
        } else {
            self.colorize("0 skipped", self.color_scheme.muted)
        };
        writeln!(output, "  Cycles:           {} completed, {}", summary.completed_cycles, skipped).map_err(fmt_err)?;

        if !report.skipped_cycles.is_empty() {
            let list: Vec<String> = report.skipped_cycles.iter().map(|c| c.to_string()).collect();
            writeln!(
                output,
                "  Skipped cycles:   {}",
                self.colorize(&list.join(", "), self.color_scheme.warning)
            )
            .map_err(fmt_err)?;
        }
        write!(
            output,
            "  Duration:         {}",
            self.colorize(&format_duration(report.duration_ms), self.color_scheme.muted)
        )
        .map_err(fmt_err)?;

        Ok(output)
    }

    fn format_warning(&self, warning: &str) -> Result<String> {
        Ok(format!("{} {}", self.colorize("⚠", self.color_scheme.warning), warning))
    }

    fn format_error(&self, error: &str) -> Result<String> {
        Ok(format!("{} {}", self.colorize("✖", self.color_scheme.error), self.colorize(error, self.color_scheme.error)))
    }
}
