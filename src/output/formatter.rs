//! Core formatting traits and implementations
//!
//! This module defines the output formatting interface and provides
//! a plain text implementation with table formatting capabilities.

use crate::{
    error::{AppError, Result},
    measure::ProgressEvent,
    models::{SeriesPoint, SeriesReport, SeriesSummary, TrialRecord},
    types::{MetricKind, TrialStatus},
};
use std::fmt::Write as _;

/// Main trait for output formatting
pub trait OutputFormatter: Send + Sync {
    /// Format a header section
    fn format_header(&self, title: &str) -> Result<String>;

    /// Line for a live progress event, `None` when the event is not shown
    fn format_progress(&self, event: &ProgressEvent) -> Result<Option<String>>;

    /// Per-cycle table of a finished session
    fn format_cycle_table(&self, report: &SeriesReport) -> Result<String>;

    /// Session summary with skipped cycles
    fn format_summary(&self, report: &SeriesReport) -> Result<String>;

    fn format_warning(&self, warning: &str) -> Result<String>;

    fn format_error(&self, error: &str) -> Result<String>;
}

/// Configuration options for formatting
#[derive(Debug, Clone)]
pub struct FormattingOptions {
    /// Enable colored output
    pub enable_color: bool,
    /// Show every trial as it completes
    pub verbose_mode: bool,
    /// Show table borders
    pub table_borders: bool,
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self {
            enable_color: true,
            verbose_mode: false,
            table_borders: true,
        }
    }
}

/// Table formatting configuration
#[derive(Debug, Clone)]
pub struct TableFormat {
    pub columns: Vec<Column>,
    pub show_borders: bool,
    pub show_header: bool,
}

/// Column definition for table formatting
#[derive(Debug, Clone)]
pub struct Column {
    pub header: String,
    pub alignment: Alignment,
    pub min_width: usize,
    pub max_width: usize,
}

impl Column {
    pub fn new(header: &str, alignment: Alignment, min_width: usize) -> Self {
        Self {
            header: header.to_string(),
            alignment,
            min_width,
            max_width: 40,
        }
    }
}

/// Text alignment options
#[derive(Debug, Clone)]
pub enum Alignment {
    Left,
    Right,
    Center,
}

/// Row data for table formatting
pub type RowData = Vec<String>;

pub(crate) fn fmt_err(e: std::fmt::Error) -> AppError {
    AppError::io(format!("Failed to format output: {}", e))
}

/// Throughput for display; zero means no measurement
pub fn format_mbps(value: f64) -> String {
    if value > 0.0 {
        format!("{:.0} Mbit/s", value)
    } else {
        "-".to_string()
    }
}

/// Latency for display; zero means no measurement
pub fn format_ping(value: f64) -> String {
    if value > 0.0 {
        format!("{:.1} ms", value)
    } else {
        "-".to_string()
    }
}

/// Format duration in human-readable format
pub fn format_duration(duration_ms: f64) -> String {
    if duration_ms < 1000.0 {
        format!("{:.0}ms", duration_ms)
    } else if duration_ms < 60000.0 {
        format!("{:.1}s", duration_ms / 1000.0)
    } else {
        let minutes = (duration_ms / 60000.0) as u32;
        let seconds = (duration_ms % 60000.0) / 1000.0;
        format!("{}m{:.1}s", minutes, seconds)
    }
}

/// Single-line description of one trial
pub fn describe_trial(record: &TrialRecord) -> String {
    let subject = match record.size_mb {
        Some(size) => format!("{} {} MB #{}", record.metric, size, record.attempt + 1),
        None => format!("{} #{}", record.metric, record.attempt + 1),
    };

    let outcome = match record.status {
        TrialStatus::Success => match record.metric {
            MetricKind::Ping => format!("{:.1} ms", record.value),
            _ => format!("{:.1} Mbit/s", record.value),
        },
        TrialStatus::RateLimited => match record.rate_limit.as_ref().and_then(|info| info.retry_after) {
            Some(retry) => format!("rate limited, retry after {}s", retry.as_secs()),
            None => "rate limited".to_string(),
        },
        TrialStatus::Zero | TrialStatus::Failed | TrialStatus::Timeout => {
            record.error_message.clone().unwrap_or_else(|| "no sample".to_string())
        }
    };

    format!("{}: {}", subject, outcome)
}

/// Running summary line shown after each cycle
pub fn describe_summary(summary: &SeriesSummary) -> String {
    format!(
        "avg down {} | avg up {} | median ping {}",
        format_mbps(summary.mean_download_mbps),
        format_mbps(summary.mean_upload_mbps),
        format_ping(summary.median_ping_ms)
    )
}

/// Plain text formatter implementation
pub struct PlainFormatter {
    options: FormattingOptions,
}

impl PlainFormatter {
    pub fn new(options: FormattingOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &FormattingOptions {
        &self.options
    }

    /// Cycle table columns
    pub fn cycle_table_format(&self) -> TableFormat {
        TableFormat {
            columns: vec![
                Column::new("Cycle", Alignment::Right, 5),
                Column::new("Download", Alignment::Right, 12),
                Column::new("Upload", Alignment::Right, 12),
                Column::new("Ping", Alignment::Right, 9),
                Column::new("Status", Alignment::Left, 7),
            ],
            show_borders: self.options.table_borders,
            show_header: true,
        }
    }

    /// Cells for one series point
    pub fn cycle_row(point: &SeriesPoint) -> RowData {
        vec![
            point.cycle.to_string(),
            format_mbps(point.download_mbps),
            format_mbps(point.upload_mbps),
            format_ping(point.ping_ms),
            if point.skipped { "skipped" } else { "ok" }.to_string(),
        ]
    }

    /// Create a table with the given format and data
    pub fn create_table(&self, format: &TableFormat, rows: &[RowData]) -> Result<String> {
        if rows.is_empty() {
            return Ok(String::new());
        }

        let column_widths = self.calculate_column_widths(format, rows);
        let mut output = String::new();

        if format.show_header && !format.columns.is_empty() {
            if format.show_borders {
                writeln!(output, "{}", self.create_horizontal_border(&column_widths)).map_err(fmt_err)?;
            }

            let headers: Vec<String> = format.columns.iter().map(|c| c.header.clone()).collect();
            writeln!(output, "{}", self.create_row(&headers, &column_widths, format)).map_err(fmt_err)?;

            if format.show_borders {
                writeln!(output, "{}", self.create_horizontal_border(&column_widths)).map_err(fmt_err)?;
            }
        }

        for row in rows {
            writeln!(output, "{}", self.create_row(row, &column_widths, format)).map_err(fmt_err)?;
        }

        if format.show_borders {
            output.push_str(&self.create_horizontal_border(&column_widths));
        }

        Ok(output)
    }

    fn calculate_column_widths(&self, format: &TableFormat, rows: &[RowData]) -> Vec<usize> {
        format
            .columns
            .iter()
            .enumerate()
            .map(|(idx, column)| {
                let content = rows
                    .iter()
                    .filter_map(|row| row.get(idx))
                    .map(|cell| cell.chars().count())
                    .max()
                    .unwrap_or(0);
                content
                    .max(column.min_width)
                    .max(column.header.len())
                    .min(column.max_width)
            })
            .collect()
    }

    fn create_row(&self, data: &[String], widths: &[usize], format: &TableFormat) -> String {
        let mut row = String::new();

        if format.show_borders {
            row.push('|');
        }

        for (idx, (cell, &width)) in data.iter().zip(widths.iter()).enumerate() {
            let alignment = format
                .columns
                .get(idx)
                .map(|column| &column.alignment)
                .unwrap_or(&Alignment::Left);

            if format.show_borders {
                row.push(' ');
            }
            row.push_str(&align_text(cell, width, alignment));
            if format.show_borders {
                row.push_str(" |");
            } else {
                row.push_str("  ");
            }
        }

        row.trim_end().to_string()
    }

    fn create_horizontal_border(&self, widths: &[usize]) -> String {
        let mut border = String::new();

        if !widths.is_empty() {
            border.push('+');
            for &width in widths {
                border.push_str(&"-".repeat(width + 2));
                border.push('+');
            }
        }

        border
    }
}

/// Align text within specified width
pub fn align_text(text: &str, width: usize, alignment: &Alignment) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.chars().take(width).collect();
    }

    let padding = width - len;
    match alignment {
        Alignment::Left => format!("{}{}", text, " ".repeat(padding)),
        Alignment::Right => format!("{}{}", " ".repeat(padding), text),
        Alignment::Center => {
            let left_pad = padding / 2;
            let right_pad = padding - left_pad;
            format!("{}{}{}", " ".repeat(left_pad), text, " ".repeat(right_pad))
        }
    }
}

impl OutputFormatter for PlainFormatter {
    fn format_header(&self, title: &str) -> Result<String> {
        let mut output = String::new();
        let border = "=".repeat(title.len() + 4);

        writeln!(output, "{}", border).map_err(fmt_err)?;
        writeln!(output, "  {}  ", title).map_err(fmt_err)?;
        write!(output, "{}", border).map_err(fmt_err)?;

        Ok(output)
    }

    fn format_progress(&self, event: &ProgressEvent) -> Result<Option<String>> {
        let line = match event {
            ProgressEvent::TrialCompleted { cycle, record } => {
                if !self.options.verbose_mode {
                    return Ok(None);
                }
                format!("  [{}] {}", cycle, describe_trial(record))
            }
            ProgressEvent::MetricCompleted { .. } => return Ok(None),
            ProgressEvent::CycleCompleted { point, summary } => format!(
                "Cycle {}: down {} | up {} | ping {}  ({})",
                point.cycle,
                format_mbps(point.download_mbps),
                format_mbps(point.upload_mbps),
                format_ping(point.ping_ms),
                describe_summary(summary)
            ),
            ProgressEvent::CycleSkipped { cycle, backoff_ms } => format!(
                "Cycle {}: all metrics zero, possible rate limit; waiting {}",
                cycle,
                format_duration(*backoff_ms as f64)
            ),
        };

        Ok(Some(line))
    }

    fn format_cycle_table(&self, report: &SeriesReport) -> Result<String> {
        let rows: Vec<RowData> = report.points.iter().map(Self::cycle_row).collect();
        if rows.is_empty() {
            return Ok("No cycles completed.".to_string());
        }
        self.create_table(&self.cycle_table_format(), &rows)
    }

    fn format_summary(&self, report: &SeriesReport) -> Result<String> {
        let summary = &report.summary;
        let mut output = String::new();

        writeln!(output, "Summary:").map_err(fmt_err)?;
        writeln!(output, "--------").map_err(fmt_err)?;
        writeln!(output, "Download (mean):  {}", format_mbps(summary.mean_download_mbps)).map_err(fmt_err)?;
        writeln!(output, "Upload (mean):    {}", format_mbps(summary.mean_upload_mbps)).map_err(fmt_err)?;
        writeln!(output, "Ping (median):    {}", format_ping(summary.median_ping_ms)).map_err(fmt_err)?;
        writeln!(
            output,
            "Cycles:           {} completed, {} skipped",
            summary.completed_cycles, summary.skipped_cycles
        )
        .map_err(fmt_err)?;
        if !report.skipped_cycles.is_empty() {
            let skipped: Vec<String> = report.skipped_cycles.iter().map(|c| c.to_string()).collect();
            writeln!(output, "Skipped cycles:   {}", skipped.join(", ")).map_err(fmt_err)?;
        }
        write!(output, "Duration:         {}", format_duration(report.duration_ms)).map_err(fmt_err)?;

        Ok(output)
    }

    fn format_warning(&self, warning: &str) -> Result<String> {
        Ok(format!("Warning: {}", warning))
    }

    fn format_error(&self, error: &str) -> Result<String> {
        Ok(format!("Error: {}", error))
    }
}
