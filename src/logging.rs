//! Structured event logging for measurement sessions
//!
//! The measurement core reports what happens through the [`EventSink`]
//! trait and never depends on a sink for its results. [`Logger`] is the
//! sink the binary uses:
//! - level filtering driven by the verbose/debug flags
//! - console, JSON and compact line formats
//! - a bounded in-memory history that can be exported as JSON

use crate::error::{AppError, Result};
use crate::models::Config;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Entries kept by a [`Logger`] before the oldest are dropped
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Fatal = 5,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        }
    }

    /// ANSI color code for console output
    pub fn color_code(&self) -> &'static str {
        match self {
            LogLevel::Trace => "\x1b[37m",
            LogLevel::Debug => "\x1b[36m",
            LogLevel::Info => "\x1b[32m",
            LogLevel::Warn => "\x1b[33m",
            LogLevel::Error => "\x1b[31m",
            LogLevel::Fatal => "\x1b[35m",
        }
    }

    pub fn reset_code() -> &'static str {
        "\x1b[0m"
    }
}

impl std::str::FromStr for LogLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            "FATAL" => Ok(LogLevel::Fatal),
            _ => Err(AppError::parse(format!("Invalid log level: {}", s))),
        }
    }
}

/// Observer for measurement events.
///
/// `category` names the part of the engine speaking (`download`,
/// `upload`, `ping`, `series`, ...) and `data` carries structured detail.
pub trait EventSink: Send + Sync {
    fn on_event(&self, level: LogLevel, category: &str, message: &str, data: Option<serde_json::Value>);
}

/// Shared handle to an event sink
pub type SharedSink = Arc<dyn EventSink>;

/// Sink that discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn on_event(&self, _level: LogLevel, _category: &str, _message: &str, _data: Option<serde_json::Value>) {}
}

/// One recorded event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub category: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Logger name/component
    pub logger: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogFormat {
    /// Human-readable console format
    Console,
    /// One JSON object per line
    Json,
    /// Compact single-line format
    Compact,
}

/// Event sink writing to stderr and keeping a bounded history
pub struct Logger {
    min_level: LogLevel,
    use_color: bool,
    format: LogFormat,
    name: String,
    session_id: Option<String>,
    /// Write accepted entries to stderr as well as the history
    echo: bool,
    max_entries: usize,
    history: Mutex<VecDeque<LogEntry>>,
}

impl Logger {
    pub fn new(name: &str) -> Self {
        Self {
            min_level: LogLevel::Info,
            use_color: true,
            format: LogFormat::Console,
            name: name.to_string(),
            session_id: None,
            echo: true,
            max_entries: DEFAULT_HISTORY_CAPACITY,
            history: Mutex::new(VecDeque::new()),
        }
    }

    /// Create a logger whose level and colors follow the configuration
    pub fn with_config(name: &str, config: &Config) -> Self {
        let min_level = if config.debug {
            LogLevel::Debug
        } else if config.verbose {
            LogLevel::Info
        } else {
            LogLevel::Warn
        };

        Self {
            min_level,
            use_color: config.enable_color && !config.json_output,
            format: if config.debug && config.json_output {
                LogFormat::Json
            } else {
                LogFormat::Console
            },
            session_id: Some(Uuid::new_v4().to_string()),
            ..Self::new(name)
        }
    }

    /// Logger that only records into its history
    pub fn silent(name: &str) -> Self {
        Self {
            echo: false,
            use_color: false,
            ..Self::new(name)
        }
    }

    pub fn set_level(&mut self, level: LogLevel) {
        self.min_level = level;
    }

    pub fn set_format(&mut self, format: LogFormat) {
        self.format = format;
    }

    pub fn set_color(&mut self, use_color: bool) {
        self.use_color = use_color;
    }

    pub fn set_echo(&mut self, echo: bool) {
        self.echo = echo;
    }

    /// Cap the history; `0` disables it
    pub fn set_history_capacity(&mut self, max_entries: usize) {
        self.max_entries = max_entries;
        if let Ok(mut history) = self.history.lock() {
            while history.len() > max_entries {
                history.pop_front();
            }
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn would_log(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    /// Start an entry to be finished with [`LogEntryBuilder::log`]
    pub fn log(&self, level: LogLevel, category: &str, message: &str) -> LogEntryBuilder<'_> {
        LogEntryBuilder {
            logger: self,
            level,
            category: category.to_string(),
            message: message.to_string(),
            fields: serde_json::Map::new(),
        }
    }

    pub fn debug(&self, category: &str, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Debug, category, message)
    }

    pub fn info(&self, category: &str, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Info, category, message)
    }

    pub fn warn(&self, category: &str, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Warn, category, message)
    }

    pub fn error(&self, category: &str, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Error, category, message)
    }

    /// Snapshot of the recorded history, oldest first
    pub fn entries(&self) -> Vec<LogEntry> {
        self.history
            .lock()
            .map(|history| history.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut history) = self.history.lock() {
            history.clear();
        }
    }

    /// Recorded history as a pretty-printed JSON array
    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.entries())?)
    }

    fn record(&self, entry: LogEntry) {
        if entry.level < self.min_level {
            return;
        }

        if self.echo {
            let output = match self.format {
                LogFormat::Console => self.format_console(&entry),
                LogFormat::Json => self.format_json(&entry),
                LogFormat::Compact => self.format_compact(&entry),
            };
            // stdout is reserved for the report
            let _ = writeln!(io::stderr(), "{}", output);
        }

        if self.max_entries == 0 {
            return;
        }
        if let Ok(mut history) = self.history.lock() {
            if history.len() >= self.max_entries {
                history.pop_front();
            }
            history.push_back(entry);
        }
    }

    fn format_console(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f");
        let level_str = entry.level.as_str();

        let formatted_level = if self.use_color {
            format!("{}{:>5}{}", entry.level.color_code(), level_str, LogLevel::reset_code())
        } else {
            format!("{:>5}", level_str)
        };

        let mut output = format!(
            "{} {} [{}:{}] {}",
            timestamp, formatted_level, entry.logger, entry.category, entry.message
        );

        if let Some(data) = &entry.data {
            output.push_str(&format!(" {}", data));
        }

        output
    }

    fn format_json(&self, entry: &LogEntry) -> String {
        match serde_json::to_string(entry) {
            Ok(json) => json,
            Err(_) => format!(
                "{{\"error\": \"Failed to serialize log entry\", \"message\": \"{}\"}}",
                entry.message
            ),
        }
    }

    fn format_compact(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%H:%M:%S");
        format!(
            "{} {} {}: {}",
            timestamp,
            entry.level.as_str().chars().next().unwrap_or('?'),
            entry.category,
            entry.message
        )
    }
}

impl EventSink for Logger {
    fn on_event(&self, level: LogLevel, category: &str, message: &str, data: Option<serde_json::Value>) {
        self.record(LogEntry {
            timestamp: Utc::now(),
            level,
            category: category.to_string(),
            message: message.to_string(),
            data,
            logger: self.name.clone(),
            session_id: self.session_id.clone(),
        });
    }
}

/// Builder for entries logged directly through a [`Logger`]
pub struct LogEntryBuilder<'a> {
    logger: &'a Logger,
    level: LogLevel,
    category: String,
    message: String,
    fields: serde_json::Map<String, serde_json::Value>,
}

impl LogEntryBuilder<'_> {
    /// Add a structured field
    pub fn field<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.fields.insert(key.to_string(), json_value);
        }
        self
    }

    /// Add error information
    pub fn error_info(self, error: &AppError) -> Self {
        self.field("error_category", error.category())
            .field("error_trial_failure", error.is_trial_failure())
            .field("error", error.to_string())
    }

    pub fn log(self) {
        let data = if self.fields.is_empty() {
            None
        } else {
            Some(serde_json::Value::Object(self.fields))
        };
        self.logger.on_event(self.level, &self.category, &self.message, data);
    }
}
