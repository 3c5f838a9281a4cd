//! Tracing subscriber setup for binaries and demos embedding the machine

use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{CallError, CallResult};

/// Configuration for the logging system
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: Level,
    /// Include file and line information
    pub file_info: bool,
    /// Log each span's enter and exit
    pub log_spans: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            file_info: false,
            log_spans: false,
        }
    }
}

impl LoggingConfig {
    pub fn new(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    pub fn with_file_info(mut self) -> Self {
        self.file_info = true;
        self
    }

    pub fn with_spans(mut self) -> Self {
        self.log_spans = true;
        self
    }
}

/// Install a global fmt subscriber; `RUST_LOG` directives take precedence
/// over `config.level`
pub fn setup_logging(config: LoggingConfig) -> CallResult<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(config.level.into())
        .from_env_lossy();

    let span_events = if config.log_spans {
        fmt::format::FmtSpan::ACTIVE
    } else {
        fmt::format::FmtSpan::NONE
    };

    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_span_events(span_events)
        .with_file(config.file_info)
        .with_line_number(config.file_info)
        .try_init()
        .map_err(|e| CallError::invalid_configuration("logging", e.to_string()))
}

/// Parse a log level from a string
pub fn parse_log_level(level: &str) -> CallResult<Level> {
    Level::from_str(level)
        .map_err(|_| CallError::invalid_configuration("level", format!("Invalid log level: {}", level)))
}
