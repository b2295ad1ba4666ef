//! Structured logging setup.
//!
//! Installs a `tracing-subscriber` registry with one formatting layer, JSON or
//! pretty, writing to stdout or appending to a file.
//!
//! # Level Names
//!
//! Level names follow the service convention `debug`, `info`, `warn`, `error`
//! and `fatal`. `fatal` maps to `error`; anything unrecognised falls back to
//! `info`. Full filter directives such as `hermes=debug,hyper=warn` are passed
//! through untouched.
//!
//! # Example
//!
//! ```rust,ignore
//! use hermes_telemetry::logging::{LogConfig, LogOutput, init_logging};
//!
//! let config = LogConfig {
//!     output: LogOutput::File("/var/log/orders.log".into()),
//!     ..LogConfig::production()
//! };
//! init_logging(&config)?;
//! ```

use crate::error::TelemetryError;
use crate::TelemetryResult;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Where log lines are written.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogOutput {
    /// Standard output.
    #[default]
    Stdout,
    /// Append to the file at this path, creating it if needed.
    File(PathBuf),
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Whether logging is enabled.
    pub enabled: bool,

    /// Level name or filter directive.
    pub level: String,

    /// Whether to output JSON format.
    pub json_format: bool,

    /// Whether to include span events (new, close).
    pub span_events: bool,

    /// Whether to include file/line info.
    pub file_line_info: bool,

    /// Whether to include thread IDs.
    pub thread_ids: bool,

    /// Whether to include target (module path).
    pub include_target: bool,

    /// Whether to emit ANSI colours. Ignored for file output.
    pub ansi: bool,

    /// Output destination.
    pub output: LogOutput,

    /// Service name for log fields.
    pub service_name: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::production()
    }
}

impl LogConfig {
    /// Creates a development configuration with human-readable output.
    #[must_use]
    pub fn development() -> Self {
        Self {
            enabled: true,
            level: "debug".to_string(),
            json_format: false,
            span_events: true,
            file_line_info: true,
            thread_ids: false,
            include_target: true,
            ansi: true,
            output: LogOutput::Stdout,
            service_name: "hermes".to_string(),
        }
    }

    /// Creates a production configuration with JSON output.
    #[must_use]
    pub fn production() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            json_format: true,
            span_events: false,
            file_line_info: false,
            thread_ids: false,
            include_target: true,
            ansi: false,
            output: LogOutput::Stdout,
            service_name: "hermes".to_string(),
        }
    }

    /// Returns the filter directive derived from [`LogConfig::level`].
    #[must_use]
    pub fn filter_directive(&self) -> String {
        normalize_level(&self.level)
    }
}

/// Maps a level name to a filter directive.
///
/// `fatal` becomes `error` and unknown names become `info`. Strings that
/// look like directives (containing `=` or `,`) are returned unchanged.
#[must_use]
pub fn normalize_level(level: &str) -> String {
    let trimmed = level.trim();
    if trimmed.contains('=') || trimmed.contains(',') {
        return trimmed.to_string();
    }
    match trimmed.to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "warn" | "warning" => "warn",
        "error" | "fatal" => "error",
        _ => "info",
    }
    .to_string()
}

/// Initializes the logging subsystem.
///
/// # Errors
///
/// Returns `TelemetryError::LoggingInit` if the filter is invalid or a global
/// subscriber is already installed, and `TelemetryError::Io` if the log file
/// cannot be opened.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = create_env_filter(&config.filter_directive())?;
    let layer = build_layer(config)?;

    tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

fn build_layer(config: &LogConfig) -> TelemetryResult<Box<dyn Layer<Registry> + Send + Sync>> {
    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let (writer, ansi) = match &config.output {
        LogOutput::Stdout => (BoxMakeWriter::new(std::io::stdout), config.ansi),
        LogOutput::File(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            (BoxMakeWriter::new(Arc::new(file)), false)
        }
    };

    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_span_events(span_events)
        .with_file(config.file_line_info)
        .with_line_number(config.file_line_info)
        .with_thread_ids(config.thread_ids)
        .with_target(config.include_target);

    Ok(if config.json_format {
        layer.json().boxed()
    } else {
        layer.pretty().boxed()
    })
}

/// Creates an env filter from a string.
///
/// # Errors
///
/// Returns error if the filter string is invalid.
pub fn create_env_filter(filter: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(filter).map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

/// Standard log field names.
pub mod fields {
    /// Request ID field name.
    pub const REQUEST_ID: &str = "request_id";

    /// Trace ID field name.
    pub const TRACE_ID: &str = "trace_id";

    /// Span ID field name.
    pub const SPAN_ID: &str = "span_id";

    /// Service name field name.
    pub const SERVICE_NAME: &str = "service.name";
}
