//! A [`Logger`] backed by the `tracing` macros.
//!
//! Each record becomes one `tracing` event carrying the request ID, trace ID
//! and span ID plus every access record key as its own structured field.
//! Keys outside that set are rendered in logfmt under `extra`. The installed
//! subscriber decides the final format; the JSON formatter places all of
//! them under `fields`.

use crate::logging::normalize_level;
use hermes_core::{FieldValue, Fields, Level, Logger, RequestContext};

/// Event target for records emitted through [`TracingLogger`].
pub const TARGET: &str = "hermes::access";

/// Record keys emitted as dedicated event fields.
const ACCESS_KEYS: [&str; 8] = [
    "kind",
    "component",
    "operation",
    "args",
    "code",
    "reason",
    "stack",
    "latency",
];

/// A record flattened into typed event fields.
struct AccessEvent<'a> {
    kind: Option<&'a str>,
    component: Option<&'a str>,
    operation: Option<&'a str>,
    args: Option<&'a str>,
    code: Option<i64>,
    reason: Option<&'a str>,
    stack: Option<&'a str>,
    latency: Option<f64>,
    extra: Option<String>,
}

impl<'a> AccessEvent<'a> {
    fn new(fields: &'a Fields) -> Self {
        let text = |key: &str| fields.get(key).and_then(FieldValue::as_str);
        let extra = fields
            .iter()
            .filter(|(key, _)| !ACCESS_KEYS.contains(key))
            .fold(Fields::new(), |acc, (key, value)| acc.with(key, value.clone()));

        Self {
            kind: text("kind"),
            component: text("component"),
            operation: text("operation"),
            args: text("args"),
            code: fields.get("code").and_then(FieldValue::as_i64),
            reason: text("reason"),
            stack: text("stack"),
            latency: fields.get("latency").and_then(FieldValue::as_f64),
            extra: (!extra.is_empty()).then(|| extra.to_string()),
        }
    }
}

macro_rules! emit {
    ($level:ident, $ctx:ident, $event:ident) => {
        tracing::$level!(
            target: TARGET,
            request_id = %$ctx.request_id(),
            trace_id = $ctx.trace_id().unwrap_or_default(),
            span_id = $ctx.span_id().unwrap_or_default(),
            kind = $event.kind,
            component = $event.component,
            operation = $event.operation,
            args = $event.args,
            code = $event.code,
            reason = $event.reason,
            stack = $event.stack,
            latency = $event.latency,
            extra = $event.extra.as_deref(),
            "access"
        )
    };
}

/// Logger that emits through the global `tracing` dispatcher.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger {
    min_level: Level,
}

impl TracingLogger {
    /// Creates a logger that emits `info` and above.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            min_level: Level::Info,
        }
    }

    /// Creates a logger for a level name such as `debug` or `fatal`.
    ///
    /// Unknown names fall back to `info`.
    #[must_use]
    pub fn with_level_name(level: &str) -> Self {
        Self::new().with_min_level(Level::parse_lenient(&normalize_level(level)))
    }

    /// Drops records below `level`.
    #[must_use]
    pub const fn with_min_level(mut self, level: Level) -> Self {
        self.min_level = level;
        self
    }

    /// Returns the minimum level.
    #[must_use]
    pub const fn min_level(&self) -> Level {
        self.min_level
    }
}

impl Logger for TracingLogger {
    fn log(&self, ctx: &RequestContext, level: Level, fields: &Fields) {
        if level < self.min_level {
            return;
        }

        let event = AccessEvent::new(fields);
        match level {
            Level::Debug => emit!(debug, ctx, event),
            Level::Info => emit!(info, ctx, event),
            Level::Warn => emit!(warn, ctx, event),
            Level::Error | Level::Fatal => emit!(error, ctx, event),
        }
    }
}
