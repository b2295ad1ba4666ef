//! Access logging middleware.
//!
//! This middleware emits exactly one structured record for every request,
//! whether the handler succeeded or returned a failure. A request that panics
//! through this stage, or whose future is dropped before completing, is
//! recorded as a `500` with reason [`INCOMPLETE_REASON`].
//!
//! # Pipeline Position
//!
//! ```text
//! Tracing → [Logging] → Recovery → Handler
//! ```
//!
//! # Record Fields
//!
//! | Key | Value |
//! |---|---|
//! | `kind` | `server` (or `client` for outbound chains) |
//! | `component` | Transport kind, empty without transport metadata |
//! | `operation` | Operation name, empty without transport metadata |
//! | `args` | Request payload summary |
//! | `code` | Failure code, `0` on success |
//! | `reason` | Failure reason, empty on success |
//! | `stack` | Failure text, `null` on success |
//! | `latency` | Seconds spent in the wrapped chain |
//!
//! Records are emitted at [`Level::Info`] through the injected [`Logger`]
//! together with the request context, so the logger can attach request and
//! trace identifiers.
//!
//! # Example
//!
//! ```
//! use hermes_middleware::LoggingMiddleware;
//! use hermes_telemetry::MemoryLogger;
//!
//! let server = LoggingMiddleware::new(MemoryLogger::new());
//! let client = LoggingMiddleware::new(MemoryLogger::new()).with_kind("client");
//! # let _ = (server, client);
//! ```

use crate::classify::classify;
use crate::middleware::Middleware;
use hermes_core::{
    BoxFuture, BoxedHandler, Failure, Fields, Handler, Level, Logger, Payload, RequestContext,
};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Record kind for inbound requests.
pub const SERVER_KIND: &str = "server";

/// Record kind for outbound requests.
pub const CLIENT_KIND: &str = "client";

/// Reason recorded for a request that was dropped or unwound before its
/// handler returned.
pub const INCOMPLETE_REASON: &str = "request did not complete";

/// Record field keys.
pub mod keys {
    /// Record kind.
    pub const KIND: &str = "kind";
    /// Transport kind.
    pub const COMPONENT: &str = "component";
    /// Operation name.
    pub const OPERATION: &str = "operation";
    /// Request summary.
    pub const ARGS: &str = "args";
    /// Failure code.
    pub const CODE: &str = "code";
    /// Failure reason.
    pub const REASON: &str = "reason";
    /// Failure text.
    pub const STACK: &str = "stack";
    /// Latency in seconds.
    pub const LATENCY: &str = "latency";
}

/// One access record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    /// `server` or `client`.
    pub kind: String,
    /// Transport kind, empty without transport metadata.
    pub transport_kind: String,
    /// Operation name, empty without transport metadata.
    pub operation: String,
    /// Request payload summary.
    pub args: String,
    /// Failure code, `0` on success.
    pub code: i32,
    /// Failure reason, empty on success.
    pub reason: String,
    /// Failure text, absent on success.
    pub stack: Option<String>,
    /// Seconds spent in the wrapped chain.
    pub latency_seconds: f64,
}

impl LogRecord {
    /// Converts the record into ordered log fields.
    #[must_use]
    pub fn to_fields(&self) -> Fields {
        Fields::new()
            .with(keys::KIND, self.kind.as_str())
            .with(keys::COMPONENT, self.transport_kind.as_str())
            .with(keys::OPERATION, self.operation.as_str())
            .with(keys::ARGS, self.args.as_str())
            .with(keys::CODE, self.code)
            .with(keys::REASON, self.reason.as_str())
            .with(keys::STACK, self.stack.clone())
            .with(keys::LATENCY, self.latency_seconds)
    }
}

/// Middleware that emits one access record per request.
#[derive(Clone)]
pub struct LoggingMiddleware {
    logger: Arc<dyn Logger>,
    kind: &'static str,
}

impl LoggingMiddleware {
    /// Creates a server-side logging middleware.
    pub fn new<L: Logger>(logger: L) -> Self {
        Self::from_arc(Arc::new(logger))
    }

    /// Creates a server-side logging middleware over a shared logger.
    #[must_use]
    pub fn from_arc(logger: Arc<dyn Logger>) -> Self {
        Self {
            logger,
            kind: SERVER_KIND,
        }
    }

    /// Sets the record kind.
    #[must_use]
    pub fn with_kind(mut self, kind: &'static str) -> Self {
        self.kind = kind;
        self
    }
}

impl fmt::Debug for LoggingMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingMiddleware")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl<Req, Res> Middleware<Req, Res> for LoggingMiddleware
where
    Req: Payload,
    Res: Send + 'static,
{
    fn name(&self) -> &'static str {
        "logging"
    }

    fn wrap(&self, next: BoxedHandler<Req, Res>) -> BoxedHandler<Req, Res> {
        Arc::new(Logged {
            logger: Arc::clone(&self.logger),
            kind: self.kind,
            next,
        })
    }
}

struct Logged<Req, Res> {
    logger: Arc<dyn Logger>,
    kind: &'static str,
    next: BoxedHandler<Req, Res>,
}

impl<Req, Res> Handler<Req, Res> for Logged<Req, Res>
where
    Req: Payload,
    Res: Send + 'static,
{
    fn call(&self, ctx: RequestContext, request: Req) -> BoxFuture<'_, Result<Res, Failure>> {
        Box::pin(async move {
            let (transport_kind, operation) = ctx
                .transport()
                .map(|t| (t.kind().to_string(), t.operation().to_string()))
                .unwrap_or_default();
            // The payload moves into the next handler, so summarise it first.
            let args = request.summary();
            let mut guard = RecordGuard {
                logger: Arc::clone(&self.logger),
                ctx: ctx.clone(),
                start: Instant::now(),
                pending: Some(LogRecord {
                    kind: self.kind.to_string(),
                    transport_kind,
                    operation,
                    args,
                    code: 0,
                    reason: String::new(),
                    stack: None,
                    latency_seconds: 0.0,
                }),
            };

            let result = self.next.call(ctx, request).await;

            guard.finish(result.as_ref().err());
            result
        })
    }
}

/// Emits the access record exactly once, on completion or on drop.
///
/// A request whose future is dropped or unwinds before completing is
/// recorded as an internal failure with [`INCOMPLETE_REASON`].
struct RecordGuard {
    logger: Arc<dyn Logger>,
    ctx: RequestContext,
    start: Instant,
    pending: Option<LogRecord>,
}

impl RecordGuard {
    fn finish(&mut self, failure: Option<&Failure>) {
        let Some(mut record) = self.pending.take() else {
            return;
        };
        if let Some(classified) = classify(failure) {
            record.code = classified.code;
            record.reason = classified.reason;
        }
        record.stack = failure.map(ToString::to_string);
        record.latency_seconds = self.start.elapsed().as_secs_f64();
        self.logger.log(&self.ctx, Level::Info, &record.to_fields());
    }
}

impl Drop for RecordGuard {
    fn drop(&mut self) {
        if self.pending.is_some() {
            self.finish(Some(&Failure::generic(INCOMPLETE_REASON)));
        }
    }
}
