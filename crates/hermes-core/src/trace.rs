//! Trace context types and the tracer collaborator.
//!
//! ## Trace Context Propagation
//!
//! Supports the [W3C Trace Context](https://www.w3.org/TR/trace-context/)
//! `traceparent` header:
//!
//! ```text
//! {version}-{trace-id}-{parent-span-id}-{flags}
//! 00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01
//! ```

use crate::log::FieldValue;
use crate::RequestContext;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// The W3C Trace Context header for trace propagation.
pub const TRACEPARENT_HEADER: &str = "traceparent";

/// Trace flags carried in a W3C `traceparent` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraceFlags(u8);

impl TraceFlags {
    /// No flags set.
    pub const NONE: Self = Self(0x00);
    /// The trace is sampled.
    pub const SAMPLED: Self = Self(0x01);

    /// Creates flags from the raw byte.
    #[must_use]
    pub const fn new(bits: u8) -> Self {
        Self(bits)
    }

    /// Returns the raw byte.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Returns true if the sampled flag is set.
    #[must_use]
    pub const fn is_sampled(self) -> bool {
        self.0 & 0x01 != 0
    }
}

/// A parsed `traceparent` value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TraceParent {
    trace_id: String,
    parent_id: String,
    flags: TraceFlags,
}

impl TraceParent {
    /// Builds a trace parent from its parts.
    ///
    /// Returns `None` if the trace ID is not 32 hex characters, the span ID
    /// is not 16 hex characters, or either is all zeros.
    #[must_use]
    pub fn new(trace_id: &str, parent_id: &str, flags: TraceFlags) -> Option<Self> {
        if !is_hex_id(trace_id, 32) || !is_hex_id(parent_id, 16) {
            return None;
        }
        Some(Self {
            trace_id: trace_id.to_ascii_lowercase(),
            parent_id: parent_id.to_ascii_lowercase(),
            flags,
        })
    }

    /// Parses a `traceparent` header value.
    ///
    /// Only version `00` is accepted.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let parts: Vec<&str> = value.trim().split('-').collect();
        if parts.len() != 4 || parts[0] != "00" {
            return None;
        }

        let flags = parts[3];
        if flags.len() != 2 || !flags.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let flags = u8::from_str_radix(flags, 16).ok()?;

        Self::new(parts[1], parts[2], TraceFlags(flags))
    }

    /// Returns the 128-bit trace ID as lowercase hex.
    #[must_use]
    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// Returns the upstream span ID as lowercase hex.
    #[must_use]
    pub fn parent_id(&self) -> &str {
        &self.parent_id
    }

    /// Returns the trace flags.
    #[must_use]
    pub const fn flags(&self) -> TraceFlags {
        self.flags
    }

    /// Returns true if the upstream sampled this trace.
    #[must_use]
    pub const fn is_sampled(&self) -> bool {
        self.flags.is_sampled()
    }
}

impl fmt::Display for TraceParent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "00-{}-{}-{:02x}",
            self.trace_id,
            self.parent_id,
            self.flags.bits()
        )
    }
}

fn is_hex_id(value: &str, len: usize) -> bool {
    value.len() == len
        && value.chars().all(|c| c.is_ascii_hexdigit())
        && value.chars().any(|c| c != '0')
}

/// Generates a new 128-bit trace ID.
#[must_use]
pub fn generate_trace_id() -> String {
    Uuid::now_v7().simple().to_string()
}

/// Generates a new 64-bit span ID.
#[must_use]
pub fn generate_span_id() -> String {
    // The tail of a v7 UUID is random; the head is a timestamp.
    Uuid::now_v7().simple().to_string()[16..].to_string()
}

/// The status a span is ended with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanStatus {
    /// The operation completed successfully.
    Ok,
    /// The operation failed.
    Error(String),
}

impl SpanStatus {
    /// Returns true for [`SpanStatus::Error`].
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

/// An in-flight span.
pub trait Span: Send {
    /// Returns the span's trace ID, if it has a valid one.
    fn trace_id(&self) -> Option<String>;

    /// Returns the span's own ID, if it has a valid one.
    fn span_id(&self) -> Option<String>;

    /// Records an attribute on the span.
    fn set_attribute(&mut self, key: &'static str, value: FieldValue);

    /// Ends the span. Consumes it, so a span can only end once.
    fn end(self: Box<Self>, status: SpanStatus);
}

/// A span factory.
///
/// Implementations must be safe for concurrent use.
pub trait Tracer: Send + Sync + 'static {
    /// Starts a span for the request, continuing any trace parent already
    /// recorded in the context.
    fn start_span(&self, ctx: &RequestContext, name: &str) -> Box<dyn Span>;
}

impl<T: Tracer + ?Sized> Tracer for Arc<T> {
    fn start_span(&self, ctx: &RequestContext, name: &str) -> Box<dyn Span> {
        (**self).start_span(ctx, name)
    }
}

/// A tracer that records nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl Tracer for NoopTracer {
    fn start_span(&self, _ctx: &RequestContext, _name: &str) -> Box<dyn Span> {
        Box::new(NoopSpan)
    }
}

#[derive(Debug)]
struct NoopSpan;

impl Span for NoopSpan {
    fn trace_id(&self) -> Option<String> {
        None
    }

    fn span_id(&self) -> Option<String> {
        None
    }

    fn set_attribute(&mut self, _key: &'static str, _value: FieldValue) {}

    fn end(self: Box<Self>, _status: SpanStatus) {}
}
