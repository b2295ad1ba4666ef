//! In-memory logger and tracer.
//!
//! Both record everything they receive and are safe to share across tasks.
//! They back the test suites and are handy for asserting on pipeline
//! behaviour in downstream services.

use hermes_core::trace::{generate_span_id, generate_trace_id};
use hermes_core::{FieldValue, Fields, Level, Logger, RequestContext, RequestId, Span, SpanStatus, Tracer};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// One record captured by [`MemoryLogger`].
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    /// Severity.
    pub level: Level,
    /// Request the record belongs to.
    pub request_id: RequestId,
    /// Trace ID from the context, if any.
    pub trace_id: Option<String>,
    /// Span ID from the context, if any.
    pub span_id: Option<String>,
    /// Record fields.
    pub fields: Fields,
}

impl LogEntry {
    /// Returns the field recorded under `key`.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// Returns the string field recorded under `key`.
    #[must_use]
    pub fn str(&self, key: &str) -> Option<&str> {
        self.field(key).and_then(FieldValue::as_str)
    }
}

/// A logger that keeps every record in memory.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryLogger {
    /// Creates an empty logger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the captured records.
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    /// Returns the records for one request.
    #[must_use]
    pub fn entries_for(&self, request_id: RequestId) -> Vec<LogEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.request_id == request_id)
            .cloned()
            .collect()
    }

    /// Returns the number of captured records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Discards captured records.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl Logger for MemoryLogger {
    fn log(&self, ctx: &RequestContext, level: Level, fields: &Fields) {
        let entry = LogEntry {
            level,
            request_id: ctx.request_id(),
            trace_id: ctx.trace_id().map(str::to_string),
            span_id: ctx.span_id().map(str::to_string),
            fields: fields.clone(),
        };
        self.entries.lock().push(entry);
    }
}

/// A span recorded by [`MemoryTracer`] once it ended.
#[derive(Debug, Clone, PartialEq)]
pub struct FinishedSpan {
    /// Span name.
    pub name: String,
    /// Trace ID.
    pub trace_id: String,
    /// Span ID.
    pub span_id: String,
    /// Parent span ID, local or remote.
    pub parent_span_id: Option<String>,
    /// End status.
    pub status: SpanStatus,
    /// Attributes in the order they were set.
    pub attributes: Vec<(&'static str, FieldValue)>,
}

impl FinishedSpan {
    /// Returns the attribute recorded under `key`.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&FieldValue> {
        self.attributes
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v)
    }
}

#[derive(Debug, Default)]
struct TracerState {
    started: AtomicUsize,
    ended: AtomicUsize,
    finished: Mutex<Vec<FinishedSpan>>,
}

/// A tracer that keeps finished spans in memory.
///
/// Continues the trace recorded in the context (remote parent or enclosing
/// span) and generates fresh IDs otherwise.
#[derive(Debug, Clone, Default)]
pub struct MemoryTracer {
    state: Arc<TracerState>,
}

impl MemoryTracer {
    /// Creates an empty tracer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of spans started.
    #[must_use]
    pub fn started(&self) -> usize {
        self.state.started.load(Ordering::SeqCst)
    }

    /// Returns the number of spans ended.
    #[must_use]
    pub fn ended(&self) -> usize {
        self.state.ended.load(Ordering::SeqCst)
    }

    /// Returns a snapshot of the finished spans, in end order.
    #[must_use]
    pub fn finished(&self) -> Vec<FinishedSpan> {
        self.state.finished.lock().clone()
    }
}

impl Tracer for MemoryTracer {
    fn start_span(&self, ctx: &RequestContext, name: &str) -> Box<dyn Span> {
        self.state.started.fetch_add(1, Ordering::SeqCst);

        let trace_id = ctx
            .trace_id()
            .map_or_else(generate_trace_id, str::to_string);
        let parent_span_id = ctx
            .span_id()
            .or_else(|| ctx.remote_parent().map(|p| p.parent_id()))
            .map(str::to_string);

        Box::new(MemorySpan {
            state: Arc::clone(&self.state),
            span: FinishedSpan {
                name: name.to_string(),
                trace_id,
                span_id: generate_span_id(),
                parent_span_id,
                status: SpanStatus::Ok,
                attributes: Vec::new(),
            },
        })
    }
}

struct MemorySpan {
    state: Arc<TracerState>,
    span: FinishedSpan,
}

impl Span for MemorySpan {
    fn trace_id(&self) -> Option<String> {
        Some(self.span.trace_id.clone())
    }

    fn span_id(&self) -> Option<String> {
        Some(self.span.span_id.clone())
    }

    fn set_attribute(&mut self, key: &'static str, value: FieldValue) {
        self.span.attributes.push((key, value));
    }

    fn end(self: Box<Self>, status: SpanStatus) {
        let Self { state, mut span } = *self;
        span.status = status;
        state.ended.fetch_add(1, Ordering::SeqCst);
        state.finished.lock().push(span);
    }
}
