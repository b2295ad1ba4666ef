//! Request context types.
//!
//! The [`RequestContext`] carries all per-request state through the middleware
//! chain and into handlers: deadline, cancellation signal, transport metadata
//! and trace identifiers.

use crate::error::Failure;
use crate::trace::{TraceFlags, TraceParent};
use crate::transport::TransportInfo;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// A unique identifier for each request, using UUID v7.
///
/// UUID v7 is time-ordered, which keeps log lines for one request easy to
/// correlate and sort.
///
/// # Example
///
/// ```
/// use hermes_core::RequestId;
///
/// let id = RequestId::new();
/// println!("Request ID: {}", id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new unique request ID using UUID v7.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `RequestId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Per-request context that flows through the middleware chain.
///
/// The context is cheap to clone. Clones share the same cancellation signal,
/// so cancelling any clone cancels the request.
///
/// Middleware never originates cancellation; it only passes the context it
/// was given (possibly augmented with trace identifiers) to the next handler.
///
/// # Example
///
/// ```
/// use hermes_core::{RequestContext, TransportInfo};
/// use std::time::Duration;
///
/// let ctx = RequestContext::new()
///     .with_transport(TransportInfo::grpc("/helloworld.Greeter/SayHello"))
///     .with_timeout(Duration::from_secs(5));
///
/// assert_eq!(ctx.transport().map(|t| t.operation()), Some("/helloworld.Greeter/SayHello"));
/// assert!(!ctx.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: RequestId,
    transport: Option<TransportInfo>,
    trace_id: Option<String>,
    span_id: Option<String>,
    parent_span_id: Option<String>,
    remote_parent: Option<TraceParent>,
    deadline: Option<Instant>,
    cancellation: CancellationToken,
    started_at: Instant,
}

impl RequestContext {
    /// Creates a new request context with a fresh request ID, no deadline and
    /// no transport metadata.
    #[must_use]
    pub fn new() -> Self {
        Self::with_request_id(RequestId::new())
    }

    /// Creates a new request context with the specified request ID.
    #[must_use]
    pub fn with_request_id(request_id: RequestId) -> Self {
        Self {
            request_id,
            transport: None,
            trace_id: None,
            span_id: None,
            parent_span_id: None,
            remote_parent: None,
            deadline: None,
            cancellation: CancellationToken::new(),
            started_at: Instant::now(),
        }
    }

    /// Returns the request ID.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the transport metadata, if the request arrived over a transport.
    #[must_use]
    pub const fn transport(&self) -> Option<&TransportInfo> {
        self.transport.as_ref()
    }

    /// Sets the transport metadata.
    pub fn set_transport(&mut self, transport: TransportInfo) {
        self.transport = Some(transport);
    }

    /// Returns a new context with the specified transport metadata.
    #[must_use]
    pub fn with_transport(mut self, transport: TransportInfo) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Returns the trace ID if set.
    #[must_use]
    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }

    /// Sets the trace ID (32 lowercase hex characters).
    pub fn set_trace_id(&mut self, trace_id: impl Into<String>) {
        self.trace_id = Some(trace_id.into());
    }

    /// Returns a new context with the specified trace ID.
    #[must_use]
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    /// Returns the current span ID if set.
    #[must_use]
    pub fn span_id(&self) -> Option<&str> {
        self.span_id.as_deref()
    }

    /// Sets the current span ID, remembering the previous one as parent.
    pub fn set_span_id(&mut self, span_id: impl Into<String>) {
        let previous = self.span_id.replace(span_id.into());
        if previous.is_some() {
            self.parent_span_id = previous;
        }
    }

    /// Returns a new context with the specified span ID.
    #[must_use]
    pub fn with_span_id(mut self, span_id: impl Into<String>) -> Self {
        self.set_span_id(span_id);
        self
    }

    /// Returns the parent span ID, if this request continues another span.
    #[must_use]
    pub fn parent_span_id(&self) -> Option<&str> {
        self.parent_span_id.as_deref()
    }

    /// Returns the remote trace parent extracted from an upstream caller.
    #[must_use]
    pub const fn remote_parent(&self) -> Option<&TraceParent> {
        self.remote_parent.as_ref()
    }

    /// Records a remote trace parent.
    ///
    /// The parent's trace ID becomes this context's trace ID and its span ID
    /// becomes the parent span ID.
    pub fn set_remote_parent(&mut self, parent: TraceParent) {
        self.trace_id = Some(parent.trace_id().to_string());
        self.parent_span_id = Some(parent.parent_id().to_string());
        self.remote_parent = Some(parent);
    }

    /// Returns a new context continuing the given remote trace parent.
    #[must_use]
    pub fn with_remote_parent(mut self, parent: TraceParent) -> Self {
        self.set_remote_parent(parent);
        self
    }

    /// Renders a `traceparent` value for outbound propagation.
    ///
    /// Returns `None` unless both a trace ID and a span ID are present.
    #[must_use]
    pub fn traceparent(&self) -> Option<String> {
        let trace_id = self.trace_id.as_deref()?;
        let span_id = self.span_id.as_deref()?;
        let flags = self
            .remote_parent
            .as_ref()
            .map_or(TraceFlags::SAMPLED, TraceParent::flags);
        TraceParent::new(trace_id, span_id, flags).map(|p| p.to_string())
    }

    /// Returns the deadline, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns a new context with an absolute deadline.
    ///
    /// An existing earlier deadline is kept.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        });
        self
    }

    /// Returns a new context whose deadline is `timeout` from now.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Returns the time left before the deadline.
    ///
    /// `None` means no deadline; `Some(Duration::ZERO)` means it has passed.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Returns true if the deadline has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Returns the cancellation token shared by all clones of this context.
    #[must_use]
    pub const fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Returns a new context observing the given cancellation token.
    #[must_use]
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Returns true if the request has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Cancels the request.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Reports whether the request may still proceed.
    ///
    /// # Errors
    ///
    /// Returns [`Failure::cancelled`] if the request was cancelled, or
    /// [`Failure::deadline_exceeded`] if its deadline has passed.
    pub fn check(&self) -> Result<(), Failure> {
        if self.is_cancelled() {
            return Err(Failure::cancelled());
        }
        if self.is_expired() {
            return Err(Failure::deadline_exceeded());
        }
        Ok(())
    }

    /// Returns when the request started processing.
    #[must_use]
    pub const fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Returns the time elapsed since the request started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
