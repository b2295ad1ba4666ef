//! Tracing middleware.
//!
//! This middleware continues the caller's distributed trace and records one
//! span per request through the injected [`Tracer`].
//!
//! ## Behavior
//!
//! 1. Extract a W3C `traceparent` from the transport metadata, unless the
//!    context already carries a remote parent
//! 2. Start a span named after the operation (`"unknown"` without transport metadata)
//! 3. Store the span's trace ID and span ID in the context passed downstream
//! 4. Delegate
//! 5. End the span: `Ok` on success, `Error(message)` on failure
//!
//! The span is held by a drop guard, so it is also ended (with an error
//! status) when the request future is dropped or unwinds before completing.
//! Each span is ended exactly once.

use crate::middleware::Middleware;
use hermes_core::{
    BoxFuture, BoxedHandler, Failure, FieldValue, Handler, RequestContext, Span, SpanStatus,
    TraceParent, Tracer, TRACEPARENT_HEADER,
};
use std::fmt;
use std::sync::Arc;

/// Span name used when the request carries no transport metadata.
pub const UNKNOWN_OPERATION: &str = "unknown";

/// Span attribute keys.
pub mod attributes {
    /// Transport kind (`grpc` or `http`).
    pub const TRANSPORT_KIND: &str = "transport.kind";
    /// Operation name.
    pub const OPERATION: &str = "operation";
    /// Request ID.
    pub const REQUEST_ID: &str = "request.id";
    /// Failure code, when the request failed.
    pub const FAILURE_CODE: &str = "failure.code";
}

/// Middleware that opens a span around each request.
///
/// # Example
///
/// ```
/// use hermes_core::NoopTracer;
/// use hermes_middleware::TracingMiddleware;
///
/// let middleware = TracingMiddleware::new(NoopTracer);
/// # let _ = middleware;
/// ```
#[derive(Clone)]
pub struct TracingMiddleware {
    tracer: Arc<dyn Tracer>,
}

impl TracingMiddleware {
    /// Creates a tracing middleware over the given tracer.
    pub fn new<T: Tracer>(tracer: T) -> Self {
        Self {
            tracer: Arc::new(tracer),
        }
    }

    /// Creates a tracing middleware over a shared tracer.
    #[must_use]
    pub fn from_arc(tracer: Arc<dyn Tracer>) -> Self {
        Self { tracer }
    }
}

impl fmt::Debug for TracingMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TracingMiddleware").finish_non_exhaustive()
    }
}

impl<Req, Res> Middleware<Req, Res> for TracingMiddleware
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    fn name(&self) -> &'static str {
        "tracing"
    }

    fn wrap(&self, next: BoxedHandler<Req, Res>) -> BoxedHandler<Req, Res> {
        Arc::new(Traced {
            tracer: Arc::clone(&self.tracer),
            next,
        })
    }
}

struct Traced<Req, Res> {
    tracer: Arc<dyn Tracer>,
    next: BoxedHandler<Req, Res>,
}

impl<Req, Res> Handler<Req, Res> for Traced<Req, Res>
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    fn call(&self, mut ctx: RequestContext, request: Req) -> BoxFuture<'_, Result<Res, Failure>> {
        Box::pin(async move {
            if ctx.remote_parent().is_none() {
                let parent = ctx
                    .transport()
                    .and_then(|t| t.header(TRACEPARENT_HEADER))
                    .and_then(TraceParent::parse);
                if let Some(parent) = parent {
                    ctx.set_remote_parent(parent);
                }
            }

            let name = span_name(&ctx);
            let mut span = self.tracer.start_span(&ctx, &name);
            if let Some(transport) = ctx.transport() {
                span.set_attribute(attributes::TRANSPORT_KIND, transport.kind().as_str().into());
                span.set_attribute(attributes::OPERATION, transport.operation().into());
            }
            span.set_attribute(attributes::REQUEST_ID, ctx.request_id().to_string().into());

            if let Some(trace_id) = span.trace_id() {
                ctx.set_trace_id(trace_id);
            }
            if let Some(span_id) = span.span_id() {
                ctx.set_span_id(span_id);
            }

            let mut guard = SpanGuard::new(span);
            let result = self.next.call(ctx, request).await;

            match &result {
                Ok(_) => guard.finish(SpanStatus::Ok),
                Err(failure) => {
                    if let Some(code) = failure.code() {
                        guard.set_attribute(attributes::FAILURE_CODE, code.into());
                    }
                    guard.finish(SpanStatus::Error(failure.to_string()));
                }
            }
            result
        })
    }
}

fn span_name(ctx: &RequestContext) -> String {
    match ctx.transport() {
        Some(transport) if !transport.operation().is_empty() => transport.operation().to_string(),
        _ => UNKNOWN_OPERATION.to_string(),
    }
}

/// Ends the span exactly once, on completion or on drop.
struct SpanGuard {
    span: Option<Box<dyn Span>>,
}

impl SpanGuard {
    fn new(span: Box<dyn Span>) -> Self {
        Self { span: Some(span) }
    }

    fn set_attribute(&mut self, key: &'static str, value: FieldValue) {
        if let Some(span) = self.span.as_mut() {
            span.set_attribute(key, value);
        }
    }

    fn finish(&mut self, status: SpanStatus) {
        if let Some(span) = self.span.take() {
            span.end(status);
        }
    }
}

impl Drop for SpanGuard {
    fn drop(&mut self) {
        self.finish(SpanStatus::Error("request did not complete".to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_core::{handler_fn, TransportInfo};
    use hermes_telemetry::MemoryTracer;
    use std::time::Duration;

    const TRACEPARENT: &str = "00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01";

    type Observed = (Option<String>, Option<String>, Option<String>);

    fn traced<Res, H>(tracer: &Arc<MemoryTracer>, handler: H) -> BoxedHandler<(), Res>
    where
        Res: Send + 'static,
        H: Handler<(), Res>,
    {
        let next: BoxedHandler<(), Res> = Arc::new(handler);
        TracingMiddleware::from_arc(tracer.clone()).wrap(next)
    }

    /// Handler that echoes the trace identifiers it observed.
    fn observer() -> impl Handler<(), Observed> {
        handler_fn(|ctx: RequestContext, _: ()| async move {
            Ok::<_, Failure>((
                ctx.trace_id().map(str::to_string),
                ctx.span_id().map(str::to_string),
                ctx.parent_span_id().map(str::to_string),
            ))
        })
    }

    #[tokio::test]
    async fn test_starts_trace_when_missing() {
        let tracer = Arc::new(MemoryTracer::new());
        let handler = traced(&tracer, observer());

        let ctx = RequestContext::new().with_transport(TransportInfo::grpc("/users.Users/Get"));
        let (trace_id, span_id, parent) = handler.call(ctx, ()).await.unwrap();

        assert_eq!(trace_id.unwrap().len(), 32);
        assert_eq!(span_id.unwrap().len(), 16);
        assert!(parent.is_none());

        let spans = tracer.finished();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].name, "/users.Users/Get");
        assert_eq!(spans[0].status, SpanStatus::Ok);
    }

    #[tokio::test]
    async fn test_continues_traceparent() {
        let tracer = Arc::new(MemoryTracer::new());
        let handler = traced(&tracer, observer());

        let ctx = RequestContext::new()
            .with_transport(TransportInfo::http("/api/data").with_header("traceparent", TRACEPARENT));
        let (trace_id, span_id, parent) = handler.call(ctx, ()).await.unwrap();

        assert_eq!(trace_id.as_deref(), Some("0af7651916cd43dd8448eb211c80319c"));
        assert_ne!(span_id.as_deref(), Some("b7ad6b7169203331"));
        assert_eq!(parent.as_deref(), Some("b7ad6b7169203331"));
    }

    #[tokio::test]
    async fn test_ignores_invalid_traceparent() {
        let tracer = Arc::new(MemoryTracer::new());
        let handler = traced(&tracer, observer());

        let ctx = RequestContext::new()
            .with_transport(TransportInfo::http("/api").with_header("traceparent", "invalid"));
        let (trace_id, _, parent) = handler.call(ctx, ()).await.unwrap();

        assert_eq!(trace_id.unwrap().len(), 32);
        assert!(parent.is_none());
    }

    #[tokio::test]
    async fn test_unknown_operation_without_transport() {
        let tracer = Arc::new(MemoryTracer::new());
        let handler = traced(&tracer, observer());

        handler.call(RequestContext::new(), ()).await.unwrap();
        assert_eq!(tracer.finished()[0].name, UNKNOWN_OPERATION);
    }

    #[tokio::test]
    async fn test_failure_ends_span_with_error() {
        let tracer = Arc::new(MemoryTracer::new());
        let handler = traced(
            &tracer,
            handler_fn(|_ctx: RequestContext, _: ()| async move {
                Err::<(), _>(Failure::business(404, "not found"))
            }),
        );

        let err = handler.call(RequestContext::new(), ()).await.unwrap_err();
        assert_eq!(err, Failure::business(404, "not found"));

        let spans = tracer.finished();
        assert_eq!(
            spans[0].status,
            SpanStatus::Error("error: code = 404 reason = not found".to_string())
        );
        assert_eq!(spans[0].attribute(attributes::FAILURE_CODE), Some(&FieldValue::Int(404)));
    }

    #[tokio::test]
    async fn test_dropped_request_ends_span() {
        let tracer = Arc::new(MemoryTracer::new());
        let handler = traced(
            &tracer,
            handler_fn(|_ctx: RequestContext, _: ()| async move {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<_, Failure>(())
            }),
        );

        let timed_out =
            tokio::time::timeout(Duration::from_millis(10), handler.call(RequestContext::new(), ())).await;
        assert!(timed_out.is_err());

        assert_eq!(tracer.started(), 1);
        assert_eq!(tracer.ended(), 1);
        assert!(tracer.finished()[0].status.is_error());
    }

    #[test]
    fn test_middleware_name() {
        let middleware = TracingMiddleware::new(hermes_core::NoopTracer);
        assert_eq!(Middleware::<(), ()>::name(&middleware), "tracing");
    }
}
