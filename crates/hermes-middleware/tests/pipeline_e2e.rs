//! End-to-end pipeline integration tests.
//!
//! These tests run the default server chain in its real order:
//!
//! 1. Tracing - Continue or start the trace, one span per request
//! 2. Logging - One access record per request
//! 3. Recovery - Convert panics into failures
//!
//! with in-memory collaborators standing in for the production logger and
//! tracer.

use hermes_core::{
    handler_fn, BoxedHandler, Failure, FieldValue, Handler, RequestContext, SpanStatus,
    TransportInfo,
};
use hermes_middleware::stages::logging::{keys, INCOMPLETE_REASON};
use hermes_middleware::{server_chain, Chain, LoggingMiddleware, RecoveryMiddleware};
use hermes_telemetry::{MemoryLogger, MemoryTracer};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const TRACEPARENT: &str = "00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01";

struct Harness {
    logger: Arc<MemoryLogger>,
    tracer: Arc<MemoryTracer>,
}

impl Harness {
    fn new() -> Self {
        Self {
            logger: Arc::new(MemoryLogger::new()),
            tracer: Arc::new(MemoryTracer::new()),
        }
    }

    fn serve<H>(&self, handler: H) -> BoxedHandler<String, String>
    where
        H: Handler<String, String>,
    {
        server_chain(self.logger.clone(), self.tracer.clone()).then(handler)
    }
}

fn grpc_ctx(operation: &str) -> RequestContext {
    RequestContext::new().with_transport(TransportInfo::grpc(operation))
}

#[tokio::test]
async fn test_success_record() {
    let harness = Harness::new();
    let handler = harness.serve(handler_fn(|_ctx: RequestContext, name: String| async move {
        Ok::<_, Failure>(format!("hello {name}"))
    }));

    let reply = handler
        .call(grpc_ctx("/greeter.Greeter/SayHello"), "world".to_string())
        .await
        .unwrap();
    assert_eq!(reply, "hello world");

    let entries = harness.logger.entries();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.str(keys::KIND), Some("server"));
    assert_eq!(entry.str(keys::COMPONENT), Some("grpc"));
    assert_eq!(entry.str(keys::OPERATION), Some("/greeter.Greeter/SayHello"));
    assert_eq!(entry.str(keys::ARGS), Some("world"));
    assert_eq!(entry.field(keys::CODE), Some(&FieldValue::Int(0)));
    assert_eq!(entry.str(keys::REASON), Some(""));
    assert_eq!(entry.field(keys::STACK), Some(&FieldValue::Null));
    assert!(entry.field(keys::LATENCY).and_then(FieldValue::as_f64).unwrap() >= 0.0);

    let spans = harness.tracer.finished();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].status, SpanStatus::Ok);
}

#[tokio::test]
async fn test_business_failure_passes_through() {
    let harness = Harness::new();
    let handler = harness.serve(handler_fn(|_ctx: RequestContext, _: String| async move {
        Err::<String, _>(Failure::business(404, "not found"))
    }));

    let err = handler
        .call(grpc_ctx("/users.Users/Get"), "id=7".to_string())
        .await
        .unwrap_err();
    assert_eq!(err, Failure::business(404, "not found"));

    let entry = &harness.logger.entries()[0];
    assert_eq!(entry.field(keys::CODE), Some(&FieldValue::Int(404)));
    assert_eq!(entry.str(keys::REASON), Some("not found"));
    assert_eq!(entry.str(keys::STACK), Some("error: code = 404 reason = not found"));
    assert!(harness.tracer.finished()[0].status.is_error());
}

#[tokio::test]
async fn test_generic_failure_is_internal() {
    let harness = Harness::new();
    let handler = harness.serve(handler_fn(|_ctx: RequestContext, _: String| async move {
        Err::<String, _>(Failure::generic("database unavailable"))
    }));

    handler.call(RequestContext::new(), String::new()).await.unwrap_err();

    let entry = &harness.logger.entries()[0];
    assert_eq!(entry.field(keys::CODE), Some(&FieldValue::Int(500)));
    assert_eq!(entry.str(keys::REASON), Some("database unavailable"));
    assert_eq!(entry.str(keys::COMPONENT), Some(""));
    assert_eq!(entry.str(keys::OPERATION), Some(""));
}

#[tokio::test]
async fn test_panic_becomes_internal_failure() {
    let harness = Harness::new();
    let handler = harness.serve(handler_fn(|_ctx: RequestContext, _: String| async move {
        if true {
            panic!("index out of range");
        }
        Ok::<String, Failure>(String::new())
    }));

    let err = handler
        .call(grpc_ctx("/orders.Orders/Create"), "{}".to_string())
        .await
        .unwrap_err();
    assert!(!err.is_business());
    assert!(err.to_string().contains("index out of range"));

    let entries = harness.logger.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].field(keys::CODE), Some(&FieldValue::Int(500)));
    assert!(entries[0].str(keys::REASON).unwrap().contains("index out of range"));
    assert!(!entries[0].str(keys::STACK).unwrap().is_empty());

    assert_eq!(harness.tracer.started(), 1);
    assert_eq!(harness.tracer.ended(), 1);
    assert!(harness.tracer.finished()[0].status.is_error());
}

#[tokio::test]
async fn test_runtime_fault_becomes_internal_failure() {
    let harness = Harness::new();
    let handler = harness.serve(handler_fn(|_ctx: RequestContext, req: String| async move {
        let quantities: Vec<u32> = Vec::new();
        let position = req.len();
        let first = quantities[position];
        let parsed = req.parse::<u32>().ok();
        Ok::<_, Failure>((first + parsed.unwrap()).to_string())
    }));

    let err = handler
        .call(grpc_ctx("/orders.Orders/Quote"), "7".to_string())
        .await
        .unwrap_err();
    assert!(!err.is_business());
    assert!(err.to_string().contains("index out of bounds"), "{err}");

    let handler = harness.serve(handler_fn(|_ctx: RequestContext, req: String| async move {
        let customer: Option<&str> = req.split_once(':').map(|(id, _)| id);
        Ok::<_, Failure>(customer.unwrap().to_string())
    }));
    let err = handler
        .call(grpc_ctx("/orders.Orders/Owner"), "no-separator".to_string())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("on a `None` value"), "{err}");

    let entries = harness.logger.entries();
    assert_eq!(entries.len(), 2);
    for entry in &entries {
        assert_eq!(entry.field(keys::CODE), Some(&FieldValue::Int(500)));
        assert!(!entry.str(keys::STACK).unwrap().is_empty());
    }
    assert_eq!(harness.tracer.started(), harness.tracer.ended());
}

#[tokio::test]
async fn test_pipeline_serves_after_panic() {
    let harness = Harness::new();
    let handler = harness.serve(handler_fn(|_ctx: RequestContext, req: String| async move {
        assert!(req != "boom", "bad request");
        Ok::<_, Failure>(req)
    }));

    handler.call(RequestContext::new(), "boom".to_string()).await.unwrap_err();
    let reply = handler.call(RequestContext::new(), "fine".to_string()).await.unwrap();

    assert_eq!(reply, "fine");
    assert_eq!(harness.logger.len(), 2);
    assert_eq!(harness.tracer.started(), 2);
    assert_eq!(harness.tracer.ended(), 2);
}

#[tokio::test]
async fn test_log_record_carries_trace() {
    let harness = Harness::new();
    let handler = harness.serve(handler_fn(|_ctx: RequestContext, req: String| async move {
        Ok::<_, Failure>(req)
    }));

    let ctx = RequestContext::new().with_transport(
        TransportInfo::http("/api/orders").with_header("traceparent", TRACEPARENT),
    );
    handler.call(ctx, String::new()).await.unwrap();

    let entry = &harness.logger.entries()[0];
    let span = &harness.tracer.finished()[0];
    assert_eq!(entry.trace_id.as_deref(), Some("0af7651916cd43dd8448eb211c80319c"));
    assert_eq!(entry.span_id.as_deref(), Some(span.span_id.as_str()));
    assert_eq!(span.parent_span_id.as_deref(), Some("b7ad6b7169203331"));
    assert_eq!(entry.str(keys::COMPONENT), Some("http"));
}

#[tokio::test]
async fn test_cancelled_context_reaches_handler() {
    let harness = Harness::new();
    let handler = harness.serve(handler_fn(|ctx: RequestContext, req: String| async move {
        ctx.check()?;
        Ok::<_, Failure>(req)
    }));

    let token = CancellationToken::new();
    token.cancel();
    let ctx = grpc_ctx("/svc/Op").with_cancellation_token(token);

    let err = handler.call(ctx, String::new()).await.unwrap_err();
    assert_eq!(err, Failure::cancelled());

    let entries = harness.logger.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].field(keys::CODE), Some(&FieldValue::Int(500)));
    assert_eq!(entries[0].str(keys::REASON), Some("context canceled"));
}

#[tokio::test]
async fn test_expired_deadline_reaches_handler() {
    let harness = Harness::new();
    let handler = harness.serve(handler_fn(|ctx: RequestContext, req: String| async move {
        ctx.check()?;
        Ok::<_, Failure>(req)
    }));

    let ctx = grpc_ctx("/svc/Op").with_timeout(Duration::ZERO);
    let err = handler.call(ctx, String::new()).await.unwrap_err();
    assert_eq!(err, Failure::deadline_exceeded());

    let entries = harness.logger.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].str(keys::REASON), Some("context deadline exceeded"));
}

#[tokio::test]
async fn test_latency_tracks_handler_duration() {
    let harness = Harness::new();
    let handler = harness.serve(handler_fn(|_ctx: RequestContext, req: String| async move {
        let millis: u64 = req.parse().unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(millis)).await;
        Ok::<_, Failure>(req)
    }));

    handler.call(RequestContext::new(), "0".to_string()).await.unwrap();
    handler.call(RequestContext::new(), "50".to_string()).await.unwrap();

    let latencies: Vec<f64> = harness
        .logger
        .entries()
        .iter()
        .map(|e| e.field(keys::LATENCY).and_then(FieldValue::as_f64).unwrap())
        .collect();
    assert!(latencies[1] >= 0.05);
    assert!(latencies[1] > latencies[0]);
}

#[tokio::test]
async fn test_concurrent_requests_each_logged_once() {
    let harness = Harness::new();
    let handler = harness.serve(handler_fn(|_ctx: RequestContext, req: String| async move {
        tokio::time::sleep(Duration::from_millis(5)).await;
        if req.ends_with('7') {
            return Err(Failure::business(409, "conflict"));
        }
        Ok(req)
    }));

    let mut tasks = Vec::new();
    let mut ids = Vec::new();
    for i in 0..32 {
        let handler = Arc::clone(&handler);
        let ctx = grpc_ctx("/svc/Op");
        ids.push(ctx.request_id());
        tasks.push(tokio::spawn(async move { handler.call(ctx, i.to_string()).await }));
    }
    for task in tasks {
        let _ = task.await.unwrap();
    }

    assert_eq!(harness.logger.len(), 32);
    for id in ids {
        assert_eq!(harness.logger.entries_for(id).len(), 1);
    }
    assert_eq!(harness.tracer.started(), 32);
    assert_eq!(harness.tracer.ended(), 32);
}

#[tokio::test]
async fn test_custom_chain_order() {
    let logger = Arc::new(MemoryLogger::new());
    // Recovery outside logging: the panic unwinds through the logging stage.
    let chain: Chain<String, String> = Chain::new()
        .with(RecoveryMiddleware::new())
        .with(LoggingMiddleware::from_arc(logger.clone()));
    let handler = chain.then(handler_fn(|_ctx: RequestContext, _: String| async move {
        if true {
            panic!("lost");
        }
        Ok::<String, Failure>(String::new())
    }));

    let err = handler.call(RequestContext::new(), String::new()).await.unwrap_err();
    assert!(err.to_string().contains("lost"));

    let entries = logger.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].field(keys::CODE), Some(&FieldValue::Int(500)));
    assert_eq!(entries[0].str(keys::REASON), Some(INCOMPLETE_REASON));
}

#[tokio::test]
async fn test_timed_out_request_logged_once() {
    let harness = Harness::new();
    let handler = harness.serve(handler_fn(|_ctx: RequestContext, req: String| async move {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok::<_, Failure>(req)
    }));

    let ctx = grpc_ctx("/reports.Reports/Build");
    let request_id = ctx.request_id();
    let timed_out =
        tokio::time::timeout(Duration::from_millis(10), handler.call(ctx, "q1".to_string())).await;
    assert!(timed_out.is_err());

    let entries = harness.logger.entries_for(request_id);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].field(keys::CODE), Some(&FieldValue::Int(500)));
    assert_eq!(entries[0].str(keys::REASON), Some(INCOMPLETE_REASON));
    assert_eq!(entries[0].str(keys::OPERATION), Some("/reports.Reports/Build"));
    assert_eq!(harness.tracer.started(), 1);
    assert_eq!(harness.tracer.ended(), 1);
}
