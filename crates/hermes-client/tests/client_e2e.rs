//! End-to-end client calls against a local HTTP server.

use bytes::Bytes;
use hermes_client::{ClientRequest, HttpClient, REQUEST_ID_HEADER};
use hermes_core::{FieldValue, Failure, RequestContext, TraceParent, TransportInfo};
use hermes_middleware::stages::logging::{keys, CLIENT_KIND};
use hermes_middleware::LoggingMiddleware;
use hermes_telemetry::MemoryLogger;
use http::{Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

const TRACEPARENT: &str = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";

async fn route(req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
    let path = req.uri().path().to_string();
    let seen = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };
    let traceparent = seen("traceparent");
    let request_id = seen(REQUEST_ID_HEADER);

    let response = match path.as_str() {
        "/ok" => Response::builder()
            .header("x-seen-traceparent", traceparent)
            .header("x-seen-request-id", request_id)
            .body(Full::new(Bytes::from_static(b"pong"))),
        "/echo" => {
            let body = req.into_body().collect().await.map(|b| b.to_bytes()).unwrap_or_default();
            Response::builder().body(Full::new(body))
        }
        "/slow" => {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Response::builder().body(Full::new(Bytes::from_static(b"late")))
        }
        _ => Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::new())),
    };
    Ok(response.unwrap())
}

async fn start_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                continue;
            };
            tokio::spawn(async move {
                let _ = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service_fn(route))
                    .await;
            });
        }
    });

    addr
}

fn client(addr: SocketAddr, timeout: Duration) -> HttpClient {
    HttpClient::new(&format!("http://{addr}"), timeout).unwrap()
}

#[tokio::test]
async fn test_success_propagates_trace_and_request_id() {
    let addr = start_server().await;
    let client = client(addr, Duration::from_secs(2));

    let ctx = RequestContext::new()
        .with_remote_parent(TraceParent::parse(TRACEPARENT).unwrap())
        .with_span_id("b7ad6b7169203331");
    let request_id = ctx.request_id();

    let response = client.get(ctx, "/ok").await.unwrap();
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body_string().as_deref(), Some("pong"));
    assert_eq!(
        response.header("x-seen-traceparent"),
        Some("00-4bf92f3577b34da6a3ce929d0e0e4736-b7ad6b7169203331-01")
    );
    assert_eq!(
        response.header("x-seen-request-id"),
        Some(request_id.to_string().as_str())
    );
}

#[tokio::test]
async fn test_untraced_context_sends_no_traceparent() {
    let addr = start_server().await;
    let response = client(addr, Duration::from_secs(2))
        .get(RequestContext::new(), "/ok")
        .await
        .unwrap();
    assert_eq!(response.header("x-seen-traceparent"), Some(""));
}

#[tokio::test]
async fn test_post_body() {
    let addr = start_server().await;
    let response = client(addr, Duration::from_secs(2))
        .post(RequestContext::new(), "/echo", r#"{"id": 7}"#)
        .await
        .unwrap();
    let value: serde_json::Value = response.body_json().unwrap();
    assert_eq!(value["id"], 7);
}

#[tokio::test]
async fn test_error_status_is_business_failure() {
    let addr = start_server().await;
    let err = client(addr, Duration::from_secs(2))
        .get(RequestContext::new(), "/missing")
        .await
        .unwrap_err();
    assert_eq!(err, Failure::business(404, "Not Found"));
}

#[tokio::test]
async fn test_client_timeout() {
    let addr = start_server().await;
    let err = client(addr, Duration::from_millis(100))
        .get(RequestContext::new(), "/slow")
        .await
        .unwrap_err();
    assert_eq!(err, Failure::deadline_exceeded());
}

#[tokio::test]
async fn test_context_deadline_shorter_than_timeout() {
    let addr = start_server().await;
    let ctx = RequestContext::new().with_timeout(Duration::from_millis(100));
    let err = client(addr, Duration::from_secs(5))
        .get(ctx, "/slow")
        .await
        .unwrap_err();
    assert_eq!(err, Failure::deadline_exceeded());
}

#[tokio::test]
async fn test_cancel_in_flight() {
    let addr = start_server().await;
    let ctx = RequestContext::new();
    let token = ctx.cancellation_token().clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
    });

    let err = client(addr, Duration::from_secs(5))
        .get(ctx, "/slow")
        .await
        .unwrap_err();
    assert_eq!(err, Failure::cancelled());
}

#[tokio::test]
async fn test_cancelled_before_send() {
    let addr = start_server().await;
    let ctx = RequestContext::new();
    ctx.cancel();
    let err = client(addr, Duration::from_secs(2))
        .get(ctx, "/ok")
        .await
        .unwrap_err();
    assert_eq!(err, Failure::cancelled());
}

#[tokio::test]
async fn test_connection_refused_is_generic() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(addr, Duration::from_secs(2))
        .get(RequestContext::new(), "/ok")
        .await
        .unwrap_err();
    assert!(!err.is_business());
    assert!(err.to_string().starts_with("request failed"), "{err}");
}

#[tokio::test]
async fn test_client_access_record() {
    let addr = start_server().await;
    let logger = Arc::new(MemoryLogger::new());
    let client = HttpClient::builder(&format!("http://{addr}"))
        .with(LoggingMiddleware::from_arc(logger.clone()).with_kind(CLIENT_KIND))
        .build()
        .unwrap();

    // The inbound server context is replaced by the outbound call's transport.
    let server_ctx =
        RequestContext::new().with_transport(TransportInfo::grpc("/alerts.Alerts/Notify"));
    let _ = client
        .invoke(server_ctx, ClientRequest::get("/missing?verbose=1"))
        .await;

    let entries = logger.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].str(keys::KIND), Some("client"));
    assert_eq!(entries[0].str(keys::COMPONENT), Some("http"));
    assert_eq!(entries[0].str(keys::OPERATION), Some("/missing"));
    assert_eq!(entries[0].str(keys::ARGS), Some("GET /missing?verbose=1"));
    assert_eq!(entries[0].field(keys::CODE), Some(&FieldValue::Int(404)));
}
