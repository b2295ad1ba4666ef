//! # Hermes Client
//!
//! Outbound HTTP client for Hermes services.
//!
//! Every call runs through a [`Chain`](hermes_middleware::Chain) whose
//! innermost stage is [`RecoveryMiddleware`](hermes_middleware::RecoveryMiddleware),
//! so a panic anywhere below the caller's middleware comes back as a
//! failure. The transport:
//!
//! - bounds each call by the client timeout and the context deadline,
//!   whichever is sooner
//! - aborts when the context is cancelled
//! - propagates `traceparent` and `x-request-id`
//! - maps non-2xx responses to `Failure::Business` with the status code
//!
//! ## Example
//!
//! ```no_run
//! use hermes_client::HttpClient;
//! use hermes_core::RequestContext;
//! use hermes_middleware::{stages::logging::CLIENT_KIND, LoggingMiddleware};
//! use hermes_telemetry::TracingLogger;
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::builder("http://127.0.0.1:8000")
//!     .timeout(Duration::from_secs(2))
//!     .with(LoggingMiddleware::new(TracingLogger::new()).with_kind(CLIENT_KIND))
//!     .build()?;
//!
//! let alerts = client.get(RequestContext::new(), "/v1/alerts").await?;
//! # let _ = alerts;
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/hermes-client/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod request;

pub use client::{HttpClient, HttpClientBuilder, REQUEST_ID_HEADER};
pub use error::{ClientError, ClientResult};
pub use request::{ClientRequest, ClientResponse};
