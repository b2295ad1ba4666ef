//! # Hermes Middleware
//!
//! Composable request middleware for the Hermes request pipeline.
//!
//! A middleware is a decorator over a [`Handler`](hermes_core::Handler): it
//! receives the next handler in the chain and returns a new handler that may
//! pre-process the request, delegate, and post-process the result. A
//! [`Chain`] folds an ordered list of middlewares around a terminal handler.
//!
//! ## Default Server Chain
//!
//! ```text
//! Request → Tracing → Logging → Recovery → Handler
//!                                            ↓
//! Result  ← Tracing ← Logging ← Recovery ←───┘
//! ```
//!
//! | Stage | Middleware | Purpose                                        |
//! |-------|------------|------------------------------------------------|
//! | 1     | Tracing    | Continue `traceparent`, open and end a span    |
//! | 2     | Logging    | Emit exactly one access record per request     |
//! | 3     | Recovery   | Convert handler panics into failures           |
//!
//! Tracing runs outermost so the access record carries the trace IDs;
//! recovery runs innermost so a panic is observed by logging and tracing as
//! an ordinary failure.
//!
//! ## Example
//!
//! ```
//! use hermes_core::{handler_fn, Failure, NoopTracer, RequestContext};
//! use hermes_middleware::{server_chain, Stage};
//! use hermes_telemetry::MemoryLogger;
//! use std::sync::Arc;
//!
//! let logger = Arc::new(MemoryLogger::new());
//! let chain = server_chain::<String, String>(logger, Arc::new(NoopTracer));
//! assert_eq!(chain.names(), Stage::all().iter().map(|s| s.name()).collect::<Vec<_>>());
//!
//! let handler = chain.then(handler_fn(|_ctx: RequestContext, req: String| async move {
//!     Ok::<_, Failure>(req)
//! }));
//! # let _ = handler;
//! ```

#![doc(html_root_url = "https://docs.rs/hermes-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod chain;
pub mod classify;
pub mod middleware;
pub mod stages;

pub use chain::{server_chain, Chain, Stage};
pub use classify::{classify, StructuredFailure, INTERNAL_CODE};
pub use middleware::{BoxedMiddleware, FnMiddleware, Middleware};
pub use stages::{Fault, LogRecord, LoggingMiddleware, RecoveryMiddleware, TracingMiddleware};
