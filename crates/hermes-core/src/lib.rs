//! # Hermes Core
//!
//! Core types and traits for the Hermes request pipeline.
//!
//! This crate provides the foundational types every other Hermes crate builds on:
//!
//! - [`RequestContext`] - Per-request context carrying deadline, cancellation, transport and trace data
//! - [`RequestId`] - UUID v7 request identifier
//! - [`TransportInfo`] - Transport kind, operation name and metadata headers
//! - [`TraceParent`] - W3C `traceparent` parsing
//! - [`Failure`] - The error taxonomy handlers report
//! - [`Handler`] - Core handler trait
//! - [`Logger`] and [`Tracer`] - Collaborators injected into middleware

#![doc(html_root_url = "https://docs.rs/hermes-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod error;
mod handler;
pub mod log;
mod payload;
pub mod trace;
mod transport;

pub use context::{RequestContext, RequestId};
pub use error::{Failure, FailureResult};
pub use handler::{handler_fn, BoxFuture, BoxedHandler, FnHandler, Handler};
pub use log::{FieldValue, Fields, Level, Logger};
pub use payload::Payload;
pub use trace::{NoopTracer, Span, SpanStatus, TraceFlags, TraceParent, Tracer, TRACEPARENT_HEADER};
pub use transport::{TransportInfo, TransportKind};
