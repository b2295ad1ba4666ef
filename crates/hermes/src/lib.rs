//! # Hermes
//!
//! **Request middleware pipeline for RPC/HTTP services**
//!
//! Hermes wraps every request handler in a fixed set of cross-cutting
//! stages and ships the collaborators those stages need:
//!
//! - **Tracing** – continue the caller's W3C trace and record one span per request
//! - **Access logging** – exactly one structured record per request, with
//!   latency and a classified failure code
//! - **Panic recovery** – a panicking handler becomes a `500` failure
//! - **Configuration** – layered file and environment configuration
//! - **Outbound client** – HTTP calls through the same middleware model
//!
//! ## Quick Start
//!
//! ```no_run
//! use hermes::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::new()
//!     .with_optional_file("hermes.yaml")?
//!     .with_env_prefix("HERMES")
//!     .load()?;
//! let app = App::from_config(config)?;
//!
//! let handler = app.serve(handler_fn(|_ctx: RequestContext, name: String| async move {
//!     if name.is_empty() {
//!         return Err(Failure::business(400, "name is required"));
//!     }
//!     Ok(format!("hello {name}"))
//! }));
//! # let _ = handler;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Request → Tracing → Logging → Recovery → Handler
//!                                            ↓
//! Result  ← Tracing ← Logging ← Recovery ←───┘
//! ```

#![doc(html_root_url = "https://docs.rs/hermes/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod app;
mod error;

pub use app::{App, AppBuilder, TRACER_NAME};
pub use error::{AppError, AppResult};

// Re-export core types
pub use hermes_core as core;

// Re-export middleware types
pub use hermes_middleware as middleware;

// Re-export telemetry types
pub use hermes_telemetry as telemetry;

// Re-export configuration types
pub use hermes_config as config;

// Re-export client types
pub use hermes_client as client;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```
/// use hermes::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{App, AppBuilder, AppError, AppResult};

    pub use hermes_core::{
        handler_fn, BoxedHandler, Failure, Handler, Logger, Payload, RequestContext, RequestId,
        TraceParent, Tracer, TransportInfo,
    };

    pub use hermes_middleware::{
        classify, server_chain, Chain, LoggingMiddleware, Middleware, RecoveryMiddleware,
        StructuredFailure, TracingMiddleware,
    };

    pub use hermes_telemetry::{MemoryLogger, MemoryTracer, OtelTracer, TracingLogger};

    pub use hermes_config::{Config, ConfigLoader, FileConfig, HermesConfig};

    pub use hermes_client::{ClientRequest, ClientResponse, HttpClient};
}
