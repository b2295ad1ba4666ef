//! Built-in middleware stages.
//!
//! 1. [`tracing`] - Continue the caller's trace and record a span
//! 2. [`logging`] - Emit one structured access record per request
//! 3. [`recovery`] - Convert panics into failures

pub mod logging;
pub mod recovery;
pub mod tracing;

// Re-export main types
pub use logging::{LogRecord, LoggingMiddleware};
pub use recovery::{Fault, RecoveryMiddleware};
pub use tracing::TracingMiddleware;
