//! Logging and tracing collaborators for the Hermes request pipeline.
//!
//! The middleware in `hermes-middleware` only sees the [`Logger`] and
//! [`Tracer`] traits from `hermes-core`. This crate provides the
//! implementations services install:
//!
//! - **Logging**: [`TracingLogger`] emits access records through `tracing`;
//!   [`init_logging`] installs a JSON or pretty subscriber writing to stdout
//!   or a file
//! - **Tracing**: [`OtelTracer`] records spans through OpenTelemetry;
//!   [`init_tracing`] installs the OTLP exporter and W3C propagator
//! - **Testing**: [`MemoryLogger`] and [`MemoryTracer`] capture everything in
//!   memory
//!
//! # Example
//!
//! ```rust,ignore
//! use hermes_telemetry::{TelemetryConfig, init_telemetry};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = TelemetryConfig::builder()
//!         .service_name("orders")
//!         .service_version("1.0.0")
//!         .environment("production")
//!         .otlp_endpoint("http://localhost:4317")
//!         .build();
//!
//!     let _guard = init_telemetry(config).expect("Failed to init telemetry");
//! }
//! ```
//!
//! [`Logger`]: hermes_core::Logger
//! [`Tracer`]: hermes_core::Tracer

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod logger;
pub mod logging;
pub mod memory;
pub mod tracing;

pub use config::{TelemetryConfig, TelemetryConfigBuilder};
pub use error::TelemetryError;
pub use logger::TracingLogger;
pub use logging::{init_logging, LogConfig, LogOutput};
pub use memory::{FinishedSpan, LogEntry, MemoryLogger, MemoryTracer};
pub use tracing::{init_tracing, OtelTracer, TracingConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Guard that shuts down telemetry providers on drop.
///
/// Keep it alive for the lifetime of the application. Dropping it flushes
/// pending spans and shuts the provider down.
pub struct TelemetryGuard {
    tracer_provider: Option<opentelemetry_sdk::trace::TracerProvider>,
}

impl TelemetryGuard {
    /// Creates a new telemetry guard.
    #[must_use]
    pub fn new(tracer_provider: Option<opentelemetry_sdk::trace::TracerProvider>) -> Self {
        Self { tracer_provider }
    }

    /// Returns true if a tracer provider is installed.
    #[must_use]
    pub fn is_tracing(&self) -> bool {
        self.tracer_provider.is_some()
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.tracer_provider.take() {
            for result in provider.force_flush() {
                if let Err(e) = result {
                    eprintln!("Error flushing tracer provider: {e}");
                }
            }
            if let Err(e) = provider.shutdown() {
                eprintln!("Error shutting down tracer provider: {e}");
            }
        }
    }
}

/// Initializes logging and tracing.
///
/// Logging is installed first so exporter failures can be reported.
///
/// # Errors
///
/// Returns `TelemetryError` if either subsystem fails to initialize.
pub fn init_telemetry(config: TelemetryConfig) -> TelemetryResult<TelemetryGuard> {
    init_logging(&config.logging)?;
    let tracer_provider = init_tracing(&config.tracing)?;
    if tracer_provider.is_some() {
        ::tracing::info!(
            service = %config.service_name,
            endpoint = %config.tracing.otlp_endpoint,
            "tracing enabled"
        );
    }
    Ok(TelemetryGuard::new(tracer_provider))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telemetry_guard_without_provider() {
        let guard = TelemetryGuard::new(None);
        assert!(!guard.is_tracing());
        drop(guard);
    }

    #[test]
    fn test_init_with_everything_disabled() {
        let mut config = TelemetryConfig::builder().without_tracing().build();
        config.logging.enabled = false;

        let guard = init_telemetry(config).unwrap();
        assert!(!guard.is_tracing());
    }
}
