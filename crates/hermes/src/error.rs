//! Application wiring errors.

use thiserror::Error;

/// Errors raised while wiring an [`App`](crate::App).
#[derive(Debug, Error)]
pub enum AppError {
    /// The configuration failed validation.
    #[error(transparent)]
    Config(#[from] hermes_config::ConfigError),

    /// Logging or tracing could not be initialized.
    #[error(transparent)]
    Telemetry(#[from] hermes_telemetry::TelemetryError),

    /// The outbound client could not be built.
    #[error(transparent)]
    Client(#[from] hermes_client::ClientError),

    /// A client was requested but no endpoint is configured.
    #[error("client.endpoint is not configured")]
    MissingClientEndpoint,
}

/// Result type for application wiring.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transparent_display() {
        let err: AppError = hermes_client::ClientError::InvalidTimeout.into();
        assert_eq!(err.to_string(), "timeout must be greater than zero");
        assert_eq!(
            AppError::MissingClientEndpoint.to_string(),
            "client.endpoint is not configured"
        );
    }
}
