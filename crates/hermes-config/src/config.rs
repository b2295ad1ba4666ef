//! Main configuration types.
//!
//! This module provides the top-level [`HermesConfig`] struct and its builder.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{ClientConfig, ConfigError, LogFormat, LoggingConfig, ServiceConfig, TracingConfig};

/// Complete Hermes service configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use hermes_config::HermesConfig;
///
/// let config = HermesConfig::default();
/// assert_eq!(config.service.name, "hermes-service");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct HermesConfig {
    /// Service identity.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Tracing configuration.
    #[serde(default)]
    pub tracing: TracingConfig,

    /// Outbound client configuration.
    #[serde(default)]
    pub client: ClientConfig,
}

impl HermesConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> HermesConfigBuilder {
        HermesConfigBuilder::new()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - The service name is empty
    /// - Sampling ratio is not in 0.0..=1.0
    /// - Tracing is enabled with an empty endpoint
    /// - The client endpoint is not an `http` URL
    /// - The client timeout is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service.name.trim().is_empty() {
            return Err(ConfigError::invalid_value("service.name", "must not be empty"));
        }

        if !(0.0..=1.0).contains(&self.tracing.sampling_ratio) {
            return Err(ConfigError::invalid_value(
                "tracing.sampling_ratio",
                "must be between 0.0 and 1.0",
            ));
        }

        if self.tracing.enabled
            && self
                .tracing
                .otlp_endpoint
                .as_deref()
                .is_some_and(|e| e.trim().is_empty())
        {
            return Err(ConfigError::invalid_value(
                "tracing.otlp_endpoint",
                "must not be empty when tracing is enabled",
            ));
        }

        if let Some(endpoint) = &self.client.endpoint {
            if !endpoint.starts_with("http://") {
                return Err(ConfigError::invalid_value(
                    "client.endpoint",
                    format!("expected an http:// URL, got {endpoint}"),
                ));
            }
        }

        if self.client.timeout_ms == 0 {
            return Err(ConfigError::invalid_value(
                "client.timeout_ms",
                "must be greater than zero",
            ));
        }

        Ok(())
    }

    /// Create a development configuration preset.
    ///
    /// Pretty, coloured debug logs with source locations.
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();

        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config.logging.ansi_enabled = true;
        config.logging.include_location = true;

        config.service.environment = "development".to_string();

        config
    }

    /// Create a production configuration preset.
    ///
    /// JSON logs at `info` and span export at a 10% sampling ratio.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();

        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;
        config.logging.ansi_enabled = false;

        config.tracing.enabled = true;
        config.tracing.sampling_ratio = 0.1;

        config.service.environment = "production".to_string();

        config
    }

    /// Returns the client timeout.
    #[must_use]
    pub const fn client_timeout(&self) -> Duration {
        Duration::from_millis(self.client.timeout_ms)
    }

    /// Converts the logging and tracing sections into telemetry settings.
    #[must_use]
    pub fn telemetry(&self) -> hermes_telemetry::TelemetryConfig {
        let logging = hermes_telemetry::LogConfig {
            enabled: self.logging.enabled,
            level: self.logging.level.clone(),
            json_format: self.logging.format == LogFormat::Json,
            file_line_info: self.logging.include_location,
            ansi: self.logging.ansi_enabled,
            output: self
                .logging
                .file
                .as_ref()
                .map_or(hermes_telemetry::LogOutput::Stdout, |path| {
                    hermes_telemetry::LogOutput::File(path.into())
                }),
            ..hermes_telemetry::LogConfig::production()
        };

        let defaults = hermes_telemetry::TracingConfig::default();
        let tracing = hermes_telemetry::TracingConfig {
            enabled: self.tracing.enabled,
            otlp_endpoint: self
                .tracing
                .otlp_endpoint
                .clone()
                .unwrap_or(defaults.otlp_endpoint),
            sample_ratio: self.tracing.sampling_ratio,
            ..defaults
        };

        let mut builder = hermes_telemetry::TelemetryConfig::builder()
            .service_name(&self.service.name)
            .environment(&self.service.environment)
            .logging(logging)
            .tracing(tracing);
        if let Some(version) = &self.service.version {
            builder = builder.service_version(version);
        }
        builder.build()
    }
}

/// Builder for [`HermesConfig`].
#[derive(Debug, Default)]
pub struct HermesConfigBuilder {
    service: Option<ServiceConfig>,
    logging: Option<LoggingConfig>,
    tracing: Option<TracingConfig>,
    client: Option<ClientConfig>,
}

impl HermesConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the service section.
    #[must_use]
    pub fn service(mut self, service: ServiceConfig) -> Self {
        self.service = Some(service);
        self
    }

    /// Set the logging section.
    #[must_use]
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Set the tracing section.
    #[must_use]
    pub fn tracing(mut self, tracing: TracingConfig) -> Self {
        self.tracing = Some(tracing);
        self
    }

    /// Set the client section.
    #[must_use]
    pub fn client(mut self, client: ClientConfig) -> Self {
        self.client = Some(client);
        self
    }

    /// Build the configuration.
    ///
    /// Any unset sections will use their default values.
    #[must_use]
    pub fn build(self) -> HermesConfig {
        HermesConfig {
            service: self.service.unwrap_or_default(),
            logging: self.logging.unwrap_or_default(),
            tracing: self.tracing.unwrap_or_default(),
            client: self.client.unwrap_or_default(),
        }
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if validation fails.
    pub fn build_validated(self) -> Result<HermesConfig, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_telemetry::LogOutput;

    #[test]
    fn test_default_config_is_valid() {
        let config = HermesConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.client_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_presets() {
        let dev = HermesConfig::development();
        assert_eq!(dev.logging.level, "debug");
        assert_eq!(dev.logging.format, LogFormat::Pretty);
        assert!(!dev.tracing.enabled);

        let prod = HermesConfig::production();
        assert_eq!(prod.logging.format, LogFormat::Json);
        assert!(prod.tracing.enabled);
        assert_eq!(prod.service.environment, "production");
        assert!(prod.validate().is_ok());
    }

    #[test]
    fn test_builder_sections() {
        let config = HermesConfig::builder()
            .service(ServiceConfig {
                name: "alerting".to_string(),
                ..Default::default()
            })
            .client(ClientConfig {
                endpoint: Some("http://127.0.0.1:8000".to_string()),
                timeout_ms: 250,
            })
            .build_validated()
            .unwrap();

        assert_eq!(config.service.name, "alerting");
        assert_eq!(config.client_timeout(), Duration::from_millis(250));
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_validation_failures() {
        let mut config = HermesConfig::default();
        config.tracing.sampling_ratio = 1.5;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue { .. })));

        let mut config = HermesConfig::default();
        config.client.timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = HermesConfig::default();
        config.client.endpoint = Some("ftp://files".to_string());
        assert!(config.validate().is_err());

        let mut config = HermesConfig::default();
        config.service.name = " ".to_string();
        assert!(config.validate().is_err());

        let mut config = HermesConfig::default();
        config.tracing.enabled = true;
        config.tracing.otlp_endpoint = Some(String::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_telemetry_conversion() {
        let mut config = HermesConfig::development();
        config.service.name = "alerting".to_string();
        config.service.version = Some("1.2.0".to_string());
        config.logging.file = Some("/var/log/alerting.log".to_string());
        config.tracing.otlp_endpoint = Some("http://collector:4317".to_string());

        let telemetry = config.telemetry();
        assert_eq!(telemetry.service_name, "alerting");
        assert_eq!(telemetry.tracing.service_version, "1.2.0");
        assert_eq!(telemetry.tracing.otlp_endpoint, "http://collector:4317");
        assert!(!telemetry.tracing.enabled);
        assert_eq!(telemetry.logging.level, "debug");
        assert!(!telemetry.logging.json_format);
        assert!(telemetry.logging.file_line_info);
        assert_eq!(
            telemetry.logging.output,
            LogOutput::File("/var/log/alerting.log".into())
        );
        assert_eq!(telemetry.logging.service_name, "alerting");
    }
}
