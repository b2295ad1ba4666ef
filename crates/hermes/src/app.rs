//! Application wiring.
//!
//! [`App`] owns the logger and tracer a service hands to its middleware and
//! builds the default server chain and the outbound client from them. Both
//! collaborators are injected explicitly; nothing is looked up from globals
//! after construction.

use std::fmt;
use std::sync::Arc;

use hermes_client::HttpClient;
use hermes_config::HermesConfig;
use hermes_core::{BoxedHandler, Handler, Logger, NoopTracer, Payload, Tracer};
use hermes_middleware::stages::logging::CLIENT_KIND;
use hermes_middleware::{server_chain, Chain, LoggingMiddleware};
use hermes_telemetry::{init_telemetry, OtelTracer, TelemetryGuard, TracingLogger};

use crate::error::{AppError, AppResult};

/// Instrumentation scope for spans started by the application tracer.
pub const TRACER_NAME: &str = "hermes";

/// A wired service: configuration plus the collaborators every chain uses.
pub struct App {
    config: HermesConfig,
    logger: Arc<dyn Logger>,
    tracer: Arc<dyn Tracer>,
    telemetry: Option<TelemetryGuard>,
}

impl App {
    /// Creates a builder with default configuration.
    #[must_use]
    pub fn builder() -> AppBuilder {
        AppBuilder::default()
    }

    /// Validates `config`, initializes telemetry from it and wires the
    /// `tracing`-backed logger and, when tracing is enabled, the
    /// OpenTelemetry tracer.
    ///
    /// The telemetry guard lives as long as the returned `App`.
    ///
    /// # Errors
    ///
    /// Returns `AppError` if validation fails or telemetry cannot be
    /// initialized (for example, a global subscriber is already installed).
    pub fn from_config(config: HermesConfig) -> AppResult<Self> {
        config.validate()?;
        let guard = init_telemetry(config.telemetry())?;

        let tracer: Arc<dyn Tracer> = if guard.is_tracing() {
            Arc::new(OtelTracer::global(TRACER_NAME))
        } else {
            Arc::new(NoopTracer)
        };
        let logger = Arc::new(TracingLogger::with_level_name(&config.logging.level));

        tracing::info!(
            service = %config.service.name,
            environment = %config.service.environment,
            tracing = guard.is_tracing(),
            "application wired"
        );

        Ok(Self {
            config,
            logger,
            tracer,
            telemetry: Some(guard),
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &HermesConfig {
        &self.config
    }

    /// Returns the shared logger.
    #[must_use]
    pub fn logger(&self) -> Arc<dyn Logger> {
        Arc::clone(&self.logger)
    }

    /// Returns the shared tracer.
    #[must_use]
    pub fn tracer(&self) -> Arc<dyn Tracer> {
        Arc::clone(&self.tracer)
    }

    /// Builds the default server chain (tracing, logging, recovery) over this
    /// application's collaborators.
    #[must_use]
    pub fn server_chain<Req, Res>(&self) -> Chain<Req, Res>
    where
        Req: Payload,
        Res: Send + 'static,
    {
        server_chain(self.logger(), self.tracer())
    }

    /// Wraps `handler` in the default server chain.
    pub fn serve<Req, Res, H>(&self, handler: H) -> BoxedHandler<Req, Res>
    where
        Req: Payload,
        Res: Send + 'static,
        H: Handler<Req, Res>,
    {
        self.server_chain().then(handler)
    }

    /// Builds a client for `client.endpoint` whose calls are logged as
    /// `client` records.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::MissingClientEndpoint`] if no endpoint is
    /// configured, or [`AppError::Client`] if it is invalid.
    pub fn client(&self) -> AppResult<HttpClient> {
        let endpoint = self
            .config
            .client
            .endpoint
            .as_deref()
            .ok_or(AppError::MissingClientEndpoint)?;

        let client = HttpClient::builder(endpoint)
            .timeout(self.config.client_timeout())
            .with(LoggingMiddleware::from_arc(self.logger()).with_kind(CLIENT_KIND))
            .build()?;
        Ok(client)
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("service", &self.config.service.name)
            .field("telemetry", &self.telemetry.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`App`] with explicitly injected collaborators.
///
/// Unlike [`App::from_config`] this never touches global telemetry state,
/// which makes it the entry point for tests.
#[derive(Default)]
pub struct AppBuilder {
    config: Option<HermesConfig>,
    logger: Option<Arc<dyn Logger>>,
    tracer: Option<Arc<dyn Tracer>>,
}

impl AppBuilder {
    /// Sets the configuration. Defaults to [`HermesConfig::default`].
    #[must_use]
    pub fn config(mut self, config: HermesConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the logger. Defaults to a [`TracingLogger`] at the configured
    /// level.
    #[must_use]
    pub fn logger<L: Logger>(self, logger: L) -> Self {
        self.shared_logger(Arc::new(logger))
    }

    /// Sets an already shared logger.
    #[must_use]
    pub fn shared_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Sets the tracer. Defaults to [`NoopTracer`].
    #[must_use]
    pub fn tracer<T: Tracer>(self, tracer: T) -> Self {
        self.shared_tracer(Arc::new(tracer))
    }

    /// Sets an already shared tracer.
    #[must_use]
    pub fn shared_tracer(mut self, tracer: Arc<dyn Tracer>) -> Self {
        self.tracer = Some(tracer);
        self
    }

    /// Validates the configuration and builds the application.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] if the configuration is invalid.
    pub fn build(self) -> AppResult<App> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let logger = self
            .logger
            .unwrap_or_else(|| Arc::new(TracingLogger::with_level_name(&config.logging.level)));
        let tracer = self.tracer.unwrap_or_else(|| Arc::new(NoopTracer));

        Ok(App {
            config,
            logger,
            tracer,
            telemetry: None,
        })
    }
}

impl fmt::Debug for AppBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppBuilder")
            .field("config", &self.config)
            .field("logger", &self.logger.is_some())
            .field("tracer", &self.tracer.is_some())
            .finish()
    }
}
