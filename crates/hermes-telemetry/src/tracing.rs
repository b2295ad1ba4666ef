//! OpenTelemetry distributed tracing for Hermes.
//!
//! This module sets up OTLP export and W3C trace context propagation, and
//! provides [`OtelTracer`], the [`Tracer`] implementation the tracing
//! middleware uses in production.
//!
//! # Example
//!
//! ```rust,ignore
//! use hermes_telemetry::tracing::{TracingConfig, init_tracing, OtelTracer};
//!
//! let provider = init_tracing(&TracingConfig::default())?;
//! let tracer = OtelTracer::global("orders");
//! ```

use crate::error::TelemetryError;
use crate::TelemetryResult;
use hermes_core::{FieldValue, RequestContext, Span, SpanStatus, TransportInfo, Tracer};
use opentelemetry::propagation::Extractor;
use opentelemetry::trace::{
    Span as _, SpanContext, SpanId, SpanKind, Status, TraceContextExt, TraceFlags, TraceId,
    TraceState, Tracer as _,
};
use opentelemetry::{global, Context, KeyValue, Value};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{RandomIdGenerator, Sampler, TracerProvider};
use opentelemetry_sdk::Resource;
use std::fmt;

/// Tracing configuration.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Whether tracing is enabled.
    pub enabled: bool,

    /// OTLP endpoint (e.g., `http://localhost:4317`).
    pub otlp_endpoint: String,

    /// Service name for spans.
    pub service_name: String,

    /// Service version.
    pub service_version: String,

    /// Deployment environment.
    pub environment: String,

    /// Sampling ratio (0.0 to 1.0).
    pub sample_ratio: f64,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            otlp_endpoint: "http://localhost:4317".to_string(),
            service_name: "hermes".to_string(),
            service_version: "0.1.0".to_string(),
            environment: "development".to_string(),
            sample_ratio: 1.0,
        }
    }
}

impl TracingConfig {
    /// Creates a production configuration with lower sampling.
    #[must_use]
    pub fn production(service_name: &str, version: &str) -> Self {
        Self {
            enabled: true,
            otlp_endpoint: "http://localhost:4317".to_string(),
            service_name: service_name.to_string(),
            service_version: version.to_string(),
            environment: "production".to_string(),
            sample_ratio: 0.1,
        }
    }

    fn sampler(&self) -> Sampler {
        if self.sample_ratio >= 1.0 {
            Sampler::AlwaysOn
        } else if self.sample_ratio <= 0.0 {
            Sampler::AlwaysOff
        } else {
            Sampler::TraceIdRatioBased(self.sample_ratio)
        }
    }
}

/// Initializes the tracing subsystem.
///
/// Installs the W3C trace context propagator and a batch OTLP exporter as
/// the global tracer provider.
///
/// Returns the `TracerProvider` for later shutdown, or `None` when tracing is
/// disabled.
///
/// # Errors
///
/// Returns `TelemetryError::InvalidConfig` for an empty endpoint and
/// `TelemetryError::TracingInit` if the exporter cannot be built.
pub fn init_tracing(config: &TracingConfig) -> TelemetryResult<Option<TracerProvider>> {
    if !config.enabled {
        return Ok(None);
    }
    if config.otlp_endpoint.trim().is_empty() {
        return Err(TelemetryError::InvalidConfig(
            "otlp_endpoint must not be empty".to_string(),
        ));
    }

    let resource = Resource::new([
        KeyValue::new(
            opentelemetry_semantic_conventions::attribute::SERVICE_NAME,
            config.service_name.clone(),
        ),
        KeyValue::new(
            opentelemetry_semantic_conventions::attribute::SERVICE_VERSION,
            config.service_version.clone(),
        ),
        KeyValue::new("deployment.environment", config.environment.clone()),
    ]);

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&config.otlp_endpoint)
        .build()
        .map_err(|e| TelemetryError::TracingInit(e.to_string()))?;

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
        .with_sampler(config.sampler())
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(resource)
        .build();

    global::set_text_map_propagator(TraceContextPropagator::new());
    global::set_tracer_provider(provider.clone());

    Ok(Some(provider))
}

/// Shuts down the tracing subsystem gracefully.
pub fn shutdown_tracing() {
    global::shutdown_tracer_provider();
}

/// Returns a tracer from the global provider.
#[must_use]
pub fn tracer(name: &'static str) -> global::BoxedTracer {
    global::tracer(name)
}

/// Reads propagation headers out of [`TransportInfo`] metadata.
pub struct MetadataExtractor<'a>(pub &'a TransportInfo);

impl Extractor for MetadataExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.header(key)
    }

    fn keys(&self) -> Vec<&str> {
        self.0.headers().map(|(name, _)| name).collect()
    }
}

/// [`Tracer`] backed by an OpenTelemetry tracer.
///
/// The parent of each span is chosen from the request context, in order:
///
/// 1. the current local span (`trace_id` and `span_id` both set)
/// 2. the remote parent parsed from `traceparent`
/// 3. whatever the global propagator extracts from the transport metadata
///
/// With none of these the span starts a new trace.
pub struct OtelTracer<T = global::BoxedTracer> {
    tracer: T,
    kind: SpanKind,
}

impl OtelTracer {
    /// Creates a tracer named `name` from the global provider.
    #[must_use]
    pub fn global(name: &'static str) -> Self {
        Self::new(global::tracer(name))
    }
}

impl<T> OtelTracer<T> {
    /// Wraps an OpenTelemetry tracer. Spans default to [`SpanKind::Server`].
    pub const fn new(tracer: T) -> Self {
        Self {
            tracer,
            kind: SpanKind::Server,
        }
    }

    /// Sets the kind of span this tracer starts.
    #[must_use]
    pub fn with_kind(mut self, kind: SpanKind) -> Self {
        self.kind = kind;
        self
    }
}

impl<T> fmt::Debug for OtelTracer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OtelTracer")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl<T> Tracer for OtelTracer<T>
where
    T: opentelemetry::trace::Tracer + Send + Sync + 'static,
    T::Span: Send + 'static,
{
    fn start_span(&self, ctx: &RequestContext, name: &str) -> Box<dyn Span> {
        let parent = parent_context(ctx);
        let span = self
            .tracer
            .span_builder(name.to_string())
            .with_kind(self.kind.clone())
            .start_with_context(&self.tracer, &parent);
        Box::new(OtelSpan { inner: span })
    }
}

fn parent_context(ctx: &RequestContext) -> Context {
    if let (Some(trace_id), Some(span_id)) = (ctx.trace_id(), ctx.span_id()) {
        if let Some(cx) = remote_context(trace_id, span_id, TraceFlags::SAMPLED) {
            return cx;
        }
    }

    if let Some(parent) = ctx.remote_parent() {
        let flags = TraceFlags::new(parent.flags().bits());
        if let Some(cx) = remote_context(parent.trace_id(), parent.parent_id(), flags) {
            return cx;
        }
    }

    if let Some(transport) = ctx.transport() {
        let extracted =
            global::get_text_map_propagator(|p| p.extract(&MetadataExtractor(transport)));
        if extracted.span().span_context().is_valid() {
            return extracted;
        }
    }

    Context::new()
}

fn remote_context(trace_id: &str, span_id: &str, flags: TraceFlags) -> Option<Context> {
    let trace_id = TraceId::from_hex(trace_id).ok()?;
    let span_id = SpanId::from_hex(span_id).ok()?;
    let span_context = SpanContext::new(trace_id, span_id, flags, true, TraceState::default());
    span_context
        .is_valid()
        .then(|| Context::new().with_remote_span_context(span_context))
}

struct OtelSpan<S> {
    inner: S,
}

impl<S> Span for OtelSpan<S>
where
    S: opentelemetry::trace::Span + Send + 'static,
{
    fn trace_id(&self) -> Option<String> {
        let cx = self.inner.span_context();
        cx.is_valid().then(|| cx.trace_id().to_string())
    }

    fn span_id(&self) -> Option<String> {
        let cx = self.inner.span_context();
        cx.is_valid().then(|| cx.span_id().to_string())
    }

    fn set_attribute(&mut self, key: &'static str, value: FieldValue) {
        let value = match value {
            FieldValue::Str(s) => Value::from(s),
            FieldValue::Int(i) => Value::from(i),
            FieldValue::Float(f) => Value::from(f),
            FieldValue::Bool(b) => Value::from(b),
            FieldValue::Null => return,
        };
        self.inner.set_attribute(KeyValue::new(key, value));
    }

    fn end(mut self: Box<Self>, status: SpanStatus) {
        match status {
            SpanStatus::Ok => self.inner.set_status(Status::Ok),
            SpanStatus::Error(message) => self.inner.set_status(Status::error(message)),
        }
        self.inner.end();
    }
}
