//! HTTP client that runs every call through a middleware chain.

use std::time::Duration;

use bytes::Bytes;
use hermes_core::{
    BoxFuture, BoxedHandler, Failure, Handler, RequestContext, TransportInfo, TRACEPARENT_HEADER,
};
use hermes_middleware::{BoxedMiddleware, Chain, Middleware, RecoveryMiddleware};
use reqwest::{Client, Url};
use tracing::debug;

use crate::error::{ClientError, ClientResult};
use crate::request::{ClientRequest, ClientResponse};

/// Header carrying the caller's request ID.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Outbound HTTP client bound to one endpoint.
///
/// Calls pass through the configured middleware, then a recovery stage, then
/// the transport. Cloning is cheap and clones share the connection pool.
///
/// # Example
///
/// ```no_run
/// use hermes_client::{ClientRequest, HttpClient};
/// use hermes_core::RequestContext;
/// use std::time::Duration;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new("http://127.0.0.1:8000", Duration::from_secs(5))?;
/// let response = client
///     .invoke(RequestContext::new(), ClientRequest::get("/v1/alerts"))
///     .await?;
/// println!("{}", response.status);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct HttpClient {
    endpoint: String,
    timeout: Duration,
    stages: Vec<&'static str>,
    handler: BoxedHandler<ClientRequest, ClientResponse>,
}

impl HttpClient {
    /// Create a client with the default chain (recovery only).
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the endpoint is not an absolute `http(s)` URL
    /// or the timeout is zero.
    pub fn new(endpoint: &str, timeout: Duration) -> ClientResult<Self> {
        Self::builder(endpoint).timeout(timeout).build()
    }

    /// Create a builder for a client bound to `endpoint`.
    pub fn builder(endpoint: &str) -> HttpClientBuilder {
        HttpClientBuilder::new(endpoint)
    }

    /// Returns the endpoint, without a trailing slash.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the per-call timeout.
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the names of the middleware calls pass through, outermost
    /// first.
    pub fn stages(&self) -> &[&'static str] {
        &self.stages
    }

    /// Sends `request` through the chain.
    ///
    /// The context passed down the chain describes this call: its transport
    /// is HTTP and its operation is the request path without the query.
    ///
    /// # Errors
    ///
    /// - `Failure::Business` with the status code for non-2xx responses
    /// - [`Failure::cancelled`] if the context is cancelled
    /// - [`Failure::deadline_exceeded`] if the timeout or the context deadline
    ///   elapses first
    /// - a generic failure for transport errors and recovered panics
    pub async fn invoke(
        &self,
        ctx: RequestContext,
        request: ClientRequest,
    ) -> Result<ClientResponse, Failure> {
        let operation = request.path.split('?').next().unwrap_or_default();
        let ctx = ctx.with_transport(TransportInfo::http(operation));
        self.handler.call(ctx, request).await
    }

    /// Sends a `GET` request.
    ///
    /// # Errors
    ///
    /// See [`HttpClient::invoke`].
    pub async fn get(&self, ctx: RequestContext, path: &str) -> Result<ClientResponse, Failure> {
        self.invoke(ctx, ClientRequest::get(path)).await
    }

    /// Sends a `POST` request with `body`.
    ///
    /// # Errors
    ///
    /// See [`HttpClient::invoke`].
    pub async fn post(
        &self,
        ctx: RequestContext,
        path: &str,
        body: impl Into<Bytes>,
    ) -> Result<ClientResponse, Failure> {
        self.invoke(ctx, ClientRequest::post(path, body)).await
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .field("stages", &self.stages)
            .finish_non_exhaustive()
    }
}

/// Builder for [`HttpClient`].
pub struct HttpClientBuilder {
    endpoint: String,
    timeout: Duration,
    chain: Chain<ClientRequest, ClientResponse>,
}

impl HttpClientBuilder {
    /// Default per-call timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            timeout: Self::DEFAULT_TIMEOUT,
            chain: Chain::new(),
        }
    }

    /// Sets the per-call timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Adds a middleware. Middleware run in the order added, all outside the
    /// recovery stage.
    #[must_use]
    pub fn with<M>(mut self, middleware: M) -> Self
    where
        M: Middleware<ClientRequest, ClientResponse>,
    {
        self.chain = self.chain.with(middleware);
        self
    }

    /// Adds a shared middleware.
    #[must_use]
    pub fn with_boxed(mut self, middleware: BoxedMiddleware<ClientRequest, ClientResponse>) -> Self {
        self.chain = self.chain.with_boxed(middleware);
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the endpoint or timeout is invalid, or the
    /// HTTP client cannot be created.
    pub fn build(self) -> ClientResult<HttpClient> {
        let endpoint = validate_endpoint(&self.endpoint)?;
        if self.timeout.is_zero() {
            return Err(ClientError::InvalidTimeout);
        }

        let client = Client::builder().pool_max_idle_per_host(100).build()?;

        let chain = self.chain.with(RecoveryMiddleware::new());
        let stages = chain.names();
        let handler = chain.then(Transport {
            client,
            endpoint: endpoint.clone(),
            timeout: self.timeout,
        });

        Ok(HttpClient {
            endpoint,
            timeout: self.timeout,
            stages,
            handler,
        })
    }
}

impl std::fmt::Debug for HttpClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClientBuilder")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .field("chain", &self.chain)
            .finish()
    }
}

fn validate_endpoint(endpoint: &str) -> ClientResult<String> {
    let url = Url::parse(endpoint).map_err(|e| ClientError::invalid_endpoint(endpoint, e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ClientError::invalid_endpoint(
            endpoint,
            format!("unsupported scheme {}", url.scheme()),
        ));
    }
    if url.host_str().is_none() {
        return Err(ClientError::invalid_endpoint(endpoint, "missing host"));
    }
    Ok(endpoint.trim_end_matches('/').to_string())
}

/// The innermost handler: performs the HTTP exchange.
struct Transport {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl Transport {
    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.endpoint)
        } else {
            format!("{}/{path}", self.endpoint)
        }
    }

    async fn exchange(
        &self,
        ctx: &RequestContext,
        request: ClientRequest,
    ) -> Result<ClientResponse, Failure> {
        let timeout = ctx
            .remaining()
            .map_or(self.timeout, |remaining| remaining.min(self.timeout));
        let url = self.url(&request.path);
        debug!(method = %request.method, %url, ?timeout, "outbound request");

        let mut builder = self
            .client
            .request(request.method, &url)
            .timeout(timeout)
            .headers(request.headers)
            .header(REQUEST_ID_HEADER, ctx.request_id().to_string());
        if let Some(traceparent) = ctx.traceparent() {
            builder = builder.header(TRACEPARENT_HEADER, traceparent);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(transport_failure)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(transport_failure)?;

        if !status.is_success() {
            return Err(Failure::business(
                i32::from(status.as_u16()),
                status.canonical_reason().unwrap_or("unknown status"),
            ));
        }

        Ok(ClientResponse {
            status,
            headers,
            body,
        })
    }
}

impl Handler<ClientRequest, ClientResponse> for Transport {
    fn call(
        &self,
        ctx: RequestContext,
        request: ClientRequest,
    ) -> BoxFuture<'_, Result<ClientResponse, Failure>> {
        Box::pin(async move {
            ctx.check()?;
            let token = ctx.cancellation_token().clone();
            tokio::select! {
                () = token.cancelled() => Err(Failure::cancelled()),
                result = self.exchange(&ctx, request) => result,
            }
        })
    }
}

fn transport_failure(err: reqwest::Error) -> Failure {
    if err.is_timeout() {
        Failure::deadline_exceeded()
    } else {
        Failure::generic(format!("request failed: {err}"))
    }
}
