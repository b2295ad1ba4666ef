//! Ordered middleware composition.
//!
//! A [`Chain`] is an ordered list of middlewares. [`Chain::then`] folds it
//! around a terminal handler so that the first middleware added is the
//! outermost: `[m1, m2, m3]` over `h` becomes `m1(m2(m3(h)))`.
//!
//! The fold is pure. Composition order is fixed when the chain is built and
//! is identical for every request served by the resulting handler.

use crate::middleware::{BoxedMiddleware, Middleware};
use crate::stages::{LoggingMiddleware, RecoveryMiddleware, TracingMiddleware};
use hermes_core::{BoxedHandler, Handler, Logger, Payload, Tracer};
use std::fmt;
use std::sync::Arc;

/// An ordered, immutable-once-built list of middlewares.
///
/// A chain is itself a [`Middleware`], so chains nest.
pub struct Chain<Req, Res> {
    stages: Vec<BoxedMiddleware<Req, Res>>,
}

impl<Req, Res> Chain<Req, Res>
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Appends a middleware. Earlier middlewares wrap later ones.
    #[must_use]
    pub fn with<M>(mut self, middleware: M) -> Self
    where
        M: Middleware<Req, Res>,
    {
        self.stages.push(Arc::new(middleware));
        self
    }

    /// Appends an already shared middleware.
    #[must_use]
    pub fn with_boxed(mut self, middleware: BoxedMiddleware<Req, Res>) -> Self {
        self.stages.push(middleware);
        self
    }

    /// Returns the middleware names, outermost first.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|m| m.name()).collect()
    }

    /// Returns the number of middlewares.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true if the chain holds no middleware.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Composes the chain around `handler`.
    ///
    /// The returned handler is shareable across tasks and may serve any
    /// number of concurrent requests.
    pub fn then<H>(&self, handler: H) -> BoxedHandler<Req, Res>
    where
        H: Handler<Req, Res>,
    {
        self.compose(Arc::new(handler))
    }

    fn compose(&self, handler: BoxedHandler<Req, Res>) -> BoxedHandler<Req, Res> {
        self.stages
            .iter()
            .rev()
            .fold(handler, |next, middleware| middleware.wrap(next))
    }
}

impl<Req, Res> Default for Chain<Req, Res>
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<Req, Res> Clone for Chain<Req, Res> {
    fn clone(&self) -> Self {
        Self {
            stages: self.stages.clone(),
        }
    }
}

impl<Req, Res> fmt::Debug for Chain<Req, Res>
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.stages.iter().map(|m| m.name()).collect();
        f.debug_struct("Chain").field("stages", &names).finish()
    }
}

impl<Req, Res> Middleware<Req, Res> for Chain<Req, Res>
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    fn name(&self) -> &'static str {
        "chain"
    }

    fn wrap(&self, next: BoxedHandler<Req, Res>) -> BoxedHandler<Req, Res> {
        self.compose(next)
    }
}

/// The stages of the default server chain, outermost first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Distributed trace propagation.
    Tracing,
    /// Access logging.
    Logging,
    /// Panic recovery.
    Recovery,
}

impl Stage {
    /// Returns all stages in chain order.
    #[must_use]
    pub const fn all() -> [Self; 3] {
        [Self::Tracing, Self::Logging, Self::Recovery]
    }

    /// Returns the middleware name of this stage.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Tracing => "tracing",
            Self::Logging => "logging",
            Self::Recovery => "recovery",
        }
    }
}

/// Builds the default server chain: tracing, logging, recovery.
pub fn server_chain<Req, Res>(logger: Arc<dyn Logger>, tracer: Arc<dyn Tracer>) -> Chain<Req, Res>
where
    Req: Payload,
    Res: Send + 'static,
{
    Chain::new()
        .with(TracingMiddleware::from_arc(tracer))
        .with(LoggingMiddleware::from_arc(logger))
        .with(RecoveryMiddleware::new())
}
