//! Core middleware trait and types.
//!
//! This module defines the [`Middleware`] trait that all middleware stages
//! implement. A middleware turns the next handler into a new handler; the
//! returned handler is built once when the chain is assembled and then serves
//! every request.
//!
//! # Example
//!
//! ```
//! use hermes_core::{BoxFuture, BoxedHandler, Failure, Handler, RequestContext};
//! use hermes_middleware::Middleware;
//! use std::sync::Arc;
//!
//! struct Uppercase;
//!
//! struct UppercaseHandler {
//!     next: BoxedHandler<String, String>,
//! }
//!
//! impl Handler<String, String> for UppercaseHandler {
//!     fn call(&self, ctx: RequestContext, req: String) -> BoxFuture<'_, Result<String, Failure>> {
//!         Box::pin(async move { self.next.call(ctx, req).await.map(|s| s.to_uppercase()) })
//!     }
//! }
//!
//! impl Middleware<String, String> for Uppercase {
//!     fn name(&self) -> &'static str {
//!         "uppercase"
//!     }
//!
//!     fn wrap(&self, next: BoxedHandler<String, String>) -> BoxedHandler<String, String> {
//!         Arc::new(UppercaseHandler { next })
//!     }
//! }
//! ```

use hermes_core::{BoxFuture, BoxedHandler, Failure, Handler, RequestContext};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// A type-erased middleware that can be stored in a chain.
pub type BoxedMiddleware<Req, Res> = Arc<dyn Middleware<Req, Res>>;

/// The core middleware trait.
///
/// # Invariants
///
/// - `wrap` has no side effects; it only captures `next`
/// - The returned handler delegates to `next` at most once per request
/// - Failures from `next` are returned, never dropped
pub trait Middleware<Req, Res>: Send + Sync + 'static {
    /// Returns the name of this middleware, used for diagnostics.
    fn name(&self) -> &'static str;

    /// Decorates `next`, returning the handler that runs this middleware.
    fn wrap(&self, next: BoxedHandler<Req, Res>) -> BoxedHandler<Req, Res>;
}

impl<Req, Res, M> Middleware<Req, Res> for Arc<M>
where
    M: Middleware<Req, Res> + ?Sized,
{
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn wrap(&self, next: BoxedHandler<Req, Res>) -> BoxedHandler<Req, Res> {
        (**self).wrap(next)
    }
}

/// A middleware that can be created from an async function.
///
/// The function receives the context, the request and the next handler.
///
/// # Example
///
/// ```
/// use hermes_core::{BoxedHandler, RequestContext};
/// use hermes_middleware::FnMiddleware;
///
/// let reject_empty = FnMiddleware::new(
///     "reject_empty",
///     |ctx: RequestContext, req: String, next: BoxedHandler<String, String>| async move {
///         if req.is_empty() {
///             return Err(hermes_core::Failure::business(400, "empty request"));
///         }
///         next.call(ctx, req).await
///     },
/// );
/// # let _ = reject_empty;
/// ```
pub struct FnMiddleware<F> {
    name: &'static str,
    func: Arc<F>,
}

impl<F> FnMiddleware<F> {
    /// Creates a new function-based middleware.
    pub fn new(name: &'static str, func: F) -> Self {
        Self {
            name,
            func: Arc::new(func),
        }
    }
}

impl<F> fmt::Debug for FnMiddleware<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMiddleware")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<F, Fut, Req, Res> Middleware<Req, Res> for FnMiddleware<F>
where
    F: Fn(RequestContext, Req, BoxedHandler<Req, Res>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Res, Failure>> + Send + 'static,
    Req: Send + 'static,
    Res: Send + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn wrap(&self, next: BoxedHandler<Req, Res>) -> BoxedHandler<Req, Res> {
        Arc::new(FnWrapped {
            func: Arc::clone(&self.func),
            next,
        })
    }
}

struct FnWrapped<F, Req, Res> {
    func: Arc<F>,
    next: BoxedHandler<Req, Res>,
}

impl<F, Fut, Req, Res> Handler<Req, Res> for FnWrapped<F, Req, Res>
where
    F: Fn(RequestContext, Req, BoxedHandler<Req, Res>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Res, Failure>> + Send + 'static,
    Req: Send + 'static,
    Res: Send + 'static,
{
    fn call(&self, ctx: RequestContext, request: Req) -> BoxFuture<'_, Result<Res, Failure>> {
        Box::pin((self.func)(ctx, request, Arc::clone(&self.next)))
    }
}
