//! Handler trait for request processing.
//!
//! The [`Handler`] trait is the unit the middleware chain wraps: it takes a
//! [`RequestContext`] and an owned request payload and resolves to either a
//! response or a [`Failure`].

use crate::{Failure, RequestContext};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A boxed future that is `Send`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A shared, type-erased handler.
pub type BoxedHandler<Req, Res> = Arc<dyn Handler<Req, Res>>;

/// A trait for handling requests.
///
/// # Type Parameters
///
/// - `Req`: The request payload, moved into the handler
/// - `Res`: The response payload
///
/// # Example
///
/// ```
/// use hermes_core::{BoxFuture, Failure, Handler, RequestContext};
///
/// struct Greeter;
///
/// impl Handler<String, String> for Greeter {
///     fn call(&self, _ctx: RequestContext, name: String) -> BoxFuture<'_, Result<String, Failure>> {
///         Box::pin(async move { Ok(format!("hello {name}")) })
///     }
/// }
/// ```
pub trait Handler<Req, Res>: Send + Sync + 'static {
    /// Handles a request.
    ///
    /// # Errors
    ///
    /// Returns a [`Failure`] when the request cannot be served. Business
    /// failures carry their own code; anything else is a generic failure.
    fn call(&self, ctx: RequestContext, request: Req) -> BoxFuture<'_, Result<Res, Failure>>;
}

impl<Req, Res, H> Handler<Req, Res> for Arc<H>
where
    H: Handler<Req, Res> + ?Sized,
{
    fn call(&self, ctx: RequestContext, request: Req) -> BoxFuture<'_, Result<Res, Failure>> {
        (**self).call(ctx, request)
    }
}

/// A function-based handler wrapper.
///
/// Created with [`handler_fn`].
#[derive(Clone)]
pub struct FnHandler<F> {
    func: F,
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

impl<F, Fut, Req, Res> Handler<Req, Res> for FnHandler<F>
where
    F: Fn(RequestContext, Req) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Res, Failure>> + Send + 'static,
{
    fn call(&self, ctx: RequestContext, request: Req) -> BoxFuture<'_, Result<Res, Failure>> {
        Box::pin((self.func)(ctx, request))
    }
}

/// Adapts an async function or closure into a [`Handler`].
///
/// # Example
///
/// ```
/// use hermes_core::{handler_fn, Failure, RequestContext};
///
/// let handler = handler_fn(|_ctx: RequestContext, id: u64| async move {
///     if id == 0 {
///         Err(Failure::business(404, "not found"))
///     } else {
///         Ok(format!("user {id}"))
///     }
/// });
/// # let _ = handler;
/// ```
pub const fn handler_fn<F>(func: F) -> FnHandler<F> {
    FnHandler { func }
}
