//! Panic recovery middleware.
//!
//! Catches panics raised while the wrapped handler runs (including while it
//! builds its future) and turns them into a [`Failure`]. The panic never
//! propagates past this stage, so the process and the worker task survive.
//!
//! # Pipeline Position
//!
//! Recovery is the innermost stage of the server chain:
//!
//! ```text
//! Tracing → Logging → [Recovery] → Handler
//! ```
//!
//! # Fault Location
//!
//! The first `RecoveryMiddleware` created installs a process-wide panic hook.
//! The hook records the panic location in a thread-local slot and then calls
//! whatever hook was installed before it, so default panic output is kept.
//! The recovered failure message reads `panic: <payload> at <file:line:col>`.
//!
//! # Example
//!
//! ```
//! use hermes_core::Failure;
//! use hermes_middleware::RecoveryMiddleware;
//!
//! // Default conversion into a generic failure
//! let recovery = RecoveryMiddleware::new();
//!
//! // Custom conversion
//! let recovery = RecoveryMiddleware::new()
//!     .with_handler(|_ctx, fault| Failure::business(503, fault.message()));
//! ```

use crate::middleware::Middleware;
use futures_util::FutureExt;
use hermes_core::{BoxFuture, BoxedHandler, Failure, Handler, RequestContext};
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Once};

/// Converts a recovered fault into the failure returned to the caller.
pub type RecoveryHandler = Arc<dyn Fn(&RequestContext, &Fault) -> Failure + Send + Sync>;

thread_local! {
    static FAULT_LOCATION: RefCell<Option<String>> = const { RefCell::new(None) };
}

static LOCATION_HOOK: Once = Once::new();

fn install_location_hook() {
    LOCATION_HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            if let Some(location) = info.location() {
                let location = location.to_string();
                FAULT_LOCATION.with(|slot| *slot.borrow_mut() = Some(location));
            }
            previous(info);
        }));
    });
}

fn take_location() -> Option<String> {
    FAULT_LOCATION.with(|slot| slot.borrow_mut().take())
}

/// A recovered panic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    message: String,
    location: Option<String>,
}

impl Fault {
    /// Creates a fault from a message and an optional `file:line:col`.
    pub fn new(message: impl Into<String>, location: Option<String>) -> Self {
        Self {
            message: message.into(),
            location,
        }
    }

    fn from_panic(payload: &(dyn Any + Send), location: Option<String>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Self::new(message, location)
    }

    /// Returns the panic message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns where the panic was raised, if known.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "panic: {}", self.message)?;
        if let Some(location) = &self.location {
            write!(f, " at {location}")?;
        }
        Ok(())
    }
}

/// Middleware that converts handler panics into failures.
///
/// On normal return the handler's result passes through unchanged. This
/// stage does not emit access records; the logging stage outside it reports
/// the converted failure.
#[derive(Clone, Default)]
pub struct RecoveryMiddleware {
    handler: Option<RecoveryHandler>,
}

impl RecoveryMiddleware {
    /// Creates a recovery middleware with the default conversion.
    #[must_use]
    pub fn new() -> Self {
        install_location_hook();
        Self { handler: None }
    }

    /// Installs a custom conversion from fault to failure.
    #[must_use]
    pub fn with_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&RequestContext, &Fault) -> Failure + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }
}

impl fmt::Debug for RecoveryMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecoveryMiddleware")
            .field("custom_handler", &self.handler.is_some())
            .finish()
    }
}

impl<Req, Res> Middleware<Req, Res> for RecoveryMiddleware
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    fn name(&self) -> &'static str {
        "recovery"
    }

    fn wrap(&self, next: BoxedHandler<Req, Res>) -> BoxedHandler<Req, Res> {
        install_location_hook();
        Arc::new(Recovered {
            handler: self.handler.clone(),
            next,
        })
    }
}

struct Recovered<Req, Res> {
    handler: Option<RecoveryHandler>,
    next: BoxedHandler<Req, Res>,
}

impl<Req, Res> Handler<Req, Res> for Recovered<Req, Res>
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    fn call(&self, ctx: RequestContext, request: Req) -> BoxFuture<'_, Result<Res, Failure>> {
        Box::pin(async move {
            let fault_ctx = ctx.clone();
            // A location left by an earlier panic on this thread is stale.
            let _ = take_location();
            // The call itself runs inside the guarded future.
            let outcome = AssertUnwindSafe(async { self.next.call(ctx, request).await })
                .catch_unwind()
                .await;

            match outcome {
                Ok(result) => result,
                Err(payload) => {
                    let fault = Fault::from_panic(payload.as_ref(), take_location());
                    ::tracing::debug!(
                        request_id = %fault_ctx.request_id(),
                        fault = %fault,
                        "recovered from panic"
                    );
                    Err(match &self.handler {
                        Some(handler) => handler(&fault_ctx, &fault),
                        None => Failure::generic(fault.to_string()),
                    })
                }
            }
        })
    }
}
