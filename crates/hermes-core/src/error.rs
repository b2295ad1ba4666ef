//! Failure types reported by handlers.
//!
//! Handlers report failures as [`Failure`], a tagged enum with two variants:
//!
//! | Variant | Meaning | Classified as |
//! |---|---|---|
//! | `Business` | Failure carrying its own code and reason | `(code, reason)` unchanged |
//! | `Generic` | Any other error, including recovered panics | `(500, message)` |
//!
//! Panics never surface as a variant: recovery middleware converts them into
//! `Generic` failures before anything else observes them.

use thiserror::Error;

/// Result type alias using [`Failure`].
pub type FailureResult<T> = Result<T, Failure>;

/// A failure reported by a handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Failure {
    /// A failure carrying a numeric code and a human-readable reason.
    #[error("error: code = {code} reason = {reason}")]
    Business {
        /// Application-defined code, commonly an HTTP-like status.
        code: i32,
        /// Human-readable reason.
        reason: String,
    },

    /// A failure with no classification beyond its message.
    #[error("{message}")]
    Generic {
        /// The failure message.
        message: String,
    },
}

impl Failure {
    /// Creates a business failure.
    pub fn business(code: i32, reason: impl Into<String>) -> Self {
        Self::Business {
            code,
            reason: reason.into(),
        }
    }

    /// Creates a generic failure.
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Creates a generic failure from any error, using its display text.
    pub fn from_error<E: std::error::Error + ?Sized>(error: &E) -> Self {
        Self::generic(error.to_string())
    }

    /// The failure reported when the request was cancelled.
    #[must_use]
    pub fn cancelled() -> Self {
        Self::generic("context canceled")
    }

    /// The failure reported when the request deadline passed.
    #[must_use]
    pub fn deadline_exceeded() -> Self {
        Self::generic("context deadline exceeded")
    }

    /// Returns the business code, if this is a business failure.
    #[must_use]
    pub const fn code(&self) -> Option<i32> {
        match self {
            Self::Business { code, .. } => Some(*code),
            Self::Generic { .. } => None,
        }
    }

    /// Returns true if this is a business failure.
    #[must_use]
    pub const fn is_business(&self) -> bool {
        matches!(self, Self::Business { .. })
    }
}

impl From<anyhow::Error> for Failure {
    fn from(error: anyhow::Error) -> Self {
        // {:#} keeps the context chain on one line
        Self::generic(format!("{error:#}"))
    }
}

impl From<std::io::Error> for Failure {
    fn from(error: std::io::Error) -> Self {
        Self::from_error(&error)
    }
}
