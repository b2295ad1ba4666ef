//! Error classification.
//!
//! Maps a [`Failure`] into the `(code, reason)` pair reported in access logs.
//!
//! | Failure | Code | Reason |
//! |---|---|---|
//! | none (success) | - | - |
//! | `Business { code, reason }` | `code` | `reason` |
//! | `Generic { message }` | [`INTERNAL_CODE`] | `message` |
//!
//! Classification is total: every failure yields a [`StructuredFailure`].

use hermes_core::Failure;
use serde::Serialize;

/// Code reported for failures that carry no classification of their own.
pub const INTERNAL_CODE: i32 = 500;

/// A failure reduced to a code and a reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructuredFailure {
    /// The failure code.
    pub code: i32,
    /// The failure reason.
    pub reason: String,
}

impl StructuredFailure {
    /// Creates a structured failure.
    pub fn new(code: i32, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// Returns true if this is the internal fallback classification.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        self.code == INTERNAL_CODE
    }
}

impl From<&Failure> for StructuredFailure {
    fn from(failure: &Failure) -> Self {
        match failure {
            Failure::Business { code, reason } => Self::new(*code, reason.clone()),
            Failure::Generic { message } => Self::new(INTERNAL_CODE, message.clone()),
        }
    }
}

/// Classifies an optional failure.
///
/// Returns `None` only when there is no failure.
#[must_use]
pub fn classify(failure: Option<&Failure>) -> Option<StructuredFailure> {
    failure.map(StructuredFailure::from)
}
