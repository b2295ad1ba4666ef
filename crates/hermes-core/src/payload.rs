//! Request payload summaries for access logs.

use bytes::Bytes;
use std::fmt::Debug;

/// A request payload that can be summarised in an access log.
///
/// Payloads that have a natural textual form override [`display_string`];
/// everything else is rendered with its `Debug` representation.
///
/// [`display_string`]: Payload::display_string
///
/// # Example
///
/// ```
/// use hermes_core::Payload;
///
/// #[derive(Debug)]
/// struct GetUser { id: u64 }
///
/// impl Payload for GetUser {
///     fn display_string(&self) -> Option<String> {
///         Some(format!("id={}", self.id))
///     }
/// }
///
/// assert_eq!(GetUser { id: 7 }.summary(), "id=7");
/// ```
pub trait Payload: Debug + Send + 'static {
    /// Returns the payload's own textual form, if it has one.
    fn display_string(&self) -> Option<String> {
        None
    }

    /// Returns the summary recorded in the access log.
    fn summary(&self) -> String {
        self.display_string()
            .unwrap_or_else(|| format!("{self:?}"))
    }
}

impl Payload for String {
    fn display_string(&self) -> Option<String> {
        Some(self.clone())
    }
}

impl Payload for &'static str {
    fn display_string(&self) -> Option<String> {
        Some((*self).to_string())
    }
}

impl Payload for serde_json::Value {
    fn display_string(&self) -> Option<String> {
        Some(self.to_string())
    }
}

impl Payload for () {}

impl Payload for Bytes {}

impl Payload for Vec<u8> {}

impl Payload for u64 {}

impl Payload for i64 {}
