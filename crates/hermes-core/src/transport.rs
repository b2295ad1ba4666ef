//! Transport metadata attached to a request.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The transport a request arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// gRPC transport.
    Grpc,
    /// HTTP transport.
    Http,
}

impl TransportKind {
    /// Returns the lowercase name used in log records.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Grpc => "grpc",
            Self::Http => "http",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport metadata: kind, operation name and request headers.
///
/// Header names are stored lowercased so lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportInfo {
    kind: TransportKind,
    operation: String,
    metadata: HashMap<String, String>,
}

impl TransportInfo {
    /// Creates transport metadata for the given kind and operation.
    pub fn new(kind: TransportKind, operation: impl Into<String>) -> Self {
        Self {
            kind,
            operation: operation.into(),
            metadata: HashMap::new(),
        }
    }

    /// Shorthand for a gRPC operation such as `/pkg.Service/Method`.
    pub fn grpc(operation: impl Into<String>) -> Self {
        Self::new(TransportKind::Grpc, operation)
    }

    /// Shorthand for an HTTP operation such as `/users/{id}`.
    pub fn http(operation: impl Into<String>) -> Self {
        Self::new(TransportKind::Http, operation)
    }

    /// Returns the transport kind.
    #[must_use]
    pub const fn kind(&self) -> TransportKind {
        self.kind
    }

    /// Returns the operation name.
    #[must_use]
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Adds a metadata header.
    #[must_use]
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.insert_header(name, value);
        self
    }

    /// Inserts a metadata header, replacing any previous value.
    pub fn insert_header(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.metadata
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    /// Looks up a metadata header by name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.metadata
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Iterates over all metadata headers.
    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.metadata.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_display() {
        assert_eq!(TransportKind::Grpc.to_string(), "grpc");
        assert_eq!(TransportKind::Http.to_string(), "http");
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let info = TransportInfo::http("/orders").with_header("TraceParent", "value");
        assert_eq!(info.header("traceparent"), Some("value"));
        assert_eq!(info.header("TRACEPARENT"), Some("value"));
        assert_eq!(info.header("missing"), None);
    }

    #[test]
    fn test_headers_iter() {
        let info = TransportInfo::grpc("/a.B/C")
            .with_header("x-one", "1")
            .with_header("x-two", "2");
        assert_eq!(info.headers().count(), 2);
    }
}
