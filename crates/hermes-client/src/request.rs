//! Outbound request and response types.

use bytes::Bytes;
use hermes_core::Payload;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::{Method, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::{ClientError, ClientResult};

/// A request sent through [`HttpClient`](crate::HttpClient).
#[derive(Debug, Clone)]
pub struct ClientRequest {
    /// HTTP method.
    pub method: Method,
    /// Path (and query) relative to the client endpoint.
    pub path: String,
    /// Request headers.
    pub headers: HeaderMap,
    /// Request body.
    pub body: Option<Bytes>,
}

impl ClientRequest {
    /// Create a new request.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Create a `GET` request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Create a `POST` request with a body.
    pub fn post(path: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    /// Add a header, builder style.
    ///
    /// An invalid name or value is dropped with a warning; use
    /// [`try_header`](Self::try_header) to handle it instead.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        match parse_header(name, value) {
            Ok((name, value)) => {
                self.headers.insert(name, value);
            }
            Err(err) => tracing::warn!(error = %err, "dropping outbound header"),
        }
        self
    }

    /// Add a header.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidHeader`] if the name or value is not
    /// valid in an HTTP header.
    pub fn try_header(mut self, name: &str, value: &str) -> ClientResult<Self> {
        let (name, value) = parse_header(name, value)?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Set the request body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }
}

fn parse_header(name: &str, value: &str) -> ClientResult<(HeaderName, HeaderValue)> {
    let header = HeaderName::try_from(name)
        .map_err(|_| ClientError::invalid_header(name, "invalid name"))?;
    let value = HeaderValue::try_from(value)
        .map_err(|_| ClientError::invalid_header(name, "invalid value"))?;
    Ok((header, value))
}

impl Payload for ClientRequest {
    fn display_string(&self) -> Option<String> {
        Some(format!("{} {}", self.method, self.path))
    }
}

/// A successful (2xx) response.
#[derive(Debug, Clone)]
pub struct ClientResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body.
    pub body: Bytes,
}

impl ClientResponse {
    /// Returns the header value, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Get the response body as a string.
    pub fn body_string(&self) -> Option<String> {
        String::from_utf8(self.body.to_vec()).ok()
    }

    /// Get the response body as JSON.
    pub fn body_json<T: DeserializeOwned>(&self) -> ClientResult<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builders() {
        let request = ClientRequest::post("/alerts", "{}").with_header("content-type", "application/json");
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.body.as_deref(), Some(&b"{}"[..]));
        assert_eq!(request.headers.get("content-type").unwrap(), "application/json");
    }

    #[test]
    fn test_invalid_header_ignored() {
        let request = ClientRequest::get("/").with_header("bad header", "x");
        assert!(request.headers.is_empty());
    }

    #[test]
    fn test_try_header() {
        let request = ClientRequest::get("/").try_header("x-tenant", "acme").unwrap();
        assert_eq!(request.headers.get("x-tenant").unwrap(), "acme");

        let err = ClientRequest::get("/").try_header("bad header", "x").unwrap_err();
        assert!(matches!(err, ClientError::InvalidHeader { .. }));
        assert_eq!(err.to_string(), "invalid header bad header: invalid name");

        let err = ClientRequest::get("/").try_header("x-note", "line\nbreak").unwrap_err();
        assert_eq!(err.to_string(), "invalid header x-note: invalid value");
    }

    #[test]
    fn test_request_summary() {
        assert_eq!(ClientRequest::get("/alerts?limit=5").summary(), "GET /alerts?limit=5");
    }

    #[test]
    fn test_response_body() {
        let response = ClientResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::from_static(br#"{"count": 3}"#),
        };
        let value: serde_json::Value = response.body_json().unwrap();
        assert_eq!(value["count"], 3);
        assert_eq!(response.body_string().as_deref(), Some(r#"{"count": 3}"#));
        assert!(response.body_json::<Vec<u8>>().is_err());
    }
}
