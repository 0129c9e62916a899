//! Backend API Module
//!
//! Requests are described as plain values and handed to a [`Transport`].
//! Every election and verification call goes through the [`RequestPipeline`],
//! which owns bearer attachment and recovery from expired access tokens.

mod http;
mod pipeline;

#[cfg(test)]
pub(crate) mod testing;

pub use http::HttpTransport;
pub use pipeline::RequestPipeline;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Path prefix of the authentication endpoints
pub const AUTH_PREFIX: [&str; 2] = ["admin", "auth"];

/// HTTP method of an outbound call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
        }
    }
}

/// An outbound API call, relative to the configured base URL
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Unencoded path segments; the transport percent-encodes them
    pub segments: Vec<String>,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    pub bearer: Option<String>,
}

impl ApiRequest {
    fn new<I, S>(method: Method, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method,
            segments: segments.into_iter().map(Into::into).collect(),
            query: Vec::new(),
            body: None,
            bearer: None,
        }
    }

    pub fn get<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Method::Get, segments)
    }

    pub fn post<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Method::Post, segments)
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    /// Path relative to the base URL, for logging and matching
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }

    /// Whether this call targets the authentication endpoints
    pub fn is_auth_endpoint(&self) -> bool {
        self.segments.len() >= AUTH_PREFIX.len()
            && self.segments.iter().zip(AUTH_PREFIX).all(|(s, p)| s == p)
    }
}

/// Raw backend response; the transport never interprets the status
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

/// Error body served by the backend's exception handler
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// Decode the JSON body
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Backend message from an error body, passed through verbatim
    pub fn error_message(&self) -> Option<String> {
        let body: ErrorBody = serde_json::from_str(&self.body).ok()?;
        body.message
            .filter(|m| !m.is_empty())
            .or(body.error.filter(|e| !e.is_empty()))
    }

    /// Convert a failed response into a taxonomy error
    pub fn into_error(self) -> Error {
        let message = self
            .error_message()
            .unwrap_or_else(|| format!("HTTP {}", self.status));
        Error::from_status(self.status, message)
    }
}

/// Carries one request to the backend and returns its raw response.
///
/// Implementations return `Err` only when no response was obtained
/// (connection refused, timeout); every HTTP status is an `Ok`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_endpoint_detection() {
        assert!(ApiRequest::post(["admin", "auth", "login"]).is_auth_endpoint());
        assert!(ApiRequest::post(["admin", "auth", "refresh"]).is_auth_endpoint());
        assert!(!ApiRequest::get(["admin"]).is_auth_endpoint());
        assert!(!ApiRequest::get(["elections", "admin", "auth"]).is_auth_endpoint());
    }

    #[test]
    fn test_error_message_passthrough() {
        let response = ApiResponse::new(
            400,
            r#"{"status":400,"error":"Election error","message":"Only started elections can be closed"}"#,
        );
        assert_eq!(
            response.error_message().as_deref(),
            Some("Only started elections can be closed")
        );

        let response = ApiResponse::new(401, r#"{"error":"Unauthorized"}"#);
        assert_eq!(response.error_message().as_deref(), Some("Unauthorized"));

        let response = ApiResponse::new(502, "<html>Bad Gateway</html>");
        assert_eq!(response.error_message(), None);
        assert_eq!(
            response.into_error(),
            Error::ServerError { status: 502, message: "HTTP 502".into() }
        );
    }
}
