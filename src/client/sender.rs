//! Pluggable HTTP sender.
//!
//! The client only needs "send a request, get status and body back". That
//! capability sits behind [`HttpSender`] so callers can swap in their own
//! transport (a preconfigured `reqwest::Client`, a proxy-aware stack, or an
//! in-memory fake in tests).

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use http::{Method, StatusCode};

use crate::error::{BmpError, Result};

/// Future returned by [`HttpSender::send`].
pub type SendFuture<'a> = Pin<Box<dyn Future<Output = Result<HttpResponse>> + Send + 'a>>;

/// Outbound request, fully built by the client.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method
    pub method: Method,
    /// Absolute URL including any query string
    pub url: String,
    /// Header name/value pairs
    pub headers: Vec<(String, String)>,
    /// Request body, if any
    pub body: Option<Bytes>,
}

impl HttpRequest {
    /// Create a request without headers or body.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Set a header, replacing an existing one with the same name.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.into()));
    }

    /// Look up a header value (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status and fully-read body of a response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status
    pub status: StatusCode,
    /// Response body
    pub body: Bytes,
}

impl HttpResponse {
    /// Create a response from a status and body.
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Sends a single request and reads the whole response body.
///
/// Implementations report connection, DNS, timeout and body-read failures as
/// [`BmpError::Transport`]. They must not retry.
pub trait HttpSender: Send + Sync {
    /// Send the request and return status plus body.
    fn send(&self, request: HttpRequest) -> SendFuture<'_>;
}

/// Default sender backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestSender {
    client: reqwest::Client,
}

impl ReqwestSender {
    /// Build a sender whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BmpError::transport("failed to create HTTP client", e))?;

        Ok(Self { client })
    }

    /// Wrap an already configured `reqwest::Client`.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl HttpSender for ReqwestSender {
    fn send(&self, request: HttpRequest) -> SendFuture<'_> {
        Box::pin(async move {
            let mut builder = self.client.request(request.method, request.url.as_str());
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            let response = builder
                .send()
                .await
                .map_err(|e| BmpError::transport("error while sending request", e))?;

            let status = response.status();
            let body = response
                .bytes()
                .await
                .map_err(|e| BmpError::transport("error while reading response", e))?;

            Ok(HttpResponse { status, body })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_header_replaces() {
        let mut request = HttpRequest::new(Method::GET, "https://api.runeverse.tools/bmp/android/init");
        request.set_header("X-Api-Key", "one");
        request.set_header("x-api-key", "two");

        assert_eq!(request.headers.len(), 1);
        assert_eq!(request.header("X-API-KEY"), Some("two"));
        assert_eq!(request.header("Content-Type"), None);
    }

    #[tokio::test]
    async fn test_reqwest_sender_connection_refused() {
        let sender = ReqwestSender::new(Duration::from_millis(500)).unwrap();
        let request = HttpRequest::new(Method::GET, "http://127.0.0.1:59999/bmp/android/init");

        let err = sender.send(request).await.unwrap_err();
        assert!(err.is_transport());
    }
}
