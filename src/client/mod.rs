//! Transport client for the BMP service.
//!
//! A [`Client`] owns the service base URL, the API key and an [`HttpSender`].
//! It builds authenticated requests and hands them to the sender, one attempt
//! per call.
//!
//! # Construction
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use bmp::client::{with_timeout, Client};
//!
//! // Production host, default 5s timeout
//! let client = Client::new_remote("api-key")?;
//!
//! // Explicit host with options applied in order
//! let client = Client::new(
//!     "https://api.runeverse.local",
//!     "api-key",
//!     [with_timeout(Duration::from_secs(10))],
//! )?;
//! ```

mod sender;

pub use sender::{HttpRequest, HttpResponse, HttpSender, ReqwestSender, SendFuture};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::Method;
use reqwest::Url;

use crate::config::Config;
use crate::error::{BmpError, Result};

/// Local/staging host
pub const LOCAL_HOST: &str = "https://api.runeverse.local";

/// Production host
pub const REMOTE_HOST: &str = "https://api.runeverse.tools";

/// Default request timeout (seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "X-Api-Key";

/// Partially-built client handed to each [`ClientOption`].
pub struct ClientSettings {
    /// Base URL of the service
    pub host: String,
    /// API key
    pub api_key: String,
    /// Timeout for the default sender
    pub timeout: Duration,
    /// Caller-supplied sender; `None` builds a [`ReqwestSender`]
    pub sender: Option<Arc<dyn HttpSender>>,
}

/// Client configuration modifier, applied in order.
pub type ClientOption = Box<dyn FnOnce(&mut ClientSettings) + Send>;

/// Use a caller-supplied sender.
pub fn with_sender(sender: impl HttpSender + 'static) -> ClientOption {
    Box::new(move |settings| settings.sender = Some(Arc::new(sender)))
}

/// Use a preconfigured `reqwest::Client` as the sender.
pub fn with_reqwest_client(client: reqwest::Client) -> ClientOption {
    with_sender(ReqwestSender::from_client(client))
}

/// Override the default sender's timeout.
pub fn with_timeout(timeout: Duration) -> ClientOption {
    Box::new(move |settings| settings.timeout = timeout)
}

/// Override the host.
pub fn with_host(host: impl Into<String>) -> ClientOption {
    let host = host.into();
    Box::new(move |settings| settings.host = host)
}

/// Authenticated client for the BMP service.
///
/// Cheap to clone; clones share the sender.
#[derive(Clone)]
pub struct Client {
    host: String,
    api_key: String,
    sender: Arc<dyn HttpSender>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("host", &self.host)
            .field("api_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a client, applying `options` in order.
    pub fn new(
        host: impl Into<String>,
        api_key: impl Into<String>,
        options: impl IntoIterator<Item = ClientOption>,
    ) -> Result<Self> {
        let mut settings = ClientSettings {
            host: host.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            sender: None,
        };

        for option in options {
            option(&mut settings);
        }

        let sender = match settings.sender {
            Some(sender) => sender,
            None => Arc::new(ReqwestSender::new(settings.timeout)?),
        };

        Ok(Self {
            host: settings.host.trim_end_matches('/').to_string(),
            api_key: settings.api_key,
            sender,
        })
    }

    /// Client for the local/staging host.
    pub fn new_local(api_key: impl Into<String>) -> Result<Self> {
        Self::new(LOCAL_HOST, api_key, Vec::<ClientOption>::new())
    }

    /// Client for the production host.
    pub fn new_remote(api_key: impl Into<String>) -> Result<Self> {
        Self::new(REMOTE_HOST, api_key, Vec::<ClientOption>::new())
    }

    /// Client from loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| BmpError::Config("missing API key".to_string()))?;

        Self::new(config.host.clone(), api_key, [with_timeout(config.timeout())])
    }

    /// Base URL of the service.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Build an authenticated GET request.
    pub(crate) fn get(&self, path: &str, query: &[(&str, String)]) -> Result<HttpRequest> {
        let mut url = self.endpoint(path)?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }

        let mut request = HttpRequest::new(Method::GET, url.as_str());
        request.set_header(API_KEY_HEADER, self.api_key.as_str());
        Ok(request)
    }

    /// Build an authenticated POST request with a JSON body.
    pub(crate) fn post_json(&self, path: &str, body: Bytes) -> Result<HttpRequest> {
        let url = self.endpoint(path)?;

        let mut request = HttpRequest::new(Method::POST, url.as_str());
        request.set_header(API_KEY_HEADER, self.api_key.as_str());
        request.set_header("Content-Type", "application/json");
        request.body = Some(body);
        Ok(request)
    }

    /// Send a request through the configured sender.
    pub(crate) async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = request.method.clone();
        let url = request.url.clone();
        tracing::debug!(%method, %url, "sending BMP request");

        match self.sender.send(request).await {
            Ok(response) => {
                tracing::debug!(%method, %url, status = %response.status, "received BMP response");
                Ok(response)
            },
            Err(err) => {
                tracing::debug!(%method, %url, error = %err, "BMP request failed");
                Err(err)
            },
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Url::parse(&format!("{}{}", self.host, path))
            .map_err(|e| BmpError::transport("error while creating request", e))
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingSender;
    use super::*;

    #[test]
    fn test_convenience_hosts() {
        assert_eq!(Client::new_local("k").unwrap().host(), LOCAL_HOST);
        assert_eq!(Client::new_remote("k").unwrap().host(), REMOTE_HOST);
    }

    #[test]
    fn test_options_apply_in_order() {
        let client = Client::new(
            "https://first.example",
            "k",
            [
                with_host("https://second.example"),
                with_host("https://third.example/"),
            ],
        )
        .unwrap();

        assert_eq!(client.host(), "https://third.example");
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let client = Client::new_remote("super-secret").unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains(REMOTE_HOST));
    }

    #[test]
    fn test_from_config_requires_api_key() {
        let err = Client::from_config(&Config::default()).unwrap_err();
        assert!(matches!(err, BmpError::Config(_)));

        let config = Config {
            api_key: Some("k".to_string()),
            host: LOCAL_HOST.to_string(),
            ..Config::default()
        };
        assert_eq!(Client::from_config(&config).unwrap().host(), LOCAL_HOST);
    }

    #[test]
    fn test_get_request_carries_key_and_query() {
        let client = RecordingSender::default().client();
        let request = client
            .get(
                "/bmp/ios/init",
                &[("iosVersion", "17.0".to_string()), ("model", "iPhone 15".to_string())],
            )
            .unwrap();

        assert_eq!(request.method, Method::GET);
        assert_eq!(
            request.url,
            "https://bmp.test/bmp/ios/init?iosVersion=17.0&model=iPhone+15"
        );
        assert_eq!(request.header(API_KEY_HEADER), Some("test-key"));
        assert!(request.body.is_none());
    }

    #[test]
    fn test_get_without_query_has_no_question_mark() {
        let client = RecordingSender::default().client();
        let request = client.get("/bmp/android/init", &[]).unwrap();
        assert_eq!(request.url, "https://bmp.test/bmp/android/init");
    }

    #[test]
    fn test_post_json_request() {
        let client = RecordingSender::default().client();
        let request = client
            .post_json("/bmp/feedback", Bytes::from_static(b"{}"))
            .unwrap();

        assert_eq!(request.method, Method::POST);
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.header(API_KEY_HEADER), Some("test-key"));
        assert_eq!(request.body.as_deref(), Some(&b"{}"[..]));
    }

    #[test]
    fn test_invalid_host_is_transport_error() {
        let sender = RecordingSender::default();
        let client = Client::new("not a url", "k", [with_sender(sender)]).unwrap();
        let err = client.get("/bmp/android/init", &[]).unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_execute_propagates_transport_failure() {
        let sender = RecordingSender::default();
        sender.fail("connection refused");
        let client = sender.client();

        let request = client.get("/bmp/android/init", &[]).unwrap();
        let err = client.execute(request).await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(sender.requests().len(), 1);
    }
}
