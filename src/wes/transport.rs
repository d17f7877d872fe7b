// src/wes/transport.rs

//! HTTP plumbing shared by both client strategies.
//!
//! Every response comes back as an [`Envelope`] (status + raw body). The
//! clients unwrap it into plain JSON, choosing which error a failure maps to.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, StatusCode, header};
use serde_json::Value;
use tracing::debug;

use crate::config::ServiceEndpoint;
use crate::errors::{Result, WesQueueError};

const USER_AGENT: &str = concat!("wesqueue/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Configured `reqwest::Client` bound to one service base URL.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(endpoint: &ServiceEndpoint) -> Result<Self> {
        Self::with_base_url(endpoint.base_url(), endpoint.auth.as_deref())
    }

    pub fn with_base_url(base_url: impl Into<String>, auth: Option<&str>) -> Result<Self> {
        let mut default_headers = header::HeaderMap::new();
        default_headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        if let Some(auth) = auth.filter(|a| !a.trim().is_empty()) {
            let value = header::HeaderValue::from_str(auth).map_err(|e| {
                WesQueueError::Config(format!("invalid Authorization header value: {e}"))
            })?;
            default_headers.insert(header::AUTHORIZATION, value);
        }

        let http = Client::builder()
            .default_headers(default_headers)
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| WesQueueError::Transport(format!("building http client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn client(&self) -> &Client {
        &self.http
    }

    /// Resolve a path (or pass through an absolute URL).
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.url(path);
        debug!(%method, %url, "building request");
        self.http.request(method, url)
    }

    /// Send a request and capture the response as an envelope.
    ///
    /// Only connection-level failures are errors here; HTTP error statuses
    /// are left in the envelope for the caller to interpret.
    pub async fn send(&self, request: RequestBuilder) -> Result<Envelope> {
        let response = request.send().await.map_err(|e| {
            WesQueueError::Transport(format!("request to {} failed: {e}", self.base_url))
        })?;

        let status = response.status();
        let url = response.url().to_string();
        let body = response
            .text()
            .await
            .map_err(|e| WesQueueError::Transport(format!("reading response from {url}: {e}")))?;

        debug!(%url, status = status.as_u16(), "received response");
        Ok(Envelope { status, url, body })
    }
}

/// Raw response as it came off the wire.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub status: StatusCode,
    pub url: String,
    pub body: String,
}

impl Envelope {
    /// Unwrap a query response.
    ///
    /// - 404 becomes `NotFound`
    /// - 401/403 and any other non-2xx become `Transport`
    /// - an unparseable 2xx body becomes `Transport`
    pub fn into_json(self) -> Result<Value> {
        if self.status == StatusCode::NOT_FOUND {
            return Err(WesQueueError::NotFound(format!(
                "{} ({})",
                self.url,
                self.summary()
            )));
        }
        if matches!(self.status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(WesQueueError::Transport(format!(
                "not authorized for {}: {}",
                self.url,
                self.summary()
            )));
        }
        if !self.status.is_success() {
            return Err(WesQueueError::Transport(format!(
                "HTTP {} from {}: {}",
                self.status.as_u16(),
                self.url,
                self.summary()
            )));
        }
        self.parse_body()
            .map_err(|e| WesQueueError::Transport(format!("malformed response from {}: {e}", self.url)))
    }

    /// Unwrap a run submission response; every failure is a rejection.
    pub fn into_submission_json(self) -> Result<Value> {
        if !self.status.is_success() {
            return Err(WesQueueError::Submission(format!(
                "HTTP {} from {}: {}",
                self.status.as_u16(),
                self.url,
                self.summary()
            )));
        }
        self.parse_body().map_err(|e| {
            WesQueueError::Submission(format!("malformed response from {}: {e}", self.url))
        })
    }

    fn parse_body(&self) -> std::result::Result<Value, serde_json::Error> {
        if self.body.trim().is_empty() {
            return Ok(Value::Object(Default::default()));
        }
        serde_json::from_str(&self.body)
    }

    /// Prefer the WES error `msg` field; otherwise a truncated body.
    fn summary(&self) -> String {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&self.body) {
            if let Some(Value::String(msg)) = map.get("msg") {
                return msg.clone();
            }
        }
        let mut text: String = self.body.chars().take(200).collect();
        if text.is_empty() {
            text = self
                .status
                .canonical_reason()
                .unwrap_or("no response body")
                .to_string();
        }
        text
    }
}
