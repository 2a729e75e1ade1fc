//! The network seam shared by the completion and OCR clients.
//!
//! Both clients talk to the outside world only through [`Transport`], so tests
//! can script replies without a server.

use anyhow::{Context, Result};
use reqwest::header::CONTENT_TYPE;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// A bearer credential. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Reads the key from an environment variable, ignoring blank values.
    pub fn from_env(var: &str) -> Option<Self> {
        std::env::var(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(Self)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
    pub bearer: Option<ApiKey>,
    pub body: RequestBody,
    pub timeout: Duration,
}

impl HttpRequest {
    pub fn post_json(url: &str, body: serde_json::Value, timeout: Duration) -> Self {
        Self {
            url: url.to_string(),
            query: Vec::new(),
            bearer: None,
            body: RequestBody::Json(body),
            timeout,
        }
    }

    pub fn post_form(url: &str, form: Vec<(String, String)>, timeout: Duration) -> Self {
        Self {
            url: url.to_string(),
            query: Vec::new(),
            bearer: None,
            body: RequestBody::Form(form),
            timeout,
        }
    }

    pub fn bearer(mut self, key: &ApiKey) -> Self {
        self.bearer = Some(key.clone());
        self
    }

    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Network-level failures. Messages never carry the request URL, which may
/// hold an access token in its query string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("reading response body failed: {0}")]
    Body(String),
}

impl TransportError {
    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return TransportError::Timeout;
        }
        let connect = err.is_connect();
        let msg = err.without_url().to_string();
        if connect {
            TransportError::Connect(msg)
        } else {
            TransportError::Request(msg)
        }
    }
}

pub trait Transport: Send + Sync {
    fn send(&self, req: &HttpRequest) -> Result<HttpReply, TransportError>;
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn send(&self, req: &HttpRequest) -> Result<HttpReply, TransportError> {
        (**self).send(req)
    }
}

/// One pooled `reqwest` session. Cloning shares the pool; the session is
/// released when the last owner drops.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .build()
            .with_context(|| "building HTTP client")?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn send(&self, req: &HttpRequest) -> Result<HttpReply, TransportError> {
        let mut builder = self.client.post(&req.url).timeout(req.timeout);
        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }
        if let Some(key) = &req.bearer {
            builder = builder.bearer_auth(key.expose());
        }
        builder = match &req.body {
            RequestBody::Json(value) => builder
                .header(CONTENT_TYPE, "application/json; charset=utf-8")
                .json(value),
            RequestBody::Form(fields) => builder.form(fields),
        };

        let resp = builder.send().map_err(TransportError::from_reqwest)?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .map_err(|e| TransportError::Body(e.without_url().to_string()))?;
        debug!(status, bytes = body.len(), "http reply");
        Ok(HttpReply { status, body })
    }
}
