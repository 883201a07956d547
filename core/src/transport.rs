//! The HTTP transport the dispatcher sends requests through.
//!
//! A transport performs one round-trip per call. It returns every response
//! it receives, including 4xx/5xx, as an `HttpResponse`; only failures to get
//! a response at all (connection refused, TLS, timeouts it enforces) are
//! `TransportError`s. Authentication belongs to the transport.
//!
//! Implementations must be safe to share between concurrent calls.

use std::error::Error as StdError;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::Credentials;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// A request that produced no response.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        let message = match e.url() {
            Some(url) => format!("request to {url} failed"),
            None => "request failed".to_string(),
        };
        Self::with_source(message, e)
    }
}

/// `Transport` backed by a `reqwest::Client`, authenticating with HTTP basic
/// auth.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    credentials: Credentials,
}

impl ReqwestTransport {
    pub fn new(credentials: Credentials) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("twilio-core/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, credentials))
    }

    /// Use a preconfigured client, e.g. one with timeouts or a proxy.
    pub fn with_client(client: reqwest::Client, credentials: Credentials) -> Self {
        Self {
            client,
            credentials,
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        };

        let mut builder = self
            .client
            .request(method, &request.url)
            .basic_auth(self.credentials.account_sid(), Some(self.credentials.auth_token()));
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.text().await?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
