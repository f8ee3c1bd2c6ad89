// MapGate - transport.rs

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, redirect, Client};
use thiserror::Error;

/// Errors raised by a single network call made during a probe.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Connection failed: {0}")]
    Connection(String),
    #[error("Could not build HTTP client: {0}")]
    Client(String),
}

/// What the existence GET learned: the terminal status and where the redirect chain ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistenceResponse {
    pub status: u16,
    pub final_url: String,
}

/// What a size HEAD learned. `content_length` is the raw header value, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeResponse {
    pub status: u16,
    pub content_length: Option<String>,
}

impl SizeResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The two HTTP capabilities a probe needs.
///
/// `get` must follow redirects and report the URL the chain terminated at.
/// Implementations apply their own timeouts; a timed out call is an `Err`.
#[async_trait]
pub trait ProbeTransport: Send + Sync {
    async fn get(&self, url: &str) -> Result<ExistenceResponse, TransportError>;
    async fn head(&self, url: &str) -> Result<SizeResponse, TransportError>;
}

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    pub max_redirects: usize,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            max_redirects: 10,
            user_agent: concat!("map-gate/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// reqwest-backed transport. Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .redirect(redirect::Policy::limited(config.max_redirects))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ProbeTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<ExistenceResponse, TransportError> {
        // Only the headers are awaited. Dropping the response abandons the body,
        // so a large archive is never downloaded here.
        let response = self.client.get(url).send().await?;
        Ok(ExistenceResponse {
            status: response.status().as_u16(),
            final_url: response.url().to_string(),
        })
    }

    async fn head(&self, url: &str) -> Result<SizeResponse, TransportError> {
        let response = self.client.head(url).send().await?;
        let content_length = response
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|val| val.to_str().ok())
            .map(|s| s.to_string());

        Ok(SizeResponse {
            status: response.status().as_u16(),
            content_length,
        })
    }
}
