//! Upstream feed fetchers.
//!
//! - [`HttpFeed`]: GET against the metro API with reqwest
//! - [`FileFeed`]: reads a local JSON file (mock mode)
//! - [`AnyFeed`]: one of the two, picked from configuration at startup

use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION};
use tracing::{debug, info, warn};

use crate::config::UpstreamConfig;
use crate::error::FetchError;
use crate::feed::FeedResponse;
use crate::traits::FeedSource;

// ============================================================================
// HTTP
// ============================================================================

/// Fetches the all-stations feed over HTTP.
#[derive(Clone, Debug)]
pub struct HttpFeed {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl HttpFeed {
    /// Build a client from configuration.
    ///
    /// Loads the extra root certificate when `ca_file` is set. Fails if the
    /// certificate cannot be read or parsed.
    pub fn new(config: &UpstreamConfig) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.fetch_timeout_ms))
            .danger_accept_invalid_certs(config.tls_insecure);

        if config.tls_insecure {
            warn!("TLS certificate verification disabled for upstream feed");
        }

        if let Some(path) = &config.ca_file {
            // Runs once during startup, before any poll is scheduled.
            let pem = std::fs::read(path)?;
            let cert = reqwest::Certificate::from_pem(&pem)?;
            builder = builder.add_root_certificate(cert);
            info!(path = %path, "loaded upstream CA certificate");
        }

        Ok(Self {
            client: builder.build()?,
            url: config.feed_url(),
            api_key: config.has_auth().then(|| config.api_key.clone()),
        })
    }

    /// Full request URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl FeedSource for HttpFeed {
    async fn fetch(&self) -> Result<FeedResponse, FetchError> {
        let mut request = self
            .client
            .get(&self.url)
            .header(ACCEPT, "application/json");
        if let Some(key) = &self.api_key {
            request = request.header(AUTHORIZATION, format!("Bearer {key}"));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        debug!(bytes = body.len(), "upstream response received");
        FeedResponse::from_slice(&body)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

// ============================================================================
// File
// ============================================================================

/// Reads the feed body from a local file on every fetch.
#[derive(Clone, Debug)]
pub struct FileFeed {
    path: String,
}

impl FileFeed {
    /// Read from `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl FeedSource for FileFeed {
    async fn fetch(&self) -> Result<FeedResponse, FetchError> {
        let body = tokio::fs::read(&self.path).await?;
        FeedResponse::from_slice(&body)
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path)
    }
}

// ============================================================================
// Selection
// ============================================================================

/// The feed chosen at startup.
#[derive(Clone, Debug)]
pub enum AnyFeed {
    /// Live upstream API
    Http(HttpFeed),
    /// Local mock file
    File(FileFeed),
}

impl AnyFeed {
    /// Mock file when configured, otherwise HTTP.
    pub fn from_config(config: &UpstreamConfig) -> Result<Self, FetchError> {
        match &config.mock_file {
            Some(path) => Ok(AnyFeed::File(FileFeed::new(path.clone()))),
            None => HttpFeed::new(config).map(AnyFeed::Http),
        }
    }
}

impl FeedSource for AnyFeed {
    async fn fetch(&self) -> Result<FeedResponse, FetchError> {
        match self {
            AnyFeed::Http(feed) => feed.fetch().await,
            AnyFeed::File(feed) => feed.fetch().await,
        }
    }

    fn describe(&self) -> String {
        match self {
            AnyFeed::Http(feed) => feed.describe(),
            AnyFeed::File(feed) => feed.describe(),
        }
    }
}
