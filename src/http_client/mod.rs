//! HTTP fetching for watch jobs.
//!
//! Stored URLs usually omit the scheme (`example.test/tos`); those are
//! fetched over HTTPS.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use url::Url;

use crate::models::FailureCause;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl FetchError {
    pub fn cause(&self) -> FailureCause {
        match self {
            Self::Timeout(_) => FailureCause::Timeout,
            Self::HttpStatus { .. } => FailureCause::HttpStatusError,
            Self::Network(_) | Self::InvalidUrl { .. } => FailureCause::NetworkError,
        }
    }
}

/// Resolve a stored URL to an absolute HTTP(S) URL.
pub fn normalize_url(raw: &str) -> Result<Url, FetchError> {
    let trimmed = raw.trim();
    let invalid = |reason: String| FetchError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let url = Url::parse(&candidate).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", url.scheme())));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }
    Ok(url)
}

/// Source of remote document text.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// reqwest-backed fetcher. Redirects are followed; every request carries the
/// configured timeout.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self { client, timeout })
    }

    fn classify(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            return FetchError::Timeout(self.timeout);
        }
        let mut message = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(inner) = source {
            message = format!("{}: {}", message, inner);
            source = inner.source();
        }
        FetchError::Network(message)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let url = normalize_url(url)?;

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response.text().await.map_err(|e| self.classify(e))
    }
}
