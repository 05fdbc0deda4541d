// src/ingest/transport.rs
//! Document retrieval seam. Production uses `HttpTransport`; tests and
//! offline probes use `FixtureTransport`.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

use crate::ingest::types::FetchError;

#[async_trait]
pub trait FeedTransport: Send + Sync {
    /// Retrieve the raw feed document at `url`.
    async fn get(&self, url: &str) -> Result<String, FetchError>;
}

/// reqwest-backed retrieval with a bounded timeout and a descriptive
/// client identifier.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent.to_string())
            .build()?;
        Ok(Self { client, timeout })
    }

    fn classify(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::from(err)
        }
    }
}

#[async_trait]
impl FeedTransport for HttpTransport {
    async fn get(&self, url: &str) -> Result<String, FetchError> {
        let resp = self.client.get(url).send().await.map_err(|e| {
            tracing::warn!(target: "ingest", error = %e, url, "feed http error");
            self.classify(e)
        })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        resp.text().await.map_err(|e| self.classify(e))
    }
}

/// In-memory documents keyed by URL. Unknown URLs answer 404.
#[derive(Debug, Clone, Default)]
pub struct FixtureTransport {
    docs: HashMap<String, String>,
    delays: HashMap<String, Duration>,
}

impl FixtureTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.docs.insert(url.into(), body.into());
        self
    }

    /// Delay the answer for `url`, to exercise fetch timeouts.
    pub fn with_delay(mut self, url: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(url.into(), delay);
        self
    }
}

#[async_trait]
impl FeedTransport for FixtureTransport {
    async fn get(&self, url: &str) -> Result<String, FetchError> {
        if let Some(d) = self.delays.get(url) {
            tokio::time::sleep(*d).await;
        }
        self.docs.get(url).cloned().ok_or_else(|| FetchError::Status {
            status: 404,
            url: url.to_string(),
        })
    }
}
