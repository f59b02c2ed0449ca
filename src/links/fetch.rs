//! Network boundary for link resolution and document loading.
//!
//! Everything that touches HTTP goes through [`HttpFetch`] so the resolver
//! and the orchestrator can be driven by a scripted fetcher in tests.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::LOCATION;
use reqwest::{redirect, Client};
use thiserror::Error;
use url::Url;

/// Result of probing one URL without following redirects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The server answered; `location` carries the redirect target if any
    Response {
        status: u16,
        location: Option<String>,
    },
    /// No HTTP answer at all (DNS, connect, TLS, timeout)
    Failed { reason: String },
}

/// Document download failures
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },
}

/// Outbound HTTP used by a validation run
#[async_trait]
pub trait HttpFetch: Send + Sync {
    /// Issue one request for `url` and report the raw answer; redirects
    /// are not followed.
    async fn probe(&self, url: &Url) -> FetchOutcome;

    /// Download a document body, following redirects.
    async fn fetch_document(&self, url: &Url) -> Result<String, FetchError>;
}

/// reqwest-backed fetcher
pub struct ReqwestFetcher {
    probe_client: Client,
    document_client: Client,
}

impl ReqwestFetcher {
    pub fn new(
        request_timeout: Duration,
        max_redirects: usize,
        user_agent: &str,
    ) -> Result<Self, reqwest::Error> {
        let probe_client = Client::builder()
            .redirect(redirect::Policy::none())
            .timeout(request_timeout)
            .user_agent(user_agent)
            .build()?;
        let document_client = Client::builder()
            .redirect(redirect::Policy::limited(max_redirects))
            .timeout(request_timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(ReqwestFetcher {
            probe_client,
            document_client,
        })
    }
}

#[async_trait]
impl HttpFetch for ReqwestFetcher {
    async fn probe(&self, url: &Url) -> FetchOutcome {
        match self.probe_client.get(url.clone()).send().await {
            Ok(response) => FetchOutcome::Response {
                status: response.status().as_u16(),
                location: response
                    .headers()
                    .get(LOCATION)
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_string),
            },
            Err(e) => FetchOutcome::Failed {
                reason: e.to_string(),
            },
        }
    }

    async fn fetch_document(&self, url: &Url) -> Result<String, FetchError> {
        let response = self
            .document_client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::Request {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| FetchError::Request {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}
