//! Mock HTTP boundary.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use docrules::links::{FetchError, FetchOutcome, HttpFetch};
use url::Url;

/// Scripted answer to a probe
#[derive(Debug, Clone)]
pub enum MockResponse {
    Ok,
    Status(u16),
    Redirect(u16, String),
    Unreachable(String),
}

impl MockResponse {
    fn outcome(&self) -> FetchOutcome {
        match self {
            MockResponse::Ok => FetchOutcome::Response {
                status: 200,
                location: None,
            },
            MockResponse::Status(status) => FetchOutcome::Response {
                status: *status,
                location: None,
            },
            MockResponse::Redirect(status, location) => FetchOutcome::Response {
                status: *status,
                location: Some(location.clone()),
            },
            MockResponse::Unreachable(reason) => FetchOutcome::Failed {
                reason: reason.clone(),
            },
        }
    }
}

/// Fetcher answering from a script; unscripted URLs get a 404
#[derive(Default)]
pub struct MockFetcher {
    responses: HashMap<String, MockResponse>,
    documents: HashMap<String, String>,
    delay: Option<Duration>,
    fallback: Option<MockResponse>,
    probes: Mutex<HashMap<String, usize>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetcher that answers 200 to every probe
    pub fn all_ok() -> Self {
        MockFetcher {
            fallback: Some(MockResponse::Ok),
            ..Self::default()
        }
    }

    pub fn with_response(mut self, url: &str, response: MockResponse) -> Self {
        self.responses.insert(normalize(url), response);
        self
    }

    pub fn with_document(mut self, url: &str, html: &str) -> Self {
        self.documents.insert(normalize(url), html.to_string());
        self
    }

    /// Sleep before answering each probe
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Probes issued for `url` so far
    pub fn probe_count(&self, url: &str) -> usize {
        self.probes
            .lock()
            .unwrap()
            .get(&normalize(url))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_probes(&self) -> usize {
        self.probes.lock().unwrap().values().sum()
    }
}

fn normalize(url: &str) -> String {
    Url::parse(url)
        .map(String::from)
        .unwrap_or_else(|_| url.to_string())
}

#[async_trait]
impl HttpFetch for MockFetcher {
    async fn probe(&self, url: &Url) -> FetchOutcome {
        *self
            .probes
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_insert(0) += 1;

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.responses
            .get(url.as_str())
            .or(self.fallback.as_ref())
            .map(MockResponse::outcome)
            .unwrap_or(FetchOutcome::Response {
                status: 404,
                location: None,
            })
    }

    async fn fetch_document(&self, url: &Url) -> Result<String, FetchError> {
        self.documents
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}
