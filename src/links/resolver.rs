//! Link Resolver.
//!
//! Resolves a URL by probing it and following `Location` headers by hand so
//! every hop is recorded. Results are cached for the lifetime of one run and
//! concurrent lookups of the same URL share a single in-flight resolution.
//!
//! # Graceful Degradation
//!
//! Ordinary network failures never surface as errors: they are encoded in
//! [`LinkStatus`]. Only a malformed same-origin base is fatal.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use thiserror::Error;
use tokio::sync::OnceCell;
use url::Url;

use crate::links::fetch::{FetchOutcome, HttpFetch};
use crate::links::reliability::{HostPolicy, HostReliability};

/// Resolver configuration errors
#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("invalid base URL '{base}': {reason}")]
    InvalidBase { base: String, reason: String },

    #[error("HTTP client could not be built: {0}")]
    Client(String),
}

/// Reachability of a resolved link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkStatus {
    Reachable,
    Broken,
    RedirectedThenBroken,
}

/// Outcome of resolving one link
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkResolution {
    pub requested: String,
    pub final_url: String,
    /// Every redirect target in the order it was followed
    pub redirect_chain: Vec<String>,
    pub status: LinkStatus,
    pub host_reliability: HostReliability,
    pub http_status: Option<u16>,
    pub failure: Option<String>,
    /// Whether the final URL sits under the directory of the supplied base
    pub same_folder: Option<bool>,
}

/// Per-call options
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveOptions<'a> {
    pub same_origin_base: Option<&'a str>,
}

/// Cached, base-independent part of a resolution
#[derive(Debug, Clone)]
struct Walk {
    final_url: String,
    redirect_chain: Vec<String>,
    status: LinkStatus,
    host_reliability: HostReliability,
    http_status: Option<u16>,
    failure: Option<String>,
}

type CacheSlot = Arc<OnceCell<Walk>>;

/// Link resolver scoped to one validation run
pub struct LinkResolver {
    fetcher: Arc<dyn HttpFetch>,
    policy: HostPolicy,
    max_redirects: usize,
    cache: Mutex<HashMap<String, CacheSlot>>,
    fetches: AtomicUsize,
}

impl LinkResolver {
    pub fn new(fetcher: Arc<dyn HttpFetch>, policy: HostPolicy, max_redirects: usize) -> Self {
        LinkResolver {
            fetcher,
            policy,
            max_redirects,
            cache: Mutex::new(HashMap::new()),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn policy(&self) -> &HostPolicy {
        &self.policy
    }

    /// Number of distinct network resolutions started in this run
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Resolve `target`, following redirects.
    pub async fn resolve(
        &self,
        target: &str,
        options: ResolveOptions<'_>,
    ) -> Result<LinkResolution, ResolverError> {
        let base = options
            .same_origin_base
            .map(|raw| {
                Url::parse(raw.trim()).map_err(|e| ResolverError::InvalidBase {
                    base: raw.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        let requested = target.trim().to_string();
        let url = match parse_http_url(&requested) {
            Ok(url) => url,
            Err(reason) => {
                return Ok(LinkResolution {
                    final_url: requested.clone(),
                    requested,
                    redirect_chain: Vec::new(),
                    status: LinkStatus::Broken,
                    host_reliability: HostReliability::Reliable,
                    http_status: None,
                    failure: Some(reason),
                    same_folder: None,
                });
            }
        };

        let slot = self.slot_for(&url);
        let walk = slot.get_or_init(|| self.walk(url)).await.clone();

        let same_folder = base.as_ref().map(|base| {
            Url::parse(&walk.final_url)
                .map(|final_url| is_same_folder(base, &final_url))
                .unwrap_or(false)
        });

        Ok(LinkResolution {
            requested,
            final_url: walk.final_url,
            redirect_chain: walk.redirect_chain,
            status: walk.status,
            host_reliability: walk.host_reliability,
            http_status: walk.http_status,
            failure: walk.failure,
            same_folder,
        })
    }

    fn slot_for(&self, url: &Url) -> CacheSlot {
        let mut cache = self
            .cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        cache
            .entry(url.as_str().to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    async fn walk(&self, start: Url) -> Walk {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(url = %start, "resolving link");

        let mut reliability = self.policy.classify(&start);
        let mut chain: Vec<String> = Vec::new();
        let mut current = start;

        loop {
            let failed =
                move |chain: Vec<String>, current: &Url, status: Option<u16>, reason: String| {
                    Walk {
                        final_url: current.to_string(),
                        status: if chain.is_empty() {
                            LinkStatus::Broken
                        } else {
                            LinkStatus::RedirectedThenBroken
                        },
                        redirect_chain: chain,
                        host_reliability: reliability,
                        http_status: status,
                        failure: Some(reason),
                    }
                };

            match self.fetcher.probe(&current).await {
                FetchOutcome::Failed { reason } => {
                    return failed(chain, &current, None, reason);
                }
                FetchOutcome::Response { status, location } if (300..400).contains(&status) => {
                    let next = location.and_then(|loc| current.join(loc.trim()).ok());
                    let Some(next) = next else {
                        return failed(
                            chain,
                            &current,
                            Some(status),
                            format!("HTTP {status} without a usable Location header"),
                        );
                    };
                    if chain.len() >= self.max_redirects {
                        return failed(
                            chain,
                            &current,
                            Some(status),
                            format!("more than {} redirects", self.max_redirects),
                        );
                    }
                    if self.policy.classify(&next) == HostReliability::Unreliable {
                        reliability = HostReliability::Unreliable;
                    }
                    chain.push(next.to_string());
                    current = next;
                }
                FetchOutcome::Response { status, .. } if (200..300).contains(&status) => {
                    return Walk {
                        final_url: current.to_string(),
                        redirect_chain: chain,
                        status: LinkStatus::Reachable,
                        host_reliability: reliability,
                        http_status: Some(status),
                        failure: None,
                    };
                }
                FetchOutcome::Response { status, .. } => {
                    return failed(chain, &current, Some(status), format!("HTTP {status}"));
                }
            }
        }
    }
}

fn parse_http_url(raw: &str) -> Result<Url, String> {
    let mut url = Url::parse(raw).map_err(|e| format!("invalid URL: {e}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    url.set_fragment(None);
    Ok(url)
}

/// Same scheme, host and port as `base`, with a path under the base's directory
pub fn is_same_folder(base: &Url, candidate: &Url) -> bool {
    if base.scheme() != candidate.scheme()
        || base.host_str() != candidate.host_str()
        || base.port_or_known_default() != candidate.port_or_known_default()
    {
        return false;
    }

    let base_path = base.path();
    let folder = match base_path.rfind('/') {
        Some(idx) => &base_path[..=idx],
        None => "/",
    };
    candidate.path().starts_with(folder)
}
