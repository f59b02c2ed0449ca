//! Static host reliability policy.
//!
//! Some hosts are known to be flaky or to serve unstable content. Links to
//! them are still checked for reachability; reliability is only ever a
//! warning-grade signal.

use serde::{Deserialize, Serialize};
use url::Url;

/// Reliability of the host serving a link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostReliability {
    Reliable,
    Unreliable,
}

/// A host (subdomains included) and an optional path prefix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostPattern {
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_prefix: Option<String>,
}

impl HostPattern {
    pub fn host(host: &str) -> Self {
        HostPattern {
            host: host.to_ascii_lowercase(),
            path_prefix: None,
        }
    }

    pub fn host_and_path(host: &str, path_prefix: &str) -> Self {
        HostPattern {
            host: host.to_ascii_lowercase(),
            path_prefix: Some(path_prefix.to_string()),
        }
    }

    pub fn matches(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        let host_matches = host == self.host
            || host
                .strip_suffix(&self.host)
                .is_some_and(|prefix| prefix.ends_with('.'));

        host_matches
            && self
                .path_prefix
                .as_deref()
                .map_or(true, |prefix| url.path().starts_with(prefix))
    }
}

/// Deny-list of hosts considered unreliable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostPolicy {
    unreliable: Vec<HostPattern>,
}

impl Default for HostPolicy {
    fn default() -> Self {
        HostPolicy {
            unreliable: vec![
                HostPattern::host("w3c-test.org"),
                HostPattern::host_and_path("www.w3.org", "/Bugs/"),
                HostPattern::host("dev.w3.org"),
                HostPattern::host("dvcs.w3.org"),
                HostPattern::host("tools.ietf.org"),
            ],
        }
    }
}

impl HostPolicy {
    /// Policy that trusts every host
    pub fn permissive() -> Self {
        HostPolicy {
            unreliable: Vec::new(),
        }
    }

    pub fn with_unreliable(mut self, pattern: HostPattern) -> Self {
        self.unreliable.push(pattern);
        self
    }

    pub fn classify(&self, url: &Url) -> HostReliability {
        if self.unreliable.iter().any(|p| p.matches(url)) {
            HostReliability::Unreliable
        } else {
            HostReliability::Reliable
        }
    }

    /// Classify a raw link target; unparseable targets are not judged here
    pub fn classify_str(&self, target: &str) -> HostReliability {
        Url::parse(target.trim())
            .map(|url| self.classify(&url))
            .unwrap_or(HostReliability::Reliable)
    }
}
