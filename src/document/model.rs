//! Canonical document facts.
//!
//! A `DocumentModel` is built exactly once per run by the extractor and is
//! shared read-only (behind an `Arc`) by every rule of that run.

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use url::Url;

use crate::document::structure::Dom;

/// Publication status declared by a document.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DocStatus {
    /// Editor's Draft
    ED,
    /// Working Draft
    WD,
    /// Candidate Recommendation Snapshot
    CR,
    /// Candidate Recommendation Draft
    CRD,
    /// Proposed Recommendation
    PR,
    /// Recommendation
    REC,
    /// Draft Note
    DNOTE,
    /// Group Note
    NOTE,
    /// Statement
    STMT,
    /// Discontinued Draft
    DISC,
    /// Draft Registry
    DRY,
    /// Candidate Registry Draft
    CRYD,
    /// Candidate Registry Snapshot
    CRY,
    /// Registry
    RY,
}

// Longest phrases first so "Candidate Recommendation Draft" wins over
// "Recommendation".
const LONG_STATUS_TABLE: &[(&str, DocStatus)] = &[
    ("candidate recommendation snapshot", DocStatus::CR),
    ("candidate recommendation draft", DocStatus::CRD),
    ("candidate registry snapshot", DocStatus::CRY),
    ("candidate registry draft", DocStatus::CRYD),
    ("proposed recommendation", DocStatus::PR),
    ("candidate recommendation", DocStatus::CR),
    ("working group note", DocStatus::NOTE),
    ("interest group note", DocStatus::NOTE),
    ("discontinued draft", DocStatus::DISC),
    ("editor's draft", DocStatus::ED),
    ("editor\u{2019}s draft", DocStatus::ED),
    ("working draft", DocStatus::WD),
    ("draft registry", DocStatus::DRY),
    ("recommendation", DocStatus::REC),
    ("group note", DocStatus::NOTE),
    ("draft note", DocStatus::DNOTE),
    ("statement", DocStatus::STMT),
    ("registry", DocStatus::RY),
];

impl DocStatus {
    /// Short code, e.g. `WD`
    pub fn as_str(&self) -> &'static str {
        match self {
            DocStatus::ED => "ED",
            DocStatus::WD => "WD",
            DocStatus::CR => "CR",
            DocStatus::CRD => "CRD",
            DocStatus::PR => "PR",
            DocStatus::REC => "REC",
            DocStatus::DNOTE => "DNOTE",
            DocStatus::NOTE => "NOTE",
            DocStatus::STMT => "STMT",
            DocStatus::DISC => "DISC",
            DocStatus::DRY => "DRY",
            DocStatus::CRYD => "CRYD",
            DocStatus::CRY => "CRY",
            DocStatus::RY => "RY",
        }
    }

    /// Human-readable status as it appears in a document's subtitle
    pub fn long_name(&self) -> &'static str {
        match self {
            DocStatus::ED => "Editor's Draft",
            DocStatus::WD => "Working Draft",
            DocStatus::CR => "Candidate Recommendation Snapshot",
            DocStatus::CRD => "Candidate Recommendation Draft",
            DocStatus::PR => "Proposed Recommendation",
            DocStatus::REC => "Recommendation",
            DocStatus::DNOTE => "Draft Note",
            DocStatus::NOTE => "Group Note",
            DocStatus::STMT => "Statement",
            DocStatus::DISC => "Discontinued Draft",
            DocStatus::DRY => "Draft Registry",
            DocStatus::CRYD => "Candidate Registry Draft",
            DocStatus::CRY => "Candidate Registry Snapshot",
            DocStatus::RY => "Registry",
        }
    }

    /// Parse a short code (`REC`) case-insensitively
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim().to_ascii_uppercase();
        let all = [
            DocStatus::ED,
            DocStatus::WD,
            DocStatus::CR,
            DocStatus::CRD,
            DocStatus::PR,
            DocStatus::REC,
            DocStatus::DNOTE,
            DocStatus::NOTE,
            DocStatus::STMT,
            DocStatus::DISC,
            DocStatus::DRY,
            DocStatus::CRYD,
            DocStatus::CRY,
            DocStatus::RY,
        ];
        all.into_iter().find(|s| s.as_str() == code)
    }

    /// Find the status named inside free text such as
    /// "W3C Candidate Recommendation Draft 12 May 2021"
    pub fn from_long_status(text: &str) -> Option<Self> {
        let lower = text.to_lowercase();
        LONG_STATUS_TABLE
            .iter()
            .find(|(phrase, _)| lower.contains(phrase))
            .map(|(_, status)| *status)
    }

    /// Statuses published on the Recommendation track
    pub fn is_rec_track(&self) -> bool {
        matches!(
            self,
            DocStatus::CR | DocStatus::CRD | DocStatus::PR | DocStatus::REC
        )
    }

    /// Statuses whose content is informative only
    pub fn is_note_track(&self) -> bool {
        matches!(self, DocStatus::NOTE | DocStatus::DNOTE)
    }
}

impl fmt::Display for DocStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Canonical fact structure of one document.
///
/// Version URLs are kept verbatim (trimmed) even when malformed; judging
/// their syntax is a rule's job.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentModel {
    pub profile: Option<DocStatus>,
    pub title: Option<String>,
    pub doc_date: Option<NaiveDate>,
    pub this_version: Option<String>,
    pub latest_version: Option<String>,
    pub previous_version: Option<String>,
    pub editor_names: Vec<String>,
    pub editor_ids: Vec<u64>,
    pub deliverer_ids: Vec<u64>,
    pub informative: bool,
    pub rectrack: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editors_draft: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implementation_feedback_due: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr_reviews_due: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implementation_report: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errata: Option<String>,
    #[serde(skip)]
    pub(crate) source: Arc<str>,
    #[serde(skip)]
    pub(crate) base_url: Option<Url>,
}

impl DocumentModel {
    /// Parse the document again and hand back a structural view.
    ///
    /// Every call reparses: the parsed tree (`scraper::Html`) is not `Send`,
    /// so it cannot live in the model shared across spawned rule tasks. Drop
    /// the view before awaiting.
    pub fn structure(&self) -> Dom {
        Dom::parse(&self.source)
    }

    /// Raw document text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// URL the document was fetched from, if any
    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }
}

/// Compare two multi-valued facts as multisets.
///
/// Equal length and every element of `expected` matched by a distinct,
/// unused element of `actual`.
pub fn set_equivalent<T: PartialEq>(actual: &[T], expected: &[T]) -> bool {
    if actual.len() != expected.len() {
        return false;
    }

    let mut used = vec![false; actual.len()];
    for wanted in expected {
        let slot = actual
            .iter()
            .enumerate()
            .position(|(i, candidate)| !used[i] && candidate == wanted);
        match slot {
            Some(i) => used[i] = true,
            None => return false,
        }
    }
    true
}
