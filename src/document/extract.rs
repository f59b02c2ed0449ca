//! Document Model Extractor.
//!
//! Builds a [`DocumentModel`] from raw document bytes in one pass. Optional
//! facts the document does not declare are left as `None`; only input that
//! cannot be read as markup at all is an error.
//!
//! # Graceful Degradation
//!
//! Version URLs are captured verbatim after trimming, even when malformed.
//! Editors and deliverers are deduplicated by identifier in first-seen order.

use std::sync::{Arc, OnceLock};

use chrono::NaiveDate;
use regex::Regex;
use scraper::ElementRef;
use thiserror::Error;
use url::Url;

use crate::document::model::{DocStatus, DocumentModel};
use crate::document::structure::{compile, element_text, Dom, StructureError};

/// Reasons a document cannot become a document model
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("document is empty")]
    Empty,

    #[error("document does not contain any markup")]
    NotMarkup,

    #[error("document is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("cannot read document from {source_name}: {reason}")]
    Source { source_name: String, reason: String },

    #[error(transparent)]
    Structure(#[from] StructureError),
}

fn date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"\b(\d{1,2})\s+(January|February|March|April|May|June|July|August|September|October|November|December)\s+(\d{4})\b",
        )
        .expect("date regex must compile")
    })
}

fn pp_impl_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"/2004/01/pp-impl/(\d+)(?:/|$)").expect("pp-impl regex must compile")
    })
}

fn process_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^https?://www\.w3\.org/(?:\d{4}/Process-\d{8}|Consortium/Process)")
            .expect("process regex must compile")
    })
}

fn feedback_due_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)(?:remain a candidate recommendation at least until|implementation feedback[^.]*?(?:by|until|before))\s+(\d{1,2}\s+[A-Za-z]+\s+\d{4})",
        )
        .expect("feedback regex must compile")
    })
}

fn reviews_due_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)review[^.]*?(?:until|by|before|no later than)\s+(\d{1,2}\s+[A-Za-z]+\s+\d{4})",
        )
        .expect("review regex must compile")
    })
}

/// Extract a document model from raw bytes.
pub fn extract(bytes: &[u8], base_url: Option<Url>) -> Result<DocumentModel, ExtractionError> {
    let text = std::str::from_utf8(bytes)?;
    extract_str(text, base_url)
}

/// Extract a document model from text already known to be UTF-8.
pub fn extract_str(text: &str, base_url: Option<Url>) -> Result<DocumentModel, ExtractionError> {
    if text.trim().is_empty() {
        return Err(ExtractionError::Empty);
    }
    if !text.contains('<') {
        return Err(ExtractionError::NotMarkup);
    }

    let dom = Dom::parse(text);

    let title = dom
        .text_of("head > title")?
        .or(dom.text_of("h1#title")?)
        .filter(|t| !t.is_empty());

    let state = state_line(&dom)?;
    let profile = state.as_deref().and_then(DocStatus::from_long_status);
    let doc_date = state.as_deref().and_then(parse_long_date);

    let head = read_head_dl(&dom)?;
    let deliverer_ids = deliverer_ids(&dom)?;

    let sotd_text = dom.sotd_text()?;
    let sotd_links = dom.sotd_links()?;
    let sotd_lower = sotd_text.to_lowercase();

    let informative = profile.is_some_and(|p| p.is_note_track())
        || sotd_lower.contains("informative only");
    let rectrack = profile.is_some_and(|p| p.is_rec_track())
        || (profile == Some(DocStatus::WD) && sotd_lower.contains("recommendation track"));

    let process = sotd_links
        .iter()
        .find(|href| process_re().is_match(href))
        .cloned();

    let implementation_feedback_due = capture_date(feedback_due_re(), &sotd_text);
    let pr_reviews_due = if profile == Some(DocStatus::PR) {
        capture_date(reviews_due_re(), &sotd_text)
    } else {
        None
    };

    Ok(DocumentModel {
        profile,
        title,
        doc_date,
        this_version: head.this_version,
        latest_version: head.latest_version,
        previous_version: head.previous_version,
        editor_names: head.editor_names,
        editor_ids: head.editor_ids,
        deliverer_ids,
        informative,
        rectrack,
        process,
        editors_draft: head.editors_draft,
        implementation_feedback_due,
        pr_reviews_due,
        implementation_report: head.implementation_report,
        errata: head.errata,
        source: Arc::from(text),
        base_url,
    })
}

/// The "W3C Working Draft, 12 May 2021" line of the document head
fn state_line(dom: &Dom) -> Result<Option<String>, StructureError> {
    if let Some(state) = dom.text_of("#w3c-state")? {
        return Ok(Some(state));
    }
    dom.text_of("div.head h2")
}

/// Parse the first "12 May 2021" style date in `text`
pub(crate) fn parse_long_date(text: &str) -> Option<NaiveDate> {
    let caps = date_re().captures(text)?;
    let candidate = format!("{} {} {}", &caps[1], &caps[2], &caps[3]);
    NaiveDate::parse_from_str(&candidate, "%d %B %Y").ok()
}

fn capture_date(re: &Regex, text: &str) -> Option<NaiveDate> {
    re.captures(text).and_then(|caps| parse_long_date(&caps[1]))
}

#[derive(Default)]
struct HeadFacts {
    this_version: Option<String>,
    latest_version: Option<String>,
    previous_version: Option<String>,
    editors_draft: Option<String>,
    implementation_report: Option<String>,
    errata: Option<String>,
    editor_names: Vec<String>,
    editor_ids: Vec<u64>,
}

/// What a `dt` of the head `dl` introduces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HeadLabel {
    ThisVersion,
    LatestVersion,
    PreviousVersion,
    EditorsDraft,
    ImplementationReport,
    Errata,
    Editors,
    Other,
}

impl HeadLabel {
    fn classify(dt: &str) -> Self {
        let label = dt.trim().trim_end_matches(':').to_lowercase();
        let label = label.replace('\u{2019}', "'");
        if label.starts_with("this version") {
            HeadLabel::ThisVersion
        } else if label.starts_with("latest published version") || label == "latest version" {
            HeadLabel::LatestVersion
        } else if label.starts_with("previous version") {
            HeadLabel::PreviousVersion
        } else if label.contains("editor's draft") || label.contains("editors' draft") {
            HeadLabel::EditorsDraft
        } else if label.starts_with("implementation report") {
            HeadLabel::ImplementationReport
        } else if label.starts_with("errata") {
            HeadLabel::Errata
        } else if (label.starts_with("editor") || label.starts_with("author"))
            && !label.contains("former")
        {
            HeadLabel::Editors
        } else {
            HeadLabel::Other
        }
    }
}

/// One `dd` of the head `dl`, with the label of the `dt` above it
#[derive(Debug, Clone)]
pub(crate) struct HeadEntry {
    pub label: HeadLabel,
    /// First link target, trimmed
    pub href: Option<String>,
    /// Text of that link, or of the whole `dd` when it has no link
    pub text: String,
    pub editor_id: Option<u64>,
    /// Editor name (text before the affiliation)
    pub name: Option<String>,
}

/// Walk the head `dl` in document order. `None` when there is no such list.
pub(crate) fn head_entries(dom: &Dom) -> Result<Option<Vec<HeadEntry>>, StructureError> {
    let Some(dl) = dom.first("div.head dl")? else {
        return Ok(None);
    };
    let link = compile("a[href]")?;

    let mut entries = Vec::new();
    let mut current = HeadLabel::Other;
    for child in dl.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "dt" => current = HeadLabel::classify(&element_text(child)),
            "dd" => {
                let anchor = child.select(&link).next();
                entries.push(HeadEntry {
                    label: current,
                    href: anchor
                        .and_then(|a| a.value().attr("href"))
                        .map(|href| href.trim().to_string()),
                    text: anchor.map(element_text).unwrap_or_else(|| element_text(child)),
                    editor_id: child
                        .value()
                        .attr("data-editor-id")
                        .and_then(|raw| raw.trim().parse::<u64>().ok()),
                    name: editor_name(child),
                });
            }
            _ => {}
        }
    }
    Ok(Some(entries))
}

fn editor_name(dd: ElementRef<'_>) -> Option<String> {
    let text = element_text(dd);
    let name = text
        .split([',', '('])
        .next()
        .map(str::trim)
        .unwrap_or_default();
    (!name.is_empty()).then(|| name.to_string())
}

fn read_head_dl(dom: &Dom) -> Result<HeadFacts, StructureError> {
    let mut facts = HeadFacts::default();
    let Some(entries) = head_entries(dom)? else {
        return Ok(facts);
    };

    for entry in entries {
        let slot = match entry.label {
            HeadLabel::ThisVersion => &mut facts.this_version,
            HeadLabel::LatestVersion => &mut facts.latest_version,
            HeadLabel::PreviousVersion => &mut facts.previous_version,
            HeadLabel::EditorsDraft => &mut facts.editors_draft,
            HeadLabel::ImplementationReport => &mut facts.implementation_report,
            HeadLabel::Errata => &mut facts.errata,
            HeadLabel::Editors => {
                record_editor(&mut facts, entry);
                continue;
            }
            HeadLabel::Other => continue,
        };
        if slot.is_none() {
            *slot = entry.href;
        }
    }

    Ok(facts)
}

fn record_editor(facts: &mut HeadFacts, entry: HeadEntry) {
    match entry.editor_id {
        Some(id) if facts.editor_ids.contains(&id) => {}
        Some(id) => {
            facts.editor_ids.push(id);
            if let Some(name) = entry.name {
                facts.editor_names.push(name);
            }
        }
        None => {
            if let Some(name) = entry.name.filter(|n| !facts.editor_names.contains(n)) {
                facts.editor_names.push(name);
            }
        }
    }
}

fn deliverer_ids(dom: &Dom) -> Result<Vec<u64>, StructureError> {
    let mut ids = Vec::new();
    let mut push = |id: u64| {
        if !ids.contains(&id) {
            ids.push(id);
        }
    };

    for raw in dom.attr_values("[data-deliverer]", "data-deliverer")? {
        raw.split(|c: char| c == ',' || c.is_whitespace())
            .filter_map(|part| part.trim().parse::<u64>().ok())
            .for_each(&mut push);
    }

    for href in dom.attr_values("a[href]", "href")? {
        if let Some(caps) = pp_impl_re().captures(&href) {
            if let Ok(id) = caps[1].parse::<u64>() {
                push(id);
            }
        }
    }

    Ok(ids)
}
