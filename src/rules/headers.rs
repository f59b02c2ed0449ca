//! Document head rules.
//!
//! Checks the `div.head` block: title, logo, status subtitle, the version
//! `dl` and the elements expected right after it.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;

use crate::document::extract::{head_entries, parse_long_date, HeadEntry, HeadLabel};
use crate::document::structure::normalize_text;
use crate::document::Dom;
use crate::links::{LinkStatus, ResolveOptions};
use crate::rules::{Rule, RuleContext, RuleFault, RuleRegistry, StaticRule};
use crate::RuleId;

pub fn register(registry: &mut RuleRegistry) {
    let rules = [
        StaticRule::new("headers", "div-head", "Document has a div.head block", div_head),
        StaticRule::new("headers", "hr", "The head block ends with an hr", hr),
        StaticRule::new("headers", "title", "Document has a non-empty title", title),
        StaticRule::new("headers", "logo", "Head block carries the W3C logo", logo),
        StaticRule::new("headers", "h1-title", "h1 matches the document title", h1_title),
        StaticRule::new("headers", "h2-status", "Subtitle states status and date", h2_status),
        StaticRule::new("headers", "errata", "Errata link uses HTTPS", errata),
        StaticRule::new("headers", "h2-toc", "Document has a Table of Contents", h2_toc),
        StaticRule::new("headers", "ol-toc", "Table of contents is an ol.toc", ol_toc),
        StaticRule::new("headers", "secno", "Headings carry section numbers", secno),
        StaticRule::new("headers", "copyright", "Document has a copyright notice", copyright),
    ];
    for rule in rules {
        registry.register(Arc::new(rule));
    }
    registry.register(Arc::new(HeadDl));
}

fn div_head(dom: &Dom, ctx: &RuleContext) -> Result<(), RuleFault> {
    if !dom.exists("div.head")? {
        ctx.report.error("not-found");
    }
    Ok(())
}

fn hr(dom: &Dom, ctx: &RuleContext) -> Result<(), RuleFault> {
    if !dom.exists("div.head > hr:last-child")? && !dom.exists("div.head + hr")? {
        ctx.report.error("not-found");
    }
    Ok(())
}

fn title(dom: &Dom, ctx: &RuleContext) -> Result<(), RuleFault> {
    if dom.text_of("head > title")?.map_or(true, |t| t.is_empty()) {
        ctx.report.error("not-found");
    }
    Ok(())
}

fn logo(dom: &Dom, ctx: &RuleContext) -> Result<(), RuleFault> {
    if !dom.exists(r#"div.head a[href] > img[src][alt="W3C"]"#)? {
        ctx.report.error("not-found");
    }
    Ok(())
}

/// Lowercase, punctuation dropped, whitespace collapsed
fn heading_key(text: &str) -> String {
    let kept: String = text
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    normalize_text(&kept.to_lowercase())
}

fn h1_title(dom: &Dom, ctx: &RuleContext) -> Result<(), RuleFault> {
    let h1 = match dom.text_of("div.head h1")? {
        Some(h1) => Some(h1),
        None => dom.text_of("h1#title")?,
    };
    let Some(h1) = h1 else {
        ctx.report.error("not-found");
        return Ok(());
    };

    let title = dom.text_of("head > title")?.unwrap_or_default();
    if heading_key(&h1) != heading_key(&title) {
        ctx.report
            .error_with("not-match", format!("h1 '{}' vs title '{}'", h1, title));
    }
    Ok(())
}

fn h2_status(dom: &Dom, ctx: &RuleContext) -> Result<(), RuleFault> {
    let Some(long_status) = ctx.config.long_status.as_deref() else {
        return Ok(());
    };

    let state = match dom.text_of("#w3c-state")? {
        Some(state) => Some(state),
        None => dom.text_of("div.head h2")?,
    };
    let Some(state) = state else {
        ctx.report.error("no-h2");
        return Ok(());
    };

    let mut expected = format!("W3C {}", long_status);
    if let Some(cr_type) = ctx.config.cr_type.as_deref() {
        if long_status.starts_with("Candidate Recommendation") && !long_status.ends_with(cr_type)
        {
            expected.push(' ');
            expected.push_str(cr_type);
        }
    }
    if ctx.config.amended == Some(true) {
        expected.push_str(" with amendments");
    }

    let matches = state.strip_prefix(&expected).is_some_and(|rest| {
        let rest = rest.trim_start_matches(',').trim();
        rest.starts_with(|c: char| c.is_ascii_digit()) && parse_long_date(rest).is_some()
    });
    if !matches {
        ctx.report
            .error_with("bad-h2", format!("expected '{}', found '{}'", expected, state));
    }
    Ok(())
}

fn errata(_dom: &Dom, ctx: &RuleContext) -> Result<(), RuleFault> {
    if let Some(errata) = ctx.model.errata.as_deref() {
        if errata.starts_with("http://") {
            ctx.report.error_with("link-should-be-https", errata);
        }
    }
    Ok(())
}

fn h2_toc(dom: &Dom, ctx: &RuleContext) -> Result<(), RuleFault> {
    let found = dom.exists("h2#table-of-contents")?
        || dom
            .h2_texts()?
            .iter()
            .any(|h| h.eq_ignore_ascii_case("table of contents"));
    if !found {
        ctx.report.error("not-found");
    }
    Ok(())
}

fn ol_toc(dom: &Dom, ctx: &RuleContext) -> Result<(), RuleFault> {
    if !dom.exists("ol.toc")? {
        ctx.report.warning("not-found");
    }
    Ok(())
}

fn secno(dom: &Dom, ctx: &RuleContext) -> Result<(), RuleFault> {
    if !dom.exists(".secno")? {
        ctx.report.warning("not-found");
    }
    Ok(())
}

fn copyright(dom: &Dom, ctx: &RuleContext) -> Result<(), RuleFault> {
    if !dom.exists("p.copyright")? {
        ctx.report.error("not-found");
    }
    Ok(())
}

fn dated_version_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^https://www\.w3\.org/TR/\d{4}/([A-Z]+)-(.+)-(\d{8})/$")
            .expect("dated version regex must compile")
    })
}

fn latest_version_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^https://www\.w3\.org/TR/([^/\s]+)/$").expect("latest regex must compile")
    })
}

/// Status code and shortname of a dated `/TR/YYYY/STATUS-name-YYYYMMDD/` URL
fn dated_parts(url: &str) -> Option<(String, String)> {
    dated_version_re()
        .captures(url)
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
}

/// The version `dl`: links present, well-formed, ordered, retrievable
struct HeadDl;

impl HeadDl {
    /// Synchronous part of the rule; returns the latest-version URL to probe
    fn inspect(&self, ctx: &RuleContext) -> Result<Option<String>, RuleFault> {
        let dom = ctx.model.structure();
        let report = &ctx.report;

        let entries = match head_entries(&dom)? {
            Some(entries) => entries,
            None => {
                report.error("not-found");
                Vec::new()
            }
        };

        let position = |label: HeadLabel| entries.iter().position(|e| e.label == label);
        let entry = |label: HeadLabel| position(label).map(|i| &entries[i]);
        let link_diff = |e: &HeadEntry, href: &str| {
            if e.text.trim() != href {
                report.error_with("link-diff", format!("'{}' links to '{}'", e.text, href));
            }
        };

        let status = ctx.status();
        let this = entry(HeadLabel::ThisVersion).and_then(|e| e.href.as_deref().map(|h| (e, h)));
        let latest =
            entry(HeadLabel::LatestVersion).and_then(|e| e.href.as_deref().map(|h| (e, h)));
        let previous =
            entry(HeadLabel::PreviousVersion).and_then(|e| e.href.as_deref().map(|h| (e, h)));

        let this_parts = match this {
            None => {
                report.error("this-version");
                None
            }
            Some((e, href)) => {
                let parts = dated_parts(href);
                let status_ok = match (&parts, &status) {
                    (Some((code, _)), Some(status)) => code == status,
                    (Some(_), None) => true,
                    (None, _) => false,
                };
                if !status_ok {
                    report.error_with("this-syntax", href);
                }
                link_diff(e, href);
                parts
            }
        };

        let latest_to_check = match latest {
            None => {
                report.error("latest-version");
                None
            }
            Some((e, href)) => {
                let valid = latest_version_re().is_match(href);
                if !valid {
                    report.error_with("latest-syntax", href);
                }
                link_diff(e, href);
                valid.then(|| href.to_string())
            }
        };

        match previous {
            None if ctx.config.previous_version == Some(true) => {
                report.error("previous-version");
            }
            None => {}
            Some((e, href)) => {
                let parts = dated_parts(href);
                if parts.is_none() {
                    report.error_with("previous-syntax", href);
                }
                link_diff(e, href);
                if ctx.config.previous_version != Some(true) {
                    report.warning("previous-not-needed");
                }
                if let (Some((_, this_name)), Some((_, previous_name))) = (&this_parts, &parts) {
                    if this_name != previous_name {
                        report.warning_with(
                            "this-previous-shortname",
                            format!("{} became {}", previous_name, this_name),
                        );
                    }
                }
            }
        }

        let this_pos = position(HeadLabel::ThisVersion);
        let latest_pos = position(HeadLabel::LatestVersion);
        let previous_pos = position(HeadLabel::PreviousVersion);
        if matches!((this_pos, latest_pos), (Some(t), Some(l)) if t > l) {
            report.error("this-latest-order");
        }
        if matches!((latest_pos, previous_pos), (Some(l), Some(p)) if l > p) {
            report.error("latest-previous-order");
        }

        let editors: Vec<&HeadEntry> = entries
            .iter()
            .filter(|e| e.label == HeadLabel::Editors)
            .collect();
        if editors.is_empty() {
            report.error("editor-not-found");
        }
        for editor in editors.iter().filter(|e| e.editor_id.is_none()) {
            report.error_with("editor-missing-id", editor.text.clone());
        }

        let insecure = |label: HeadLabel| {
            entries
                .iter()
                .filter(|e| e.label == label)
                .filter_map(|e| e.href.as_deref())
                .any(|href| href.starts_with("http://"))
        };
        if insecure(HeadLabel::EditorsDraft) {
            report.error("editors-draft-should-be-https");
        }
        if insecure(HeadLabel::ImplementationReport) {
            report.error("implelink-should-be-https");
        }

        Ok(latest_to_check)
    }
}

#[async_trait]
impl Rule for HeadDl {
    fn id(&self) -> RuleId {
        RuleId::new("headers", "dl")
    }

    fn description(&self) -> &'static str {
        "Version links are present, well-formed, ordered and retrievable"
    }

    async fn run(&self, ctx: &RuleContext) -> Result<(), RuleFault> {
        let Some(latest) = self.inspect(ctx)? else {
            return Ok(());
        };

        let resolution = ctx.resolver.resolve(&latest, ResolveOptions::default()).await?;
        if resolution.status != LinkStatus::Reachable {
            ctx.report.error_with(
                "cant-retrieve",
                resolution
                    .failure
                    .unwrap_or_else(|| format!("{} is not reachable", latest)),
            );
        }
        Ok(())
    }
}
