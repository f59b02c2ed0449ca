//! Structure rules: mandatory sections, section ids, canonical link,
//! neutral wording.

use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::document::structure::{compile, element_text};
use crate::document::Dom;
use crate::rules::{RuleContext, RuleFault, RuleRegistry, StaticRule};

/// Leading `h2` headings every document opens with, with their finding keys
const OPENING_SECTIONS: [(&str, &str); 3] = [
    ("abstract", "Abstract"),
    ("sotd", "Status of This Document"),
    ("toc", "Table of Contents"),
];

fn non_neutral_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(master|slaves?|blacklist(?:ed|s)?|whitelist(?:ed|s)?|grandfathered|sanity[ -]check|dummy)\b",
        )
        .expect("neutral wording regex must compile")
    })
}

pub fn register(registry: &mut RuleRegistry) {
    let rules = [
        StaticRule::new(
            "structure",
            "h2",
            "Abstract, Status and Table of Contents open the document",
            h2,
        ),
        StaticRule::new("structure", "section-ids", "Every section has an id", section_ids),
        StaticRule::new("structure", "canonical", "A canonical link is declared", canonical),
        StaticRule::new("structure", "neutral", "Wording avoids non-neutral terms", neutral),
    ];
    for rule in rules {
        registry.register(Arc::new(rule));
    }
}

fn h2(dom: &Dom, ctx: &RuleContext) -> Result<(), RuleFault> {
    let headings = dom.h2_texts()?;
    for (position, (key, expected)) in OPENING_SECTIONS.iter().enumerate() {
        let found = headings
            .get(position)
            .is_some_and(|text| text.eq_ignore_ascii_case(expected));
        if !found {
            ctx.report.error_with(key, format!("expected \"{expected}\""));
        }
    }
    Ok(())
}

fn section_ids(dom: &Dom, ctx: &RuleContext) -> Result<(), RuleFault> {
    for section in dom.select("section:not([id])")? {
        let heading = section
            .select(&compile("h2, h3, h4, h5, h6")?)
            .next()
            .map(element_text)
            .unwrap_or_default();
        ctx.report.error_with("no-id", heading);
    }
    Ok(())
}

fn canonical(dom: &Dom, ctx: &RuleContext) -> Result<(), RuleFault> {
    let found = dom
        .attr_values(r#"link[rel="canonical"][href]"#, "href")?
        .iter()
        .any(|href| !href.trim().is_empty());
    if !found {
        ctx.report.error("not-found");
    }
    Ok(())
}

fn neutral(dom: &Dom, ctx: &RuleContext) -> Result<(), RuleFault> {
    let Some(body) = dom.first("body")? else {
        return Ok(());
    };
    let text = element_text(body);
    let words: BTreeSet<String> = non_neutral_re()
        .find_iter(&text)
        .map(|m| m.as_str().to_lowercase())
        .collect();
    if !words.is_empty() {
        ctx.report
            .warning_with("neutral", words.into_iter().collect::<Vec<_>>().join(", "));
    }
    Ok(())
}
