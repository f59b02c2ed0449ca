//! Text heuristics.

use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::document::structure::element_text;
use crate::document::Dom;
use crate::rules::{RuleContext, RuleFault, RuleRegistry, StaticRule};

/// "May 12, 2021" and "12/05/2021"; dates are written "12 May 2021"
fn wrong_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"\b(?:(?:January|February|March|April|May|June|July|August|September|October|November|December) \d{1,2}, \d{4}|\d{1,2}/\d{1,2}/\d{4})\b",
        )
        .expect("date regex must compile")
    })
}

pub fn register(registry: &mut RuleRegistry) {
    registry.register(Arc::new(StaticRule::new(
        "heuristic",
        "date-format",
        "Dates are written day month year",
        date_format,
    )));
}

fn date_format(dom: &Dom, ctx: &RuleContext) -> Result<(), RuleFault> {
    let Some(body) = dom.first("body")? else {
        return Ok(());
    };
    let text = element_text(body);
    for found in wrong_date_re().find_iter(&text) {
        ctx.report.error_with("wrong", found.as_str());
    }
    Ok(())
}
