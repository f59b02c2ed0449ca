//! Status of This Document rules.

use std::sync::Arc;

use crate::document::Dom;
use crate::rules::{RuleContext, RuleFault, RuleRegistry, StaticRule};

const SOTD_INTRO: &str =
    "this section describes the status of this document at the time of its publication";

const TR_INDEX: &str = "www.w3.org/TR";

/// Patent policy document for each policy name a profile may configure
fn patent_policy_url(policy: &str) -> Option<&'static str> {
    match policy {
        "pp2002" | "pp2004" => Some("www.w3.org/Consortium/Patent-Policy-20040205"),
        "pp2017" => Some("www.w3.org/Consortium/Patent-Policy-20170801"),
        "pp2020" => Some("www.w3.org/Consortium/Patent-Policy-20200915"),
        _ => None,
    }
}

/// `https://host/path/` reduced to `host/path` for scheme-blind comparison
fn bare(href: &str) -> &str {
    href.trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/')
}

pub fn register(registry: &mut RuleRegistry) {
    registry.register(Arc::new(StaticRule::new(
        "sotd",
        "supersedable",
        "Status section opens with the supersedable boilerplate",
        supersedable,
    )));
    registry.register(Arc::new(StaticRule::new(
        "sotd",
        "pp",
        "Recommendation-track status section links the patent policy",
        patent_policy,
    )));
}

fn supersedable(dom: &Dom, ctx: &RuleContext) -> Result<(), RuleFault> {
    if !dom.sotd_text()?.to_lowercase().contains(SOTD_INTRO) {
        ctx.report.error("no-sotd-intro");
    }
    if !dom.sotd_links()?.iter().any(|href| bare(href) == TR_INDEX) {
        ctx.report.error("no-sotd-tr");
    }
    Ok(())
}

fn patent_policy(dom: &Dom, ctx: &RuleContext) -> Result<(), RuleFault> {
    let applies = ctx.config.rec_track_status == Some(true) || ctx.model.rectrack;
    if !applies {
        return Ok(());
    }

    let Some(policy) = ctx.config.patent_policy.as_deref() else {
        ctx.report.error("undefined");
        return Ok(());
    };
    let Some(expected) = patent_policy_url(policy) else {
        ctx.report
            .error_with("undefined", format!("unknown patent policy '{policy}'"));
        return Ok(());
    };

    if !dom.sotd_links()?.iter().any(|href| bare(href) == expected) {
        ctx.report.error_with("no-pp", format!("https://{expected}/"));
    }
    Ok(())
}
