//! Style rules: the official stylesheet, viewport meta, fixup script.

use std::sync::Arc;

use crate::document::Dom;
use crate::rules::{RuleContext, RuleFault, RuleRegistry, StaticRule};

const STYLESHEET_BASE: &str = "https://www.w3.org/StyleSheets/TR/2021/";
const VIEWPORT: &str = "width=device-width,initial-scale=1,shrink-to-fit=no";
const FIXUP_SCRIPT: &str = "https://www.w3.org/scripts/TR/2021/fixup.js";

pub fn register(registry: &mut RuleRegistry) {
    let rules = [
        StaticRule::new("style", "sheet", "Official stylesheet is linked last", sheet),
        StaticRule::new("style", "meta", "Viewport meta element is present", meta),
        StaticRule::new("style", "script", "fixup.js is included", script),
        StaticRule::new("style", "back-to-top", "Document has a back-to-top link", back_to_top),
        StaticRule::new(
            "style",
            "body-toc-sidebar",
            "body does not force the sidebar table of contents",
            body_toc_sidebar,
        ),
    ];
    for rule in rules {
        registry.register(Arc::new(rule));
    }
}

fn sheet(dom: &Dom, ctx: &RuleContext) -> Result<(), RuleFault> {
    let sheets = dom.attr_values(r#"link[rel~="stylesheet"][href]"#, "href")?;
    let last = sheets.last().map(|href| href.trim());

    let ok = match (last, ctx.config.style_sheet.as_deref()) {
        (Some(href), Some(name)) => href == format!("{}{}", STYLESHEET_BASE, name),
        (Some(href), None) => href.starts_with("https://www.w3.org/StyleSheets/TR/"),
        (None, _) => false,
    };
    if !ok {
        ctx.report.error("not-found");
    }
    Ok(())
}

fn meta(dom: &Dom, ctx: &RuleContext) -> Result<(), RuleFault> {
    let found = dom
        .attr_values(r#"meta[name="viewport"][content]"#, "content")?
        .iter()
        .any(|content| content.split_whitespace().collect::<String>() == VIEWPORT);
    if !found {
        ctx.report.error("not-found");
    }
    Ok(())
}

fn script(dom: &Dom, ctx: &RuleContext) -> Result<(), RuleFault> {
    let found = dom
        .attr_values("script[src]", "src")?
        .iter()
        .any(|src| src.trim() == FIXUP_SCRIPT);
    if !found {
        ctx.report.error("not-found");
    }
    Ok(())
}

fn back_to_top(dom: &Dom, ctx: &RuleContext) -> Result<(), RuleFault> {
    if !dom.exists("p#back-to-top")? {
        ctx.report.warning("not-found");
    }
    Ok(())
}

fn body_toc_sidebar(dom: &Dom, ctx: &RuleContext) -> Result<(), RuleFault> {
    if dom.exists("body.toc-sidebar")? {
        ctx.report.error("class-found");
    }
    Ok(())
}
