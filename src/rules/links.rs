//! Link rules: internal anchors, host reliability, embedded resources.
//!
//! # Graceful Degradation
//!
//! `links/linkchecker` only runs when the document was loaded from a URL;
//! without a base there is no folder to compare against and it reports
//! nothing. Each resource yields at most one error: reachability first,
//! folder placement only for reachable resources. A resource whose
//! resolution touched a deny-listed host, redirect hops included, also
//! gets an `unreliable-host` warning.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use url::Url;

use crate::document::Dom;
use crate::links::{HostReliability, LinkStatus, ResolveOptions};
use crate::rules::{Rule, RuleContext, RuleFault, RuleRegistry, StaticRule};
use crate::RuleId;

/// Resources shared by every published document; never fetched
const SHARED_RESOURCE_PREFIXES: &[&str] = &[
    "https://www.w3.org/StyleSheets/",
    "https://www.w3.org/scripts/",
    "https://www.w3.org/Icons/",
];

const LINK_CONCURRENCY: usize = 8;

pub fn register(registry: &mut RuleRegistry) {
    registry.register(Arc::new(StaticRule::new(
        "links",
        "internal",
        "Fragment links point at existing ids",
        internal,
    )));
    registry.register(Arc::new(StaticRule::new(
        "links",
        "reliability",
        "Links avoid hosts known to be unreliable",
        reliability,
    )));
    registry.register(Arc::new(LinkChecker));
}

fn internal(dom: &Dom, ctx: &RuleContext) -> Result<(), RuleFault> {
    let ids = dom.ids()?;
    for href in dom.attr_values(r##"a[href^="#"]"##, "href")? {
        let fragment = href.trim_start_matches('#');
        if fragment.is_empty() {
            continue;
        }
        if !ids.contains(fragment) {
            ctx.report.error_with("anchor", href.clone());
        }
    }
    Ok(())
}

fn reliability(dom: &Dom, ctx: &RuleContext) -> Result<(), RuleFault> {
    let policy = ctx.resolver.policy();
    for href in dom.attr_values("a[href]", "href")? {
        if policy.classify_str(&href) == HostReliability::Unreliable {
            ctx.report.warning_with("unreliable-link", href.trim());
        }
    }
    Ok(())
}

/// Embedded resource URLs (images, stylesheets, scripts) made absolute
fn resource_urls(dom: &Dom, base: &Url) -> Result<Vec<String>, RuleFault> {
    let mut raw = dom.attr_values("img[src]", "src")?;
    raw.extend(dom.attr_values(r#"link[rel~="stylesheet"][href]"#, "href")?);
    raw.extend(dom.attr_values("script[src]", "src")?);

    let mut seen = HashSet::new();
    Ok(raw
        .iter()
        .filter_map(|target| base.join(target.trim()).ok())
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .map(String::from)
        .filter(|url| {
            !SHARED_RESOURCE_PREFIXES
                .iter()
                .any(|prefix| url.starts_with(prefix))
        })
        .filter(|url| seen.insert(url.clone()))
        .collect())
}

/// Every embedded resource is reachable and lives next to the document
struct LinkChecker;

#[async_trait]
impl Rule for LinkChecker {
    fn id(&self) -> RuleId {
        RuleId::new("links", "linkchecker")
    }

    fn description(&self) -> &'static str {
        "Embedded resources are reachable and stored in the document's folder"
    }

    async fn run(&self, ctx: &RuleContext) -> Result<(), RuleFault> {
        let Some(base) = ctx.model.base_url().cloned() else {
            return Ok(());
        };
        let urls = {
            let dom = ctx.model.structure();
            resource_urls(&dom, &base)?
        };
        if urls.is_empty() {
            return Ok(());
        }

        let base = base.to_string();
        let resolver = &ctx.resolver;
        let resolutions: Vec<_> = stream::iter(urls)
            .map(|url| {
                let base = base.as_str();
                async move {
                    resolver
                        .resolve(
                            &url,
                            ResolveOptions {
                                same_origin_base: Some(base),
                            },
                        )
                        .await
                }
            })
            .buffer_unordered(LINK_CONCURRENCY)
            .try_collect()
            .await?;

        for resolution in &resolutions {
            match resolution.status {
                LinkStatus::Broken => {
                    ctx.report
                        .error_with("response-error", resolution.requested.clone());
                }
                LinkStatus::RedirectedThenBroken => {
                    ctx.report.error_with(
                        "response-error-with-redirect",
                        format!(
                            "{} -> {}",
                            resolution.requested,
                            resolution.redirect_chain.join(" -> ")
                        ),
                    );
                }
                LinkStatus::Reachable => {
                    if resolution.same_folder == Some(false) {
                        ctx.report
                            .error_with("not-same-folder", resolution.final_url.clone());
                    }
                }
            }
            if resolution.host_reliability == HostReliability::Unreliable {
                ctx.report
                    .warning_with("unreliable-host", resolution.final_url.clone());
            }
        }

        ctx.report.warning_with(
            "display",
            format!("{} embedded resources checked", resolutions.len()),
        );
        Ok(())
    }
}
