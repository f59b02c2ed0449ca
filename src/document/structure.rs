//! Structural view over a parsed document.
//!
//! Rules query structure on demand instead of the extractor precomputing
//! every fact. Selector strings are compiled per query; an invalid selector
//! is a programming error surfaced as `StructureError`, which the
//! orchestrator turns into an isolated rule fault.

use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

/// Structural query errors
#[derive(Debug, Error)]
pub enum StructureError {
    #[error("invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },
}

/// Parsed DOM of one document
pub struct Dom {
    html: Html,
}

impl Dom {
    pub fn parse(source: &str) -> Self {
        Dom {
            html: Html::parse_document(source),
        }
    }

    /// Underlying parser tree
    pub fn html(&self) -> &Html {
        &self.html
    }

    /// All elements matching a CSS selector, in document order
    pub fn select(&self, css: &str) -> Result<Vec<ElementRef<'_>>, StructureError> {
        let selector = compile(css)?;
        Ok(self.html.select(&selector).collect())
    }

    /// First element matching a CSS selector
    pub fn first(&self, css: &str) -> Result<Option<ElementRef<'_>>, StructureError> {
        let selector = compile(css)?;
        Ok(self.html.select(&selector).next())
    }

    pub fn exists(&self, css: &str) -> Result<bool, StructureError> {
        Ok(self.first(css)?.is_some())
    }

    pub fn count(&self, css: &str) -> Result<usize, StructureError> {
        let selector = compile(css)?;
        Ok(self.html.select(&selector).count())
    }

    /// Whitespace-normalized text of the first match
    pub fn text_of(&self, css: &str) -> Result<Option<String>, StructureError> {
        Ok(self.first(css)?.map(element_text))
    }

    /// Values of `attr` on every match that carries it
    pub fn attr_values(&self, css: &str, attr: &str) -> Result<Vec<String>, StructureError> {
        Ok(self
            .select(css)?
            .into_iter()
            .filter_map(|el| el.value().attr(attr).map(str::to_string))
            .collect())
    }

    /// Every `id` attribute in the document
    pub fn ids(&self) -> Result<HashSet<String>, StructureError> {
        Ok(self.attr_values("[id]", "id")?.into_iter().collect())
    }

    /// The "Status of This Document" section.
    ///
    /// Prefers `section#sotd`, falls back to the section whose `h2` reads
    /// "Status of This Document".
    pub fn sotd(&self) -> Result<Option<ElementRef<'_>>, StructureError> {
        if let Some(section) = self.first("#sotd")? {
            return Ok(Some(section));
        }

        for heading in self.select("h2")? {
            if strip_secno(&element_text(heading)).eq_ignore_ascii_case("status of this document")
            {
                let parent = heading.parent().and_then(ElementRef::wrap);
                return Ok(parent);
            }
        }

        Ok(None)
    }

    /// Normalized text of the SOTD section, empty when there is none
    pub fn sotd_text(&self) -> Result<String, StructureError> {
        Ok(self.sotd()?.map(element_text).unwrap_or_default())
    }

    /// `href` values of links inside the SOTD section
    pub fn sotd_links(&self) -> Result<Vec<String>, StructureError> {
        let Some(sotd) = self.sotd()? else {
            return Ok(Vec::new());
        };
        let selector = compile("a[href]")?;
        Ok(sotd
            .select(&selector)
            .filter_map(|a| a.value().attr("href").map(|h| h.trim().to_string()))
            .collect())
    }

    /// Normalized texts of all `h2` headings, section numbers stripped
    pub fn h2_texts(&self) -> Result<Vec<String>, StructureError> {
        Ok(self
            .select("h2")?
            .into_iter()
            .map(|h| strip_secno(&element_text(h)).to_string())
            .collect())
    }
}

/// Compile a selector, mapping parser errors to `StructureError`
pub fn compile(css: &str) -> Result<Selector, StructureError> {
    Selector::parse(css).map_err(|e| StructureError::InvalidSelector {
        selector: css.to_string(),
        reason: e.to_string(),
    })
}

/// Text content of an element with whitespace collapsed
pub fn element_text(el: ElementRef<'_>) -> String {
    normalize_text(&el.text().collect::<String>())
}

/// Collapse runs of whitespace into single spaces and trim
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drop a leading section number ("2. ", "A.1 ") from a heading
pub fn strip_secno(text: &str) -> &str {
    let trimmed = text.trim_start();
    let numbered = trimmed.split_once(' ').filter(|(head, _)| {
        head.chars()
            .all(|c| c.is_ascii_digit() || c == '.' || c.is_ascii_uppercase())
            && head.chars().any(|c| c.is_ascii_digit() || c == '.')
            && head.chars().filter(|c| c.is_ascii_uppercase()).count() <= 1
    });
    match numbered {
        Some((_, rest)) => rest.trim_start(),
        None => trimmed,
    }
}
