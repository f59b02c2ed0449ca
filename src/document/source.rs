//! Where a document comes from.

use std::fmt;
use std::path::PathBuf;

use url::Url;

use crate::document::extract::ExtractionError;
use crate::links::fetch::HttpFetch;

/// Input document for a run
#[derive(Debug, Clone)]
pub enum DocumentSource {
    /// Local HTML file
    File(PathBuf),
    /// Published document fetched over HTTP
    Url(Url),
    /// Markup already in memory, with an optional base for relative links
    Inline { html: String, base: Option<Url> },
}

/// Raw text plus the URL relative resources resolve against
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub text: Vec<u8>,
    pub base_url: Option<Url>,
}

impl DocumentSource {
    /// Read the document bytes.
    ///
    /// Files are read with `tokio::fs`; URLs go through the run's fetcher so
    /// tests can script responses.
    pub async fn load(&self, fetcher: &dyn HttpFetch) -> Result<LoadedDocument, ExtractionError> {
        match self {
            DocumentSource::File(path) => {
                let text = tokio::fs::read(path)
                    .await
                    .map_err(|e| ExtractionError::Source {
                        source_name: path.display().to_string(),
                        reason: e.to_string(),
                    })?;
                Ok(LoadedDocument {
                    text,
                    base_url: None,
                })
            }
            DocumentSource::Url(url) => {
                let text =
                    fetcher
                        .fetch_document(url)
                        .await
                        .map_err(|e| ExtractionError::Source {
                            source_name: url.to_string(),
                            reason: e.to_string(),
                        })?;
                Ok(LoadedDocument {
                    text: text.into_bytes(),
                    base_url: Some(url.clone()),
                })
            }
            DocumentSource::Inline { html, base } => Ok(LoadedDocument {
                text: html.clone().into_bytes(),
                base_url: base.clone(),
            }),
        }
    }
}

impl fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentSource::File(path) => write!(f, "{}", path.display()),
            DocumentSource::Url(url) => write!(f, "{}", url),
            DocumentSource::Inline { base: Some(base), .. } => write!(f, "inline ({})", base),
            DocumentSource::Inline { base: None, .. } => write!(f, "inline"),
        }
    }
}
