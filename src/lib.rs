//! docrules library
//!
//! Conformance validation for published technical specification documents.
//!
//! This library provides the validation orchestration engine:
//! - Document model extraction from a parsed HTML document
//! - Link resolution with redirect tracking and host reliability classification
//! - A rule contract plus a built-in collection of conformance rules
//! - An event sink collecting findings from concurrently running rules
//! - An orchestrator that joins every rule exactly once and emits one terminal event
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use docrules::document::DocumentSource;
//! use docrules::engine::sink::Sink;
//! use docrules::profile::Profile;
//! use docrules::{validate, ValidationRequest};
//!
//! # async fn run() -> Result<(), docrules::DocrulesError> {
//! let request = ValidationRequest {
//!     source: DocumentSource::File("spec.html".into()),
//!     profile: Profile::builtin("WD").expect("built-in profile"),
//! };
//! let report = validate(request, Arc::new(Sink::new())).await?;
//! println!("Errors: {}", report.summary().errors);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod document;
pub mod engine;
pub mod links;
pub mod profile;
pub mod rules;
pub mod version;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use document::{DocumentSource, ExtractionError};
use engine::orchestrator::{OrchestratorConfig, Validator};
use engine::result::RunReport;
use engine::sink::Sink;
use links::ResolverError;
use profile::{Profile, ProfileError};

// Re-exports for public API
pub use engine::orchestrator::Validator as Orchestrator;
pub use engine::result::{ResultSummary, RunReport as Report};

/// Identity of a rule: `category/name` (e.g. `headers/dl`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RuleId {
    category: String,
    name: String,
}

impl RuleId {
    pub fn new(category: impl Into<String>, name: impl Into<String>) -> Self {
        RuleId {
            category: category.into(),
            name: name.into(),
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dotted prefix used for finding identities (`headers.dl`).
    pub fn namespace(&self) -> String {
        format!("{}.{}", self.category, self.name)
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category, self.name)
    }
}

impl FromStr for RuleId {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once('/') {
            Some((category, name))
                if !category.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(RuleId::new(category, name))
            }
            _ => Err(ProfileError::InvalidRuleId(s.to_string())),
        }
    }
}

impl TryFrom<String> for RuleId {
    type Error = ProfileError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RuleId> for String {
    fn from(value: RuleId) -> Self {
        value.to_string()
    }
}

/// Finding severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A single error or warning reported by a rule.
///
/// Identity for comparison is `category.rule.key`; `detail` is free-form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub rule: RuleId,
    pub key: String,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Finding {
    /// Identity string, e.g. `headers.dl.cant-retrieve`.
    pub fn id(&self) -> String {
        format!("{}.{}", self.rule.namespace(), self.key)
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{} ({})", self.id(), detail),
            None => write!(f, "{}", self.id()),
        }
    }
}

/// Error types for docrules operations.
#[derive(Debug, Error)]
pub enum DocrulesError {
    /// The document could not be turned into a document model
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// The link resolver could not be configured
    #[error(transparent)]
    Resolver(#[from] ResolverError),

    /// The profile names rules or settings that cannot be used
    #[error(transparent)]
    Profile(#[from] ProfileError),

    /// A sink was handed to a second run
    #[error("event sink already belongs to another validation run")]
    SinkReused,

    /// A report or baseline could not be (de)serialized
    #[error("failed to parse {context}: {message}")]
    Parse { context: String, message: String },

    /// I/O error
    #[error("I/O error in {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

/// Input to one validation run.
#[derive(Debug, Clone)]
pub struct ValidationRequest {
    pub source: DocumentSource,
    pub profile: Profile,
}

/// Validate a document against a profile with the built-in rule collection.
///
/// Findings are delivered to `sink` while the run progresses; the returned
/// report is the final aggregate once the terminal `end-all` signal fired.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use docrules::document::DocumentSource;
/// use docrules::engine::sink::{EventKind, Sink};
/// use docrules::profile::Profile;
/// use docrules::{validate, ValidationRequest};
///
/// # async fn run() -> Result<(), docrules::DocrulesError> {
/// let sink = Arc::new(Sink::new());
/// sink.subscribe(EventKind::Error, |event| println!("{:?}", event));
///
/// let request = ValidationRequest {
///     source: DocumentSource::Url("https://www.w3.org/TR/example/".parse().expect("url")),
///     profile: Profile::builtin("REC").expect("built-in profile"),
/// };
///
/// match validate(request, sink).await {
///     Ok(report) => println!("{} findings", report.findings.len()),
///     Err(e) => eprintln!("Error: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
pub async fn validate(
    request: ValidationRequest,
    sink: Arc<Sink>,
) -> Result<RunReport, DocrulesError> {
    let validator = Validator::new(OrchestratorConfig::default())?;
    validator.validate(request, sink).await
}

/// Extract the document model without running any rules.
pub async fn extract_metadata(
    source: DocumentSource,
    sink: Arc<Sink>,
) -> Result<RunReport, DocrulesError> {
    let validator = Validator::new(OrchestratorConfig::default())?;
    validator.extract_metadata(source, sink).await
}
