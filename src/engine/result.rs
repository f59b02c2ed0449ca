//! Result aggregation and reporting.
//!
//! Turns the sink's accumulated state into a `RunReport`, generates
//! summaries, and supports baseline comparison.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::DocumentModel;
use crate::engine::sink::{ExceptionReport, Sink};
use crate::{DocrulesError, Finding, RuleId, Severity};

/// Result summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResultSummary {
    pub errors: usize,
    pub warnings: usize,
    pub exceptions: usize,
    pub rules: usize,
    pub unsettled: usize,
    pub total_duration_ms: u64,
}

/// Final aggregate of one validation run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub profile: String,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<DocumentModel>,
    pub findings: Vec<Finding>,
    pub exceptions: Vec<ExceptionReport>,
    /// Dispatched rules, in profile order
    pub rules: Vec<RuleId>,
    pub unsettled: Vec<RuleId>,
    pub timed_out: bool,
    pub timestamp: DateTime<Utc>,
    pub total_duration_ms: u64,
}

impl RunReport {
    /// Calculate summary statistics
    pub fn summary(&self) -> ResultSummary {
        ResultSummary {
            errors: self.errors().len(),
            warnings: self.warnings().len(),
            exceptions: self.exceptions.len(),
            rules: self.rules.len(),
            unsettled: self.unsettled.len(),
            total_duration_ms: self.total_duration_ms,
        }
    }

    pub fn errors(&self) -> Vec<&Finding> {
        self.of_severity(Severity::Error)
    }

    pub fn warnings(&self) -> Vec<&Finding> {
        self.of_severity(Severity::Warning)
    }

    fn of_severity(&self, severity: Severity) -> Vec<&Finding> {
        self.findings
            .iter()
            .filter(|f| f.severity == severity)
            .collect()
    }

    /// `category.rule.key` of every error, duplicates kept
    pub fn error_ids(&self) -> Vec<String> {
        self.errors().into_iter().map(Finding::id).collect()
    }

    /// `category.rule.key` of every warning, duplicates kept
    pub fn warning_ids(&self) -> Vec<String> {
        self.warnings().into_iter().map(Finding::id).collect()
    }

    pub fn has_errors(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::Error)
    }

    /// Every dispatched rule settled before the deadline
    pub fn is_complete(&self) -> bool {
        !self.timed_out && self.unsettled.is_empty()
    }

    /// Dispatched rules that raised an exception; their findings may be partial
    pub fn faulted_rules(&self) -> Vec<&RuleId> {
        let mut faulted: Vec<&RuleId> = self
            .exceptions
            .iter()
            .filter_map(|e| e.rule.as_ref())
            .filter(|rule| self.rules.contains(rule))
            .collect();
        faulted.sort();
        faulted.dedup();
        faulted
    }

    /// Findings of one rule category
    pub fn by_category(&self, category: &str) -> Vec<&Finding> {
        self.findings
            .iter()
            .filter(|f| f.rule.category() == category)
            .collect()
    }

    pub fn by_rule(&self, rule: &RuleId) -> Vec<&Finding> {
        self.findings.iter().filter(|f| &f.rule == rule).collect()
    }

    /// Compare against the findings of an earlier run.
    ///
    /// Findings are matched by identity and severity with multiplicity, so
    /// a second copy of an old finding counts as new.
    pub fn compare_to_baseline(&self, baseline: &[Finding]) -> ComparisonResult {
        let mut remaining: HashMap<(Severity, String), usize> = HashMap::new();
        for finding in baseline {
            *remaining.entry((finding.severity, finding.id())).or_default() += 1;
        }

        let mut result = ComparisonResult::default();
        for finding in &self.findings {
            let key = (finding.severity, finding.id());
            match remaining.get_mut(&key) {
                Some(count) if *count > 0 => {
                    *count -= 1;
                    result.unchanged.push(key.1);
                }
                _ => match finding.severity {
                    Severity::Error => result.new_errors.push(key.1),
                    Severity::Warning => result.new_warnings.push(key.1),
                },
            }
        }

        for ((_, id), count) in remaining {
            result.resolved.extend(std::iter::repeat(id).take(count));
        }
        result.resolved.sort();
        result
    }
}

/// Baseline comparison result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ComparisonResult {
    pub new_errors: Vec<String>,
    pub new_warnings: Vec<String>,
    pub resolved: Vec<String>,
    pub unchanged: Vec<String>,
}

impl ComparisonResult {
    pub fn has_regressions(&self) -> bool {
        !self.new_errors.is_empty()
    }
}

/// Collects run metadata while the run progresses and snapshots the sink
/// into a `RunReport` once it terminated.
pub struct ResultAggregator {
    profile: String,
    source: String,
    metadata: Option<DocumentModel>,
    rules: Vec<RuleId>,
    timed_out: bool,
}

impl ResultAggregator {
    pub fn new(profile: impl Into<String>, source: impl Into<String>) -> Self {
        ResultAggregator {
            profile: profile.into(),
            source: source.into(),
            metadata: None,
            rules: Vec::new(),
            timed_out: false,
        }
    }

    pub fn set_metadata(&mut self, metadata: DocumentModel) {
        self.metadata = Some(metadata);
    }

    pub fn set_rules(&mut self, rules: Vec<RuleId>) {
        self.rules = rules;
    }

    pub fn mark_timed_out(&mut self) {
        self.timed_out = true;
    }

    /// Create final report from the sink's accepted events.
    ///
    /// Unsettled rules are read from the sink, so a `done` accepted between
    /// the timeout and `end-all` counts as settled.
    pub fn to_report(&self, sink: &Sink, total_duration_ms: u64) -> RunReport {
        let unsettled = if self.timed_out {
            let settled = sink.settled_rules();
            self.rules
                .iter()
                .filter(|rule| !settled.contains(rule))
                .cloned()
                .collect()
        } else {
            Vec::new()
        };

        RunReport {
            profile: self.profile.clone(),
            source: self.source.clone(),
            metadata: self.metadata.clone(),
            findings: sink.findings(),
            exceptions: sink.exceptions(),
            rules: self.rules.clone(),
            unsettled,
            timed_out: self.timed_out,
            timestamp: Utc::now(),
            total_duration_ms,
        }
    }
}

#[derive(Deserialize)]
struct Baseline {
    findings: Vec<Finding>,
}

/// Save a run report as JSON baseline
pub fn save_as_baseline(report: &RunReport, path: &Path) -> Result<(), DocrulesError> {
    let json = serde_json::to_string_pretty(report).map_err(|e| DocrulesError::Parse {
        context: "save_as_baseline".to_string(),
        message: e.to_string(),
    })?;

    std::fs::write(path, json).map_err(|source| DocrulesError::Io {
        context: format!("writing baseline {}", path.display()),
        source,
    })
}

/// Load the findings of a JSON baseline written by `save_as_baseline`
/// or `--format json`
pub fn load_baseline(path: &Path) -> Result<Vec<Finding>, DocrulesError> {
    let content = std::fs::read_to_string(path).map_err(|source| DocrulesError::Io {
        context: format!("reading baseline {}", path.display()),
        source,
    })?;

    let baseline: Baseline =
        serde_json::from_str(&content).map_err(|e| DocrulesError::Parse {
            context: format!("baseline {}", path.display()),
            message: e.to_string(),
        })?;
    Ok(baseline.findings)
}
