//! Output formatting for docrules.
//!
//! Provides terminal, JSON, and JUnit XML output formatters.
//!
//! # Graceful Degradation
//!
//! This module handles errors gracefully:
//! - Non-TTY output: Color disabled via NO_COLOR or --no-color
//! - Empty reports: Produces valid output with zero rules
//! - Timed-out reports: Unsettled rules are listed, never shown as passing
//! - Serialization failure: JSON falls back to an error object
//!
//! All formatters produce valid output for any RunReport input.
//! No function in this module will panic.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::cli::args::OutputFormat;
use crate::document::DocumentModel;
use crate::engine::result::{ComparisonResult, ResultSummary, RunReport};
use crate::engine::sink::ExceptionReport;
use crate::{Finding, RuleId, Severity};

const RULE: &str =
    "--------------------------------------------------------------------------------";

/// Trait for output formatters
pub trait OutputFormatter {
    /// Format a run report into a string
    fn format(&self, report: &RunReport) -> String;
}

/// How a rule ended, for display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleOutcome {
    Pass,
    Warn,
    Fail,
    Exception,
    Unsettled,
}

/// Findings and exceptions of one rule
struct RuleView<'a> {
    id: &'a RuleId,
    findings: Vec<&'a Finding>,
    exceptions: Vec<&'a ExceptionReport>,
    unsettled: bool,
}

impl RuleView<'_> {
    fn outcome(&self) -> RuleOutcome {
        if self.unsettled {
            RuleOutcome::Unsettled
        } else if !self.exceptions.is_empty() {
            RuleOutcome::Exception
        } else if self.findings.iter().any(|f| f.severity == Severity::Error) {
            RuleOutcome::Fail
        } else if !self.findings.is_empty() {
            RuleOutcome::Warn
        } else {
            RuleOutcome::Pass
        }
    }
}

/// Per-rule views grouped by category, in profile order within a category
fn rule_views(report: &RunReport) -> BTreeMap<&str, Vec<RuleView<'_>>> {
    let mut grouped: BTreeMap<&str, Vec<RuleView<'_>>> = BTreeMap::new();
    for id in &report.rules {
        grouped.entry(id.category()).or_default().push(RuleView {
            id,
            findings: report.by_rule(id),
            exceptions: report
                .exceptions
                .iter()
                .filter(|e| e.rule.as_ref() == Some(id))
                .collect(),
            unsettled: report.unsettled.contains(id),
        });
    }
    grouped
}

/// Run-level exceptions not tied to one rule
fn run_exceptions(report: &RunReport) -> Vec<&ExceptionReport> {
    report
        .exceptions
        .iter()
        .filter(|e| e.rule.as_ref().map_or(true, |r| !report.rules.contains(r)))
        .collect()
}

/// Process exit code for a finished run.
///
/// 0 clean, 1 errors, 2 warnings only, 3 incomplete run. A rule that
/// faulted or panicked leaves the run incomplete.
pub fn exit_code(report: &RunReport) -> u8 {
    let summary = report.summary();
    if !report.is_complete() || !report.faulted_rules().is_empty() {
        3
    } else if summary.errors > 0 {
        1
    } else if summary.warnings > 0 {
        2
    } else {
        0
    }
}

/// Terminal (human-readable) formatter
pub struct TerminalFormatter {
    color: bool,
    verbose: bool,
    quiet: bool,
}

impl TerminalFormatter {
    pub fn new(color: bool, verbose: bool, quiet: bool) -> Self {
        TerminalFormatter {
            color,
            verbose,
            quiet,
        }
    }

    fn colorize(&self, text: &str, color_code: &str) -> String {
        if self.color {
            format!("\x1b[{}m{}\x1b[0m", color_code, text)
        } else {
            text.to_string()
        }
    }

    fn status(&self, outcome: RuleOutcome) -> String {
        match outcome {
            RuleOutcome::Pass => self.colorize("[PASS]", "32"),
            RuleOutcome::Warn => self.colorize("[WARN]", "33"),
            RuleOutcome::Fail => self.colorize("[FAIL]", "31"),
            RuleOutcome::Exception => self.colorize("[EXCP]", "35"),
            RuleOutcome::Unsettled => self.colorize("[TIME]", "90"),
        }
    }

    fn finding_line(&self, finding: &Finding) -> String {
        let marker = match finding.severity {
            Severity::Error => self.colorize("error", "31"),
            Severity::Warning => self.colorize("warning", "33"),
        };
        match (&finding.detail, self.verbose) {
            (Some(detail), true) => format!("      {} {}: {}\n", marker, finding.id(), detail),
            _ => format!("      {} {}\n", marker, finding.id()),
        }
    }
}

impl OutputFormatter for TerminalFormatter {
    fn format(&self, report: &RunReport) -> String {
        let mut output = String::new();

        output.push_str(RULE);
        output.push_str("\ndocrules validation report\n");
        output.push_str(&format!("Document: {}\n", report.source));
        output.push_str(&format!("Profile: {}\n", report.profile));
        if let Some(title) = report.metadata.as_ref().and_then(|m| m.title.as_deref()) {
            output.push_str(&format!("Title: {}\n", title));
        }
        output.push_str(&format!("Timestamp: {}\n", report.timestamp.to_rfc3339()));
        output.push_str(RULE);
        output.push_str("\n\n");

        for (category, views) in rule_views(report) {
            let shown: Vec<_> = views
                .iter()
                .filter(|v| !self.quiet || v.outcome() != RuleOutcome::Pass)
                .collect();
            if shown.is_empty() {
                continue;
            }

            output.push_str(&format!("{}\n", category.to_uppercase()));
            for view in shown {
                output.push_str(&format!("  {} {}\n", self.status(view.outcome()), view.id));
                for finding in &view.findings {
                    output.push_str(&self.finding_line(finding));
                }
                for exception in &view.exceptions {
                    output.push_str(&format!("      exception: {}\n", exception.message));
                }
            }
            output.push('\n');
        }

        let general = run_exceptions(report);
        if !general.is_empty() {
            output.push_str("RUN\n");
            for exception in general {
                output.push_str(&format!("  {} {}\n", self.status(RuleOutcome::Exception), exception.message));
            }
            output.push('\n');
        }

        let summary = report.summary();
        output.push_str(RULE);
        output.push_str(&format!(
            "\nSUMMARY: {} rules, {} errors, {} warnings, {} exceptions\n",
            summary.rules, summary.errors, summary.warnings, summary.exceptions
        ));
        output.push_str(&format!(
            "Total time: {:.1}s\n",
            report.total_duration_ms as f64 / 1000.0
        ));

        let code = exit_code(report);
        let exit_desc = match code {
            0 => "no findings",
            1 => "errors found",
            2 => "warnings found",
            _ => "run incomplete",
        };
        output.push_str(&format!("Exit code: {} ({})\n", code, exit_desc));
        output.push_str(RULE);

        output
    }
}

/// JSON document: the report plus its summary
#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    report: &'a RunReport,
    summary: ResultSummary,
}

/// JSON formatter
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        JsonFormatter { pretty }
    }

    fn render<T: Serialize>(&self, value: &T) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        rendered.unwrap_or_else(|e| {
            serde_json::json!({ "error": format!("failed to serialize report: {e}") }).to_string()
        })
    }
}

impl OutputFormatter for JsonFormatter {
    fn format(&self, report: &RunReport) -> String {
        self.render(&JsonReport {
            report,
            summary: report.summary(),
        })
    }
}

/// JUnit XML formatter
pub struct JunitFormatter;

impl JunitFormatter {
    pub fn new() -> Self {
        JunitFormatter
    }

    fn escape_xml(s: &str) -> String {
        let mut result = String::with_capacity(s.len());
        for c in s.chars() {
            match c {
                '&' => result.push_str("&amp;"),
                '<' => result.push_str("&lt;"),
                '>' => result.push_str("&gt;"),
                '"' => result.push_str("&quot;"),
                '\'' => result.push_str("&apos;"),
                c => result.push(c),
            }
        }
        result
    }
}

impl Default for JunitFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFormatter for JunitFormatter {
    fn format(&self, report: &RunReport) -> String {
        let views = rule_views(report);
        let count = |wanted: &[RuleOutcome]| {
            views
                .values()
                .flatten()
                .filter(|v| wanted.contains(&v.outcome()))
                .count()
        };

        let mut output = String::new();
        output.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        output.push_str(&format!(
            "<testsuites name=\"{}\" tests=\"{}\" failures=\"{}\" errors=\"{}\" time=\"{:.3}\">\n",
            Self::escape_xml(&report.profile),
            report.rules.len(),
            count(&[RuleOutcome::Fail]),
            count(&[RuleOutcome::Exception, RuleOutcome::Unsettled]),
            report.total_duration_ms as f64 / 1000.0
        ));

        for (category, views) in &views {
            let failures = views.iter().filter(|v| v.outcome() == RuleOutcome::Fail).count();
            let errors = views
                .iter()
                .filter(|v| matches!(v.outcome(), RuleOutcome::Exception | RuleOutcome::Unsettled))
                .count();
            output.push_str(&format!(
                "  <testsuite name=\"{}\" tests=\"{}\" failures=\"{}\" errors=\"{}\">\n",
                Self::escape_xml(category),
                views.len(),
                failures,
                errors
            ));

            for view in views {
                output.push_str(&format!(
                    "    <testcase name=\"{}\" classname=\"docrules.{}\"",
                    Self::escape_xml(&view.id.to_string()),
                    Self::escape_xml(category)
                ));
                if view.outcome() == RuleOutcome::Pass {
                    output.push_str(" />\n");
                    continue;
                }
                output.push_str(">\n");

                for finding in view.findings.iter().filter(|f| f.severity == Severity::Error) {
                    output.push_str(&format!(
                        "      <failure message=\"{}\">{}</failure>\n",
                        Self::escape_xml(&finding.id()),
                        Self::escape_xml(finding.detail.as_deref().unwrap_or(""))
                    ));
                }
                for exception in &view.exceptions {
                    output.push_str(&format!(
                        "      <error message=\"{}\" />\n",
                        Self::escape_xml(&exception.message)
                    ));
                }
                if view.unsettled {
                    output.push_str("      <error message=\"rule did not settle before the run timeout\" />\n");
                }
                let warnings: Vec<String> = view
                    .findings
                    .iter()
                    .filter(|f| f.severity == Severity::Warning)
                    .map(|f| format!("WARNING: {}", f))
                    .collect();
                if !warnings.is_empty() {
                    output.push_str(&format!(
                        "      <system-out>{}</system-out>\n",
                        Self::escape_xml(&warnings.join("\n"))
                    ));
                }
                output.push_str("    </testcase>\n");
            }

            output.push_str("  </testsuite>\n");
        }

        output.push_str("</testsuites>");
        output
    }
}

/// Get a formatter based on the output format
pub fn get_formatter(
    format: &OutputFormat,
    no_color: bool,
    verbose: bool,
    quiet: bool,
) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Text => Box::new(TerminalFormatter::new(!no_color, verbose, quiet)),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
        OutputFormat::Junit => Box::new(JunitFormatter::new()),
    }
}

/// Render an extracted document model
pub fn format_metadata(model: &DocumentModel, format: &OutputFormat) -> String {
    if *format != OutputFormat::Text {
        return JsonFormatter::new(true).render(model);
    }

    let mut output = String::new();
    let mut line = |label: &str, value: Option<String>| {
        if let Some(value) = value {
            output.push_str(&format!("{:<30}{}\n", label, value));
        }
    };
    line("Title", model.title.clone());
    line("Status", model.profile.map(|p| p.to_string()));
    line("Date", model.doc_date.map(|d| d.to_string()));
    line("This version", model.this_version.clone());
    line("Latest version", model.latest_version.clone());
    line("Previous version", model.previous_version.clone());
    line("Editor's draft", model.editors_draft.clone());
    line("Editors", Some(model.editor_names.join(", ")).filter(|s| !s.is_empty()));
    line("Editor ids", join_ids(&model.editor_ids));
    line("Deliverer ids", join_ids(&model.deliverer_ids));
    line("Process", model.process.clone());
    line(
        "Implementation feedback due",
        model.implementation_feedback_due.map(|d| d.to_string()),
    );
    line("PR reviews due", model.pr_reviews_due.map(|d| d.to_string()));
    line("Implementation report", model.implementation_report.clone());
    line("Errata", model.errata.clone());
    line("Informative", Some(model.informative.to_string()));
    line("Recommendation track", Some(model.rectrack.to_string()));
    output
}

fn join_ids(ids: &[u64]) -> Option<String> {
    (!ids.is_empty()).then(|| {
        ids.iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    })
}

/// Render a baseline comparison as text
pub fn format_comparison(comparison: &ComparisonResult) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "BASELINE: {} new errors, {} new warnings, {} resolved, {} unchanged\n",
        comparison.new_errors.len(),
        comparison.new_warnings.len(),
        comparison.resolved.len(),
        comparison.unchanged.len()
    ));
    for id in &comparison.new_errors {
        output.push_str(&format!("  + error {}\n", id));
    }
    for id in &comparison.new_warnings {
        output.push_str(&format!("  + warning {}\n", id));
    }
    for id in &comparison.resolved {
        output.push_str(&format!("  - {}\n", id));
    }
    output
}
