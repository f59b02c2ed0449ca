//! Output formatting integration tests.
//!
//! Formatters and baseline files exercised on reports from real runs.

use std::sync::Arc;
use std::time::Duration;

use docrules::cli::args::OutputFormat;
use docrules::cli::output::{exit_code, format_comparison, get_formatter};
use docrules::document::DocumentSource;
use docrules::engine::orchestrator::{OrchestratorConfig, Validator};
use docrules::engine::result::{load_baseline, save_as_baseline, RunReport};
use docrules::engine::sink::Sink;
use docrules::profile::{Profile, RunConfig};
use docrules::{RuleId, ValidationRequest};
use url::Url;

use crate::mocks::{self, scripted_registry, MockFetcher, Script, ScriptedRule, DOC_BASE};

async fn report_for(html: String, rules: &[&str]) -> RunReport {
    let config = OrchestratorConfig {
        timeout: Duration::from_secs(5),
        ..OrchestratorConfig::default()
    };
    let validator = Validator::new(config)
        .unwrap()
        .with_fetcher(Arc::new(MockFetcher::all_ok()));
    let rules = rules.iter().map(|r| r.parse::<RuleId>().unwrap()).collect();

    validator
        .validate(
            ValidationRequest {
                source: DocumentSource::Inline {
                    html,
                    base: Some(Url::parse(DOC_BASE).unwrap()),
                },
                profile: Profile::new("custom", rules, RunConfig::default()),
            },
            Arc::new(Sink::new()),
        )
        .await
        .unwrap()
}

const RULES: &[&str] = &["headers/div-head", "headers/copyright", "links/reliability"];

fn bare_document() -> String {
    mocks::with_links(&["https://w3c-test.org/dom/"])
}

#[tokio::test]
async fn test_terminal_output_for_failing_run() {
    let report = report_for(bare_document(), RULES).await;
    let output = get_formatter(&OutputFormat::Text, true, true, false).format(&report);

    assert!(output.contains("[FAIL] headers/div-head"));
    assert!(output.contains("headers.copyright.not-found"));
    assert!(output.contains("[WARN] links/reliability"));
    assert!(output.contains("https://w3c-test.org/dom/"));
    assert!(output.contains("SUMMARY: 3 rules, 2 errors, 1 warnings, 0 exceptions"));
    assert!(output.contains("Exit code: 1"));
    assert!(!output.contains("\x1b["));
}

#[tokio::test]
async fn test_json_output_for_clean_run() {
    let report = report_for(mocks::working_draft(), &["headers/div-head"]).await;
    let output = get_formatter(&OutputFormat::Json, true, false, false).format(&report);

    let value: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(value["profile"], "custom");
    assert_eq!(value["summary"]["errors"], 0);
    assert_eq!(value["metadata"]["title"], "Fancy Spec");
    assert_eq!(value["rules"][0], "headers/div-head");
    assert_eq!(exit_code(&report), 0);
}

#[tokio::test]
async fn test_faulted_rule_marks_run_incomplete() {
    let (registry, ids) = scripted_registry(vec![ScriptedRule::new(
        "broken",
        Script::Fault("boom".to_string()),
    )]);
    let validator = Validator::new(OrchestratorConfig::default())
        .unwrap()
        .with_fetcher(Arc::new(MockFetcher::all_ok()))
        .with_registry(registry);
    let report = validator
        .validate(
            ValidationRequest {
                source: DocumentSource::Inline {
                    html: mocks::working_draft(),
                    base: Some(Url::parse(DOC_BASE).unwrap()),
                },
                profile: Profile::new("custom", ids, RunConfig::default()),
            },
            Arc::new(Sink::new()),
        )
        .await
        .unwrap();

    assert!(report.findings.is_empty());
    assert!(report.is_complete());
    assert_eq!(report.faulted_rules(), vec![&RuleId::new("scripted", "broken")]);
    assert_eq!(exit_code(&report), 3);

    let output = get_formatter(&OutputFormat::Text, true, false, false).format(&report);
    assert!(output.contains("Exit code: 3 (run incomplete)"));
}

#[tokio::test]
async fn test_junit_output_counts_failures() {
    let report = report_for(bare_document(), RULES).await;
    let output = get_formatter(&OutputFormat::Junit, true, false, false).format(&report);

    assert!(output.starts_with("<?xml"));
    assert!(output.contains("tests=\"3\" failures=\"2\" errors=\"0\""));
    assert!(output.contains("<failure message=\"headers.div-head.not-found\">"));
    assert!(output.contains("<system-out>WARNING: links.reliability.unreliable-link"));
}

#[tokio::test]
async fn test_baseline_round_trip_detects_resolved_findings() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("baseline.json");

    let before = report_for(bare_document(), RULES).await;
    save_as_baseline(&before, &path).unwrap();
    let baseline = load_baseline(&path).unwrap();
    assert_eq!(baseline, before.findings);

    let after = report_for(mocks::working_draft(), RULES).await;
    let comparison = after.compare_to_baseline(&baseline);

    assert!(!comparison.has_regressions());
    assert_eq!(comparison.resolved.len(), 3);
    assert!(format_comparison(&comparison).contains("0 new errors"));
}

#[tokio::test]
async fn test_json_report_doubles_as_baseline() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.json");

    let report = report_for(bare_document(), RULES).await;
    let json = get_formatter(&OutputFormat::Json, true, false, false).format(&report);
    std::fs::write(&path, json).unwrap();

    let baseline = load_baseline(&path).unwrap();
    let comparison = report.compare_to_baseline(&baseline);
    assert_eq!(comparison.unchanged.len(), 3);
    assert!(comparison.new_errors.is_empty());
}
