//! Rule integration tests.
//!
//! Network-facing rules run through the orchestrator with scripted
//! responses, so each scenario observes exactly what a real run reports.

use std::sync::Arc;
use std::time::Duration;

use docrules::document::DocumentSource;
use docrules::engine::orchestrator::{OrchestratorConfig, Validator};
use docrules::engine::result::RunReport;
use docrules::engine::sink::Sink;
use docrules::profile::{Profile, RunConfig};
use docrules::{RuleId, ValidationRequest};
use url::Url;

use crate::mocks::{self, MockFetcher, MockResponse, DOC_BASE};

const FOLDER: &str = "https://www.w3.org/TR/2021/WD-fancy-20210512/";

async fn run(
    fetcher: Arc<MockFetcher>,
    rules: &[&str],
    html: String,
    base: Option<&str>,
) -> RunReport {
    let config = OrchestratorConfig {
        timeout: Duration::from_secs(5),
        ..OrchestratorConfig::default()
    };
    let validator = Validator::new(config).unwrap().with_fetcher(fetcher);
    let rules = rules.iter().map(|r| r.parse::<RuleId>().unwrap()).collect();

    validator
        .validate(
            ValidationRequest {
                source: DocumentSource::Inline {
                    html,
                    base: base.map(|b| Url::parse(b).unwrap()),
                },
                profile: Profile::new("links", rules, RunConfig::default()),
            },
            Arc::new(Sink::new()),
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn test_linkchecker_redirect_then_broken() {
    let fetcher = Arc::new(MockFetcher::new().with_response(
        &format!("{FOLDER}img/moved.png"),
        MockResponse::Redirect(301, "lost.png".to_string()),
    ));

    let report = run(
        fetcher.clone(),
        &["links/linkchecker"],
        mocks::with_images(&["img/moved.png"]),
        Some(DOC_BASE),
    )
    .await;

    assert_eq!(
        report.error_ids(),
        vec!["links.linkchecker.response-error-with-redirect".to_string()]
    );
    assert_eq!(
        report.warning_ids(),
        vec!["links.linkchecker.display".to_string()]
    );
    let detail = report.errors()[0].detail.clone().unwrap();
    assert!(detail.contains("img/lost.png"), "{detail}");
    assert_eq!(fetcher.probe_count(&format!("{FOLDER}img/lost.png")), 1);
}

#[tokio::test]
async fn test_linkchecker_flags_resources_outside_folder() {
    let fetcher = Arc::new(MockFetcher::all_ok());

    let report = run(
        fetcher,
        &["links/linkchecker"],
        mocks::with_images(&["img/ok.png", "https://cdn.example.org/a.png"]),
        Some(DOC_BASE),
    )
    .await;

    assert_eq!(
        report.error_ids(),
        vec!["links.linkchecker.not-same-folder".to_string()]
    );
    assert_eq!(
        report.errors()[0].detail.as_deref(),
        Some("https://cdn.example.org/a.png")
    );
    assert_eq!(report.warning_ids().len(), 1);
}

#[tokio::test]
async fn test_linkchecker_one_error_per_broken_resource() {
    let fetcher = Arc::new(MockFetcher::new());

    let report = run(
        fetcher,
        &["links/linkchecker"],
        mocks::with_images(&["img/a.png", "https://cdn.example.org/missing.png"]),
        Some(DOC_BASE),
    )
    .await;

    assert_eq!(
        report.error_ids(),
        vec![
            "links.linkchecker.response-error".to_string(),
            "links.linkchecker.response-error".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_linkchecker_skips_shared_resources() {
    let fetcher = Arc::new(MockFetcher::new());

    let report = run(
        fetcher.clone(),
        &["links/linkchecker"],
        mocks::with_images(&["https://www.w3.org/StyleSheets/TR/2021/logos/W3C"]),
        Some(DOC_BASE),
    )
    .await;

    assert!(report.findings.is_empty());
    assert_eq!(fetcher.total_probes(), 0);
}

#[tokio::test]
async fn test_linkchecker_without_base_reports_nothing() {
    let fetcher = Arc::new(MockFetcher::new());

    let report = run(
        fetcher.clone(),
        &["links/linkchecker"],
        mocks::with_images(&["img/a.png"]),
        None,
    )
    .await;

    assert!(report.findings.is_empty());
    assert!(report.is_complete());
    assert_eq!(fetcher.total_probes(), 0);
}

#[tokio::test]
async fn test_duplicate_resources_probed_once() {
    let fetcher = Arc::new(MockFetcher::all_ok());

    let report = run(
        fetcher.clone(),
        &["links/linkchecker"],
        mocks::with_images(&["img/a.png", "img/a.png", "./img/a.png"]),
        Some(DOC_BASE),
    )
    .await;

    assert!(report.error_ids().is_empty());
    assert_eq!(fetcher.probe_count(&format!("{FOLDER}img/a.png")), 1);
}

#[tokio::test]
async fn test_unreliable_hosts_warn_once_per_link() {
    let fetcher = Arc::new(MockFetcher::all_ok());

    let report = run(
        fetcher,
        &["links/reliability"],
        mocks::with_links(&[
            "https://w3c-test.org/dom/",
            "https://tools.ietf.org/html/rfc2119",
            "https://www.w3.org/TR/",
        ]),
        Some(DOC_BASE),
    )
    .await;

    assert!(report.error_ids().is_empty());
    assert_eq!(
        report.warning_ids(),
        vec![
            "links.reliability.unreliable-link".to_string(),
            "links.reliability.unreliable-link".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_linkchecker_warns_on_redirect_to_unreliable_host() {
    let fetcher = Arc::new(MockFetcher::all_ok().with_response(
        &format!("{FOLDER}img/mirror.png"),
        MockResponse::Redirect(302, "https://w3c-test.org/mirror.png".to_string()),
    ));

    let report = run(
        fetcher,
        &["links/linkchecker"],
        mocks::with_images(&["img/mirror.png", "img/local.png"]),
        Some(DOC_BASE),
    )
    .await;

    assert_eq!(
        report.error_ids(),
        vec!["links.linkchecker.not-same-folder".to_string()]
    );
    assert_eq!(
        report.warning_ids(),
        vec![
            "links.linkchecker.unreliable-host".to_string(),
            "links.linkchecker.display".to_string(),
        ]
    );
    let warning = &report.warnings()[0];
    assert_eq!(
        warning.detail.as_deref(),
        Some("https://w3c-test.org/mirror.png")
    );
}

#[tokio::test]
async fn test_latest_version_must_be_retrievable() {
    let fetcher = Arc::new(
        MockFetcher::all_ok()
            .with_response("https://www.w3.org/TR/fancy/", MockResponse::Status(404)),
    );

    let report = run(
        fetcher,
        &["headers/dl"],
        mocks::working_draft(),
        Some(DOC_BASE),
    )
    .await;

    assert!(report
        .error_ids()
        .contains(&"headers.dl.cant-retrieve".to_string()));
}
