//! Metadata extraction integration tests.

use std::sync::Arc;

use chrono::NaiveDate;
use docrules::document::{extract_str, set_equivalent, DocStatus, DocumentSource};
use docrules::engine::orchestrator::{OrchestratorConfig, Validator};
use docrules::engine::sink::Sink;
use docrules::profile::Profile;
use url::Url;

use crate::mocks::{self, MockFetcher, DOC_BASE};

fn validator() -> Validator {
    Validator::new(OrchestratorConfig::default())
        .unwrap()
        .with_fetcher(Arc::new(
            MockFetcher::new().with_document(DOC_BASE, &mocks::working_draft()),
        ))
}

#[tokio::test]
async fn test_metadata_only_run() {
    let sink = Arc::new(Sink::new());
    let report = validator()
        .extract_metadata(
            DocumentSource::Url(Url::parse(DOC_BASE).unwrap()),
            Arc::clone(&sink),
        )
        .await
        .unwrap();

    assert_eq!(report.profile, "metadata");
    assert!(report.rules.is_empty());
    assert!(report.findings.is_empty());
    assert_eq!(sink.end_all_count(), 1);

    let model = report.metadata.unwrap();
    assert_eq!(model.profile, Some(DocStatus::WD));
    assert_eq!(model.title.as_deref(), Some("Fancy Spec"));
    assert_eq!(model.doc_date, NaiveDate::from_ymd_opt(2021, 5, 12));
    assert_eq!(
        model.this_version.as_deref(),
        Some("https://www.w3.org/TR/2021/WD-fancy-20210512/")
    );
    assert_eq!(
        model.latest_version.as_deref(),
        Some("https://www.w3.org/TR/fancy/")
    );
    assert!(model.rectrack);
    assert!(!model.informative);
    assert_eq!(model.deliverer_ids, vec![1001]);
    assert_eq!(model.base_url().map(Url::as_str), Some(DOC_BASE));
}

#[tokio::test]
async fn test_missing_document_fails_metadata_run() {
    let sink = Arc::new(Sink::new());
    let missing = Url::parse("https://www.w3.org/TR/nowhere/").unwrap();

    let result = validator()
        .extract_metadata(DocumentSource::Url(missing), Arc::clone(&sink))
        .await;

    assert!(result.is_err());
    assert_eq!(sink.end_all_count(), 0);
    assert_eq!(sink.exceptions().len(), 1);
}

#[tokio::test]
async fn test_detected_status_selects_profile() {
    let report = validator()
        .extract_metadata(
            DocumentSource::Inline {
                html: mocks::working_draft(),
                base: None,
            },
            Arc::new(Sink::new()),
        )
        .await
        .unwrap();

    let status = report.metadata.and_then(|m| m.profile).unwrap();
    let profile = Profile::for_status(status);
    assert_eq!(profile.name, "WD");
    assert_eq!(profile.config.long_status.as_deref(), Some("Working Draft"));
}

#[test]
fn test_editor_ids_compare_as_multisets() {
    let model = extract_str(&mocks::working_draft(), None).unwrap();

    assert!(set_equivalent(&model.editor_ids, &[7, 42]));
    assert!(!set_equivalent(&model.editor_ids, &[42]));
    assert!(!set_equivalent(&model.editor_ids, &[42, 42]));
    assert_eq!(model.editor_names, vec!["Grace Hopper", "Alan Turing"]);
}
