//! Link resolver integration tests.
//!
//! Redirect chains, failure classification, host reliability and request
//! coalescing against a scripted fetcher.

use std::sync::Arc;
use std::time::Duration;

use docrules::links::{
    HostPattern, HostPolicy, HostReliability, LinkResolver, LinkStatus, ResolveOptions,
    ResolverError,
};

use crate::mocks::{MockFetcher, MockResponse, DOC_BASE};

const START: &str = "https://www.w3.org/TR/2021/WD-fancy-20210512/start";

fn resolver(fetcher: &Arc<MockFetcher>) -> LinkResolver {
    LinkResolver::new(fetcher.clone(), HostPolicy::default(), 10)
}

#[tokio::test]
async fn test_direct_hit() {
    let fetcher = Arc::new(MockFetcher::new().with_response(START, MockResponse::Ok));
    let resolution = resolver(&fetcher)
        .resolve(START, ResolveOptions::default())
        .await
        .unwrap();

    assert_eq!(resolution.status, LinkStatus::Reachable);
    assert_eq!(resolution.final_url, START);
    assert!(resolution.redirect_chain.is_empty());
    assert_eq!(resolution.http_status, Some(200));
    assert_eq!(resolution.same_folder, None);
}

#[tokio::test]
async fn test_redirect_chain_is_recorded_in_order() {
    let fetcher = Arc::new(
        MockFetcher::new()
            .with_response(START, MockResponse::Redirect(301, "hop".to_string()))
            .with_response(
                "https://www.w3.org/TR/2021/WD-fancy-20210512/hop",
                MockResponse::Redirect(302, "https://www.w3.org/TR/fancy/".to_string()),
            )
            .with_response("https://www.w3.org/TR/fancy/", MockResponse::Ok),
    );

    let resolution = resolver(&fetcher)
        .resolve(
            START,
            ResolveOptions {
                same_origin_base: Some(DOC_BASE),
            },
        )
        .await
        .unwrap();

    assert_eq!(resolution.status, LinkStatus::Reachable);
    assert_eq!(
        resolution.redirect_chain,
        vec![
            "https://www.w3.org/TR/2021/WD-fancy-20210512/hop".to_string(),
            "https://www.w3.org/TR/fancy/".to_string(),
        ]
    );
    assert_eq!(resolution.final_url, "https://www.w3.org/TR/fancy/");
    assert_eq!(resolution.same_folder, Some(false));
}

#[tokio::test]
async fn test_redirect_then_broken() {
    let fetcher = Arc::new(
        MockFetcher::new()
            .with_response(
                START,
                MockResponse::Redirect(301, "https://www.w3.org/TR/gone/".to_string()),
            )
            .with_response("https://www.w3.org/TR/gone/", MockResponse::Status(410)),
    );

    let resolution = resolver(&fetcher)
        .resolve(START, ResolveOptions::default())
        .await
        .unwrap();

    assert_eq!(resolution.status, LinkStatus::RedirectedThenBroken);
    assert_eq!(resolution.redirect_chain.len(), 1);
    assert_eq!(resolution.http_status, Some(410));
    assert!(resolution.failure.is_some());
}

#[tokio::test]
async fn test_transport_failure_is_broken() {
    let fetcher = Arc::new(MockFetcher::new().with_response(
        START,
        MockResponse::Unreachable("dns error".to_string()),
    ));

    let resolution = resolver(&fetcher)
        .resolve(START, ResolveOptions::default())
        .await
        .unwrap();

    assert_eq!(resolution.status, LinkStatus::Broken);
    assert_eq!(resolution.http_status, None);
    assert_eq!(resolution.failure.as_deref(), Some("dns error"));
}

#[tokio::test]
async fn test_redirect_limit() {
    let fetcher = Arc::new(
        MockFetcher::new().with_response(START, MockResponse::Redirect(302, START.to_string())),
    );
    let resolver = LinkResolver::new(fetcher.clone(), HostPolicy::default(), 3);

    let resolution = resolver
        .resolve(START, ResolveOptions::default())
        .await
        .unwrap();

    assert_eq!(resolution.status, LinkStatus::RedirectedThenBroken);
    assert_eq!(resolution.redirect_chain.len(), 3);
    assert_eq!(fetcher.probe_count(START), 4);
}

#[tokio::test]
async fn test_unreliable_host_is_still_resolved() {
    let target = "https://w3c-test.org/dom/";
    let fetcher = Arc::new(MockFetcher::new().with_response(target, MockResponse::Ok));

    let resolution = resolver(&fetcher)
        .resolve(target, ResolveOptions::default())
        .await
        .unwrap();

    assert_eq!(resolution.status, LinkStatus::Reachable);
    assert_eq!(resolution.host_reliability, HostReliability::Unreliable);
}

#[tokio::test]
async fn test_redirect_onto_unreliable_host() {
    let fetcher = Arc::new(
        MockFetcher::new()
            .with_response(
                START,
                MockResponse::Redirect(301, "https://flaky.example.org/x".to_string()),
            )
            .with_response("https://flaky.example.org/x", MockResponse::Ok),
    );
    let policy = HostPolicy::permissive().with_unreliable(HostPattern::host("flaky.example.org"));
    let resolver = LinkResolver::new(fetcher.clone(), policy, 10);

    let resolution = resolver
        .resolve(START, ResolveOptions::default())
        .await
        .unwrap();

    assert_eq!(resolution.status, LinkStatus::Reachable);
    assert_eq!(resolution.host_reliability, HostReliability::Unreliable);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_requests_are_coalesced() {
    let fetcher = Arc::new(
        MockFetcher::new()
            .with_response(START, MockResponse::Ok)
            .with_delay(Duration::from_millis(500)),
    );
    let resolver = resolver(&fetcher);

    let (first, second) = tokio::join!(
        resolver.resolve(START, ResolveOptions::default()),
        resolver.resolve(
            START,
            ResolveOptions {
                same_origin_base: Some(DOC_BASE),
            }
        ),
    );

    let (first, second) = (first.unwrap(), second.unwrap());
    assert_eq!(first.status, second.status);
    assert_eq!(first.final_url, second.final_url);
    assert_eq!(first.same_folder, None);
    assert_eq!(second.same_folder, Some(true));
    assert_eq!(resolver.fetch_count(), 1);
    assert_eq!(fetcher.probe_count(START), 1);
}

#[tokio::test]
async fn test_fragment_variants_share_one_resolution() {
    let fetcher = Arc::new(MockFetcher::new().with_response(START, MockResponse::Ok));
    let resolver = resolver(&fetcher);

    for target in [START, "https://www.w3.org/TR/2021/WD-fancy-20210512/start#intro"] {
        let resolution = resolver
            .resolve(target, ResolveOptions::default())
            .await
            .unwrap();
        assert_eq!(resolution.status, LinkStatus::Reachable);
        assert_eq!(resolution.requested, target);
    }
    assert_eq!(fetcher.total_probes(), 1);
}

#[tokio::test]
async fn test_invalid_base_is_error() {
    let fetcher = Arc::new(MockFetcher::all_ok());
    let result = resolver(&fetcher)
        .resolve(
            START,
            ResolveOptions {
                same_origin_base: Some("not a url"),
            },
        )
        .await;

    assert!(matches!(result, Err(ResolverError::InvalidBase { .. })));
    assert_eq!(fetcher.total_probes(), 0);
}

#[tokio::test]
async fn test_non_http_target_is_broken_without_fetch() {
    let fetcher = Arc::new(MockFetcher::all_ok());
    let resolver = resolver(&fetcher);

    let resolution = resolver
        .resolve("mailto:editor@example.org", ResolveOptions::default())
        .await
        .unwrap();

    assert_eq!(resolution.status, LinkStatus::Broken);
    assert_eq!(resolver.fetch_count(), 0);
    assert_eq!(fetcher.total_probes(), 0);
}
