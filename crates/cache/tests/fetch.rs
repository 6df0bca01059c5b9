//! Downloads, failover and coalescing against mock gateways

mod common;

use common::{coordinator, dir_listing, gateway, truncating_gateway};
use futures::future::join_all;
use pincache_cache::{CacheError, CancellationToken, PreloadOutcome};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn body(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[tokio::test]
async fn test_failover_keeps_only_the_winning_bytes() {
    let g1 = MockServer::start().await;
    let g2 = MockServer::start().await;
    let bytes = body(64 * 1024);

    Mock::given(method("GET"))
        .and(path("/ipfs/QmABC"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&g1)
        .await;
    Mock::given(method("GET"))
        .and(path("/ipfs/QmABC"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(bytes.clone())
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&g2)
        .await;

    let temp = TempDir::new().unwrap();
    let cache = coordinator(&temp, vec![gateway(&g1), gateway(&g2)]).await;

    let fetched = cache.fetch("QmABC").await.expect("fetch should fail over");

    assert_eq!(std::fs::read(&fetched).unwrap(), bytes);
    assert_eq!(dir_listing(cache.disk().root()), vec!["QmABC".to_string()]);
    let latency = cache.registry().latency_of(&gateway(&g2)).expect("latency recorded");
    assert!(latency >= 200, "recorded {latency}ms");
    assert!(cache.registry().latency_of(&gateway(&g1)).is_none());
}

#[tokio::test]
async fn test_truncated_body_is_discarded_and_fails_over() {
    let truncating = truncating_gateway(100_000, 5_000).await;
    let whole = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ipfs/QmTrunc"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"whole".to_vec()))
        .expect(1)
        .mount(&whole)
        .await;

    let temp = TempDir::new().unwrap();
    let cache = coordinator(&temp, vec![truncating.clone(), gateway(&whole)]).await;

    let fetched = cache.fetch("QmTrunc").await.expect("fetch should fail over");

    assert_eq!(std::fs::read(&fetched).unwrap(), b"whole");
    assert_eq!(dir_listing(cache.disk().root()), vec!["QmTrunc".to_string()]);
    assert!(cache.registry().latency_of(&truncating).is_none());
    assert!(cache.registry().latency_of(&gateway(&whole)).is_some());
}

#[tokio::test]
async fn test_truncated_body_alone_leaves_nothing_behind() {
    let truncating = truncating_gateway(100_000, 5_000).await;

    let temp = TempDir::new().unwrap();
    let cache = coordinator(&temp, vec![truncating]).await;

    let err = cache.fetch("QmTrunc").await.unwrap_err();
    assert!(matches!(err, CacheError::AllGatewaysFailed { attempts: 1, .. }));
    assert!(dir_listing(cache.disk().root()).is_empty());
}

#[tokio::test]
async fn test_fetch_hits_disk_without_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fresh".to_vec()))
        .expect(0)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let cache = coordinator(&temp, vec![gateway(&server)]).await;
    let existing = cache.disk().path_for("QmCached").unwrap();
    std::fs::write(&existing, b"already here").unwrap();

    let fetched = cache.fetch("QmCached").await.unwrap();
    assert_eq!(fetched, existing);
    assert_eq!(std::fs::read(&fetched).unwrap(), b"already here");
}

#[tokio::test]
async fn test_concurrent_fetches_share_one_download() {
    let server = MockServer::start().await;
    let bytes = body(4096);
    Mock::given(method("GET"))
        .and(path("/ipfs/QmShared"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(bytes.clone())
                .set_delay(Duration::from_millis(150)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let cache = coordinator(&temp, vec![gateway(&server)]).await;

    let results = join_all((0..8).map(|_| cache.fetch("QmShared"))).await;

    let expected = cache.disk().path_for("QmShared").unwrap();
    for result in results {
        assert_eq!(result.expect("shared fetch"), expected);
    }
    assert_eq!(std::fs::read(&expected).unwrap(), bytes);
    assert_eq!(dir_listing(cache.disk().root()), vec!["QmShared".to_string()]);
}

#[tokio::test]
async fn test_stalled_gateway_times_out_and_fails_over() {
    let stalled = MockServer::start().await;
    let healthy = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"too late".to_vec())
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&stalled)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"on time".to_vec()))
        .mount(&healthy)
        .await;

    let temp = TempDir::new().unwrap();
    let cache = coordinator(&temp, vec![gateway(&stalled), gateway(&healthy)]).await;

    let fetched = cache.fetch("QmStall").await.unwrap();
    assert_eq!(std::fs::read(fetched).unwrap(), b"on time");
}

#[tokio::test]
async fn test_empty_body_is_a_gateway_failure() {
    let empty = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&empty)
        .await;

    let temp = TempDir::new().unwrap();
    let cache = coordinator(&temp, vec![gateway(&empty)]).await;

    let err = cache.fetch("QmEmpty").await.unwrap_err();
    assert!(matches!(err, CacheError::AllGatewaysFailed { attempts: 1, .. }));
    assert!(dir_listing(cache.disk().root()).is_empty());
}

#[tokio::test]
async fn test_all_gateways_failing_leaves_nothing_behind() {
    let g1 = MockServer::start().await;
    let g2 = MockServer::start().await;
    for server in [&g1, &g2] {
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(server)
            .await;
    }

    let temp = TempDir::new().unwrap();
    let cache = coordinator(&temp, vec![gateway(&g1), gateway(&g2)]).await;

    let err = cache.fetch("QmMissing").await.unwrap_err();
    assert!(matches!(err, CacheError::AllGatewaysFailed { attempts: 2, .. }));
    assert!(err.is_transient());
    assert!(dir_listing(cache.disk().root()).is_empty());
    assert_eq!(cache.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_cancellation_stops_before_next_gateway() {
    let g1 = MockServer::start().await;
    let g2 = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_delay(Duration::from_millis(200)))
        .expect(1)
        .mount(&g1)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"never".to_vec()))
        .expect(0)
        .mount(&g2)
        .await;

    let temp = TempDir::new().unwrap();
    let cache = coordinator(&temp, vec![gateway(&g1), gateway(&g2)]).await;
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = cache.fetch_with_cancel("QmCancel", &cancel).await.unwrap_err();
    assert!(err.is_cancelled());
    assert!(dir_listing(cache.disk().root()).is_empty());
}

#[tokio::test]
async fn test_waiter_retries_after_initiator_cancels() {
    let slow = MockServer::start().await;
    let good = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_delay(Duration::from_millis(300)))
        .mount(&slow)
        .await;
    Mock::given(method("GET"))
        .and(path("/ipfs/QmJoint"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"joint".to_vec()))
        .expect(1)
        .mount(&good)
        .await;

    let temp = TempDir::new().unwrap();
    let cache = coordinator(&temp, vec![gateway(&slow), gateway(&good)]).await;
    let initiator = CancellationToken::new();
    let waiter = CancellationToken::new();

    let trigger = initiator.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let (first, second) = tokio::join!(cache.fetch_with_cancel("QmJoint", &initiator), async {
        // Join only once the first caller owns the download
        tokio::time::sleep(Duration::from_millis(30)).await;
        cache.fetch_with_cancel("QmJoint", &waiter).await
    });

    assert!(first.unwrap_err().is_cancelled());
    let path = second.expect("waiter should retry on its own");
    assert_eq!(std::fs::read(path).unwrap(), b"joint");
    assert!(!waiter.is_cancelled());
    assert_eq!(dir_listing(cache.disk().root()), vec!["QmJoint".to_string()]);
}

#[tokio::test]
async fn test_preload_downloads_and_records_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ipfs/QmPin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"pinned".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let cache = coordinator(&temp, vec![gateway(&server)]).await;

    let outcome = cache.preload("QmPin").await.unwrap();
    let path = cache.disk().path_for("QmPin").unwrap();
    assert_eq!(outcome, PreloadOutcome::Cached(path.clone()));

    let entry = cache.entry("QmPin").await.unwrap().unwrap();
    assert_eq!(entry.local_path, Some(path));

    // A preloaded CID now resolves to its local copy
    let resolution = cache.resolve("QmPin").await.unwrap();
    assert!(resolution.url.starts_with("file://"));
}
