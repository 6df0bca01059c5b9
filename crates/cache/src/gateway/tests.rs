//! Tests for gateway ranking and health classification

use super::*;
use proptest::prelude::*;
use std::time::Duration;

fn registry() -> GatewayRegistry {
    GatewayRegistry::new(["https://a.example/ipfs/", "https://b.example/ipfs", "https://c.example/ipfs/"])
}

fn order(registry: &GatewayRegistry) -> Vec<String> {
    registry.rank().into_iter().map(|e| e.base_url).collect()
}

#[test]
fn test_base_urls_are_normalized_and_deduplicated() {
    let registry = GatewayRegistry::new(["https://a.example/ipfs", "https://a.example/ipfs/"]);
    assert_eq!(registry.endpoints(), ["https://a.example/ipfs/".to_string()]);
    assert_eq!(
        GatewayRegistry::url_for("https://a.example/ipfs/", "QmA"),
        "https://a.example/ipfs/QmA"
    );
}

#[test]
fn test_unmeasured_registry_keeps_configured_order() {
    let registry = registry();
    assert_eq!(order(&registry), registry.endpoints().to_vec());
    assert_eq!(registry.default_endpoint(), Some("https://a.example/ipfs/"));
}

#[test]
fn test_faster_gateway_ranks_first() {
    let registry = registry();
    registry.record_probe("https://a.example/ipfs/", ProbeOutcome::Success(Duration::from_millis(50)));
    registry.record_probe("https://b.example/ipfs/", ProbeOutcome::Success(Duration::from_millis(10)));

    assert_eq!(
        order(&registry),
        vec![
            "https://b.example/ipfs/".to_string(),
            "https://a.example/ipfs/".to_string(),
            "https://c.example/ipfs/".to_string(),
        ]
    );
}

#[test]
fn test_failure_keeps_previous_latency() {
    let registry = registry();
    registry.record_probe("https://c.example/ipfs/", ProbeOutcome::Success(Duration::from_millis(30)));
    registry.record_probe("https://c.example/ipfs/", ProbeOutcome::Failure);

    assert_eq!(registry.latency_of("https://c.example/ipfs/"), Some(30));
    assert_eq!(order(&registry)[0], "https://c.example/ipfs/");
}

#[test]
fn test_unknown_endpoint_is_ignored() {
    let registry = registry();
    registry.record_probe("https://rogue.example/ipfs/", ProbeOutcome::Success(Duration::from_millis(1)));
    assert!(registry.latency_of("https://rogue.example/ipfs/").is_none());
    assert_eq!(registry.rank().len(), 3);
}

#[test]
fn test_status_classification() {
    let threshold = Duration::from_millis(1000);
    assert_eq!(GatewayStatus::classify(None, threshold), GatewayStatus::Offline);
    assert_eq!(
        GatewayStatus::classify(Some(Duration::from_millis(999)), threshold),
        GatewayStatus::Online
    );
    assert_eq!(
        GatewayStatus::classify(Some(Duration::from_millis(1000)), threshold),
        GatewayStatus::Slow
    );
}

proptest! {
    #[test]
    fn rank_is_a_permutation_sorted_by_latency(
        latencies in proptest::collection::vec(proptest::option::of(0u64..10_000), 1..8)
    ) {
        let urls: Vec<String> = (0..latencies.len())
            .map(|i| format!("https://g{i}.example/ipfs/"))
            .collect();
        let registry = GatewayRegistry::new(urls.clone());
        for (url, latency) in urls.iter().zip(&latencies) {
            if let Some(ms) = latency {
                registry.record_probe(url, ProbeOutcome::Success(Duration::from_millis(*ms)));
            }
        }

        let ranked = registry.rank();
        prop_assert_eq!(ranked.len(), urls.len());

        let mut seen: Vec<String> = ranked.iter().map(|e| e.base_url.clone()).collect();
        seen.sort();
        let mut expected = urls.clone();
        expected.sort();
        prop_assert_eq!(seen, expected);

        // Measured before unmeasured, ascending among measured
        for pair in ranked.windows(2) {
            match (pair[0].last_latency_ms, pair[1].last_latency_ms) {
                (Some(a), Some(b)) => prop_assert!(a <= b),
                (None, Some(_)) => prop_assert!(false, "unmeasured ranked before measured"),
                _ => {}
            }
        }

        // Unmeasured endpoints keep configured relative order
        let unmeasured: Vec<&String> = ranked
            .iter()
            .filter(|e| e.last_latency_ms.is_none())
            .map(|e| &e.base_url)
            .collect();
        let configured: Vec<&String> = urls
            .iter()
            .zip(&latencies)
            .filter(|(_, l)| l.is_none())
            .map(|(u, _)| u)
            .collect();
        prop_assert_eq!(unmeasured, configured);
    }
}
