//! Resource exhaustion tests.
//!
//! Verifies the query service keeps storage reads bounded, enforces its
//! deadline, and releases everything when a request is abandoned.

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use beacon_query::{AuthContext, BeaconError, QueryConfig};
use common::{public, service, snp_query, snv, MockStore};
use serde_json::json;

fn wide_store(datasets: usize, delay: Duration) -> Arc<MockStore> {
    let mut store = MockStore::new().with_delay(delay);
    for i in 0..datasets {
        store = store.with_dataset(public(&format!("D{i:03}")), vec![snv(100, "G")]);
    }
    Arc::new(store)
}

/// Storage reads in flight never exceed the permit pool
#[tokio::test]
async fn test_storage_reads_bounded() {
    let store = wide_store(24, Duration::from_millis(20));
    let config = QueryConfig {
        max_concurrency: 3,
        query_timeout: Duration::from_secs(10),
        retry_backoff: Duration::from_millis(10),
    };
    let svc = service(&store, config);

    let mut query = snp_query(100);
    query["includeDatasetResponses"] = json!("HIT");
    let response = svc
        .handle_query(&query, &AuthContext::anonymous())
        .await
        .unwrap();

    assert_eq!(response.dataset_allele_responses.len(), 24);
    assert!(store.peak() <= 3, "peak {} exceeds pool", store.peak());
    assert!(store.peak() >= 2, "reads should overlap, peak {}", store.peak());
    assert_eq!(store.in_flight(), 0);
}

/// The pool is shared by concurrent requests on one service
#[tokio::test]
async fn test_pool_shared_across_requests() {
    let store = wide_store(8, Duration::from_millis(20));
    let config = QueryConfig {
        max_concurrency: 2,
        ..common::fast_config()
    };
    let svc = Arc::new(service(&store, config));

    let mut handles = Vec::new();
    for _ in 0..5 {
        let svc = Arc::clone(&svc);
        handles.push(tokio::spawn(async move {
            svc.handle_query(&snp_query(100), &AuthContext::anonymous())
                .await
                .map(|r| r.exists)
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().unwrap());
    }
    assert!(store.peak() <= 2, "peak {} exceeds pool", store.peak());
}

/// A slow store hits the deadline instead of hanging the request
#[tokio::test]
async fn test_query_deadline() {
    let store = wide_store(4, Duration::from_secs(30));
    let config = QueryConfig {
        max_concurrency: 4,
        query_timeout: Duration::from_millis(100),
        retry_backoff: Duration::from_millis(10),
    };
    let svc = service(&store, config);

    let started = Instant::now();
    let err = svc
        .handle_query(&snp_query(100), &AuthContext::anonymous())
        .await
        .unwrap_err();
    assert!(matches!(err, BeaconError::Timeout(d) if d == Duration::from_millis(100)));
    assert!(started.elapsed() < Duration::from_secs(5));

    // Abandoned reads are aborted and release their slots
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(store.in_flight(), 0);
}

/// Dropping the request future aborts its dataset tasks
#[tokio::test]
async fn test_cancelled_request_releases_reads() {
    let store = wide_store(4, Duration::from_secs(30));
    let svc = service(&store, common::fast_config());

    let outcome = tokio::time::timeout(
        Duration::from_millis(100),
        svc.handle_query(&snp_query(100), &AuthContext::anonymous()),
    )
    .await;
    assert!(outcome.is_err());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(store.in_flight(), 0);
    assert_eq!(store.peak(), 4);
}

/// Validation failures never reach the store
#[tokio::test]
async fn test_invalid_queries_are_cheap() {
    let store = wide_store(4, Duration::from_secs(30));
    let svc = service(&store, common::fast_config());

    let started = Instant::now();
    for _ in 0..100 {
        let mut query = snp_query(100);
        query["assemblyId"] = json!("not-an-assembly");
        assert!(svc
            .handle_query(&query, &AuthContext::anonymous())
            .await
            .is_err());
    }
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(store.attempts("D000"), 0);
}

/// Concurrency and timeout limits must be usable
#[test]
fn test_query_config_limits() {
    assert!(QueryConfig::default().validate().is_ok());

    let no_permits = QueryConfig {
        max_concurrency: 0,
        ..QueryConfig::default()
    };
    assert!(no_permits.validate().is_err());

    let no_deadline = QueryConfig {
        query_timeout: Duration::ZERO,
        ..QueryConfig::default()
    };
    assert!(no_deadline.validate().is_err());
}
