//! Integration Tests for the Cache Service
//!
//! Exercises the full subsystem end to end: gateway lookups over both
//! tiers, request coalescing, pattern-driven prefetch, seed warmup, and
//! the operational HTTP surface.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;

use clinref_cache::api::{create_router, AppState};
use clinref_cache::cache::cache_key;
use clinref_cache::prefetch::{FetcherRegistry, SchedulerConfig};
use clinref_cache::{CacheService, CallOptions, Category, Config, FetchError};

// == Helper Functions ==

fn test_config() -> Config {
    Config {
        db_path: None,
        seeds_path: None,
        scheduler: SchedulerConfig {
            fetch_delay: Duration::from_millis(1),
            ..SchedulerConfig::default()
        },
        ..Config::default()
    }
}

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("clinref_svc_{}_{}", std::process::id(), name))
}

fn seeds_file(name: &str, contents: &str) -> PathBuf {
    let path = temp_path(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn counting_registry(
    category: Category,
    counter: Arc<AtomicUsize>,
    result: Result<Value, FetchError>,
) -> FetcherRegistry {
    let mut registry = FetcherRegistry::new();
    registry.register(category, move |_query| {
        let counter = Arc::clone(&counter);
        let result = result.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            result
        }
    });
    registry
}

/// Polls the predicate until it holds or two seconds pass.
async fn wait_until<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

// == Gateway Lookup Tests ==

#[tokio::test]
async fn test_lookup_fetches_once_then_hits() {
    let service = CacheService::init(test_config(), FetcherRegistry::new())
        .await
        .unwrap();
    let fetches = Arc::new(AtomicUsize::new(0));

    for _ in 0..2 {
        let fetches = Arc::clone(&fetches);
        let result = service
            .gateway()
            .cached_call(
                "E11.9",
                Category::Codes,
                move || async move {
                    fetches.fetch_add(1, Ordering::SeqCst);
                    Ok(json!({"code": "E11.9", "description": "Type 2 diabetes"}))
                },
                CallOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(result["code"], "E11.9");
    }

    assert_eq!(fetches.load(Ordering::SeqCst), 1);

    let stats = service.store().stats().await;
    assert_eq!(stats.total_requests, 2);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.memory_hits, 1);
}

#[tokio::test]
async fn test_concurrent_lookups_coalesce_to_one_fetch() {
    let service = CacheService::init(test_config(), FetcherRegistry::new())
        .await
        .unwrap();
    let gateway = Arc::clone(service.gateway());
    let fetches = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let gateway = Arc::clone(&gateway);
        let fetches = Arc::clone(&fetches);
        handles.push(tokio::spawn(async move {
            gateway
                .cached_call(
                    "metformin",
                    Category::Drugs,
                    move || async move {
                        fetches.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok(json!({"name": "metformin"}))
                    },
                    CallOptions::default(),
                )
                .await
        }));
    }

    for handle in handles {
        let result = handle.await.unwrap().unwrap();
        assert_eq!(result["name"], "metformin");
    }
    assert_eq!(fetches.load(Ordering::SeqCst), 1);
}

// == Prefetch Flow Tests ==

#[tokio::test]
async fn test_repeated_searches_warm_related_queries() {
    let seeds = seeds_file(
        "relations.json",
        r#"{"related_queries": {"headache": ["migraine", "tension headache"]}}"#,
    );
    let config = Config {
        seeds_path: Some(seeds),
        ..test_config()
    };

    let fetches = Arc::new(AtomicUsize::new(0));
    let registry = counting_registry(
        Category::Symptoms,
        Arc::clone(&fetches),
        Ok(json!([{"name": "stub"}])),
    );

    let mut service = CacheService::init(config, registry).await.unwrap();
    service.start();

    for _ in 0..2 {
        let _ = service
            .gateway()
            .cached_call(
                "headache",
                Category::Symptoms,
                || async { Ok(json!([{"name": "headache"}])) },
                CallOptions::default(),
            )
            .await
            .unwrap();
    }

    let store = Arc::clone(service.store());
    let warmed = wait_until(|| {
        let store = Arc::clone(&store);
        async move {
            store.is_warm(&cache_key(Category::Symptoms, "migraine")).await
                && store
                    .is_warm(&cache_key(Category::Symptoms, "tension headache"))
                    .await
        }
    })
    .await;
    assert!(warmed, "related queries were never prefetched");
    assert!(service.scheduler().stats().tasks_completed >= 2);

    service.shutdown();
}

#[tokio::test]
async fn test_seed_queries_warmed_on_start() {
    let seeds = seeds_file(
        "seeds.json",
        r#"{"seed_queries": {"codes": ["hypertension"]}}"#,
    );
    let config = Config {
        seeds_path: Some(seeds),
        ..test_config()
    };

    let fetches = Arc::new(AtomicUsize::new(0));
    let registry = counting_registry(
        Category::Codes,
        Arc::clone(&fetches),
        Ok(json!({"code": "I10"})),
    );

    let mut service = CacheService::init(config, registry).await.unwrap();
    service.start();

    let store = Arc::clone(service.store());
    let warmed = wait_until(|| {
        let store = Arc::clone(&store);
        async move { store.is_warm(&cache_key(Category::Codes, "hypertension")).await }
    })
    .await;
    assert!(warmed, "seed query was never prefetched");
    assert_eq!(fetches.load(Ordering::SeqCst), 1);

    service.shutdown();
}

#[tokio::test]
async fn test_prefetch_skips_keys_warmed_by_user_lookups() {
    let seeds = seeds_file(
        "warm_relations.json",
        r#"{"related_queries": {"fever": ["sepsis"]}}"#,
    );
    let config = Config {
        seeds_path: Some(seeds),
        ..test_config()
    };

    let fetches = Arc::new(AtomicUsize::new(0));
    let registry = counting_registry(
        Category::Symptoms,
        Arc::clone(&fetches),
        Ok(json!("prefetched")),
    );

    let mut service = CacheService::init(config, registry).await.unwrap();

    // Warm the related key through a user lookup before the workers run
    let _ = service
        .gateway()
        .cached_call(
            "sepsis",
            Category::Symptoms,
            || async { Ok(json!("user fetched")) },
            CallOptions::default(),
        )
        .await
        .unwrap();

    service.start();
    for _ in 0..2 {
        let _ = service
            .gateway()
            .cached_call(
                "fever",
                Category::Symptoms,
                || async { Ok(json!("fever result")) },
                CallOptions::default(),
            )
            .await
            .unwrap();
    }

    let scheduler = Arc::clone(service.scheduler());
    let completed = wait_until(|| {
        let scheduler = Arc::clone(&scheduler);
        async move { scheduler.stats().tasks_completed >= 1 }
    })
    .await;
    assert!(completed, "warm-key task never completed");

    // The registered fetcher was never invoked for the warm key
    assert_eq!(fetches.load(Ordering::SeqCst), 0);
    assert_eq!(
        service
            .store()
            .get(&cache_key(Category::Symptoms, "sepsis"))
            .await,
        Some(json!("user fetched"))
    );

    service.shutdown();
}

// == Durability Tests ==

#[tokio::test]
async fn test_cache_survives_restart() {
    let db_path = temp_path("restart.db");
    let _ = std::fs::remove_file(&db_path);
    let config = Config {
        db_path: Some(db_path.clone()),
        ..test_config()
    };

    {
        let service = CacheService::init(config.clone(), FetcherRegistry::new())
            .await
            .unwrap();
        let _ = service
            .gateway()
            .cached_call(
                "aspirin",
                Category::Drugs,
                || async { Ok(json!({"name": "aspirin"})) },
                CallOptions::default(),
            )
            .await
            .unwrap();
    }

    let service = CacheService::init(config, FetcherRegistry::new())
        .await
        .unwrap();
    let cached = service
        .store()
        .get(&cache_key(Category::Drugs, "aspirin"))
        .await;
    assert_eq!(cached, Some(json!({"name": "aspirin"})));

    // Fresh process, so this hit came from the durable tier
    let stats = service.store().stats().await;
    assert_eq!(stats.durable_hits, 1);

    let _ = std::fs::remove_file(&db_path);
}

// == Operational Surface Tests ==

#[tokio::test]
async fn test_stats_endpoint_reflects_service_activity() {
    let service = CacheService::init(test_config(), FetcherRegistry::new())
        .await
        .unwrap();
    let _ = service
        .gateway()
        .cached_call(
            "asthma",
            Category::Codes,
            || async { Ok(json!({"code": "J45"})) },
            CallOptions::default(),
        )
        .await
        .unwrap();

    let app = create_router(AppState::new(
        Arc::clone(service.store()),
        Arc::clone(service.scheduler()),
    ));

    let response = app
        .oneshot(Request::builder().uri("/stats").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["misses"], 1);
    assert_eq!(body["total_requests"], 1);
    assert!(body["prefetch"].get("queue_depth").is_some());
}

#[tokio::test]
async fn test_clear_category_endpoint_empties_only_that_category() {
    let service = CacheService::init(test_config(), FetcherRegistry::new())
        .await
        .unwrap();
    service
        .store()
        .set("codes:i10", json!("a"), Category::Codes)
        .await;
    service
        .store()
        .set("drugs:aspirin", json!("b"), Category::Drugs)
        .await;

    let app = create_router(AppState::new(
        Arc::clone(service.store()),
        Arc::clone(service.scheduler()),
    ));

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/cache/codes")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert!(!service.store().is_warm("codes:i10").await);
    assert!(service.store().is_warm("drugs:aspirin").await);
}
