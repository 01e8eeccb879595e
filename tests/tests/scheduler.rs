//! Tick dispatch, isolation, concurrency bound and shutdown of the
//! scheduler, against the mock store.
//!
//! Health and metrics are process-global, so each test uses its own brand
//! names and only checks counters for growth.

use integration_tests::fixtures::simple_chunks;
use integration_tests::setup::{test_config, TestContext};
use std::time::Duration;
use telemetry::{health, metrics, BrandState};
use tokio::sync::watch;
use worker::{PipelineConfig, TickReport};

#[tokio::test]
async fn test_tick_processes_every_registered_brand() {
    let ctx = TestContext::new();
    ctx.register(&["Tick Alpha", "tick-beta", "TICK_ALPHA"]);
    ctx.enqueue("tick-alpha", simple_chunks("tick-alpha", 2));
    ctx.enqueue("tick-beta", simple_chunks("tick-beta", 1));

    let report = ctx.scheduler.run_tick().await.unwrap();

    assert_eq!(
        report,
        TickReport {
            brands: 2,
            published: 2,
            no_data: 0,
            failed: 0,
        }
    );
    assert_eq!(ctx.summary("tick-alpha").unwrap()["totalChunks"], 2);
    assert_eq!(ctx.summary("tick-beta").unwrap()["totalChunks"], 1);
    assert_eq!(health().brands.state("tick-alpha"), Some(BrandState::Succeeded));
    assert!(health().brands.last_processed("tick-beta").is_some());
}

#[tokio::test]
async fn test_idle_brand_reports_no_data() {
    let ctx = TestContext::new();
    ctx.register(&["idle-brand"]);

    let report = ctx.scheduler.run_tick().await.unwrap();

    assert_eq!(report.no_data, 1);
    assert!(ctx.summary("idle-brand").is_none());
    assert_eq!(health().brands.state("idle-brand"), Some(BrandState::NoData));
}

#[tokio::test]
async fn test_failing_brand_does_not_affect_siblings() {
    let ctx = TestContext::new();
    ctx.register(&["iso-a", "iso-b", "iso-c"]);
    for brand in ["iso-a", "iso-b", "iso-c"] {
        ctx.enqueue(brand, simple_chunks(brand, 1));
    }
    ctx.store
        .fail_key(&ctx.keys.summary_key(&ctx.slug("iso-b")));
    let failed_before = metrics().brands_failed.get();

    let report = ctx.scheduler.run_tick().await.unwrap();

    assert_eq!(report.published, 2);
    assert_eq!(report.failed, 1);
    assert!(ctx.summary("iso-a").is_some());
    assert!(ctx.summary("iso-c").is_some());
    assert_eq!(health().brands.state("iso-b"), Some(BrandState::Failed));
    assert!(health().brands.report().failed.contains("iso-b"));
    assert!(metrics().brands_failed.get() > failed_before);

    // Next tick still runs every brand
    ctx.enqueue("iso-a", simple_chunks("iso-a", 1));
    let report = ctx.scheduler.run_tick().await.unwrap();
    assert_eq!(report.brands, 3);
    assert_eq!(report.published, 1);
}

#[tokio::test(start_paused = true)]
async fn test_concurrency_is_bounded() {
    let ctx = TestContext::with_config(PipelineConfig {
        concurrency: 3,
        ..test_config()
    });
    let brands: Vec<String> = (0..12).map(|i| format!("bound-{}", i)).collect();
    let names: Vec<&str> = brands.iter().map(String::as_str).collect();
    ctx.register(&names);
    ctx.store.set_blocking_delay(Duration::from_secs(1));

    let report = ctx.scheduler.run_tick().await.unwrap();

    assert_eq!(report.brands, 12);
    assert_eq!(report.no_data, 12);
    assert_eq!(ctx.store.max_in_flight(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_single_brand_concurrency() {
    let ctx = TestContext::with_config(PipelineConfig {
        concurrency: 1,
        ..test_config()
    });
    ctx.register(&["serial-a", "serial-b", "serial-c"]);
    ctx.store.set_blocking_delay(Duration::from_millis(500));

    ctx.scheduler.run_tick().await.unwrap();

    assert_eq!(ctx.store.max_in_flight(), 1);
}

#[tokio::test]
async fn test_registry_failure_fails_the_tick() {
    let ctx = TestContext::new();
    ctx.store.fail_key(ctx.keys.registry_key());

    let err = ctx.scheduler.run_tick().await.unwrap_err();

    assert!(err.is_transient());
    // One attempt plus two retries
    assert_eq!(ctx.store.call_count("members"), 3);
    assert_eq!(ctx.store.call_count("blocking_pop"), 0);
}

#[tokio::test]
async fn test_registry_as_list_is_normalized() {
    let ctx = TestContext::new();
    ctx.store.push_all(
        ctx.keys.registry_key(),
        ["List Brand", "LIST-BRAND", "!!!", "  "],
    );
    ctx.enqueue("list-brand", simple_chunks("list-brand", 1));

    let report = ctx.scheduler.run_tick().await.unwrap();

    assert_eq!(report.brands, 1);
    assert_eq!(report.published, 1);
}

#[tokio::test]
async fn test_brands_discovered_from_queues() {
    let ctx = TestContext::new();
    ctx.enqueue("found-a", simple_chunks("found-a", 1));
    ctx.enqueue("found-b", simple_chunks("found-b", 2));

    let report = ctx.scheduler.run_tick().await.unwrap();

    assert_eq!(report.brands, 2);
    assert_eq!(report.published, 2);
    assert_eq!(ctx.store.call_count("scan_keys"), 1);
}

#[tokio::test]
async fn test_discovery_can_be_disabled() {
    let ctx = TestContext::with_config(PipelineConfig {
        discover_from_queues: false,
        ..test_config()
    });
    ctx.enqueue("hidden", simple_chunks("hidden", 1));

    let report = ctx.scheduler.run_tick().await.unwrap();

    assert_eq!(report.brands, 0);
    assert_eq!(ctx.store.call_count("scan_keys"), 0);
    assert_eq!(ctx.queued("hidden").len(), 1);
}

#[tokio::test]
async fn test_registry_wins_over_discovery() {
    let ctx = TestContext::new();
    ctx.register(&["listed"]);
    ctx.enqueue("unlisted", simple_chunks("unlisted", 1));

    let report = ctx.scheduler.run_tick().await.unwrap();

    assert_eq!(report.brands, 1);
    assert_eq!(ctx.queued("unlisted").len(), 1);
    assert_eq!(ctx.store.call_count("scan_keys"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_start_runs_until_shutdown() {
    let ctx = TestContext::new();
    ctx.register(&["loop-brand"]);
    ctx.enqueue("loop-brand", simple_chunks("loop-brand", 2));

    let (tx, rx) = watch::channel(false);
    let handles = ctx.scheduler.clone().start(rx);

    tokio::time::sleep(Duration::from_millis(350)).await;
    assert!(ctx.summary("loop-brand").is_some());

    // Heartbeat written on the first beat
    let key = ctx.keys.heartbeat_key("orchestrator-test");
    let (value, ttl) = ctx.store.value(&key).expect("heartbeat written");
    assert_eq!(value, "alive");
    assert_eq!(ttl, ctx.config.heartbeat_ttl());

    tx.send(true).unwrap();
    for handle in handles {
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("task stops after shutdown")
            .unwrap();
    }

    let ticks = ctx.store.call_count("members");
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(ctx.store.call_count("members"), ticks);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_waits_for_brand_in_flight() {
    let ctx = TestContext::new();
    ctx.register(&["drain-on-stop"]);
    ctx.enqueue("drain-on-stop", simple_chunks("drain-on-stop", 3));
    ctx.store.set_blocking_delay(Duration::from_secs(2));

    let (tx, rx) = watch::channel(false);
    let handles = ctx.scheduler.clone().start(rx);

    // First tick fires at once; the brand is now parked in its blocking pop
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(health().brands.state("drain-on-stop"), Some(BrandState::Active));
    assert!(ctx.summary("drain-on-stop").is_none());

    tx.send(true).unwrap();
    for handle in handles {
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("task stops after shutdown")
            .unwrap();
    }

    assert_eq!(ctx.summary("drain-on-stop").unwrap()["totalChunks"], 3);
    assert!(ctx.queued("drain-on-stop").is_empty());
    assert_eq!(
        health().brands.state("drain-on-stop"),
        Some(BrandState::Succeeded)
    );
    assert_eq!(ctx.store.call_count("members"), 1);
}

#[tokio::test]
async fn test_unlisted_brands_leave_health() {
    let ctx = TestContext::new();
    ctx.register(&["prune-keep", "prune-gone"]);

    ctx.scheduler.run_tick().await.unwrap();
    assert_eq!(health().brands.state("prune-gone"), Some(BrandState::NoData));

    let registry = ctx.keys.registry_key().to_string();
    ctx.store.remove_from_set(&registry, &["prune-gone"]);
    let report = ctx.scheduler.run_tick().await.unwrap();

    assert_eq!(report.brands, 1);
    assert_eq!(health().brands.state("prune-gone"), None);
    assert_eq!(health().brands.state("prune-keep"), Some(BrandState::NoData));
    assert!(!health()
        .brands
        .report()
        .brands
        .iter()
        .any(|b| b.brand == "prune-gone"));

    // An empty listing forgets the rest
    ctx.store.remove_from_set(&registry, &["prune-keep"]);
    let report = ctx.scheduler.run_tick().await.unwrap();
    assert_eq!(report.brands, 0);
    assert_eq!(health().brands.state("prune-keep"), None);
}

#[tokio::test(start_paused = true)]
async fn test_loop_survives_failed_ticks() {
    let ctx = TestContext::new();
    ctx.store.fail_key(ctx.keys.registry_key());
    let errors_before = metrics().loop_errors.get();

    let (tx, rx) = watch::channel(false);
    let scheduler = ctx.scheduler.clone();
    let run = tokio::spawn(async move { scheduler.run(rx).await });

    tokio::time::sleep(Duration::from_millis(500)).await;
    tx.send(true).unwrap();
    run.await.unwrap();

    assert!(metrics().loop_errors.get() >= errors_before + 2);
    // Three attempts per failed tick
    assert!(ctx.store.call_count("members") >= 6);
}
