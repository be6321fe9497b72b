// Engine lifecycle and cycle behavior against a scripted provider

use std::sync::atomic::Ordering;

use anyhow::bail;
use hostmon::core::system_monitor::{EngineState, EventKind};
use hostmon::MonitorError;
use serde_json::json;

use super::support::{engine_with, FakeHost};

#[test]
fn test_stop_twice_emits_one_stop() {
    let host = FakeHost::new();
    let (mut engine, recorder) = engine_with(&host);

    engine.start(None).unwrap();
    engine.stop().unwrap();
    engine.stop().unwrap();

    assert_eq!(recorder.count(EventKind::Stop), 1);
    assert_eq!(engine.state(), EngineState::Stopped);
}

#[test]
fn test_stop_without_start_is_silent() {
    let host = FakeHost::new();
    let (mut engine, recorder) = engine_with(&host);

    engine.stop().unwrap();

    assert!(recorder.kinds().is_empty());
}

#[test]
fn test_destroy_twice_emits_one_destroy() {
    let host = FakeHost::new();
    let (mut engine, recorder) = engine_with(&host);

    engine.start(None).unwrap();
    engine.destroy().unwrap();
    engine.destroy().unwrap();

    assert_eq!(recorder.count(EventKind::Destroy), 1);
    assert!(matches!(
        engine.start(None),
        Err(MonitorError::AlreadyDestroyed)
    ));
    assert!(matches!(engine.reset(), Err(MonitorError::AlreadyDestroyed)));
}

#[tokio::test]
async fn test_cycle_after_destroy_is_refused() {
    let host = FakeHost::new();
    let (mut engine, _) = engine_with(&host);

    engine.destroy().unwrap();

    assert!(matches!(
        engine.run_cycle().await,
        Err(MonitorError::AlreadyDestroyed)
    ));
    assert_eq!(host.calls(), 0);
}

#[tokio::test]
async fn test_regular_event_carries_snapshot() {
    let host = FakeHost::new();
    let (mut engine, recorder) = engine_with(&host);

    engine.run_cycle().await.unwrap();

    let regular = recorder.of(EventKind::Regular);
    assert_eq!(regular.len(), 1);
    let event = &regular[0];
    assert_eq!(event.timestamp, 1_700_000_000);
    assert_eq!(event.get("type"), Some(&json!("regular")));
    assert_eq!(event.get("timestamp"), Some(&json!(1_700_000_000)));
    assert_eq!(event.get("hostname"), Some(&json!("test-host")));
    assert_eq!(event.get("totalmem"), Some(&json!(1000)));
    assert_eq!(event.get("freemem"), Some(&json!(400)));
    assert_eq!(event.get("loadavg"), Some(&json!([0.5, 0.5, 0.5])));
    assert!(event.get("disks").is_some());
    assert!(event.get("processes").is_none());
}

#[tokio::test]
async fn test_fractional_freemem_breach() {
    let host = FakeHost::new();
    let (mut engine, recorder) = engine_with(&host);
    engine
        .configure(&json!({"threshold": {"freemem": 0.5}}))
        .unwrap();

    engine.run_cycle().await.unwrap();

    assert_eq!(recorder.count(EventKind::FreeMem), 1);
}

#[tokio::test]
async fn test_absolute_freemem_breach() {
    let host = FakeHost::new();
    let (mut engine, recorder) = engine_with(&host);
    engine
        .configure(&json!({"threshold": {"freemem": 600}}))
        .unwrap();

    let report = engine.run_cycle().await.unwrap();

    assert_eq!(recorder.count(EventKind::FreeMem), 1);
    let breach = &report.breaches[0];
    assert_eq!(breach.value, 400.0);
    assert_eq!(breach.threshold, 600.0);
}

#[tokio::test]
async fn test_freemem_not_breached_when_enough_free() {
    let host = FakeHost::new();
    let (mut engine, recorder) = engine_with(&host);
    engine
        .configure(&json!({"threshold": {"freemem": 0.3}}))
        .unwrap();

    engine.run_cycle().await.unwrap();

    assert_eq!(recorder.count(EventKind::FreeMem), 0);
}

#[tokio::test]
async fn test_only_breached_load_window_fires() {
    let host = FakeHost::new();
    host.set_loadavg([2.0, 0.5, 0.5]);
    let (mut engine, recorder) = engine_with(&host);
    engine
        .configure(&json!({"threshold": {"loadavg": [1, 1, 1]}}))
        .unwrap();

    engine.run_cycle().await.unwrap();

    assert_eq!(recorder.count(EventKind::LoadAvg1), 1);
    assert_eq!(recorder.count(EventKind::LoadAvg5), 0);
    assert_eq!(recorder.count(EventKind::LoadAvg15), 0);
}

#[tokio::test]
async fn test_equal_load_is_not_a_breach() {
    let host = FakeHost::new();
    host.set_loadavg([1.0, 1.0, 1.0]);
    let (mut engine, recorder) = engine_with(&host);
    engine
        .configure(&json!({"threshold": {"loadavg": 1}}))
        .unwrap();

    engine.run_cycle().await.unwrap();

    assert!(recorder.kinds().iter().all(|kind| !kind.is_threshold()));
}

#[tokio::test]
async fn test_uptime_breach() {
    let host = FakeHost::new();
    let (mut engine, recorder) = engine_with(&host);

    engine.run_cycle().await.unwrap();
    assert_eq!(recorder.count(EventKind::Uptime), 0);

    engine
        .configure(&json!({"threshold": {"uptime": 60}}))
        .unwrap();
    engine.run_cycle().await.unwrap();
    assert_eq!(recorder.count(EventKind::Uptime), 1);
}

#[tokio::test]
async fn test_freedisk_fires_per_filesystem() {
    let host = FakeHost::new();
    host.set_disk("/", 1000, 50);
    host.set_disk("/data", 1000, 900);
    host.set_disk("/var", 1000, 10);
    let (mut engine, recorder) = engine_with(&host);
    engine
        .configure(&json!({"threshold": {"freedisk": 0.1}}))
        .unwrap();

    engine.run_cycle().await.unwrap();

    let mounts: Vec<_> = recorder
        .of(EventKind::FreeDisk)
        .iter()
        .filter_map(|e| e.get("mount").and_then(|m| m.as_str()).map(String::from))
        .collect();
    assert_eq!(mounts, vec!["/".to_string(), "/var".to_string()]);
}

#[tokio::test]
async fn test_disk_failure_does_not_block_other_events() {
    let host = FakeHost::new();
    host.set_loadavg([5.0, 5.0, 5.0]);
    host.fail_disks();
    let (mut engine, recorder) = engine_with(&host);
    engine
        .configure(&json!({"threshold": {
            "loadavg": 1, "freemem": 0.5, "freedisk": 0.5, "uptime": 60
        }}))
        .unwrap();

    let report = engine.run_cycle().await.unwrap();

    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].is_collection_error());
    assert_eq!(recorder.count(EventKind::Regular), 1);
    assert_eq!(recorder.count(EventKind::LoadAvg1), 1);
    assert_eq!(recorder.count(EventKind::FreeMem), 1);
    assert_eq!(recorder.count(EventKind::Uptime), 1);
    assert_eq!(recorder.count(EventKind::FreeDisk), 0);
    assert!(recorder.of(EventKind::Regular)[0].get("disks").is_none());
}

#[tokio::test]
async fn test_host_failure_emits_nothing() {
    let host = FakeHost::new();
    host.fail_host.store(true, Ordering::SeqCst);
    let (mut engine, recorder) = engine_with(&host);

    let err = engine.run_cycle().await.unwrap_err();

    assert!(matches!(err, MonitorError::CollectionFailed(_)));
    assert!(err.is_collection_error());
    assert!(recorder.kinds().is_empty());
}

#[tokio::test]
async fn test_silent_suppresses_regular_only() {
    let host = FakeHost::new();
    let (mut engine, recorder) = engine_with(&host);
    engine
        .configure(&json!({"silent": true, "threshold": {"freemem": 600}}))
        .unwrap();
    recorder.clear();

    engine.run_cycle().await.unwrap();

    assert_eq!(recorder.kinds(), vec![EventKind::FreeMem]);
}

#[tokio::test]
async fn test_failing_listener_does_not_stop_the_cycle() {
    let host = FakeHost::new();
    let (mut engine, recorder) = engine_with(&host);
    engine.on(EventKind::Regular, |_| bail!("subscriber exploded"));
    engine
        .configure(&json!({"threshold": {"freemem": 600}}))
        .unwrap();
    recorder.clear();

    let report = engine.run_cycle().await.unwrap();

    assert_eq!(report.listener_errors.len(), 1);
    match &report.listener_errors[0] {
        MonitorError::ListenerError { kind, message } => {
            assert_eq!(kind, "regular");
            assert!(message.contains("subscriber exploded"));
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(report.emitted, vec![EventKind::FreeMem]);
    assert_eq!(recorder.kinds(), vec![EventKind::Regular, EventKind::FreeMem]);
}

#[test]
fn test_failing_listener_is_reported_to_caller() {
    let host = FakeHost::new();
    let (mut engine, _) = engine_with(&host);
    engine.on(EventKind::Start, |_| bail!("no"));

    let err = engine.start(None).unwrap_err();

    assert!(matches!(err, MonitorError::ListenerError { .. }));
    assert!(engine.is_running());
}

#[test]
fn test_configure_while_running_keeps_running() {
    let host = FakeHost::new();
    let (mut engine, recorder) = engine_with(&host);

    engine.start(None).unwrap();
    let config = engine.configure(&json!({"interval": 100})).unwrap();

    assert_eq!(config.interval_ms, 100);
    assert!(engine.is_running());
    assert_eq!(recorder.kinds(), vec![EventKind::Start, EventKind::Config]);
}

#[test]
fn test_reset_while_stopped_stays_stopped() {
    let host = FakeHost::new();
    let (mut engine, recorder) = engine_with(&host);

    engine.configure(&json!({"interval": 100})).unwrap();
    engine.reset().unwrap();

    assert_eq!(engine.state(), EngineState::Stopped);
    assert_eq!(
        recorder.kinds(),
        vec![EventKind::Config, EventKind::Reset, EventKind::Config]
    );
}

#[tokio::test]
async fn test_processes_rejects_unknown_sort_key() {
    let host = FakeHost::new();
    let (engine, _) = engine_with(&host);

    let err = engine.processes("colour", 5, false).await.unwrap_err();

    assert!(matches!(err, MonitorError::InvalidArgument(_)));
}
