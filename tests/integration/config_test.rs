use hostmon::core::config::{validate, Config, Limit, DEFAULT_INTERVAL_MS};
use hostmon::core::system_monitor::EventKind;
use hostmon::MonitorError;
use serde_json::json;

use super::support::{engine_with, FakeHost};

fn rejected(options: serde_json::Value) -> MonitorError {
    validate(&options).expect_err("options should be rejected")
}

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.interval_ms, DEFAULT_INTERVAL_MS);
    assert!(!config.silent);
    assert_eq!(config.thresholds.uptime, 0);
}

#[test]
fn test_non_numeric_interval_is_rejected() {
    for bad in [json!(true), json!([1]), json!({"ms": 1}), json!("soon"), json!(-5)] {
        let err = rejected(json!({ "interval": bad }));
        assert!(err.is_configuration_error(), "{:?} should be a configuration error", err);
    }
}

#[test]
fn test_options_must_be_a_record() {
    assert!(matches!(rejected(json!([1, 2])), MonitorError::InvalidType(_)));
    assert!(matches!(rejected(json!(500)), MonitorError::InvalidType(_)));
}

#[test]
fn test_delay_is_an_interval_alias() {
    let patch = validate(&json!({"delay": 250})).unwrap();
    assert_eq!(patch.interval_ms, Some(250));
}

#[test]
fn test_loadavg_shapes() {
    let scalar = validate(&json!({"threshold": {"loadavg": 2}})).unwrap();
    assert_eq!(scalar.thresholds.unwrap().loadavg, Some([2.0, 2.0, 2.0]));

    let triple = validate(&json!({"threshold": {"loadavg": [1, 2.5, 3]}})).unwrap();
    assert_eq!(triple.thresholds.unwrap().loadavg, Some([1.0, 2.5, 3.0]));

    for bad in [json!([1, 2]), json!([1, 2, 3, 4]), json!([1, "x", 3]), json!("high")] {
        assert!(rejected(json!({"threshold": {"loadavg": bad}})).is_configuration_error());
    }
}

#[test]
fn test_limits_below_one_are_fractions() {
    assert_eq!(Limit::from_number(0.25), Limit::Fraction(0.25));
    assert_eq!(Limit::from_number(512.0), Limit::Absolute(512.0));
    assert_eq!(Limit::Fraction(0.5).resolve(1000.0), 500.0);
    assert_eq!(Limit::Absolute(600.0).resolve(1000.0), 600.0);
}

#[test]
fn test_unknown_threshold_keeps_existing_values() {
    let host = FakeHost::new();
    let (mut engine, _) = engine_with(&host);

    engine.configure(&json!({"threshold": {"uptime": 50}})).unwrap();
    engine.start(Some(&json!({"threshold": {"test": "x"}}))).unwrap();

    let config = engine.config();
    assert_eq!(config.thresholds.uptime, 50);
    assert_eq!(config.thresholds.extra["test"], json!("x"));
}

#[test]
fn test_config_event_carries_delta_and_merged_fields() {
    let host = FakeHost::new();
    let (mut engine, recorder) = engine_with(&host);

    engine.configure(&json!({"silent": true})).unwrap();

    let events = recorder.of(EventKind::Config);
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.get("type"), Some(&json!("config")));
    assert_eq!(event.get("options"), Some(&json!({"silent": true})));
    assert_eq!(event.get("silent"), Some(&json!(true)));
    assert_eq!(event.get("interval"), Some(&json!(DEFAULT_INTERVAL_MS)));
}

#[test]
fn test_failed_configure_changes_nothing() {
    let host = FakeHost::new();
    let (mut engine, recorder) = engine_with(&host);
    let before = engine.config();

    let err = engine
        .configure(&json!({"silent": true, "threshold": {"freemem": "lots"}}))
        .unwrap_err();

    assert!(err.is_configuration_error());
    assert_eq!(*engine.config(), *before);
    assert!(recorder.kinds().is_empty());
}
