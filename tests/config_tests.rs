use chrono::NaiveTime;
use leverage_lag::config::{parse_duration_ms, Config};

#[test]
fn parse_default_toml() {
    let config: Config = toml::from_str(include_str!("../config/default.toml")).unwrap();
    config.validate().unwrap();

    assert_eq!(config.instruments.reference, "QQQ");
    assert_eq!(config.instruments.derived.len(), 2);
    assert_eq!(config.instruments.derived[1].symbol, "SQQQ");
    assert!((config.instruments.derived[1].leverage + 3.0).abs() < f64::EPSILON);
    assert_eq!(config.data.dates.len(), 5);
    assert_eq!(config.ratio.windows, vec![5_000, 10_000, 30_000, 60_000]);
    assert_eq!(
        config.lag.offsets,
        vec![0, 1_000, 2_000, 5_000, 10_000, 20_000, 30_000]
    );
    assert_eq!(config.lag.detection_window, 10_000);
    assert_eq!(config.stop.cooldown, 60_000);
    assert_eq!(
        config.session.open_utc,
        NaiveTime::from_hms_opt(14, 30, 0).unwrap()
    );
}

#[test]
fn partial_toml_falls_back_to_defaults() {
    let config: Config = toml::from_str(
        r#"
[lag]
move_threshold_pct = 0.05

[[instruments.derived]]
symbol = "SOXL"
leverage = 3.0
"#,
    )
    .unwrap();
    config.validate().unwrap();

    assert!((config.lag.move_threshold_pct - 0.05).abs() < f64::EPSILON);
    assert_eq!(config.lag.detection_window, 10_000);
    assert_eq!(config.instruments.reference, "QQQ");
    assert_eq!(config.instruments.derived.len(), 1);
    assert_eq!(config.stop.thresholds_pct, vec![0.2, 0.5]);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn detector_config_carries_values() {
    let config: Config = toml::from_str(
        r#"
[lag]
detection_window = "5s"
offsets = ["0s", "500ms", "3s"]
"#,
    )
    .unwrap();
    let lag = config.lag.detector_config();
    assert_eq!(lag.detection_window_ms, 5_000);
    assert_eq!(lag.offsets_ms, vec![0, 500, 3_000]);
}

#[test]
fn invalid_duration_is_a_parse_error() {
    let parsed: Result<Config, _> = toml::from_str(
        r#"
[stop]
cooldown = "sixty"
"#,
    );
    assert!(parsed.is_err());
}

#[test]
fn validate_rejects_bad_values() {
    let mut config = Config::default();
    config.lag.offsets = vec![0, 5_000, 1_000];
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.instruments.derived[0].leverage = 0.0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.stop.thresholds_pct = vec![0.2, -0.1];
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.ratio.windows = vec![5_000, 10_000, 5_000];
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.ratio.gap_tolerance = 1.5;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.data.dates = vec!["2026-02-09".to_string()];
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.session.close_utc = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn parse_duration_units() {
    assert_eq!(parse_duration_ms("750ms").unwrap(), 750);
    assert_eq!(parse_duration_ms("30s").unwrap(), 30_000);
    assert_eq!(parse_duration_ms("0s").unwrap(), 0);
    assert!(parse_duration_ms("1d").is_err());
}

#[test]
fn repeated_ratio_window_is_rejected_on_load() {
    let config: Config = toml::from_str(
        r#"
[ratio]
windows = ["5s", "10s", "5s"]
"#,
    )
    .unwrap();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("ratio.windows"), "{}", err);
}
