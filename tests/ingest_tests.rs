use std::fs;
use std::path::Path;

use chrono::{NaiveDate, NaiveTime};
use leverage_lag::config::Config;
use leverage_lag::ingest::{
    load_session_series, load_ticks_csv, parse_timestamp_ms, tick_file_path, CsvColumns,
    MarketHours,
};
use leverage_lag::model::{Tick, TickSeries};
use leverage_lag::session::{run_session, SessionAnalyzer, SessionOutcome};

fn market_hours() -> MarketHours {
    MarketHours {
        open: NaiveTime::from_hms_opt(14, 30, 0).unwrap(),
        close: NaiveTime::from_hms_opt(21, 0, 0).unwrap(),
    }
}

/// `count` one-second ticks starting at 14:30:00 UTC on 2026-02-09, plus one
/// pre-market tick.
fn write_session_csv(dir: &Path, symbol: &str, factor: f64, count: i64) {
    let mut body = String::from("timestamp,symbol,price,size\n");
    body.push_str(&format!("2026-02-09 14:29:00.000,{},1.0,1\n", symbol));
    for s in 0..count {
        let minute = 30 + s / 60;
        let second = s % 60;
        let price = 100.0 * factor.powi((s / 120) as i32);
        body.push_str(&format!(
            "2026-02-09 14:{:02}:{:02}.000,{},{},100\n",
            minute, second, symbol, price
        ));
    }
    let path = tick_file_path(dir, "{date}_market_data_{symbol}.csv", "20260209", symbol);
    fs::write(path, body).unwrap();
}

#[test]
fn parses_iso_timestamps() {
    let utc = parse_timestamp_ms("2026-02-09T14:30:00+00:00").unwrap();
    assert_eq!(parse_timestamp_ms("2026-02-09T14:30:00Z").unwrap(), utc);
    assert_eq!(parse_timestamp_ms("2026-02-09 14:30:00").unwrap(), utc);
    assert_eq!(parse_timestamp_ms("2026-02-09T09:30:00-05:00").unwrap(), utc);
    assert_eq!(
        parse_timestamp_ms("2026-02-09 14:30:00.250").unwrap(),
        utc + 250
    );
    assert!(parse_timestamp_ms("yesterday").is_err());
}

#[test]
fn loads_and_sorts_csv_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ticks.csv");
    fs::write(
        &path,
        "timestamp,symbol,price\n\
         2026-02-09T14:30:02+00:00,QQQ,101.5\n\
         2026-02-09T14:30:00+00:00,QQQ,100.0\n\
         2026-02-09T14:30:01+00:00,QQQ,100.5\n",
    )
    .unwrap();

    let ticks = load_ticks_csv(&path, CsvColumns::default()).unwrap();
    let prices: Vec<f64> = ticks.iter().map(|t| t.price).collect();
    assert_eq!(prices, vec![100.0, 100.5, 101.5]);
    assert_eq!(ticks[1].timestamp_ms - ticks[0].timestamp_ms, 1_000);
}

#[test]
fn malformed_price_reports_row() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.csv");
    fs::write(
        &path,
        "timestamp,symbol,price\n2026-02-09T14:30:00Z,QQQ,abc\n",
    )
    .unwrap();

    let err = load_ticks_csv(&path, CsvColumns::default()).unwrap_err();
    assert!(format!("{:#}", err).contains("row 2"), "{:#}", err);
}

#[test]
fn market_hours_window_is_inclusive() {
    let date = NaiveDate::from_ymd_opt(2026, 2, 9).unwrap();
    let hours = market_hours();
    let (open, close) = hours.window_ms(date);
    assert_eq!(close - open, 6 * 3_600_000 + 30 * 60_000);

    let series = TickSeries::new(
        "QQQ",
        vec![
            Tick::new(open - 1, 1.0),
            Tick::new(open, 2.0),
            Tick::new(close, 3.0),
            Tick::new(close + 1, 4.0),
        ],
    )
    .unwrap();
    let cut = hours.restrict(&series, date).unwrap();
    assert_eq!(cut.len(), 2);
    assert_eq!(cut.first().price, 2.0);
    assert_eq!(cut.last().price, 3.0);
}

#[test]
fn missing_file_skips_session() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.data.dir = dir.path().to_path_buf();
    let analyzer = SessionAnalyzer::from_config(&config);

    match run_session(&config, &analyzer, "20260209") {
        SessionOutcome::Skipped { reason, .. } => {
            assert!(reason.contains("missing data"), "reason={}", reason)
        }
        SessionOutcome::Completed(_) => panic!("expected skip"),
    }
}

#[test]
fn bad_date_skips_session() {
    let config = Config::default();
    let analyzer = SessionAnalyzer::from_config(&config);
    assert!(matches!(
        run_session(&config, &analyzer, "2026-02-09"),
        SessionOutcome::Skipped { .. }
    ));
}

#[test]
fn csv_session_runs_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    write_session_csv(dir.path(), "QQQ", 1.01, 600);
    write_session_csv(dir.path(), "TQQQ", 1.03, 600);
    write_session_csv(dir.path(), "SQQQ", 0.97, 600);

    let mut config = Config::default();
    config.data.dir = dir.path().to_path_buf();
    let analyzer = SessionAnalyzer::from_config(&config);

    let report = match run_session(&config, &analyzer, "20260209") {
        SessionOutcome::Completed(report) => report,
        SessionOutcome::Skipped { reason, .. } => panic!("unexpected skip: {}", reason),
    };
    // The pre-market row is dropped.
    assert_eq!(report.tick_counts[0], ("QQQ".to_string(), 600));
    assert_eq!(report.derived.len(), 2);
    assert!(report
        .derived
        .iter()
        .all(|d| !d.move_events.is_empty()));
}

#[test]
fn bad_prints_outside_market_hours_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ticks.csv");
    fs::write(
        &path,
        "timestamp,symbol,price\n\
         2026-02-09 13:00:00,QQQ,0\n\
         2026-02-09 14:30:00,QQQ,100.0\n\
         2026-02-09 14:30:01,QQQ,100.5\n\
         2026-02-09 22:00:00,QQQ,-1\n",
    )
    .unwrap();
    let date = NaiveDate::from_ymd_opt(2026, 2, 9).unwrap();

    let series = load_session_series(&path, "QQQ", CsvColumns::default(), market_hours(), date)
        .unwrap()
        .unwrap();
    assert_eq!(series.len(), 2);
    assert_eq!(series.first().price, 100.0);
    assert_eq!(series.last().price, 100.5);
}

#[test]
fn bad_print_inside_market_hours_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ticks.csv");
    fs::write(
        &path,
        "timestamp,symbol,price\n\
         2026-02-09 14:30:00,QQQ,100.0\n\
         2026-02-09 14:30:01,QQQ,0\n",
    )
    .unwrap();
    let date = NaiveDate::from_ymd_opt(2026, 2, 9).unwrap();

    let err = load_session_series(&path, "QQQ", CsvColumns::default(), market_hours(), date)
        .unwrap_err();
    assert!(format!("{:#}", err).contains("invalid tick data"), "{:#}", err);
}

#[test]
fn no_ticks_in_market_hours_is_none() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ticks.csv");
    fs::write(&path, "timestamp,symbol,price\n2026-02-09 13:00:00,QQQ,100.0\n").unwrap();
    let date = NaiveDate::from_ymd_opt(2026, 2, 9).unwrap();

    let loaded =
        load_session_series(&path, "QQQ", CsvColumns::default(), market_hours(), date).unwrap();
    assert!(loaded.is_none());
}
