use leverage_lag::analysis::{StopState, StopTriggerConfig, StopTriggerSimulator};
use leverage_lag::model::{LeveragedSeries, Tick, TickSeries};

const TICK_MS: i64 = 50;

/// Reference falls 0.001 per tick from 100 to 99 over 50s, then holds at 99
/// until `hold_until_ms`. The derived series moves three times as far.
fn falling_then_flat(hold_until_ms: i64) -> (TickSeries, TickSeries) {
    let mut reference = Vec::new();
    let mut derived = Vec::new();
    let mut i = 0i64;
    loop {
        let ts = i * TICK_MS;
        if ts > hold_until_ms.max(50_000) {
            break;
        }
        let step = i.min(1_000) as f64;
        reference.push(Tick::new(ts, 100.0 - 0.001 * step));
        derived.push(Tick::new(ts, 100.0 - 0.003 * step));
        i += 1;
    }
    (
        TickSeries::new("QQQ", reference).unwrap(),
        TickSeries::new("TQQQ", derived).unwrap(),
    )
}

fn simulator() -> StopTriggerSimulator {
    StopTriggerSimulator::new(StopTriggerConfig {
        thresholds_pct: vec![0.5],
        band_width_pct: 0.05,
        cooldown_ms: 60_000,
        max_samples: 100_000,
    })
}

#[test]
fn monotonic_drop_fires_exactly_once_inside_cooldown() {
    let (reference, derived) = falling_then_flat(50_000);
    let events = simulator()
        .simulate(&reference, &LeveragedSeries::new(&derived, 3.0), 0.5)
        .unwrap();

    assert_eq!(events.len(), 1);
    let e = &events[0];
    assert!(e.reference_drawdown_pct >= 0.5 && e.reference_drawdown_pct < 0.55);
    assert!(e.timestamp_ms >= 25_000 && e.timestamp_ms <= 25_100);
    assert!((e.ratio - 3.0).abs() < 0.05, "ratio={}", e.ratio);
    assert_eq!(e.tick_gap_ms, 0);
    assert_eq!(e.derived_symbol, "TQQQ");
}

#[test]
fn second_trigger_waits_for_cooldown() {
    let (reference, derived) = falling_then_flat(120_000);
    let events = simulator()
        .simulate(&reference, &LeveragedSeries::new(&derived, 3.0), 0.5)
        .unwrap();

    assert_eq!(events.len(), 2);
    assert_eq!(events[1].timestamp_ms - events[0].timestamp_ms, 60_000);
    assert!(events[1].reference_drawdown_pct >= 0.5);
    assert!(events[1].reference_drawdown_pct < 0.55);
}

#[test]
fn drawdown_beyond_band_does_not_fire() {
    // Gap down straight through the band.
    let ticks = vec![
        Tick::new(0, 100.0),
        Tick::new(1_000, 100.0),
        Tick::new(2_000, 99.0),
        Tick::new(3_000, 99.0),
    ];
    let reference = TickSeries::new("QQQ", ticks.clone()).unwrap();
    let derived = TickSeries::new("TQQQ", ticks).unwrap();
    let events = simulator()
        .simulate(&reference, &LeveragedSeries::new(&derived, 3.0), 0.5)
        .unwrap();
    assert!(events.is_empty());
}

#[test]
fn run_keeps_thresholds_independent() {
    let (reference, derived) = falling_then_flat(50_000);
    let sim = StopTriggerSimulator::new(StopTriggerConfig {
        thresholds_pct: vec![0.2, 0.5],
        band_width_pct: 0.05,
        cooldown_ms: 60_000,
        max_samples: 100_000,
    });
    let runs = sim
        .run(&reference, &LeveragedSeries::new(&derived, 3.0))
        .unwrap();

    assert_eq!(runs.len(), 2);
    assert!((runs[0].threshold_pct - 0.2).abs() < f64::EPSILON);
    assert!((runs[1].threshold_pct - 0.5).abs() < f64::EPSILON);
    assert_eq!(runs[0].events.len(), 1);
    assert_eq!(runs[1].events.len(), 1);
    assert!(runs[0].events[0].timestamp_ms < runs[1].events[0].timestamp_ms);
}

#[test]
fn drawdown_after_reset_is_zero() {
    let mut state = StopState::new(100.0, 100.0);
    state.observe(99.48, 98.44);
    let dd = state.reference_drawdown_pct(99.48).unwrap();
    assert!(dd >= 0.5 && dd < 0.55);

    state.reset(99.48, 98.44, 30_000);
    assert!(state.reference_drawdown_pct(99.48).unwrap().abs() < 1e-12);
    assert!(state.derived_drawdown_pct(98.44).unwrap().abs() < 1e-12);
    assert!(!state.cooled_down(30_001, 60_000));
}

#[test]
fn derived_mark_rises_on_its_own_highs() {
    let mut state = StopState::new(100.0, 50.0);
    state.observe(99.0, 55.0);
    assert_eq!(state.reference_hwm, 100.0);
    assert_eq!(state.derived_hwm, 55.0);
    let derived_dd = state.derived_drawdown_pct(49.5).unwrap();
    assert!((derived_dd - 10.0).abs() < 1e-9);
}

#[test]
fn inverse_product_has_no_stop_runs() {
    let (reference, _) = falling_then_flat(50_000);
    let inverse: Vec<Tick> = reference
        .ticks()
        .iter()
        .map(|t| Tick::new(t.timestamp_ms, 100.0 + 3.0 * (100.0 - t.price)))
        .collect();
    let inverse = TickSeries::new("SQQQ", inverse).unwrap();

    let runs = simulator()
        .run(&reference, &LeveragedSeries::new(&inverse, -3.0))
        .unwrap();
    assert!(runs.is_empty());
}
