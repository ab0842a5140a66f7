use std::fmt::Write;

use serde::Serialize;

use crate::analysis::StopRun;
use crate::config::Config;
use crate::model::{MoveEvent, RatioWindowSummary};
use crate::session::{SessionOutcome, SessionReport};
use crate::stats::{mean, percentile, sorted};

const RULE_WIDE: usize = 90;
const RULE_NARROW: usize = 70;

#[derive(Debug, Clone, Serialize)]
pub struct MoveSummary {
    pub symbol: String,
    pub leverage: f64,
    pub count: usize,
    pub achieved_p10: f64,
    pub achieved_p50: f64,
    pub achieved_p90: f64,
    /// Cumulative `(bucket_ms, events caught up within bucket)`.
    pub catchup_within: Vec<(u64, usize)>,
    pub never_caught_up: usize,
    /// Lowest achieved percentage first.
    pub worst: Vec<MoveEvent>,
}

pub fn summarize_moves(
    symbol: &str,
    leverage: f64,
    events: &[MoveEvent],
    worst_n: usize,
    buckets_ms: &[u64],
) -> Option<MoveSummary> {
    if events.is_empty() {
        return None;
    }
    let achieved = sorted(events.iter().map(|e| e.achieved_pct).collect());
    let catchup_within = buckets_ms
        .iter()
        .map(|&bucket| {
            let n = events
                .iter()
                .filter(|e| e.catchup_offset_ms.is_some_and(|o| o <= bucket))
                .count();
            (bucket, n)
        })
        .collect();
    let never_caught_up = events
        .iter()
        .filter(|e| e.catchup_offset_ms.is_none())
        .count();

    let mut worst = events.to_vec();
    worst.sort_by(|a, b| a.achieved_pct.total_cmp(&b.achieved_pct));
    worst.truncate(worst_n);

    Some(MoveSummary {
        symbol: symbol.to_string(),
        leverage,
        count: events.len(),
        achieved_p10: percentile(&achieved, 10.0),
        achieved_p50: percentile(&achieved, 50.0),
        achieved_p90: percentile(&achieved, 90.0),
        catchup_within,
        never_caught_up,
        worst,
    })
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct StopSummary {
    pub threshold_pct: f64,
    pub expected: f64,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

pub fn summarize_stops(run: &StopRun) -> Option<StopSummary> {
    let ratios = sorted(run.events.iter().map(|e| e.ratio).collect());
    let first = *ratios.first()?;
    let last = *ratios.last()?;
    Some(StopSummary {
        threshold_pct: run.threshold_pct,
        expected: run.leverage,
        count: ratios.len(),
        mean: mean(&ratios)?,
        median: percentile(&ratios, 50.0),
        min: first,
        max: last,
    })
}

fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

fn format_offset(offset_ms: Option<u64>, horizon_ms: u64) -> String {
    match offset_ms {
        Some(ms) => format!("{}ms", ms),
        None => format!(">{}s", horizon_ms / 1_000),
    }
}

fn bucket_label(bucket_ms: u64) -> String {
    if bucket_ms == 0 {
        "Immediate (0ms)".to_string()
    } else if bucket_ms % 1_000 == 0 {
        format!("Within {}s", bucket_ms / 1_000)
    } else {
        format!("Within {}ms", bucket_ms)
    }
}

pub fn render_header() -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", "=".repeat(RULE_WIDE));
    let _ = writeln!(out, "ETF PRICE RESPONSE LAG ANALYSIS");
    let _ = writeln!(
        out,
        "When the reference makes a directional move, how long until the leveraged products follow?"
    );
    let _ = writeln!(out, "{}", "=".repeat(RULE_WIDE));
    out
}

pub fn render_session(outcome: &SessionOutcome, config: &Config) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", "-".repeat(RULE_NARROW));
    let _ = writeln!(out, "DATE: {}", outcome.date());
    let _ = writeln!(out, "{}", "-".repeat(RULE_NARROW));

    match outcome {
        SessionOutcome::Skipped { reason, .. } => {
            let _ = writeln!(out, "  SKIP: {}", reason);
        }
        SessionOutcome::Completed(report) => render_report(&mut out, report, config),
    }
    out
}

fn render_report(out: &mut String, report: &SessionReport, config: &Config) {
    let counts: Vec<String> = report
        .tick_counts
        .iter()
        .map(|(s, n)| format!("{}={}", s, n))
        .collect();
    let _ = writeln!(out, "  Ticks: {}", counts.join("  "));
    let _ = writeln!(out);

    let _ = writeln!(
        out,
        "  [1/3] Rolling leverage ratio ({} move vs derived move over the same window)",
        report.reference_symbol
    );
    let mut windows: Vec<u64> = report.ratio_windows.iter().map(|w| w.window_ms).collect();
    windows.dedup();
    for window_ms in windows {
        let row: Vec<&RatioWindowSummary> = report
            .ratio_windows
            .iter()
            .filter(|w| w.window_ms == window_ms)
            .collect();
        let _ = writeln!(out, "{}", render_ratio_row(window_ms, &row, &report.reference_symbol));
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "  [2/3] Price response lag: {} moves >{}% over {}s",
        report.reference_symbol,
        config.lag.move_threshold_pct,
        config.lag.detection_window / 1_000
    );
    let horizon = config.lag.offsets.last().copied().unwrap_or(0);
    for d in &report.derived {
        match summarize_moves(
            &d.symbol,
            d.leverage,
            &d.move_events,
            config.report.worst_n,
            &config.report.catchup_buckets,
        ) {
            Some(summary) => render_moves(out, &summary, config.lag.catchup_pct, horizon),
            None => {
                let _ = writeln!(out, "    {}: no moves detected above threshold", d.symbol);
            }
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "  [3/3] Stop-trigger scenario: {} drawdown from recent high vs derived drawdown",
        report.reference_symbol
    );
    for d in &report.derived {
        if d.leverage <= 0.0 {
            let _ = writeln!(
                out,
                "    {} ({:+}x): not simulated, inverse products rise on a {} drawdown",
                d.symbol, d.leverage, report.reference_symbol
            );
            continue;
        }
        for run in &d.stop_runs {
            match summarize_stops(run) {
                Some(s) => {
                    let _ = writeln!(
                        out,
                        "    {} stop at {}% (n={}): drop ratio mean={} median={} [min={}, max={}] expected ~{}",
                        d.symbol,
                        s.threshold_pct,
                        s.count,
                        round_to(s.mean, 3),
                        round_to(s.median, 3),
                        round_to(s.min, 3),
                        round_to(s.max, 3),
                        s.expected
                    );
                }
                None => {
                    let _ = writeln!(
                        out,
                        "    {} stop at {}%: no trigger events",
                        d.symbol, run.threshold_pct
                    );
                }
            }
        }
    }

    for failure in &report.failures {
        let _ = writeln!(
            out,
            "  ERROR [{}{}]: {}",
            failure.component.as_str(),
            failure
                .derived_symbol
                .as_deref()
                .map(|s| format!(" {}", s))
                .unwrap_or_default(),
            failure.error
        );
    }
    let _ = writeln!(out);
}

fn render_ratio_row(window_ms: u64, row: &[&RatioWindowSummary], reference: &str) -> String {
    let secs = window_ms / 1_000;
    let accepted = row.first().map_or(0, |w| w.accepted);
    let cells: Option<Vec<String>> = row
        .iter()
        .map(|w| {
            w.stats.map(|s| {
                format!(
                    "{}/{} med={:7.3} [p10={:7.3} p90={:7.3}] MAE={:5.3}",
                    w.derived_symbol,
                    reference,
                    round_to(s.median, 3),
                    round_to(s.p10, 3),
                    round_to(s.p90, 3),
                    round_to(s.mae, 3)
                )
            })
        })
        .collect();
    match cells {
        Some(cells) if !cells.is_empty() => {
            format!("    {:3}s window (n={:4}):  {}", secs, accepted, cells.join("  |  "))
        }
        _ => format!("    {:3}s window: insufficient data points ({})", secs, accepted),
    }
}

fn render_moves(out: &mut String, s: &MoveSummary, catchup_pct: f64, horizon_ms: u64) {
    let _ = writeln!(
        out,
        "    {} ({:+}x): moves={}  achieved at move end median={}% [p10={}%  p90={}%]",
        s.symbol,
        s.leverage,
        s.count,
        round_to(s.achieved_p50, 1),
        round_to(s.achieved_p10, 1),
        round_to(s.achieved_p90, 1)
    );
    let _ = writeln!(out, "      catch-up to {}% of expected:", catchup_pct);
    for (bucket, n) in &s.catchup_within {
        let _ = writeln!(out, "        {:<16} {} / {}", bucket_label(*bucket), n, s.count);
    }
    let _ = writeln!(
        out,
        "        {:<16} {} / {}",
        format!("Never (>{}s)", horizon_ms / 1_000),
        s.never_caught_up,
        s.count
    );

    let _ = writeln!(out, "      worst underperformance (lowest achieved at move end):");
    let _ = writeln!(
        out,
        "        {:>6} {:>10} {:>10} {:>10} {:>10} {:>10}",
        "Dir", "Ref%", "Exp%", "Act%", "Achieved%", "CatchUp"
    );
    for e in &s.worst {
        let _ = writeln!(
            out,
            "        {:>6} {:>10.4} {:>10.4} {:>10.4} {:>10.1} {:>10}",
            e.direction.as_str(),
            e.reference_move_pct,
            e.expected_derived_pct,
            e.derived_pct_at_move_end,
            e.achieved_pct,
            format_offset(e.catchup_offset_ms, horizon_ms)
        );
    }
}

pub fn render_run_footer(completed: usize, skipped: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", "=".repeat(RULE_WIDE));
    let _ = writeln!(out, "SESSIONS: {} analysed, {} skipped", completed, skipped);
    let _ = writeln!(out, "{}", "=".repeat(RULE_WIDE));
    let _ = writeln!(
        out,
        "Achieved % near 100 at move end means the derived product responds instantly;"
    );
    let _ = writeln!(
        out,
        "a median below 90 means a measurable response lag. Stop ratios far from the"
    );
    let _ = writeln!(
        out,
        "leverage (e.g. <2.5 or >3.5 for 3x) argue for stops on the derived product itself."
    );
    out
}
