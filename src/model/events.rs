use serde::Serialize;

use crate::model::series::TickSeries;

/// A derived instrument paired with the signed multiple it is expected to
/// deliver on the reference's percentage moves (+3.0 long, -3.0 inverse).
#[derive(Debug, Clone, Copy)]
pub struct LeveragedSeries<'a> {
    pub series: &'a TickSeries,
    pub leverage: f64,
}

impl<'a> LeveragedSeries<'a> {
    pub fn new(series: &'a TickSeries, leverage: f64) -> Self {
        Self { series, leverage }
    }

    pub fn symbol(&self) -> &str {
        self.series.symbol()
    }

    pub fn is_long(&self) -> bool {
        self.leverage > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn of(pct: f64) -> Self {
        if pct > 0.0 {
            Direction::Up
        } else {
            Direction::Down
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "UP",
            Direction::Down => "DOWN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatioSample {
    pub window_ms: u64,
    pub anchor_ms: i64,
    pub derived_pct: f64,
    pub reference_pct: f64,
    pub ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatioStats {
    pub median: f64,
    pub p10: f64,
    pub p90: f64,
    /// Mean absolute distance of each ratio from the expected leverage.
    pub mae: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RatioWindowSummary {
    pub window_ms: u64,
    pub derived_symbol: String,
    pub leverage: f64,
    pub accepted: usize,
    /// `None` when fewer than the configured minimum samples were accepted.
    pub stats: Option<RatioStats>,
}

/// Derived response at one offset of the forward ladder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResponsePoint {
    pub offset_ms: u64,
    pub derived_pct: f64,
    pub achieved_pct: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MoveEvent {
    pub derived_symbol: String,
    pub started_at_ms: i64,
    /// Timestamp of the reference tick that closed the detection window.
    pub completed_at_ms: i64,
    pub direction: Direction,
    pub reference_move_pct: f64,
    pub expected_derived_pct: f64,
    pub derived_pct_at_move_end: f64,
    pub achieved_pct: f64,
    /// First ladder offset reaching the catch-up fraction; `None` if the
    /// derived series never got there within the ladder.
    pub catchup_offset_ms: Option<u64>,
    pub response: Vec<ResponsePoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StopTriggerEvent {
    pub derived_symbol: String,
    pub threshold_pct: f64,
    pub timestamp_ms: i64,
    pub reference_drawdown_pct: f64,
    pub derived_drawdown_pct: f64,
    pub ratio: f64,
    /// Distance between the reference tick and the derived tick used for it.
    pub tick_gap_ms: u64,
}
