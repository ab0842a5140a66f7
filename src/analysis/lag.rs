use crate::analysis::GapGuard;
use crate::error::AnalysisError;
use crate::model::{Direction, LeveragedSeries, MoveEvent, ResponsePoint, Tick, TickSeries};
use crate::stats::{percent_change, sample_stride};

#[derive(Debug, Clone)]
pub struct MoveLagConfig {
    pub detection_window_ms: u64,
    pub gap_tolerance: f64,
    pub move_threshold_pct: f64,
    /// Ascending offsets measured from the end of the detection window.
    pub offsets_ms: Vec<u64>,
    /// Achieved percentage that counts as caught up.
    pub catchup_pct: f64,
    pub max_samples: usize,
}

impl Default for MoveLagConfig {
    fn default() -> Self {
        Self {
            detection_window_ms: 10_000,
            gap_tolerance: 0.5,
            move_threshold_pct: 0.03,
            offsets_ms: vec![0, 1_000, 2_000, 5_000, 10_000, 20_000, 30_000],
            catchup_pct: 90.0,
            max_samples: 1_000,
        }
    }
}

/// A reference move that passed detection, before any derived series is
/// measured against it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceMove {
    pub start: Tick,
    pub end: Tick,
    pub move_pct: f64,
}

impl ReferenceMove {
    pub fn direction(&self) -> Direction {
        Direction::of(self.move_pct)
    }
}

/// Detects reference moves over a fixed window and measures how far each
/// derived series has followed at a ladder of forward offsets.
#[derive(Debug, Clone)]
pub struct MoveLagDetector {
    cfg: MoveLagConfig,
    guard: GapGuard,
}

impl MoveLagDetector {
    pub fn new(cfg: MoveLagConfig) -> Self {
        let guard = GapGuard::new(cfg.gap_tolerance);
        Self { cfg, guard }
    }

    pub fn config(&self) -> &MoveLagConfig {
        &self.cfg
    }

    /// Reference moves above threshold, one candidate per stride-sampled tick.
    pub fn detect_moves(&self, reference: &TickSeries) -> Vec<ReferenceMove> {
        let stride = sample_stride(reference.len(), self.cfg.max_samples);
        reference
            .ticks()
            .iter()
            .step_by(stride)
            .filter_map(|start| self.detect_at(reference, *start))
            .collect()
    }

    fn detect_at(&self, reference: &TickSeries, start: Tick) -> Option<ReferenceMove> {
        let window = self.cfg.detection_window_ms;
        let end = reference.nearest(start.timestamp_ms + window as i64);
        if !self
            .guard
            .accepts(window, end.timestamp_ms - start.timestamp_ms)
        {
            return None;
        }
        let move_pct = percent_change(start.price, end.price).ok()?;
        if move_pct == 0.0 || move_pct.abs() < self.cfg.move_threshold_pct {
            return None;
        }
        Some(ReferenceMove {
            start,
            end,
            move_pct,
        })
    }

    /// Response of one derived series to one detected move.
    ///
    /// The ladder is anchored at the nominal end of the detection window
    /// (`start + window`), while percentage changes are measured from the
    /// derived tick nearest the move start.
    pub fn measure(
        &self,
        mv: &ReferenceMove,
        derived: &LeveragedSeries<'_>,
    ) -> Result<MoveEvent, AnalysisError> {
        let expected = mv.move_pct * derived.leverage;
        let anchor = derived.series.nearest(mv.start.timestamp_ms);
        let move_end_ms = mv.start.timestamp_ms + self.cfg.detection_window_ms as i64;

        let at_end = percent_change(anchor.price, derived.series.nearest(move_end_ms).price)?;

        let mut response = Vec::with_capacity(self.cfg.offsets_ms.len());
        for &offset_ms in &self.cfg.offsets_ms {
            let check = derived.series.nearest(move_end_ms + offset_ms as i64);
            let derived_pct = percent_change(anchor.price, check.price)?;
            response.push(ResponsePoint {
                offset_ms,
                derived_pct,
                achieved_pct: achieved_pct(derived_pct, expected),
            });
        }

        let catchup_offset_ms = response
            .iter()
            .find(|p| p.achieved_pct >= self.cfg.catchup_pct)
            .map(|p| p.offset_ms);

        Ok(MoveEvent {
            derived_symbol: derived.symbol().to_string(),
            started_at_ms: mv.start.timestamp_ms,
            completed_at_ms: mv.end.timestamp_ms,
            direction: mv.direction(),
            reference_move_pct: mv.move_pct,
            expected_derived_pct: expected,
            derived_pct_at_move_end: at_end,
            achieved_pct: achieved_pct(at_end, expected),
            catchup_offset_ms,
            response,
        })
    }

    /// All events for one derived series. An event that cannot be measured is
    /// skipped without aborting the scan.
    pub fn run(&self, reference: &TickSeries, derived: &LeveragedSeries<'_>) -> Vec<MoveEvent> {
        let moves = self.detect_moves(reference);
        let mut events = Vec::with_capacity(moves.len());
        for mv in &moves {
            match self.measure(mv, derived) {
                Ok(event) => events.push(event),
                Err(e) => {
                    tracing::debug!(
                        symbol = %derived.symbol(),
                        started_at_ms = mv.start.timestamp_ms,
                        error = %e,
                        "skipping move event"
                    );
                }
            }
        }
        tracing::debug!(
            symbol = %derived.symbol(),
            moves = moves.len(),
            events = events.len(),
            "move lag scan finished"
        );
        events
    }
}

/// Actual response as a percentage of the expected one; a zero expectation
/// counts as fully achieved.
pub fn achieved_pct(actual_pct: f64, expected_pct: f64) -> f64 {
    if expected_pct == 0.0 {
        100.0
    } else {
        actual_pct / expected_pct * 100.0
    }
}
