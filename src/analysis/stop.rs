use serde::Serialize;

use crate::error::AnalysisError;
use crate::model::{LeveragedSeries, StopTriggerEvent, TickSeries};
use crate::stats::sample_stride;

#[derive(Debug, Clone)]
pub struct StopTriggerConfig {
    pub thresholds_pct: Vec<f64>,
    /// Width of the trigger band above each threshold, in percent.
    pub band_width_pct: f64,
    pub cooldown_ms: u64,
    pub max_samples: usize,
}

impl Default for StopTriggerConfig {
    fn default() -> Self {
        Self {
            thresholds_pct: vec![0.2, 0.5],
            band_width_pct: 0.05,
            cooldown_ms: 60_000,
            max_samples: 3_000,
        }
    }
}

/// Trailing-stop bookkeeping for one (threshold, derived series) run.
#[derive(Debug, Clone, PartialEq)]
pub struct StopState {
    pub reference_hwm: f64,
    pub derived_hwm: f64,
    pub last_trigger_ms: Option<i64>,
}

impl StopState {
    pub fn new(reference_price: f64, derived_price: f64) -> Self {
        Self {
            reference_hwm: reference_price,
            derived_hwm: derived_price,
            last_trigger_ms: None,
        }
    }

    /// Raise each high-water mark to its own series' price; the two marks move
    /// independently.
    pub fn observe(&mut self, reference_price: f64, derived_price: f64) {
        if reference_price > self.reference_hwm {
            self.reference_hwm = reference_price;
        }
        if derived_price > self.derived_hwm {
            self.derived_hwm = derived_price;
        }
    }

    /// Drawdown from the reference mark, `None` if the mark is not positive.
    pub fn reference_drawdown_pct(&self, price: f64) -> Option<f64> {
        drawdown_pct(self.reference_hwm, price)
    }

    pub fn derived_drawdown_pct(&self, price: f64) -> Option<f64> {
        drawdown_pct(self.derived_hwm, price)
    }

    pub fn cooled_down(&self, now_ms: i64, cooldown_ms: u64) -> bool {
        match self.last_trigger_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= cooldown_ms as i64,
        }
    }

    /// Restart both marks from the current prices after a trigger.
    pub fn reset(&mut self, reference_price: f64, derived_price: f64, now_ms: i64) {
        self.reference_hwm = reference_price;
        self.derived_hwm = derived_price;
        self.last_trigger_ms = Some(now_ms);
    }
}

fn drawdown_pct(hwm: f64, price: f64) -> Option<f64> {
    (hwm > 0.0).then(|| (hwm - price) / hwm * 100.0)
}

#[derive(Debug, Clone, Serialize)]
pub struct StopRun {
    pub threshold_pct: f64,
    pub derived_symbol: String,
    pub leverage: f64,
    pub events: Vec<StopTriggerEvent>,
}

/// Replays a trailing stop on the reference and records how far the derived
/// series had fallen from its own high when the stop would have fired.
#[derive(Debug, Clone)]
pub struct StopTriggerSimulator {
    cfg: StopTriggerConfig,
}

impl StopTriggerSimulator {
    pub fn new(cfg: StopTriggerConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &StopTriggerConfig {
        &self.cfg
    }

    pub fn simulate(
        &self,
        reference: &TickSeries,
        derived: &LeveragedSeries<'_>,
        threshold_pct: f64,
    ) -> Result<Vec<StopTriggerEvent>, AnalysisError> {
        let mut state = StopState::new(reference.first().price, derived.series.first().price);
        let upper = threshold_pct + self.cfg.band_width_pct;
        let stride = sample_stride(reference.len(), self.cfg.max_samples);
        let mut events = Vec::new();

        for tick in reference.ticks().iter().skip(1).step_by(stride) {
            let aligned = derived.series.nearest(tick.timestamp_ms);
            state.observe(tick.price, aligned.price);

            let reference_dd = state.reference_drawdown_pct(tick.price).ok_or_else(|| {
                AnalysisError::NonPositiveHighWaterMark {
                    symbol: reference.symbol().to_string(),
                    hwm: state.reference_hwm,
                }
            })?;
            if reference_dd < threshold_pct || reference_dd >= upper {
                continue;
            }
            if !state.cooled_down(tick.timestamp_ms, self.cfg.cooldown_ms) {
                continue;
            }

            let derived_dd = state.derived_drawdown_pct(aligned.price).ok_or_else(|| {
                AnalysisError::NonPositiveHighWaterMark {
                    symbol: derived.symbol().to_string(),
                    hwm: state.derived_hwm,
                }
            })?;

            tracing::trace!(
                symbol = %derived.symbol(),
                threshold_pct,
                timestamp_ms = tick.timestamp_ms,
                reference_dd,
                derived_dd,
                "stop trigger"
            );
            events.push(StopTriggerEvent {
                derived_symbol: derived.symbol().to_string(),
                threshold_pct,
                timestamp_ms: tick.timestamp_ms,
                reference_drawdown_pct: reference_dd,
                derived_drawdown_pct: derived_dd,
                ratio: derived_dd / reference_dd,
                tick_gap_ms: aligned.distance_ms(tick.timestamp_ms),
            });
            state.reset(tick.price, aligned.price, tick.timestamp_ms);
        }

        Ok(events)
    }

    /// One run per configured threshold, each with fresh state. Inverse
    /// products rise while the reference draws down, so they get no runs.
    pub fn run(
        &self,
        reference: &TickSeries,
        derived: &LeveragedSeries<'_>,
    ) -> Result<Vec<StopRun>, AnalysisError> {
        if !derived.is_long() {
            tracing::debug!(
                symbol = %derived.symbol(),
                leverage = derived.leverage,
                "stop scenario skipped for inverse product"
            );
            return Ok(Vec::new());
        }
        self.cfg
            .thresholds_pct
            .iter()
            .map(|&threshold_pct| {
                Ok(StopRun {
                    threshold_pct,
                    derived_symbol: derived.symbol().to_string(),
                    leverage: derived.leverage,
                    events: self.simulate(reference, derived, threshold_pct)?,
                })
            })
            .collect()
    }
}
