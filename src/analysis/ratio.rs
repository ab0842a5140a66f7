use crate::analysis::GapGuard;
use crate::error::AnalysisError;
use crate::model::{LeveragedSeries, RatioSample, RatioStats, RatioWindowSummary, TickSeries};
use crate::stats::{mean_abs_error, percent_change, percentile, sample_stride, sorted};

#[derive(Debug, Clone)]
pub struct RatioSamplerConfig {
    pub windows_ms: Vec<u64>,
    pub max_samples: usize,
    pub gap_tolerance: f64,
    /// Reference moves smaller than this (in percent) are skipped.
    pub noise_floor_pct: f64,
    pub min_samples: usize,
}

impl Default for RatioSamplerConfig {
    fn default() -> Self {
        Self {
            windows_ms: vec![5_000, 10_000, 30_000, 60_000],
            max_samples: 500,
            gap_tolerance: 0.5,
            noise_floor_pct: 0.005,
            min_samples: 11,
        }
    }
}

/// Samples derived/reference percentage-move ratios over fixed windows.
#[derive(Debug, Clone)]
pub struct RollingRatioSampler {
    cfg: RatioSamplerConfig,
    guard: GapGuard,
}

impl RollingRatioSampler {
    pub fn new(cfg: RatioSamplerConfig) -> Self {
        let guard = GapGuard::new(cfg.gap_tolerance);
        Self { cfg, guard }
    }

    pub fn config(&self) -> &RatioSamplerConfig {
        &self.cfg
    }

    /// Ratio samples for one window, one list per entry of `derived`.
    ///
    /// Acceptance depends only on the reference, so every derived list has the
    /// same length and anchors.
    pub fn sample_window(
        &self,
        reference: &TickSeries,
        derived: &[LeveragedSeries<'_>],
        window_ms: u64,
    ) -> Result<Vec<Vec<RatioSample>>, AnalysisError> {
        let mut out = vec![Vec::new(); derived.len()];
        let stride = sample_stride(reference.len(), self.cfg.max_samples);
        let offset = window_ms as i64;

        for start in reference.ticks().iter().step_by(stride) {
            let end = reference.nearest(start.timestamp_ms + offset);
            if !self
                .guard
                .accepts(window_ms, end.timestamp_ms - start.timestamp_ms)
            {
                continue;
            }

            let reference_pct = percent_change(start.price, end.price)?;
            if reference_pct.abs() < self.cfg.noise_floor_pct || reference_pct == 0.0 {
                continue;
            }

            for (samples, d) in out.iter_mut().zip(derived) {
                let d0 = d.series.nearest(start.timestamp_ms);
                let d1 = d.series.nearest(start.timestamp_ms + offset);
                let derived_pct = percent_change(d0.price, d1.price)?;
                samples.push(RatioSample {
                    window_ms,
                    anchor_ms: start.timestamp_ms,
                    derived_pct,
                    reference_pct,
                    ratio: derived_pct / reference_pct,
                });
            }
        }

        Ok(out)
    }

    pub fn summarize(
        &self,
        window_ms: u64,
        derived: &LeveragedSeries<'_>,
        samples: &[RatioSample],
    ) -> RatioWindowSummary {
        let ratios: Vec<f64> = samples.iter().map(|s| s.ratio).collect();
        let stats = if ratios.len() >= self.cfg.min_samples {
            let ascending = sorted(ratios.clone());
            Some(RatioStats {
                median: percentile(&ascending, 50.0),
                p10: percentile(&ascending, 10.0),
                p90: percentile(&ascending, 90.0),
                mae: mean_abs_error(&ratios, derived.leverage).unwrap_or(0.0),
            })
        } else {
            None
        };

        RatioWindowSummary {
            window_ms,
            derived_symbol: derived.symbol().to_string(),
            leverage: derived.leverage,
            accepted: ratios.len(),
            stats,
        }
    }

    /// Summaries for every configured window, ordered window-major.
    pub fn run(
        &self,
        reference: &TickSeries,
        derived: &[LeveragedSeries<'_>],
    ) -> Result<Vec<RatioWindowSummary>, AnalysisError> {
        let mut summaries = Vec::with_capacity(self.cfg.windows_ms.len() * derived.len());
        for &window_ms in &self.cfg.windows_ms {
            let per_series = self.sample_window(reference, derived, window_ms)?;
            for (d, samples) in derived.iter().zip(&per_series) {
                let summary = self.summarize(window_ms, d, samples);
                tracing::debug!(
                    window_ms,
                    symbol = %d.symbol(),
                    accepted = summary.accepted,
                    "ratio window sampled"
                );
                summaries.push(summary);
            }
        }
        Ok(summaries)
    }
}
