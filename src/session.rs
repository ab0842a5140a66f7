use serde::Serialize;

use crate::analysis::{MoveLagDetector, RollingRatioSampler, StopRun, StopTriggerSimulator};
use crate::config::Config;
use crate::ingest::{load_session_series, parse_session_date, tick_file_path};
use crate::model::{LeveragedSeries, MoveEvent, RatioWindowSummary, TickSeries};

/// A derived instrument's session ticks with its expected leverage.
#[derive(Debug, Clone)]
pub struct InstrumentSeries {
    pub series: TickSeries,
    pub leverage: f64,
}

impl InstrumentSeries {
    pub fn new(series: TickSeries, leverage: f64) -> Self {
        Self { series, leverage }
    }

    pub fn as_leveraged(&self) -> LeveragedSeries<'_> {
        LeveragedSeries::new(&self.series, self.leverage)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    RollingRatio,
    MoveLag,
    StopTrigger,
}

impl Component {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RollingRatio => "rolling_ratio",
            Self::MoveLag => "move_lag",
            Self::StopTrigger => "stop_trigger",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentFailure {
    pub component: Component,
    pub derived_symbol: Option<String>,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DerivedReport {
    pub symbol: String,
    pub leverage: f64,
    pub move_events: Vec<MoveEvent>,
    pub stop_runs: Vec<StopRun>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub date: String,
    pub reference_symbol: String,
    pub tick_counts: Vec<(String, usize)>,
    pub ratio_windows: Vec<RatioWindowSummary>,
    pub derived: Vec<DerivedReport>,
    pub failures: Vec<ComponentFailure>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionOutcome {
    Skipped { date: String, reason: String },
    Completed(SessionReport),
}

impl SessionOutcome {
    pub fn date(&self) -> &str {
        match self {
            Self::Skipped { date, .. } => date,
            Self::Completed(report) => &report.date,
        }
    }

    fn skipped(date: &str, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        tracing::warn!(date = %date, reason = %reason, "session skipped");
        Self::Skipped {
            date: date.to_string(),
            reason,
        }
    }
}

/// Runs the three analyses over one session's series.
#[derive(Debug, Clone)]
pub struct SessionAnalyzer {
    ratio: RollingRatioSampler,
    lag: MoveLagDetector,
    stop: StopTriggerSimulator,
    min_ticks: usize,
}

impl SessionAnalyzer {
    pub fn new(
        ratio: RollingRatioSampler,
        lag: MoveLagDetector,
        stop: StopTriggerSimulator,
        min_ticks: usize,
    ) -> Self {
        Self {
            ratio,
            lag,
            stop,
            min_ticks,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            RollingRatioSampler::new(config.ratio.sampler_config()),
            MoveLagDetector::new(config.lag.detector_config()),
            StopTriggerSimulator::new(config.stop.simulator_config()),
            config.session.min_ticks,
        )
    }

    pub fn min_ticks(&self) -> usize {
        self.min_ticks
    }

    /// Analyse one session. A failing component is recorded in the report and
    /// the remaining components still run.
    pub fn analyze(
        &self,
        date: &str,
        reference: &TickSeries,
        derived: &[InstrumentSeries],
    ) -> SessionOutcome {
        let mut tick_counts = vec![(reference.symbol().to_string(), reference.len())];
        tick_counts.extend(
            derived
                .iter()
                .map(|d| (d.series.symbol().to_string(), d.series.len())),
        );

        if let Some((symbol, n)) = tick_counts.iter().find(|(_, n)| *n < self.min_ticks) {
            return SessionOutcome::skipped(
                date,
                format!(
                    "too few ticks: {} has {} (minimum {})",
                    symbol, n, self.min_ticks
                ),
            );
        }

        let leveraged: Vec<LeveragedSeries<'_>> =
            derived.iter().map(InstrumentSeries::as_leveraged).collect();
        let mut failures = Vec::new();

        let ratio_windows = match self.ratio.run(reference, &leveraged) {
            Ok(windows) => windows,
            Err(e) => {
                tracing::warn!(date = %date, error = %e, "rolling ratio failed");
                failures.push(ComponentFailure {
                    component: Component::RollingRatio,
                    derived_symbol: None,
                    error: e.to_string(),
                });
                Vec::new()
            }
        };

        let mut reports = Vec::with_capacity(leveraged.len());
        for d in &leveraged {
            let move_events = self.lag.run(reference, d);
            let stop_runs = match self.stop.run(reference, d) {
                Ok(runs) => runs,
                Err(e) => {
                    tracing::warn!(
                        date = %date,
                        symbol = %d.symbol(),
                        error = %e,
                        "stop trigger simulation failed"
                    );
                    failures.push(ComponentFailure {
                        component: Component::StopTrigger,
                        derived_symbol: Some(d.symbol().to_string()),
                        error: e.to_string(),
                    });
                    Vec::new()
                }
            };
            reports.push(DerivedReport {
                symbol: d.symbol().to_string(),
                leverage: d.leverage,
                move_events,
                stop_runs,
            });
        }

        tracing::info!(
            date = %date,
            reference = %reference.symbol(),
            ticks = reference.len(),
            ratio_windows = ratio_windows.len(),
            failures = failures.len(),
            "session analysed"
        );

        SessionOutcome::Completed(SessionReport {
            date: date.to_string(),
            reference_symbol: reference.symbol().to_string(),
            tick_counts,
            ratio_windows,
            derived: reports,
            failures,
        })
    }
}

/// Load every configured instrument for `date` and analyse it. Missing or
/// unreadable data skips the session rather than failing the run.
pub fn run_session(config: &Config, analyzer: &SessionAnalyzer, date: &str) -> SessionOutcome {
    let session_date = match parse_session_date(date) {
        Ok(d) => d,
        Err(e) => return SessionOutcome::skipped(date, format!("{:#}", e)),
    };
    let hours = config.session.market_hours();
    let columns = config.data.columns();

    let load = |symbol: &str| -> Result<TickSeries, String> {
        let path = tick_file_path(&config.data.dir, &config.data.file_pattern, date, symbol);
        if !path.exists() {
            return Err(format!("missing data: {}", path.display()));
        }
        match load_session_series(&path, symbol, columns, hours, session_date) {
            Ok(Some(series)) => Ok(series),
            Ok(None) => Err(format!("no {} ticks inside market hours", symbol)),
            Err(e) => Err(format!("{:#}", e)),
        }
    };

    let reference = match load(&config.instruments.reference) {
        Ok(s) => s,
        Err(reason) => return SessionOutcome::skipped(date, reason),
    };
    let mut derived = Vec::with_capacity(config.instruments.derived.len());
    for instrument in &config.instruments.derived {
        match load(&instrument.symbol) {
            Ok(series) => derived.push(InstrumentSeries::new(series, instrument.leverage)),
            Err(reason) => return SessionOutcome::skipped(date, reason),
        }
    }

    analyzer.analyze(date, &reference, &derived)
}
