use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use csv::ReaderBuilder;

use crate::model::{Tick, TickSeries};

/// Zero-based column positions in a tick CSV.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvColumns {
    pub timestamp: usize,
    pub price: usize,
}

impl Default for CsvColumns {
    fn default() -> Self {
        Self {
            timestamp: 0,
            price: 2,
        }
    }
}

/// Regular-session bounds in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketHours {
    pub open: NaiveTime,
    pub close: NaiveTime,
}

impl MarketHours {
    /// Inclusive `[open_ms, close_ms]` for `date`.
    pub fn window_ms(&self, date: NaiveDate) -> (i64, i64) {
        let open = date.and_time(self.open).and_utc().timestamp_millis();
        let close = date.and_time(self.close).and_utc().timestamp_millis();
        (open, close)
    }

    pub fn restrict(&self, series: &TickSeries, date: NaiveDate) -> Option<TickSeries> {
        let (open, close) = self.window_ms(date);
        series.restrict(open, close)
    }
}

pub fn parse_session_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y%m%d")
        .with_context(|| format!("invalid session date '{}': expected YYYYMMDD", s))
}

pub fn tick_file_path(dir: &Path, pattern: &str, date: &str, symbol: &str) -> PathBuf {
    dir.join(pattern.replace("{date}", date).replace("{symbol}", symbol))
}

/// ISO-8601 timestamp to epoch milliseconds. Strings without an offset are
/// taken as UTC.
pub fn parse_timestamp_ms(s: &str) -> Result<i64> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.timestamp_millis());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(naive.and_utc().timestamp_millis());
        }
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%:z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Ok(dt.timestamp_millis());
        }
    }
    bail!("unrecognised timestamp '{}'", s)
}

/// Read ticks from a CSV with a header row, sorted by time.
pub fn load_ticks_csv(path: &Path, columns: CsvColumns) -> Result<Vec<Tick>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let mut ticks = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let line = row + 2;
        let record =
            record.with_context(|| format!("{}: malformed row {}", path.display(), line))?;
        let ts_field = record.get(columns.timestamp).with_context(|| {
            format!(
                "{}: row {} has no column {}",
                path.display(),
                line,
                columns.timestamp
            )
        })?;
        let price_field = record.get(columns.price).with_context(|| {
            format!(
                "{}: row {} has no column {}",
                path.display(),
                line,
                columns.price
            )
        })?;
        let timestamp_ms = parse_timestamp_ms(ts_field)
            .with_context(|| format!("{}: row {}", path.display(), line))?;
        let price: f64 = price_field.parse().with_context(|| {
            format!(
                "{}: row {} has invalid price '{}'",
                path.display(),
                line,
                price_field
            )
        })?;
        ticks.push(Tick::new(timestamp_ms, price));
    }

    ticks.sort_by_key(|t| t.timestamp_ms);
    Ok(ticks)
}

/// Load one instrument's session: read the CSV, keep the ticks inside market
/// hours and build the series from those. Prints outside the window are not
/// validated. `Ok(None)` when nothing trades inside the window.
pub fn load_session_series(
    path: &Path,
    symbol: &str,
    columns: CsvColumns,
    hours: MarketHours,
    date: NaiveDate,
) -> Result<Option<TickSeries>> {
    let ticks = load_ticks_csv(path, columns)?;
    let raw = ticks.len();
    let (open, close) = hours.window_ms(date);
    let in_hours: Vec<Tick> = ticks
        .into_iter()
        .filter(|t| (open..=close).contains(&t.timestamp_ms))
        .collect();
    tracing::debug!(
        symbol = %symbol,
        path = %path.display(),
        raw,
        in_hours = in_hours.len(),
        "loaded ticks"
    );
    if in_hours.is_empty() {
        return Ok(None);
    }
    let series = TickSeries::new(symbol, in_hours)
        .with_context(|| format!("invalid tick data in {}", path.display()))?;
    Ok(Some(series))
}
