use crate::error::AnalysisError;
use crate::model::tick::Tick;

/// Time-ordered, non-empty tick sequence for one instrument and session.
///
/// Construction validates ordering and prices once, so every lookup afterwards
/// is infallible.
#[derive(Debug, Clone)]
pub struct TickSeries {
    symbol: String,
    ticks: Vec<Tick>,
}

impl TickSeries {
    /// Build from ticks already sorted by timestamp (ties allowed).
    pub fn new(symbol: impl Into<String>, ticks: Vec<Tick>) -> Result<Self, AnalysisError> {
        let symbol = symbol.into();
        if ticks.is_empty() {
            return Err(AnalysisError::EmptySeries { symbol });
        }
        for (index, tick) in ticks.iter().enumerate() {
            if tick.price <= 0.0 || !tick.price.is_finite() {
                return Err(AnalysisError::NonPositivePrice {
                    symbol,
                    index,
                    price: tick.price,
                });
            }
            if index > 0 && tick.timestamp_ms < ticks[index - 1].timestamp_ms {
                return Err(AnalysisError::UnsortedSeries { symbol, index });
            }
        }
        Ok(Self { symbol, ticks })
    }

    /// Build from ticks in arbitrary order. The sort is stable so ties keep
    /// their ingestion order.
    pub fn from_unsorted(
        symbol: impl Into<String>,
        mut ticks: Vec<Tick>,
    ) -> Result<Self, AnalysisError> {
        ticks.sort_by_key(|t| t.timestamp_ms);
        Self::new(symbol, ticks)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn ticks(&self) -> &[Tick] {
        &self.ticks
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    /// Always false; kept for API symmetry with slices.
    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    pub fn first(&self) -> Tick {
        self.ticks[0]
    }

    pub fn last(&self) -> Tick {
        self.ticks[self.ticks.len() - 1]
    }

    pub fn get(&self, index: usize) -> Option<Tick> {
        self.ticks.get(index).copied()
    }

    /// Index of the tick closest in time to `target_ms`, O(log n).
    ///
    /// Targets outside the series clamp to the first/last tick. When two ticks
    /// are equidistant the later one (first tick at or after the target) wins.
    pub fn nearest_index(&self, target_ms: i64) -> usize {
        let at_or_after = self.ticks.partition_point(|t| t.timestamp_ms < target_ms);
        if at_or_after == self.ticks.len() {
            return self.ticks.len() - 1;
        }
        if at_or_after > 0 {
            let before = &self.ticks[at_or_after - 1];
            let after = &self.ticks[at_or_after];
            if before.distance_ms(target_ms) < after.distance_ms(target_ms) {
                return at_or_after - 1;
            }
        }
        at_or_after
    }

    /// Tick closest in time to `target_ms`. Callers compare the returned
    /// timestamp to the target to see how far off the nearest sample was.
    pub fn nearest(&self, target_ms: i64) -> Tick {
        self.ticks[self.nearest_index(target_ms)]
    }

    /// Sub-series with `start_ms <= timestamp <= end_ms`, or `None` if no tick
    /// falls in the window.
    pub fn restrict(&self, start_ms: i64, end_ms: i64) -> Option<TickSeries> {
        let lo = self.ticks.partition_point(|t| t.timestamp_ms < start_ms);
        let hi = self.ticks.partition_point(|t| t.timestamp_ms <= end_ms);
        if lo >= hi {
            return None;
        }
        Some(TickSeries {
            symbol: self.symbol.clone(),
            ticks: self.ticks[lo..hi].to_vec(),
        })
    }
}
