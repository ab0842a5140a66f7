use serde::Serialize;

/// One observed trade print: epoch milliseconds and last price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Tick {
    pub timestamp_ms: i64,
    pub price: f64,
}

impl Tick {
    pub fn new(timestamp_ms: i64, price: f64) -> Self {
        Self {
            timestamp_ms,
            price,
        }
    }

    /// Absolute distance in milliseconds between this tick and `target_ms`.
    pub fn distance_ms(&self, target_ms: i64) -> u64 {
        self.timestamp_ms.abs_diff(target_ms)
    }
}
