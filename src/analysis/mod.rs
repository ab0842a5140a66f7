pub mod lag;
pub mod ratio;
pub mod stop;

pub use lag::{MoveLagDetector, MoveLagConfig, ReferenceMove};
pub use ratio::{RatioSamplerConfig, RollingRatioSampler};
pub use stop::{StopRun, StopState, StopTriggerConfig, StopTriggerSimulator};

/// Sparse-data guard: a nearest-tick lookup for `T + window` is usable only if
/// the tick actually found lies within `window * (1 +/- tolerance)` of `T`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GapGuard {
    tolerance: f64,
}

impl GapGuard {
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance: tolerance.clamp(0.0, 1.0),
        }
    }

    pub fn accepts(&self, window_ms: u64, actual_gap_ms: i64) -> bool {
        let window = window_ms as f64;
        let gap = actual_gap_ms as f64;
        gap >= window * (1.0 - self.tolerance) && gap <= window * (1.0 + self.tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::GapGuard;

    #[test]
    fn gap_guard_bounds_are_inclusive() {
        let guard = GapGuard::new(0.5);
        assert!(guard.accepts(10_000, 5_000));
        assert!(guard.accepts(10_000, 15_000));
        assert!(!guard.accepts(10_000, 4_999));
        assert!(!guard.accepts(10_000, 15_001));
        assert!(!guard.accepts(10_000, -1));
    }
}
