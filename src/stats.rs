use crate::error::AnalysisError;

/// Nearest-rank percentile of an ascending slice, `pct` in 0..=100.
///
/// Index is `floor(len * pct / 100)` clamped to the slice; no interpolation.
/// Empty input yields 0.0.
pub fn percentile(sorted: &[f64], pct: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let raw = (sorted.len() as f64 * pct / 100.0).floor();
    let idx = if raw <= 0.0 { 0 } else { raw as usize };
    sorted[idx.min(sorted.len() - 1)]
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Middle value, averaging the two central values for even lengths.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sorted = sorted(values.to_vec());
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

pub fn mean_abs_error(values: &[f64], target: f64) -> Option<f64> {
    let errors: Vec<f64> = values.iter().map(|v| (v - target).abs()).collect();
    mean(&errors)
}

pub fn sorted(mut values: Vec<f64>) -> Vec<f64> {
    values.sort_by(|a, b| a.total_cmp(b));
    values
}

/// Percentage move from `from` to `to`. A non-positive base is an error
/// rather than an infinite or sign-flipped result.
pub fn percent_change(from: f64, to: f64) -> Result<f64, AnalysisError> {
    if from <= 0.0 || !from.is_finite() {
        return Err(AnalysisError::NonPositiveBase { price: from });
    }
    Ok((to - from) / from * 100.0)
}

/// Stride that draws at most about `max_samples` points from `len` items.
pub fn sample_stride(len: usize, max_samples: usize) -> usize {
    (len / max_samples.max(1)).max(1)
}
