//! Read-only statistics over the flat company table

pub mod dataset;
pub mod geo;
pub mod stats;

pub use dataset::{Company, Dataset};
pub use geo::GeoReference;

/// Mean of the present values, `None` when there are none
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Median of the present values; even counts average the two middle values
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Round half to even; missing statistics become 0
pub fn round_stat(value: Option<f64>) -> i64 {
    value.map(|v| v.round_ties_even() as i64).unwrap_or(0)
}
