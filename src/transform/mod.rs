//! Derived views over filtered observation rows.
//!
//! Every function here is a pure transformation of an already materialised
//! row set. Absent metric values are skipped, never counted as zero.

pub mod aggregate;
pub mod anomaly;
pub mod correlation;
pub mod latest;
pub mod records;
pub mod statistics;
pub mod summary;

use crate::metrics::MetricSpec;
use crate::structs::ObservationRow;

/// Rounds `value` to `places` decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

pub(crate) fn round2(value: f64) -> f64 {
    round_to(value, 2)
}

/// Present values of one metric, in row order.
pub fn present_values(rows: &[ObservationRow], spec: &MetricSpec) -> Vec<f64> {
    rows.iter()
        .filter_map(|row| spec.value(&row.observation))
        .collect()
}

/// Arithmetic mean. Returns `None` for an empty slice.
pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

/// Population standard deviation (N denominator).
pub fn population_std_dev(data: &[f64]) -> Option<f64> {
    let avg = mean(data)?;
    let variance = data.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / data.len() as f64;
    Some(variance.sqrt())
}

/// Calculates the median (50th percentile).
///
/// The middle value of the sorted data, or the mean of the two middle values
/// for an even count. Returns `None` for empty data.
pub fn median(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }

    let mut sorted_data = data.to_vec();
    sorted_data.sort_by(|a, b| a.total_cmp(b));

    let len = sorted_data.len();
    if len.is_multiple_of(2) {
        Some((sorted_data[len / 2 - 1] + sorted_data[len / 2]) / 2.0)
    } else {
        Some(sorted_data[len / 2])
    }
}
