use super::round_to;
use serde::Serialize;

/// Both limits must be reached before an extreme counts as an anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnomalyThresholds {
    /// Minimum relative deviation from the average, in percent.
    pub min_percent: f64,
    /// Minimum absolute difference from the average, in the metric's unit.
    pub min_difference: f64,
}

impl Default for AnomalyThresholds {
    fn default() -> Self {
        Self {
            min_percent: 50.0,
            min_difference: 0.5,
        }
    }
}

/// Which extreme is being evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    High,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Anomaly {
    pub is_anomaly: bool,
    /// Deviation from the average in percent, rounded to 1 decimal.
    pub percent_deviation: Option<f64>,
}

impl Anomaly {
    fn undefined() -> Self {
        Self {
            is_anomaly: false,
            percent_deviation: None,
        }
    }
}

/// Flags an extreme value that sits far from the metric's average.
///
/// The deviation is undefined, and never an anomaly, when either input is
/// missing or the average is zero.
pub fn detect(
    average: Option<f64>,
    value: Option<f64>,
    side: Side,
    thresholds: &AnomalyThresholds,
) -> Anomaly {
    let (Some(average), Some(value)) = (average, value) else {
        return Anomaly::undefined();
    };
    if average == 0.0 {
        return Anomaly::undefined();
    }

    let deviation = match side {
        Side::High => (value - average) / average.abs(),
        Side::Low => (average - value) / average.abs(),
    };
    let percent = deviation.abs() * 100.0;
    let is_anomaly =
        percent >= thresholds.min_percent && (value - average).abs() >= thresholds.min_difference;

    Anomaly {
        is_anomaly,
        percent_deviation: Some(round_to(percent, 1)),
    }
}
