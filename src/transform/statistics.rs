use super::correlation::{self, Correlation, CorrelationPair};
use super::{mean, median, population_std_dev, round2};
use crate::metrics::{Field, MetricRegistry, MetricSpec};
use crate::structs::{ObservationRow, State};
use log::debug;
use serde::Serialize;
use std::collections::BTreeMap;

/// Fewer rows than this and no statistics are computed.
pub const MIN_SAMPLE_SIZE: usize = 2;

/// The observation holding a metric's maximum or minimum.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtremeRecord {
    pub station_id: u32,
    pub station_name: String,
    pub state: State,
    /// ISO 8601 date.
    pub date: String,
    /// Raw, unrounded value.
    pub value: f64,
}

impl ExtremeRecord {
    fn from_row(row: &ObservationRow, value: f64) -> Self {
        Self {
            station_id: row.station.id,
            station_name: row.station.station_name.clone(),
            state: row.station.state,
            date: row.date().format("%Y-%m-%d").to_string(),
            value,
        }
    }
}

/// Descriptive statistics for one metric, rounded to 2 decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricStatistics {
    pub count: usize,
    pub mean: f64,
    #[serde(rename = "std")]
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub max_record: Option<ExtremeRecord>,
    pub min_record: Option<ExtremeRecord>,
}

/// Present values of one metric plus the rows holding its extremes.
#[derive(Debug, Clone)]
pub struct MetricProfile {
    pub values: Vec<f64>,
    pub max_record: Option<ExtremeRecord>,
    pub min_record: Option<ExtremeRecord>,
}

impl MetricProfile {
    pub fn count(&self) -> usize {
        self.values.len()
    }

    pub fn average(&self) -> Option<f64> {
        mean(&self.values)
    }

    pub fn maximum(&self) -> Option<f64> {
        self.max_record.as_ref().map(|r| r.value)
    }

    pub fn minimum(&self) -> Option<f64> {
        self.min_record.as_ref().map(|r| r.value)
    }
}

/// Collects a metric's present values and locates its extremal records.
///
/// Ties on the extreme value go to the earliest date, then the lowest
/// station id.
pub fn profile(rows: &[ObservationRow], spec: &MetricSpec) -> MetricProfile {
    let mut values = Vec::with_capacity(rows.len());
    let mut highest: Option<(f64, &ObservationRow)> = None;
    let mut lowest: Option<(f64, &ObservationRow)> = None;

    let earlier = |a: &ObservationRow, b: &ObservationRow| {
        (a.date(), a.station.id) < (b.date(), b.station.id)
    };

    for row in rows {
        let Some(value) = spec.value(&row.observation) else {
            continue;
        };
        values.push(value);

        let replace_high = match highest {
            None => true,
            Some((best, best_row)) => value > best || (value == best && earlier(row, best_row)),
        };
        if replace_high {
            highest = Some((value, row));
        }

        let replace_low = match lowest {
            None => true,
            Some((best, best_row)) => value < best || (value == best && earlier(row, best_row)),
        };
        if replace_low {
            lowest = Some((value, row));
        }
    }

    MetricProfile {
        values,
        max_record: highest.map(|(value, row)| ExtremeRecord::from_row(row, value)),
        min_record: lowest.map(|(value, row)| ExtremeRecord::from_row(row, value)),
    }
}

/// Describes a single metric, or `None` when it has no present values.
pub fn describe(rows: &[ObservationRow], spec: &MetricSpec) -> Option<MetricStatistics> {
    let profile = profile(rows, spec);
    let values = &profile.values;

    Some(MetricStatistics {
        count: values.len(),
        mean: round2(mean(values)?),
        std_dev: round2(population_std_dev(values)?),
        min: round2(profile.minimum()?),
        max: round2(profile.maximum()?),
        median: round2(median(values)?),
        max_record: profile.max_record,
        min_record: profile.min_record,
    })
}

/// Describes every requested field that has at least one present value.
pub fn describe_all(
    rows: &[ObservationRow],
    fields: &[Field],
    registry: &MetricRegistry,
) -> BTreeMap<Field, MetricStatistics> {
    registry
        .specs_for(fields)
        .filter_map(|spec| describe(rows, spec).map(|stats| (spec.field, stats)))
        .collect()
}

/// The field with the highest (rounded) standard deviation.
///
/// Ties resolve to the field that comes first in metric-priority order.
pub fn dominant_factor(statistics: &BTreeMap<Field, MetricStatistics>) -> Option<Field> {
    let mut dominant: Option<(Field, f64)> = None;
    for (field, stats) in statistics {
        if dominant.is_none_or(|(_, best)| stats.std_dev > best) {
            dominant = Some((*field, stats.std_dev));
        }
    }
    dominant.map(|(field, _)| field)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsReport {
    pub statistics: BTreeMap<Field, MetricStatistics>,
    /// Display name of the dominant field, or "N/A".
    pub dominant_factor: String,
    pub correlations: Vec<Correlation>,
    pub sample_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsufficientData {
    pub error: &'static str,
    pub sample_size: usize,
}

/// Result of the statistics view: either a full report or the
/// insufficient-data sentinel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StatisticsOutcome {
    Insufficient(InsufficientData),
    Report(StatisticsReport),
}

impl StatisticsOutcome {
    pub fn report(&self) -> Option<&StatisticsReport> {
        match self {
            StatisticsOutcome::Report(report) => Some(report),
            StatisticsOutcome::Insufficient(_) => None,
        }
    }

    pub fn sample_size(&self) -> usize {
        match self {
            StatisticsOutcome::Report(report) => report.sample_size,
            StatisticsOutcome::Insufficient(info) => info.sample_size,
        }
    }
}

/// Builds the statistics view over a filtered row set.
///
/// Fewer than [`MIN_SAMPLE_SIZE`] rows yield the insufficient-data sentinel
/// and nothing else is computed. Correlations always use the fields named in
/// `pairs`, whichever fields were requested for the statistics table.
pub fn statistics_report(
    rows: &[ObservationRow],
    fields: &[Field],
    registry: &MetricRegistry,
    pairs: &[CorrelationPair],
) -> StatisticsOutcome {
    debug!("Computing statistics over {} rows", rows.len());
    if rows.len() < MIN_SAMPLE_SIZE {
        return StatisticsOutcome::Insufficient(InsufficientData {
            error: "Insufficient data for analysis",
            sample_size: rows.len(),
        });
    }

    let statistics = describe_all(rows, fields, registry);
    let dominant_factor = dominant_factor(&statistics)
        .and_then(|field| registry.spec(field))
        .map_or_else(|| "N/A".to_string(), |spec| spec.display_name.to_string());

    let mut series: BTreeMap<Field, Vec<f64>> = BTreeMap::new();
    for pair in pairs {
        for field in [pair.first, pair.second] {
            if series.contains_key(&field) {
                continue;
            }
            if let Some(spec) = registry.spec(field) {
                series.insert(field, super::present_values(rows, spec));
            }
        }
    }
    let correlations = correlation::analyze(&series, pairs);

    debug!(
        "Described {} metrics, {} correlations, dominant factor {}",
        statistics.len(),
        correlations.len(),
        dominant_factor
    );
    StatisticsOutcome::Report(StatisticsReport {
        statistics,
        dominant_factor,
        correlations,
        sample_size: rows.len(),
    })
}
