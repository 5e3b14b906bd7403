use super::anomaly::{self, Anomaly, AnomalyThresholds, Side};
use super::round2;
use super::statistics::{self, ExtremeRecord};
use crate::metrics::{Field, MetricRegistry, MetricSpec};
use crate::structs::ObservationRow;
use log::debug;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coverage {
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSummary {
    pub label: &'static str,
    pub count: usize,
    pub average: Option<f64>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub max_record: Option<ExtremeRecord>,
    pub min_record: Option<ExtremeRecord>,
    pub max_anomaly: Anomaly,
    /// `None` for metrics whose minimum is not reported.
    pub min_anomaly: Option<Anomaly>,
}

/// Per-metric extremes plus human-readable insight and anomaly lines.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherSummary {
    pub records_analyzed: usize,
    pub stations_covered: usize,
    pub coverage: Coverage,
    pub metrics: BTreeMap<Field, MetricSummary>,
    pub insights: Vec<String>,
    pub anomalies: Vec<String>,
}

/// Summarises the requested fields over a filtered row set.
///
/// Every requested field gets an entry; one without any present value has a
/// zero count and empty figures. Low-side insights and anomalies are only
/// produced for fields whose registry entry reports them.
pub fn summarize(
    rows: &[ObservationRow],
    fields: &[Field],
    registry: &MetricRegistry,
    thresholds: &AnomalyThresholds,
) -> WeatherSummary {
    debug!("Summarising {} rows over {} metrics", rows.len(), fields.len());
    let stations: BTreeSet<u32> = rows.iter().map(|row| row.station.id).collect();
    let earliest = rows.iter().map(ObservationRow::date).min();
    let latest = rows.iter().map(ObservationRow::date).max();

    let mut metrics = BTreeMap::new();
    let mut insights = Vec::new();
    let mut anomalies = Vec::new();

    for spec in registry.specs_for(fields) {
        let profile = statistics::profile(rows, spec);
        let average = profile.average();

        let max_anomaly = anomaly::detect(average, profile.maximum(), Side::High, thresholds);
        if let Some(record) = &profile.max_record {
            insights.push(insight_line("Highest", spec, record));
            if max_anomaly.is_anomaly {
                anomalies.push(anomaly_line(spec, record, &max_anomaly, Side::High));
            }
        }

        let min_anomaly = spec
            .reports_low_side
            .then(|| anomaly::detect(average, profile.minimum(), Side::Low, thresholds));
        if let (Some(record), Some(low)) = (&profile.min_record, &min_anomaly) {
            insights.push(insight_line("Lowest", spec, record));
            if low.is_anomaly {
                anomalies.push(anomaly_line(spec, record, low, Side::Low));
            }
        }

        metrics.insert(
            spec.field,
            MetricSummary {
                label: spec.summary_label,
                count: profile.count(),
                average: average.map(round2),
                minimum: profile.minimum().map(round2),
                maximum: profile.maximum().map(round2),
                max_record: profile.max_record,
                min_record: profile.min_record,
                max_anomaly,
                min_anomaly,
            },
        );
    }

    debug!(
        "Summary produced {} insights and {} anomalies",
        insights.len(),
        anomalies.len()
    );
    WeatherSummary {
        records_analyzed: rows.len(),
        stations_covered: stations.len(),
        coverage: Coverage {
            start: earliest.map(|d| d.format("%Y-%m-%d").to_string()),
            end: latest.map(|d| d.format("%Y-%m-%d").to_string()),
        },
        metrics,
        insights,
        anomalies,
    }
}

fn insight_line(prefix: &str, spec: &MetricSpec, record: &ExtremeRecord) -> String {
    format!(
        "{} {} of {} at {} ({}) on {}.",
        prefix,
        spec.summary_label.to_lowercase(),
        decimal_text(round2(record.value)),
        record.station_name,
        record.state,
        record.date
    )
}

/// Always keeps a fractional part, so 33 reads as `33.0`.
fn decimal_text(value: f64) -> String {
    format!("{:?}", value)
}

fn anomaly_line(spec: &MetricSpec, record: &ExtremeRecord, anomaly: &Anomaly, side: Side) -> String {
    let amount = anomaly
        .percent_deviation
        .map_or_else(|| "significantly".to_string(), |p| format!("{:.0}%", p));
    let direction = match side {
        Side::High => "above",
        Side::Low => "below",
    };
    format!(
        "{} deviates {} {} average at {} ({}) on {}.",
        spec.summary_label, amount, direction, record.station_name, record.state, record.date
    )
}
