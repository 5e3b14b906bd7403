use super::round2;
use crate::metrics::MetricSpec;
use crate::structs::{ObservationRow, Station};
use chrono::{Datelike, NaiveDate};
use log::{debug, warn};
use serde::Serialize;
use std::{collections::BTreeMap, fmt, sync::Arc};

/// Temporal bucket size for [`aggregate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Daily,
    Weekly,
    #[default]
    Monthly,
    Yearly,
}

impl Granularity {
    /// Parses a granularity name. Anything unrecognised falls back to
    /// [`Granularity::Monthly`].
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "daily" => Granularity::Daily,
            "weekly" => Granularity::Weekly,
            "monthly" => Granularity::Monthly,
            "yearly" => Granularity::Yearly,
            other => {
                warn!("Unsupported granularity '{}', using monthly", other);
                Granularity::Monthly
            }
        }
    }

    /// Maps a date onto its bucket.
    ///
    /// Weeks are Monday-first and numbered within the calendar year: week 01
    /// starts on the first Monday, days before it belong to week 00.
    pub fn period_of(self, date: NaiveDate) -> Period {
        match self {
            Granularity::Daily => Period::Day(date),
            Granularity::Weekly => {
                let days_from_monday = date.weekday().num_days_from_monday();
                Period::Week {
                    year: date.year(),
                    week: (date.ordinal0() + 7 - days_from_monday) / 7,
                }
            }
            Granularity::Monthly => Period::Month {
                year: date.year(),
                month: date.month(),
            },
            Granularity::Yearly => Period::Year(date.year()),
        }
    }
}

/// A bucket key. Orders chronologically within one granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Period {
    Day(NaiveDate),
    Week { year: i32, week: u32 },
    Month { year: i32, month: u32 },
    Year(i32),
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Day(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Period::Week { year, week } => write!(f, "{:04}-W{:02}", year, week),
            Period::Month { year, month } => write!(f, "{:04}-{:02}", year, month),
            Period::Year(year) => write!(f, "{:04}", year),
        }
    }
}

/// avg/min/max of one metric for one station in one period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodAggregate {
    pub station_id: u32,
    pub station_name: String,
    pub period: String,
    pub avg_value: f64,
    pub min_value: f64,
    pub max_value: f64,
}

struct Bucket {
    station: Arc<Station>,
    sum: f64,
    count: usize,
    min: f64,
    max: f64,
}

impl Bucket {
    fn new(station: Arc<Station>) -> Self {
        Self {
            station,
            sum: 0.0,
            count: 0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }
}

/// Groups rows per (station, period) and summarises one metric in each group.
///
/// Rows are assumed to be filtered already. Groups without a single present
/// value are left out. Output is ordered by period, then station id, with
/// every value rounded to 2 decimal places.
pub fn aggregate(
    rows: &[ObservationRow],
    spec: &MetricSpec,
    granularity: Granularity,
) -> Vec<PeriodAggregate> {
    debug!(
        "Aggregating {} rows of {} at {:?} granularity",
        rows.len(),
        spec.field,
        granularity
    );
    let mut buckets: BTreeMap<(Period, u32), Bucket> = BTreeMap::new();

    for row in rows {
        let Some(value) = spec.value(&row.observation) else {
            continue;
        };
        let key = (granularity.period_of(row.date()), row.station.id);
        buckets
            .entry(key)
            .or_insert_with(|| Bucket::new(Arc::clone(&row.station)))
            .push(value);
    }

    let results: Vec<PeriodAggregate> = buckets
        .into_iter()
        .map(|((period, _), bucket)| PeriodAggregate {
            station_id: bucket.station.id,
            station_name: bucket.station.station_name.clone(),
            period: period.to_string(),
            avg_value: round2(bucket.sum / bucket.count as f64),
            min_value: round2(bucket.min),
            max_value: round2(bucket.max),
        })
        .collect();

    debug!("Produced {} period buckets", results.len());
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{Field, MetricRegistry};
    use crate::structs::State;
    use crate::test_support::{date, melbourne_week, row_with, station};

    fn rainfall_rows() -> Vec<ObservationRow> {
        let a = Arc::new(station(1, State::Vic, "Melbourne"));
        let b = Arc::new(station(2, State::Nsw, "Sydney"));
        vec![
            row_with(&a, "2024-01-10", |o| o.rainfall_mm = Some(1.0)),
            row_with(&b, "2024-01-11", |o| o.rainfall_mm = Some(0.0)),
            row_with(&a, "2024-01-20", |o| o.rainfall_mm = Some(3.0)),
            row_with(&b, "2024-02-01", |o| o.rainfall_mm = None),
            row_with(&a, "2024-02-03", |o| o.rainfall_mm = Some(2.333)),
            row_with(&a, "2023-12-31", |o| o.rainfall_mm = Some(7.0)),
        ]
    }

    #[test]
    fn test_monthly_same_month_bucket() {
        let registry = MetricRegistry::standard();
        let spec = registry.spec(Field::Rainfall).unwrap();
        let a = Arc::new(station(1, State::Vic, "Melbourne"));
        let rows = vec![
            row_with(&a, "2024-03-01", |o| o.rainfall_mm = Some(1.0)),
            row_with(&a, "2024-03-15", |o| o.rainfall_mm = Some(3.0)),
        ];

        let buckets = aggregate(&rows, spec, Granularity::Monthly);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].period, "2024-03");
        assert_eq!(buckets[0].avg_value, 2.0);
        assert_eq!(buckets[0].min_value, 1.0);
        assert_eq!(buckets[0].max_value, 3.0);
    }

    #[test]
    fn test_ordering_and_empty_groups() {
        let registry = MetricRegistry::standard();
        let spec = registry.spec(Field::Rainfall).unwrap();
        let buckets = aggregate(&rainfall_rows(), spec, Granularity::Monthly);

        let keys: Vec<(String, u32)> = buckets
            .iter()
            .map(|b| (b.period.clone(), b.station_id))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("2023-12".to_string(), 1),
                ("2024-01".to_string(), 1),
                ("2024-01".to_string(), 2),
                ("2024-02".to_string(), 1),
            ]
        );
        // A recorded zero is a value, an absent reading is not.
        assert_eq!(buckets[2].avg_value, 0.0);
        assert_eq!(buckets[3].avg_value, 2.33);
    }

    #[test]
    fn test_avg_between_min_and_max_for_all_granularities() {
        let registry = MetricRegistry::standard();
        let rows = melbourne_week();
        for granularity in [
            Granularity::Daily,
            Granularity::Weekly,
            Granularity::Monthly,
            Granularity::Yearly,
        ] {
            for field in Field::ALL {
                let spec = registry.spec(field).unwrap();
                for bucket in aggregate(&rows, spec, granularity) {
                    assert!(bucket.min_value <= bucket.max_value);
                    assert!(bucket.min_value <= bucket.avg_value);
                    assert!(bucket.avg_value <= bucket.max_value);
                }
            }
        }
    }

    #[test]
    fn test_row_order_does_not_change_output() {
        let registry = MetricRegistry::standard();
        let spec = registry.spec(Field::Rainfall).unwrap();
        let rows = rainfall_rows();
        let mut reversed = rows.clone();
        reversed.reverse();

        assert_eq!(
            aggregate(&rows, spec, Granularity::Weekly),
            aggregate(&reversed, spec, Granularity::Weekly)
        );
    }

    #[test]
    fn test_period_labels() {
        let d = date("2024-03-07");
        assert_eq!(Granularity::Daily.period_of(d).to_string(), "2024-03-07");
        assert_eq!(Granularity::Monthly.period_of(d).to_string(), "2024-03");
        assert_eq!(Granularity::Yearly.period_of(d).to_string(), "2024");
        assert_eq!(Granularity::Weekly.period_of(d).to_string(), "2024-W10");
    }

    #[test]
    fn test_weekly_buckets_at_year_boundary() {
        // 2022-12-31 is a Saturday, 2023-01-01 a Sunday, 2023-01-02 a Monday.
        let weekly = Granularity::Weekly;
        assert_eq!(weekly.period_of(date("2022-12-31")).to_string(), "2022-W52");
        assert_eq!(weekly.period_of(date("2023-01-01")).to_string(), "2023-W00");
        assert_eq!(weekly.period_of(date("2023-01-02")).to_string(), "2023-W01");
        assert_eq!(weekly.period_of(date("2023-01-08")).to_string(), "2023-W01");
        assert_eq!(weekly.period_of(date("2023-01-09")).to_string(), "2023-W02");
        // 2024 starts on a Monday, so there is no week 00.
        assert_eq!(weekly.period_of(date("2024-01-01")).to_string(), "2024-W01");
    }

    #[test]
    fn test_unknown_granularity_falls_back_to_monthly() {
        assert_eq!(Granularity::from_name("fortnightly"), Granularity::Monthly);
        assert_eq!(Granularity::from_name("Weekly"), Granularity::Weekly);
        assert_eq!(Granularity::from_name(""), Granularity::Monthly);
    }
}
