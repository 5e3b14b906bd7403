use super::round2;
use crate::filter::DateRange;
use crate::metrics::MetricSpec;
use crate::structs::{ObservationRow, State, Station};
use log::debug;
use serde::Serialize;
use std::{collections::HashMap, sync::Arc};

/// One station's resolved value for the map view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationValue {
    pub station_id: u32,
    pub station_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub state: State,
    pub value: Option<f64>,
}

impl StationValue {
    fn new(station: &Station, value: Option<f64>) -> Self {
        Self {
            station_id: station.id,
            station_name: station.station_name.clone(),
            latitude: station.latitude,
            longitude: station.longitude,
            state: station.state,
            value: value.map(round2),
        }
    }
}

/// Resolves one value per station.
///
/// With a bounded `range` the value is the station's average over the rows
/// (present values only; stations with none are dropped). Without one it is
/// the metric as recorded on the station's most recent date, which may be
/// absent. `rows` must already be restricted to `range` by the store.
/// Output is ordered by state, then station name.
pub fn resolve_latest(
    rows: &[ObservationRow],
    spec: &MetricSpec,
    range: &DateRange,
) -> Vec<StationValue> {
    let mut values = if range.is_bounded() {
        range_averages(rows, spec)
    } else {
        most_recent(rows, spec)
    };

    values.sort_by(|a, b| {
        a.state
            .cmp(&b.state)
            .then_with(|| a.station_name.cmp(&b.station_name))
            .then_with(|| a.station_id.cmp(&b.station_id))
    });
    debug!(
        "Resolved {} station values for {} from {} rows",
        values.len(),
        spec.field,
        rows.len()
    );
    values
}

fn range_averages(rows: &[ObservationRow], spec: &MetricSpec) -> Vec<StationValue> {
    let mut sums: HashMap<u32, (Arc<Station>, f64, usize)> = HashMap::new();
    for row in rows {
        if let Some(value) = spec.value(&row.observation) {
            let entry = sums
                .entry(row.station.id)
                .or_insert_with(|| (Arc::clone(&row.station), 0.0, 0));
            entry.1 += value;
            entry.2 += 1;
        }
    }

    sums.into_values()
        .map(|(station, sum, count)| StationValue::new(&station, Some(sum / count as f64)))
        .collect()
}

fn most_recent(rows: &[ObservationRow], spec: &MetricSpec) -> Vec<StationValue> {
    let mut latest: HashMap<u32, &ObservationRow> = HashMap::new();
    for row in rows {
        latest
            .entry(row.station.id)
            .and_modify(|current| {
                if row.date() > current.date() {
                    *current = row;
                }
            })
            .or_insert(row);
    }

    latest
        .into_values()
        .map(|row| StationValue::new(&row.station, spec.value(&row.observation)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{Field, MetricRegistry};
    use crate::test_support::{date, melbourne_week, row_with, station};

    #[test]
    fn test_latest_without_range_uses_last_date() {
        let registry = MetricRegistry::standard();
        let spec = registry.spec(Field::TemperatureMax).unwrap();
        let mut rows = melbourne_week();
        rows.reverse();

        let values = resolve_latest(&rows, spec, &DateRange::default());
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].value, Some(29.0));
    }

    #[test]
    fn test_latest_value_may_be_absent() {
        let registry = MetricRegistry::standard();
        let spec = registry.spec(Field::Wind).unwrap();
        let perth = Arc::new(station(7, State::Wa, "Perth"));
        let rows = vec![
            row_with(&perth, "2024-05-01", |o| o.wind_speed_ms = Some(3.0)),
            row_with(&perth, "2024-05-02", |o| o.wind_speed_ms = None),
        ];

        let values = resolve_latest(&rows, spec, &DateRange::default());
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].value, None);
    }

    #[test]
    fn test_range_average_skips_stations_without_values() {
        let registry = MetricRegistry::standard();
        let spec = registry.spec(Field::Rainfall).unwrap();
        let hobart = Arc::new(station(3, State::Tas, "Hobart"));
        let darwin = Arc::new(station(4, State::Nt, "Darwin"));
        let rows = vec![
            row_with(&hobart, "2024-02-01", |o| o.rainfall_mm = Some(1.0)),
            row_with(&hobart, "2024-02-02", |o| o.rainfall_mm = None),
            row_with(&hobart, "2024-02-03", |o| o.rainfall_mm = Some(2.0)),
            row_with(&darwin, "2024-02-01", |o| o.rainfall_mm = None),
        ];
        let range = DateRange::new(Some(date("2024-02-01")), Some(date("2024-02-28")));

        let values = resolve_latest(&rows, spec, &range);
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].station_name, "Hobart");
        assert_eq!(values[0].value, Some(1.5));
    }

    #[test]
    fn test_ordered_by_state_then_name() {
        let registry = MetricRegistry::standard();
        let spec = registry.spec(Field::TemperatureMax).unwrap();
        let stations = [
            Arc::new(station(1, State::Vic, "Melbourne")),
            Arc::new(station(2, State::Nsw, "Sydney")),
            Arc::new(station(3, State::Vic, "Ballarat")),
            Arc::new(station(4, State::Nsw, "Albury")),
        ];
        let rows: Vec<ObservationRow> = stations
            .iter()
            .map(|s| row_with(s, "2024-01-01", |o| o.temp_max_c = Some(20.0)))
            .collect();

        let names: Vec<String> = resolve_latest(&rows, spec, &DateRange::default())
            .into_iter()
            .map(|v| v.station_name)
            .collect();
        assert_eq!(names, vec!["Albury", "Sydney", "Ballarat", "Melbourne"]);
    }
}
