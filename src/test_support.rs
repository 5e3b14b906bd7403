//! Fixtures shared by the unit tests.

use crate::structs::{Observation, ObservationRow, State, Station};
use chrono::NaiveDate;
use std::sync::Arc;

pub fn date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
}

pub fn station(id: u32, state: State, name: &str) -> Station {
    Station {
        id,
        state,
        station_name: name.to_string(),
        latitude: -37.8136,
        longitude: 144.9631,
    }
}

/// An observation with no metrics recorded.
pub fn observation(station_id: u32, day: &str) -> Observation {
    Observation {
        station_id,
        date: date(day),
        evapotranspiration_mm: None,
        rainfall_mm: None,
        temp_max_c: None,
        temp_min_c: None,
        humidity_max_percent: None,
        humidity_min_percent: None,
        wind_speed_ms: None,
    }
}

pub fn row(station: &Arc<Station>, day: &str) -> ObservationRow {
    ObservationRow::new(Arc::clone(station), observation(station.id, day))
}

pub fn row_with(
    station: &Arc<Station>,
    day: &str,
    fill: impl FnOnce(&mut Observation),
) -> ObservationRow {
    let mut obs = observation(station.id, day);
    fill(&mut obs);
    ObservationRow::new(Arc::clone(station), obs)
}

/// Five January 2024 days for one Melbourne station, every metric rising
/// by one unit per day.
pub fn melbourne_week() -> Vec<ObservationRow> {
    let melbourne = Arc::new(station(1, State::Vic, "Melbourne"));
    (0..5)
        .map(|index| {
            let i = index as f64;
            row_with(&melbourne, &format!("2024-01-0{}", index + 1), |o| {
                o.temp_max_c = Some(25.0 + i);
                o.temp_min_c = Some(15.0 + i);
                o.rainfall_mm = Some(i);
                o.humidity_max_percent = Some(70.0 - i);
                o.humidity_min_percent = Some(40.0 - i);
                o.wind_speed_ms = Some(5.0 + i);
                o.evapotranspiration_mm = Some(2.0 + i);
            })
        })
        .collect()
}
