use crate::error::{InsightsError, Result};
use crate::filter::FilterCriteria;
use crate::structs::{Observation, ObservationRow, State, Station};
use csv::Reader;
use log::debug;
use std::collections::{BTreeMap, HashSet};
use std::{fs::File, io::Read, path::Path, sync::Arc};

/// One page of rows plus the number of rows matching the whole query.
#[derive(Debug, Clone)]
pub struct Page {
    pub rows: Vec<ObservationRow>,
    pub total: usize,
}

/// Read-only source of observations and station reference data.
///
/// Implementations apply the station, state and date filters of the
/// criteria; the derived views never filter again.
pub trait ObservationStore {
    /// Every matching row, ordered by date and then station id.
    fn observations(&self, criteria: &FilterCriteria) -> Vec<ObservationRow>;

    /// The page of matching rows selected by `criteria.page`/`page_size`.
    fn page(&self, criteria: &FilterCriteria) -> Page;

    /// Stations ordered by state then name, optionally limited to one state.
    fn stations(&self, state: Option<State>) -> Vec<Arc<Station>>;

    fn station(&self, id: u32) -> Option<Arc<Station>>;

    /// Distinct states that have at least one station.
    fn states(&self) -> Vec<State>;
}

/// Store backed by fully loaded vectors.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    stations: BTreeMap<u32, Arc<Station>>,
    rows: Vec<ObservationRow>,
}

impl InMemoryStore {
    /// Joins observations to their stations.
    ///
    /// # Errors
    ///
    /// Returns `InsightsError::Data` when an observation references an unknown
    /// station, or when a station has two observations for the same date.
    pub fn new(stations: Vec<Station>, observations: Vec<Observation>) -> Result<Self> {
        let stations: BTreeMap<u32, Arc<Station>> = stations
            .into_iter()
            .map(|station| (station.id, Arc::new(station)))
            .collect();

        let mut seen = HashSet::with_capacity(observations.len());
        let mut rows = Vec::with_capacity(observations.len());
        for observation in observations {
            let station = stations.get(&observation.station_id).ok_or_else(|| {
                InsightsError::Data(format!(
                    "Observation on {} references unknown station {}",
                    observation.date, observation.station_id
                ))
            })?;
            if !seen.insert((observation.station_id, observation.date)) {
                return Err(InsightsError::Data(format!(
                    "Duplicate observation for station {} on {}",
                    observation.station_id, observation.date
                )));
            }
            rows.push(ObservationRow::new(Arc::clone(station), observation));
        }
        rows.sort_by_key(|row| (row.date(), row.station.id));

        debug!(
            "Loaded {} stations and {} observations",
            stations.len(),
            rows.len()
        );
        Ok(Self { stations, rows })
    }

    /// Loads station and observation tables from CSV.
    ///
    /// Empty metric cells are read as absent values.
    pub fn from_csv_readers<S: Read, O: Read>(stations: S, observations: O) -> Result<Self> {
        let stations = Reader::from_reader(stations)
            .deserialize()
            .collect::<std::result::Result<Vec<Station>, csv::Error>>()?;
        let observations = Reader::from_reader(observations)
            .deserialize()
            .collect::<std::result::Result<Vec<Observation>, csv::Error>>()?;
        Self::new(stations, observations)
    }

    pub fn from_csv_files(stations: &Path, observations: &Path) -> Result<Self> {
        debug!(
            "Reading stations from {} and observations from {}",
            stations.display(),
            observations.display()
        );
        Self::from_csv_readers(File::open(stations)?, File::open(observations)?)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl ObservationStore for InMemoryStore {
    fn observations(&self, criteria: &FilterCriteria) -> Vec<ObservationRow> {
        self.rows
            .iter()
            .filter(|row| criteria.matches(row))
            .cloned()
            .collect()
    }

    fn page(&self, criteria: &FilterCriteria) -> Page {
        let page_size = criteria.page_size.max(1);
        let offset = criteria.page.saturating_sub(1).saturating_mul(page_size);
        let matching = self.rows.iter().filter(|row| criteria.matches(row));

        let mut total = 0;
        let mut rows = Vec::new();
        for row in matching {
            if total >= offset && rows.len() < page_size {
                rows.push(row.clone());
            }
            total += 1;
        }
        Page { rows, total }
    }

    fn stations(&self, state: Option<State>) -> Vec<Arc<Station>> {
        let mut stations: Vec<Arc<Station>> = self
            .stations
            .values()
            .filter(|station| state.is_none_or(|s| s == station.state))
            .cloned()
            .collect();
        stations.sort_by(|a, b| {
            a.state
                .cmp(&b.state)
                .then_with(|| a.station_name.cmp(&b.station_name))
        });
        stations
    }

    fn station(&self, id: u32) -> Option<Arc<Station>> {
        self.stations.get(&id).cloned()
    }

    fn states(&self) -> Vec<State> {
        let mut states: Vec<State> = self.stations.values().map(|s| s.state).collect();
        states.sort();
        states.dedup();
        states
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::DateRange;
    use crate::test_support::date;

    const STATIONS: &str = "id,state,station_name,latitude,longitude
1,VIC,Melbourne,-37.81,144.96
2,NSW,Sydney,-33.87,151.21
3,VIC,Ballarat,-37.56,143.85
";

    const OBSERVATIONS: &str = "station_id,date,evapotranspiration_mm,rainfall_mm,temp_max_c,temp_min_c,humidity_max_percent,humidity_min_percent,wind_speed_ms
1,2024-01-02,3.1,0.0,26.0,14.0,80,40,5.5
2,2024-01-01,2.9,,29.5,19.0,85,50,
1,2024-01-01,2.5,4.2,24.0,13.0,90,45,4.0
3,2024-01-03,,,,,,,
";

    fn store() -> InMemoryStore {
        InMemoryStore::from_csv_readers(STATIONS.as_bytes(), OBSERVATIONS.as_bytes()).unwrap()
    }

    #[test]
    fn test_load_preserves_absent_values() {
        let store = store();
        assert_eq!(store.len(), 4);
        let rows = store.observations(&FilterCriteria::default());
        let sydney = rows.iter().find(|r| r.station.id == 2).unwrap();
        assert_eq!(sydney.observation.rainfall_mm, None);
        assert_eq!(sydney.observation.wind_speed_ms, None);
        let melbourne = rows
            .iter()
            .find(|r| r.station.id == 1 && r.date() == date("2024-01-02"))
            .unwrap();
        assert_eq!(melbourne.observation.rainfall_mm, Some(0.0));
    }

    #[test]
    fn test_rows_ordered_by_date_then_station() {
        let keys: Vec<(String, u32)> = store()
            .observations(&FilterCriteria::default())
            .iter()
            .map(|r| (r.date().to_string(), r.station.id))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("2024-01-01".to_string(), 1),
                ("2024-01-01".to_string(), 2),
                ("2024-01-02".to_string(), 1),
                ("2024-01-03".to_string(), 3),
            ]
        );
    }

    #[test]
    fn test_filters_applied() {
        let criteria = FilterCriteria {
            state: Some(State::Vic),
            date_range: DateRange::new(None, Some(date("2024-01-02"))),
            ..FilterCriteria::default()
        };
        assert_eq!(store().observations(&criteria).len(), 2);

        let criteria = FilterCriteria {
            station_ids: vec![2, 3],
            ..FilterCriteria::default()
        };
        assert_eq!(store().observations(&criteria).len(), 2);
    }

    #[test]
    fn test_paging() {
        let criteria = FilterCriteria {
            page: 2,
            page_size: 3,
            ..FilterCriteria::default()
        };
        let page = store().page(&criteria);
        assert_eq!(page.total, 4);
        assert_eq!(page.rows.len(), 1);
        assert_eq!(page.rows[0].station.id, 3);
    }

    #[test]
    fn test_station_directory() {
        let store = store();
        let names: Vec<String> = store
            .stations(None)
            .iter()
            .map(|s| s.station_name.clone())
            .collect();
        assert_eq!(names, vec!["Sydney", "Ballarat", "Melbourne"]);
        assert_eq!(store.stations(Some(State::Nsw)).len(), 1);
        assert_eq!(store.states(), vec![State::Nsw, State::Vic]);
        assert_eq!(store.station(3).unwrap().station_name, "Ballarat");
        assert!(store.station(99).is_none());
    }

    #[test]
    fn test_unknown_station_rejected() {
        let observations = "station_id,date,evapotranspiration_mm,rainfall_mm,temp_max_c,temp_min_c,humidity_max_percent,humidity_min_percent,wind_speed_ms
9,2024-01-01,,,,,,,
";
        let result = InMemoryStore::from_csv_readers(STATIONS.as_bytes(), observations.as_bytes());
        assert!(matches!(result, Err(InsightsError::Data(_))));
    }

    #[test]
    fn test_duplicate_observation_rejected() {
        let observations = "station_id,date,evapotranspiration_mm,rainfall_mm,temp_max_c,temp_min_c,humidity_max_percent,humidity_min_percent,wind_speed_ms
1,2024-01-01,,,,,,,
1,2024-01-01,,1.0,,,,,
";
        let result = InMemoryStore::from_csv_readers(STATIONS.as_bytes(), observations.as_bytes());
        assert!(matches!(result, Err(InsightsError::Data(_))));
    }
}
