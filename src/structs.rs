use crate::error::InsightsError;
use crate::transform::anomaly::AnomalyThresholds;
use chrono::NaiveDate;
use log::{Log, Metadata, Record as LogRecord};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, sync::Arc};

/// Simple logger implementation
pub struct SimpleLogger;

impl Log for SimpleLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &LogRecord) {
        println!("[{}] {}", record.level(), record.args());
    }

    fn flush(&self) {}
}

/// Australian state or territory a station belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum State {
    Act,
    Nsw,
    Nt,
    Qld,
    Sa,
    Tas,
    Vic,
    Wa,
}

impl State {
    pub const ALL: [State; 8] = [
        State::Act,
        State::Nsw,
        State::Nt,
        State::Qld,
        State::Sa,
        State::Tas,
        State::Vic,
        State::Wa,
    ];

    pub fn code(self) -> &'static str {
        match self {
            State::Act => "ACT",
            State::Nsw => "NSW",
            State::Nt => "NT",
            State::Qld => "QLD",
            State::Sa => "SA",
            State::Tas => "TAS",
            State::Vic => "VIC",
            State::Wa => "WA",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for State {
    type Err = InsightsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        State::ALL
            .into_iter()
            .find(|state| state.code() == upper)
            .ok_or_else(|| {
                let valid: Vec<&str> = State::ALL.iter().map(|s| s.code()).collect();
                InsightsError::InvalidFilter(format!(
                    "Invalid state '{}'. Must be one of: {}",
                    s,
                    valid.join(", ")
                ))
            })
    }
}

/// Weather station reference data. Never mutated once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: u32,
    pub state: State,
    pub station_name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// One station's recorded metrics for one calendar date.
///
/// Every metric is optional: `None` means nothing was recorded that day,
/// which is not the same as a reading of zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub station_id: u32,
    pub date: NaiveDate,
    pub evapotranspiration_mm: Option<f64>,
    pub rainfall_mm: Option<f64>,
    pub temp_max_c: Option<f64>,
    pub temp_min_c: Option<f64>,
    pub humidity_max_percent: Option<f64>,
    pub humidity_min_percent: Option<f64>,
    pub wind_speed_ms: Option<f64>,
}

/// An observation joined with its station, as handed out by the store.
#[derive(Debug, Clone)]
pub struct ObservationRow {
    pub station: Arc<Station>,
    pub observation: Observation,
}

impl ObservationRow {
    pub fn new(station: Arc<Station>, observation: Observation) -> Self {
        Self {
            station,
            observation,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.observation.date
    }
}

/// Configuration shared by the filter normaliser and the derived views
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub max_export_rows: usize,
    pub default_page_size: usize,
    pub max_page_size: usize,
    pub max_station_ids: usize,
    pub history_start: NaiveDate,
    pub history_end: NaiveDate,
    pub anomaly: AnomalyThresholds,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_export_rows: 20_000,
            default_page_size: 500,
            max_page_size: 2_000,
            max_station_ids: 50,
            history_start: NaiveDate::from_ymd_opt(2019, 1, 1).unwrap_or(NaiveDate::MIN),
            history_end: NaiveDate::from_ymd_opt(2025, 8, 31).unwrap_or(NaiveDate::MAX),
            anomaly: AnomalyThresholds::default(),
        }
    }
}
