use crate::error::{InsightsError, Result};
use crate::metrics::Metric;
use crate::structs::{AnalysisConfig, ObservationRow, State};
use chrono::NaiveDate;
use serde::Serialize;

/// Inclusive date range; either bound may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// True when at least one bound is set.
    pub fn is_bounded(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.is_none_or(|start| date >= start) && self.end.is_none_or(|end| date <= end)
    }

    fn clamped(self, floor: NaiveDate, ceiling: NaiveDate) -> Self {
        Self {
            start: self.start.map(|d| d.clamp(floor, ceiling)),
            end: self.end.map(|d| d.clamp(floor, ceiling)),
        }
    }
}

/// Query parameters shared by every view.
///
/// An empty `station_ids` or `metrics` list means "no restriction".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterCriteria {
    pub station_ids: Vec<u32>,
    pub state: Option<State>,
    pub date_range: DateRange,
    pub metrics: Vec<Metric>,
    pub page: usize,
    pub page_size: usize,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            station_ids: Vec::new(),
            state: None,
            date_range: DateRange::default(),
            metrics: Vec::new(),
            page: 1,
            page_size: AnalysisConfig::default().default_page_size,
        }
    }
}

impl FilterCriteria {
    /// Brings the criteria into the bounds allowed by `config`.
    ///
    /// # Errors
    ///
    /// Returns `InsightsError::InvalidFilter` when more distinct station ids are
    /// requested than `config.max_station_ids` permits, or when the configured
    /// history window ends before it starts.
    pub fn normalized(mut self, config: &AnalysisConfig) -> Result<Self> {
        if config.history_start > config.history_end {
            return Err(InsightsError::InvalidFilter(format!(
                "History window is inverted: {} is after {}",
                config.history_start, config.history_end
            )));
        }

        let mut ids: Vec<u32> = Vec::with_capacity(self.station_ids.len());
        for id in self.station_ids {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        if ids.len() > config.max_station_ids {
            return Err(InsightsError::InvalidFilter(format!(
                "Maximum {} stations allowed per request, got {}",
                config.max_station_ids,
                ids.len()
            )));
        }
        self.station_ids = ids;

        let mut metrics: Vec<Metric> = Vec::with_capacity(self.metrics.len());
        for metric in self.metrics {
            if !metrics.contains(&metric) {
                metrics.push(metric);
            }
        }
        self.metrics = metrics;

        self.date_range = self
            .date_range
            .clamped(config.history_start, config.history_end);
        self.page = self.page.max(1);
        self.page_size = match self.page_size {
            0 => config.default_page_size,
            size => size.min(config.max_page_size),
        };
        Ok(self)
    }

    /// Station, state and date predicate applied by the store.
    pub fn matches(&self, row: &ObservationRow) -> bool {
        (self.station_ids.is_empty() || self.station_ids.contains(&row.station.id))
            && self.state.is_none_or(|state| state == row.station.state)
            && self.date_range.contains(row.date())
    }
}
