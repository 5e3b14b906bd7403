use crate::error::InsightsError;
use crate::structs::Observation;
use serde::Serialize;
use std::{fmt, str::FromStr};

/// One numeric field of an [`Observation`].
///
/// Declaration order is the metric-priority order used for tie-breaks
/// and for the canonical column order of exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    TemperatureMax,
    TemperatureMin,
    Rainfall,
    HumidityMax,
    HumidityMin,
    Wind,
    Evapotranspiration,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::TemperatureMax,
        Field::TemperatureMin,
        Field::Rainfall,
        Field::HumidityMax,
        Field::HumidityMin,
        Field::Wind,
        Field::Evapotranspiration,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Field::TemperatureMax => "temperature_max",
            Field::TemperatureMin => "temperature_min",
            Field::Rainfall => "rainfall",
            Field::HumidityMax => "humidity_max",
            Field::HumidityMin => "humidity_min",
            Field::Wind => "wind",
            Field::Evapotranspiration => "evapotranspiration",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Field {
    type Err = InsightsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        Field::ALL
            .into_iter()
            .find(|field| field.key() == key)
            .ok_or_else(|| InsightsError::InvalidFilter(format!("Unknown metric field '{}'", s)))
    }
}

/// Public, coarse metric keys accepted by the aggregation, latest-value and
/// export views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Temperature,
    Rainfall,
    Humidity,
    Wind,
    Evapotranspiration,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::Temperature,
        Metric::Rainfall,
        Metric::Humidity,
        Metric::Wind,
        Metric::Evapotranspiration,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Metric::Temperature => "temperature",
            Metric::Rainfall => "rainfall",
            Metric::Humidity => "humidity",
            Metric::Wind => "wind",
            Metric::Evapotranspiration => "evapotranspiration",
        }
    }

    /// The field a single-valued view reads for this metric.
    pub fn primary_field(self) -> Field {
        match self {
            Metric::Temperature => Field::TemperatureMax,
            Metric::Rainfall => Field::Rainfall,
            Metric::Humidity => Field::HumidityMax,
            Metric::Wind => Field::Wind,
            Metric::Evapotranspiration => Field::Evapotranspiration,
        }
    }

    /// Every field covered by this metric, in canonical order.
    pub fn fields(self) -> &'static [Field] {
        match self {
            Metric::Temperature => &[Field::TemperatureMax, Field::TemperatureMin],
            Metric::Rainfall => &[Field::Rainfall],
            Metric::Humidity => &[Field::HumidityMax, Field::HumidityMin],
            Metric::Wind => &[Field::Wind],
            Metric::Evapotranspiration => &[Field::Evapotranspiration],
        }
    }

    /// Parses a mixed list of coarse and fine-grained keys into coarse
    /// metrics, keeping first-seen order.
    ///
    /// A fine-grained key selects the metric that covers it, so
    /// `temperature_max` selects [`Metric::Temperature`].
    ///
    /// # Errors
    ///
    /// Returns `InsightsError::InvalidFilter` for a key that names neither a
    /// metric nor a field.
    pub fn from_keys<S: AsRef<str>>(keys: &[S]) -> Result<Vec<Metric>, InsightsError> {
        let mut metrics = Vec::with_capacity(keys.len());
        for key in keys {
            let key = key.as_ref();
            let metric = match key.parse::<Metric>() {
                Ok(metric) => metric,
                Err(err) => key.parse::<Field>().map(Metric::from).map_err(|_| err)?,
            };
            if !metrics.contains(&metric) {
                metrics.push(metric);
            }
        }
        Ok(metrics)
    }
}

impl From<Field> for Metric {
    fn from(field: Field) -> Self {
        match field {
            Field::TemperatureMax | Field::TemperatureMin => Metric::Temperature,
            Field::Rainfall => Metric::Rainfall,
            Field::HumidityMax | Field::HumidityMin => Metric::Humidity,
            Field::Wind => Metric::Wind,
            Field::Evapotranspiration => Metric::Evapotranspiration,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Metric {
    type Err = InsightsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        Metric::ALL
            .into_iter()
            .find(|metric| metric.key() == key)
            .ok_or_else(|| {
                let valid: Vec<&str> = Metric::ALL.iter().map(|m| m.key()).collect();
                InsightsError::InvalidFilter(format!(
                    "Invalid metric '{}'. Valid options: {}",
                    s,
                    valid.join(", ")
                ))
            })
    }
}

/// Reads one field out of an observation.
pub type Accessor = fn(&Observation) -> Option<f64>;

/// Everything the views need to know about one field.
#[derive(Debug, Clone)]
pub struct MetricSpec {
    pub field: Field,
    pub accessor: Accessor,
    /// Name used for the dominant factor, e.g. "Maximum Temperature".
    pub display_name: &'static str,
    /// Label used by summaries and insight text.
    pub summary_label: &'static str,
    pub csv_header: &'static str,
    /// Raw column name in paginated observation listings.
    pub value_column: &'static str,
    /// Whether a minimum is meaningful enough to report as an insight or anomaly.
    pub reports_low_side: bool,
}

impl MetricSpec {
    pub fn value(&self, observation: &Observation) -> Option<f64> {
        (self.accessor)(observation)
    }
}

/// Immutable lookup table from field to [`MetricSpec`].
///
/// Built once and shared by reference with every view that needs metric
/// metadata.
#[derive(Debug, Clone)]
pub struct MetricRegistry {
    specs: Vec<MetricSpec>,
}

impl MetricRegistry {
    pub fn new(specs: Vec<MetricSpec>) -> Self {
        Self { specs }
    }

    /// The seven observation fields with their standard labels.
    pub fn standard() -> Self {
        Self::new(vec![
            MetricSpec {
                field: Field::TemperatureMax,
                accessor: |o| o.temp_max_c,
                display_name: "Maximum Temperature",
                summary_label: "Maximum temperature (°C)",
                csv_header: "Max Temperature (degC)",
                value_column: "temp_max_c",
                reports_low_side: true,
            },
            MetricSpec {
                field: Field::TemperatureMin,
                accessor: |o| o.temp_min_c,
                display_name: "Minimum Temperature",
                summary_label: "Minimum temperature (°C)",
                csv_header: "Min Temperature (degC)",
                value_column: "temp_min_c",
                reports_low_side: true,
            },
            MetricSpec {
                field: Field::Rainfall,
                accessor: |o| o.rainfall_mm,
                display_name: "Rainfall",
                summary_label: "Daily rainfall (mm)",
                csv_header: "Rainfall (mm)",
                value_column: "rainfall_mm",
                reports_low_side: false,
            },
            MetricSpec {
                field: Field::HumidityMax,
                accessor: |o| o.humidity_max_percent,
                display_name: "Maximum Humidity",
                summary_label: "Maximum humidity (%)",
                csv_header: "Max Humidity (%)",
                value_column: "humidity_max_percent",
                reports_low_side: true,
            },
            MetricSpec {
                field: Field::HumidityMin,
                accessor: |o| o.humidity_min_percent,
                display_name: "Minimum Humidity",
                summary_label: "Minimum humidity (%)",
                csv_header: "Min Humidity (%)",
                value_column: "humidity_min_percent",
                reports_low_side: true,
            },
            MetricSpec {
                field: Field::Wind,
                accessor: |o| o.wind_speed_ms,
                display_name: "Wind Speed",
                summary_label: "Wind speed (m/s)",
                csv_header: "Wind Speed (m/s)",
                value_column: "wind_speed_ms",
                reports_low_side: true,
            },
            MetricSpec {
                field: Field::Evapotranspiration,
                accessor: |o| o.evapotranspiration_mm,
                display_name: "Evapotranspiration",
                summary_label: "Evapotranspiration (mm)",
                csv_header: "Evapotranspiration (mm)",
                value_column: "evapotranspiration_mm",
                reports_low_side: false,
            },
        ])
    }

    pub fn spec(&self, field: Field) -> Option<&MetricSpec> {
        self.specs.iter().find(|spec| spec.field == field)
    }

    /// Specs in canonical order, restricted to `fields`.
    pub fn specs_for<'a>(&'a self, fields: &'a [Field]) -> impl Iterator<Item = &'a MetricSpec> {
        self.specs
            .iter()
            .filter(move |spec| fields.contains(&spec.field))
    }

    /// Fields covered by the selected coarse metrics in canonical order;
    /// an empty selection means every field.
    pub fn expand(&self, metrics: &[Metric]) -> Vec<Field> {
        self.specs
            .iter()
            .map(|spec| spec.field)
            .filter(|field| {
                metrics.is_empty() || metrics.iter().any(|m| m.fields().contains(field))
            })
            .collect()
    }

    /// Resolves a mixed list of fine-grained and coarse keys.
    ///
    /// Unknown keys are ignored, duplicates keep their first position and an
    /// empty result falls back to all registered fields.
    pub fn normalize_keys<S: AsRef<str>>(&self, keys: &[S]) -> Vec<Field> {
        let mut fields: Vec<Field> = Vec::new();
        for key in keys {
            let key = key.as_ref();
            let resolved: Vec<Field> = if let Ok(field) = key.parse::<Field>() {
                vec![field]
            } else if let Ok(metric) = key.parse::<Metric>() {
                metric.fields().to_vec()
            } else {
                Vec::new()
            };
            for field in resolved {
                if !fields.contains(&field) && self.spec(field).is_some() {
                    fields.push(field);
                }
            }
        }

        if fields.is_empty() {
            self.specs.iter().map(|spec| spec.field).collect()
        } else {
            fields
        }
    }
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
