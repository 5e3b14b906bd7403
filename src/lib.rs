pub mod error;
pub mod filter;
pub mod load;
pub mod metrics;
pub mod store;
pub mod structs;
pub mod transform;

#[cfg(test)]
mod test_support;

// Re-export public API
pub use error::{InsightsError, Result};
pub use filter::{DateRange, FilterCriteria};
pub use load::{ExportStatus, export_csv_string, write_csv, write_json, write_parquet};
pub use metrics::{Field, Metric, MetricRegistry, MetricSpec};
pub use store::{InMemoryStore, ObservationStore, Page};
pub use structs::{AnalysisConfig, Observation, ObservationRow, SimpleLogger, State, Station};
pub use transform::aggregate::{Granularity, PeriodAggregate, aggregate};
pub use transform::anomaly::{Anomaly, AnomalyThresholds, Side};
pub use transform::correlation::{Correlation, CorrelationPair, DEFAULT_CORRELATION_PAIRS};
pub use transform::latest::{StationValue, resolve_latest};
pub use transform::records::{WeatherPage, page_view};
pub use transform::statistics::{StatisticsOutcome, StatisticsReport, statistics_report};
pub use transform::summary::{WeatherSummary, summarize};
