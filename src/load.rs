use crate::error::{InsightsError, Result};
use crate::metrics::{Metric, MetricRegistry};
use crate::structs::ObservationRow;
use crate::transform::aggregate::PeriodAggregate;
use arrow_array::{Float64Array, RecordBatch, StringArray, UInt32Array};
use arrow_schema::{DataType, Field, Schema};
use csv::Writer;
use log::debug;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use serde::Serialize;
use std::{fs::File, io::Write, path::Path, sync::Arc};

/// Outcome of a CSV export that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStatus {
    /// Header plus this many data rows were written.
    Written(usize),
    /// Nothing matched; nothing was written.
    NoData,
}

/// Writes observation rows as CSV, restricted to the selected metrics.
///
/// Columns are `State`, `Station Name`, `Date`, then the metric columns in
/// canonical order (every metric when `metrics` is empty). Values carry
/// 2 decimals and absent values are written as empty cells.
///
/// # Arguments
/// * `writer` - Destination for the CSV bytes
/// * `rows` - Filtered observation rows, already in export order
/// * `metrics` - Coarse metrics whose columns are written
/// * `max_rows` - Largest number of data rows the export may hold
/// * `registry` - Metric table supplying headers and accessors
///
/// # Returns
/// Returns `ExportStatus::Written` with the data row count, or
/// `ExportStatus::NoData` when `rows` is empty.
///
/// # Errors
/// Returns `InsightsError::ExportLimitExceeded` when `rows` holds more than
/// `max_rows` entries; nothing is written in that case. Write failures surface
/// as `Csv`/`Io` errors.
pub fn write_csv<W: Write>(
    writer: W,
    rows: &[ObservationRow],
    metrics: &[Metric],
    max_rows: usize,
    registry: &MetricRegistry,
) -> Result<ExportStatus> {
    debug!(
        "Preparing CSV export of {} rows (metrics: {:?})",
        rows.len(),
        metrics
    );
    if rows.is_empty() {
        return Ok(ExportStatus::NoData);
    }
    if rows.len() > max_rows {
        return Err(InsightsError::ExportLimitExceeded {
            limit: max_rows,
            total: rows.len(),
        });
    }

    let fields = registry.expand(metrics);
    let specs: Vec<_> = registry.specs_for(&fields).collect();
    let mut writer = Writer::from_writer(writer);

    let mut header = vec!["State", "Station Name", "Date"];
    header.extend(specs.iter().map(|spec| spec.csv_header));
    writer.write_record(&header)?;

    for row in rows {
        let mut record = Vec::with_capacity(header.len());
        record.push(row.station.state.to_string());
        record.push(single_line(&row.station.station_name));
        record.push(row.date().format("%Y-%m-%d").to_string());
        record.extend(
            specs
                .iter()
                .map(|spec| format_value(spec.value(&row.observation))),
        );
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(ExportStatus::Written(rows.len()))
}

/// [`write_csv`] into a string.
///
/// # Returns
/// Returns `Ok(None)` when there was no data to export.
///
/// # Errors
/// Same as [`write_csv`], plus `InsightsError::Data` if the output is not UTF-8.
pub fn export_csv_string(
    rows: &[ObservationRow],
    metrics: &[Metric],
    max_rows: usize,
    registry: &MetricRegistry,
) -> Result<Option<String>> {
    let mut buffer = Vec::new();
    match write_csv(&mut buffer, rows, metrics, max_rows, registry)? {
        ExportStatus::NoData => Ok(None),
        ExportStatus::Written(_) => String::from_utf8(buffer)
            .map(Some)
            .map_err(|e| InsightsError::Data(format!("CSV output is not UTF-8: {}", e))),
    }
}

fn format_value(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_default()
}

fn single_line(text: &str) -> String {
    text.replace("\r\n", " ").replace(['\n', '\r'], " ")
}

/// Writes any serializable view to a pretty-formatted JSON file.
///
/// # Arguments
/// * `value` - View to serialize
/// * `output_path` - Path where the JSON file will be created
///
/// # Returns
/// Returns `Ok(())` on success.
///
/// # Errors
/// Returns error if file cannot be created or serialization fails.
pub fn write_json<T: Serialize + ?Sized>(value: &T, output_path: &Path) -> Result<()> {
    let file = File::create(output_path)?;
    serde_json::to_writer_pretty(file, value)?;
    Ok(())
}

/// Writes period aggregates to a columnar Parquet file using Arrow format.
///
/// # Arguments
/// * `results` - Slice of period aggregates to write
/// * `output_path` - Path where the Parquet file will be created
///
/// # Returns
/// Returns `Ok(())` on success.
///
/// # Errors
/// Returns error if file cannot be created, schema is invalid, or Arrow operations fail.
pub fn write_parquet(results: &[PeriodAggregate], output_path: &Path) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("station_id", DataType::UInt32, false),
        Field::new("station_name", DataType::Utf8, false),
        Field::new("period", DataType::Utf8, false),
        Field::new("avg_value", DataType::Float64, false),
        Field::new("min_value", DataType::Float64, false),
        Field::new("max_value", DataType::Float64, false),
    ]));

    let station_ids: UInt32Array = results.iter().map(|r| r.station_id).collect();
    let station_names: StringArray =
        StringArray::from_iter_values(results.iter().map(|r| r.station_name.as_str()));
    let periods: StringArray = StringArray::from_iter_values(results.iter().map(|r| r.period.as_str()));
    let avg_values: Float64Array = results.iter().map(|r| r.avg_value).collect();
    let min_values: Float64Array = results.iter().map(|r| r.min_value).collect();
    let max_values: Float64Array = results.iter().map(|r| r.max_value).collect();

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(station_ids),
            Arc::new(station_names),
            Arc::new(periods),
            Arc::new(avg_values),
            Arc::new(min_values),
            Arc::new(max_values),
        ],
    )?;

    let file = File::create(output_path)?;
    let props = WriterProperties::builder().build();
    let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;
    writer.write(&batch)?;
    writer.close()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::{State, Station};
    use crate::test_support::{melbourne_week, row_with};

    #[test]
    fn test_export_all_metrics() {
        let registry = MetricRegistry::standard();
        let csv = export_csv_string(&melbourne_week(), &[], 10, &registry)
            .unwrap()
            .unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 6);
        assert_eq!(
            lines[0],
            "State,Station Name,Date,Max Temperature (degC),Min Temperature (degC),Rainfall (mm),Max Humidity (%),Min Humidity (%),Wind Speed (m/s),Evapotranspiration (mm)"
        );
        assert_eq!(
            lines[1],
            "VIC,Melbourne,2024-01-01,25.00,15.00,0.00,70.00,40.00,5.00,2.00"
        );
    }

    #[test]
    fn test_export_uses_canonical_column_order() {
        let registry = MetricRegistry::standard();
        let csv = export_csv_string(
            &melbourne_week(),
            &[Metric::Wind, Metric::Temperature],
            10,
            &registry,
        )
        .unwrap()
        .unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "State,Station Name,Date,Max Temperature (degC),Min Temperature (degC),Wind Speed (m/s)"
        );
        assert_eq!(lines.next().unwrap(), "VIC,Melbourne,2024-01-01,25.00,15.00,5.00");
    }

    #[test]
    fn test_export_absent_values_and_newlines() {
        let registry = MetricRegistry::standard();
        let station = Arc::new(Station {
            id: 5,
            state: State::Sa,
            station_name: "Mount\nGambier".to_string(),
            latitude: -37.8,
            longitude: 140.8,
        });
        let rows = vec![row_with(&station, "2024-06-01", |o| o.rainfall_mm = Some(0.0))];
        let csv = export_csv_string(&rows, &[Metric::Rainfall, Metric::Wind], 10, &registry)
            .unwrap()
            .unwrap();

        assert_eq!(csv.lines().nth(1).unwrap(), "SA,Mount Gambier,2024-06-01,0.00,");
    }

    #[test]
    fn test_export_row_cap() {
        let registry = MetricRegistry::standard();
        let rows = melbourne_week();

        let result = export_csv_string(&rows, &[], 4, &registry);
        assert!(matches!(
            result,
            Err(InsightsError::ExportLimitExceeded { limit: 4, total: 5 })
        ));

        let mut buffer = Vec::new();
        let status = write_csv(&mut buffer, &rows, &[], 5, &registry).unwrap();
        assert_eq!(status, ExportStatus::Written(5));
    }

    #[test]
    fn test_export_no_data() {
        let registry = MetricRegistry::standard();
        assert_eq!(export_csv_string(&[], &[], 10, &registry).unwrap(), None);

        let mut buffer = Vec::new();
        let status = write_csv(&mut buffer, &[], &[], 0, &registry).unwrap();
        assert_eq!(status, ExportStatus::NoData);
        assert!(buffer.is_empty());
    }
}
