use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use log::debug;
use station_insights::{
    AnalysisConfig, DEFAULT_CORRELATION_PAIRS, DateRange, FilterCriteria, Granularity,
    InMemoryStore, InsightsError, Metric, MetricRegistry, ObservationStore, SimpleLogger, State,
    aggregate, export_csv_string, page_view, resolve_latest, statistics_report, summarize,
    write_json, write_parquet,
};
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

static LOGGER: SimpleLogger = SimpleLogger;

/// Derived view to compute
#[derive(Debug, Clone, Copy, ValueEnum)]
enum View {
    Aggregate,
    Latest,
    Statistics,
    Summary,
    Records,
    Export,
    Stations,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Stations CSV file (id,state,station_name,latitude,longitude)
    #[arg(long)]
    stations: PathBuf,

    /// Observations CSV file (station_id,date,<metric columns>)
    #[arg(short, long)]
    observations: PathBuf,

    /// View to compute
    #[arg(short, long, value_enum)]
    view: View,

    /// Output base name (written under ./output/<name>/)
    #[arg(long, default_value = "output")]
    output: String,

    /// Station ids to filter by (e.g., 1,2,3). All stations when omitted.
    #[arg(long, value_delimiter = ',')]
    station_ids: Vec<u32>,

    /// State code to filter by (ACT, NSW, NT, QLD, SA, TAS, VIC, WA)
    #[arg(long)]
    state: Option<String>,

    /// Start date (inclusive), YYYY-MM-DD
    #[arg(long)]
    start_date: Option<NaiveDate>,

    /// End date (inclusive), YYYY-MM-DD
    #[arg(long)]
    end_date: Option<NaiveDate>,

    /// Metric keys to include (e.g., temperature,rainfall or temperature_max)
    #[arg(short, long, value_delimiter = ',')]
    metrics: Vec<String>,

    /// Metric for the aggregate and latest views
    #[arg(long, value_enum, default_value = "temperature")]
    metric: Metric,

    /// Bucket size for the aggregate view (daily, weekly, monthly, yearly)
    #[arg(long, default_value = "monthly")]
    granularity: String,

    /// Page number for the records view
    #[arg(long, default_value_t = 1)]
    page: usize,

    /// Page size for the records view
    #[arg(long, default_value_t = 500)]
    page_size: usize,

    /// Maximum number of rows the export view may write
    #[arg(long, default_value_t = 20_000)]
    max_export_rows: usize,

    /// Log level for output
    #[arg(long, default_value = "false")]
    debug: bool,
}

fn main() -> Result<(), InsightsError> {
    // Initialize timer and logger
    let total_start = Instant::now();
    log::set_logger(&LOGGER).map_err(|e| InsightsError::Data(e.to_string()))?;

    // Acquire CLI args
    let args = Args::parse();
    if args.debug {
        log::set_max_level(log::LevelFilter::Debug);
    } else {
        log::set_max_level(log::LevelFilter::Info);
    }

    let config = AnalysisConfig {
        max_export_rows: args.max_export_rows,
        ..AnalysisConfig::default()
    };
    let registry = MetricRegistry::standard();
    let criteria = FilterCriteria {
        station_ids: args.station_ids.clone(),
        state: args.state.as_deref().map(str::parse::<State>).transpose()?,
        date_range: DateRange::new(args.start_date, args.end_date),
        metrics: Metric::from_keys(&args.metrics)?,
        page: args.page,
        page_size: args.page_size,
    }
    .normalized(&config)?;

    println!("Station Insights! Weather observation analytics");
    debug!("View: {:?} | Criteria: {:?}", args.view, criteria);

    let load_start = Instant::now();
    let store = InMemoryStore::from_csv_files(&args.stations, &args.observations)?;
    println!(
        "Loaded {} observations in {:.2?}",
        store.len(),
        load_start.elapsed()
    );

    // Create output directory
    let output_dir = PathBuf::from(format!("./output/{}", args.output));
    fs::create_dir_all(&output_dir)?;
    let output_name = args
        .output
        .split(['/', '\\'])
        .next_back()
        .unwrap_or(&args.output)
        .to_string();
    let path_for = |extension: &str| output_dir.join(format!("{}.{}", output_name, extension));

    let processing_start = Instant::now();
    let fields = registry.normalize_keys(&args.metrics);
    let metric_spec = registry
        .spec(args.metric.primary_field())
        .ok_or_else(|| InsightsError::Data(format!("No registry entry for {}", args.metric)))?;

    match args.view {
        View::Aggregate => {
            let granularity = Granularity::from_name(&args.granularity);
            let rows = store.observations(&criteria);
            let buckets = aggregate(&rows, metric_spec, granularity);
            println!("Aggregated {} rows into {} buckets", rows.len(), buckets.len());
            write_json(&buckets, &path_for("json"))?;
            write_parquet(&buckets, &path_for("parquet"))?;
        }
        View::Latest => {
            let rows = store.observations(&criteria);
            let values = resolve_latest(&rows, metric_spec, &criteria.date_range);
            println!("Resolved values for {} stations", values.len());
            write_json(&values, &path_for("json"))?;
        }
        View::Statistics => {
            let rows = store.observations(&criteria);
            let outcome = statistics_report(&rows, &fields, &registry, DEFAULT_CORRELATION_PAIRS);
            match outcome.report() {
                Some(report) => println!(
                    "Described {} metrics over {} rows, dominant factor: {}",
                    report.statistics.len(),
                    report.sample_size,
                    report.dominant_factor
                ),
                None => println!(
                    "Insufficient data for analysis ({} rows)",
                    outcome.sample_size()
                ),
            }
            write_json(&outcome, &path_for("json"))?;
        }
        View::Summary => {
            let rows = store.observations(&criteria);
            let summary = summarize(&rows, &fields, &registry, &config.anomaly);
            for line in summary.insights.iter().chain(&summary.anomalies) {
                println!("  {}", line);
            }
            write_json(&summary, &path_for("json"))?;
        }
        View::Records => {
            let page = store.page(&criteria);
            let view = page_view(&page, &criteria, &registry);
            println!(
                "Page {}/{} ({} items)",
                view.pagination.page,
                view.pagination.total_pages,
                view.items.len()
            );
            write_json(&view, &path_for("json"))?;
        }
        View::Export => {
            let rows = store.observations(&criteria);
            match export_csv_string(&rows, &criteria.metrics, config.max_export_rows, &registry)? {
                Some(csv) => {
                    fs::write(path_for("csv"), csv)?;
                    println!("Exported {} rows", rows.len());
                }
                None => println!("No data found for the selected filters"),
            }
        }
        View::Stations => {
            let stations = store.stations(criteria.state);
            println!(
                "{} stations across {} states",
                stations.len(),
                store.states().len()
            );
            let stations: Vec<_> = stations.iter().map(|s| s.as_ref()).collect();
            write_json(&stations, &path_for("json"))?;
        }
    }
    let processing_time = processing_start.elapsed();
    println!("View computed in {:.2?}", processing_time);
    println!("\nWrote files to directory: {}", output_dir.display());

    let total_time = total_start.elapsed();
    debug!(
        "Performance breakdown: Processing={:.1}%",
        (processing_time.as_secs_f64() / total_time.as_secs_f64()) * 100.0
    );
    println!("\nTotal runtime: {:.2?}", total_time);
    Ok(())
}
