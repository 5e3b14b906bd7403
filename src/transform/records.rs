use crate::filter::FilterCriteria;
use crate::metrics::MetricRegistry;
use crate::store::Page;
use crate::structs::State;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherRecord {
    pub station_id: u32,
    pub station_name: String,
    pub state: State,
    pub date: String,
    /// Raw metric columns, keyed by column name. Only selected metrics appear.
    #[serde(flatten)]
    pub values: BTreeMap<&'static str, Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pagination {
    pub page: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherPage {
    pub items: Vec<WeatherRecord>,
    pub pagination: Pagination,
}

/// Projects one page of rows onto the metrics selected in `criteria`.
pub fn page_view(page: &Page, criteria: &FilterCriteria, registry: &MetricRegistry) -> WeatherPage {
    let fields = registry.expand(&criteria.metrics);
    let items = page
        .rows
        .iter()
        .map(|row| WeatherRecord {
            station_id: row.station.id,
            station_name: row.station.station_name.clone(),
            state: row.station.state,
            date: row.date().format("%Y-%m-%d").to_string(),
            values: registry
                .specs_for(&fields)
                .map(|spec| (spec.value_column, spec.value(&row.observation)))
                .collect(),
        })
        .collect();

    let page_size = criteria.page_size.max(1);
    WeatherPage {
        items,
        pagination: Pagination {
            page: criteria.page,
            page_size,
            total_items: page.total,
            total_pages: page.total.div_ceil(page_size),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::Metric;
    use crate::test_support::melbourne_week;

    #[test]
    fn test_page_view_projects_selected_metrics() {
        let registry = MetricRegistry::standard();
        let rows = melbourne_week();
        let page = Page {
            rows: rows[..2].to_vec(),
            total: 5,
        };
        let criteria = FilterCriteria {
            metrics: vec![Metric::Temperature],
            page: 1,
            page_size: 2,
            ..FilterCriteria::default()
        };

        let view = page_view(&page, &criteria, &registry);
        assert_eq!(view.items.len(), 2);
        assert_eq!(view.pagination.total_items, 5);
        assert_eq!(view.pagination.total_pages, 3);

        let first = &view.items[0];
        assert_eq!(first.date, "2024-01-01");
        assert_eq!(
            first.values.keys().copied().collect::<Vec<_>>(),
            vec!["temp_max_c", "temp_min_c"]
        );
        let json = serde_json::to_value(first).unwrap();
        assert_eq!(json["temp_max_c"], 25.0);
        assert!(json.get("rainfall_mm").is_none());
    }

    #[test]
    fn test_page_view_defaults_to_every_metric() {
        let registry = MetricRegistry::standard();
        let page = Page {
            rows: melbourne_week(),
            total: 5,
        };
        let view = page_view(&page, &FilterCriteria::default(), &registry);
        assert_eq!(view.items[0].values.len(), 7);
        assert_eq!(view.pagination.total_pages, 1);
    }
}
