//! Query-language rendering.
//!
//! ```text
//! SELECT campaign.id, metrics.impressions
//! FROM campaign
//! WHERE segments.date BETWEEN '2024-01-01' AND '2024-01-31'
//! ORDER BY metrics.impressions DESC
//! ```

use adpulse_core::ReportQuery;

use super::catalog::{dimension_field, metric_field};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Renders a validated query as a read-only query-language string.
///
/// Field names were restricted to `[A-Za-z0-9_.]` when the query was built,
/// so they are interpolated as is.
pub fn build_query(query: &ReportQuery) -> String {
    let fields: Vec<String> = query
        .dimensions
        .iter()
        .map(|d| dimension_field(d))
        .chain(query.metrics.iter().map(|m| metric_field(m)))
        .collect();

    let mut gaql = format!(
        "SELECT {} FROM {} WHERE segments.date BETWEEN '{}' AND '{}'",
        fields.join(", "),
        query.resource,
        query.date_range.start().format(DATE_FORMAT),
        query.date_range.end().format(DATE_FORMAT),
    );

    if let Some(metric) = query.order_metric() {
        gaql.push_str(" ORDER BY ");
        gaql.push_str(&metric_field(metric));
        gaql.push_str(" DESC");
    }
    gaql
}

#[cfg(test)]
mod tests {
    use adpulse_core::DateRange;

    use super::*;

    fn range() -> DateRange {
        DateRange::parse("2024-01-01", "2024-01-31").unwrap()
    }

    #[test]
    fn test_campaign_query() {
        let query = ReportQuery::campaign_performance("123-456", range()).unwrap();
        assert_eq!(
            build_query(&query),
            "SELECT campaign.id, campaign.name, campaign.status, metrics.impressions, \
             metrics.clicks, metrics.cost_micros, metrics.conversions, \
             metrics.conversions_value, metrics.ctr, metrics.average_cpc \
             FROM campaign WHERE segments.date BETWEEN '2024-01-01' AND '2024-01-31' \
             ORDER BY metrics.impressions DESC"
        );
    }

    #[test]
    fn test_date_alias_and_order_override() {
        let query = ReportQuery::active_users("1", range())
            .unwrap()
            .with_order_by("newUsers")
            .unwrap();
        let gaql = build_query(&query);
        assert!(gaql.starts_with("SELECT segments.date, metrics.active_users, metrics.new_users"));
        assert!(gaql.ends_with("ORDER BY metrics.new_users DESC"));
    }

    #[test]
    fn test_dimension_only_query_has_no_order() {
        let query = ReportQuery::new("1", ["campaign.id"], Vec::<String>::new(), range()).unwrap();
        assert!(!build_query(&query).contains("ORDER BY"));
    }
}
