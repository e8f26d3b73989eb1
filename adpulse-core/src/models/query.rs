//! Report queries and date ranges.

use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::account::AccountId;
use crate::error::ReportError;

/// Logical table queried when none is given.
pub const DEFAULT_RESOURCE: &str = "campaign";

// ============================================================================
// Date Range
// ============================================================================

/// An inclusive date range, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDateRange")]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

/// Unchecked wire form of [`DateRange`].
#[derive(Deserialize)]
struct RawDateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<RawDateRange> for DateRange {
    type Error = ReportError;

    fn try_from(raw: RawDateRange) -> Result<Self, Self::Error> {
        Self::new(raw.start, raw.end)
    }
}

impl DateRange {
    /// Creates a date range.
    ///
    /// # Errors
    ///
    /// Returns a query error if `start` is after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ReportError> {
        if start > end {
            return Err(ReportError::query(format!(
                "invalid date range: {start} is after {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// The last `days` days up to and including `today`.
    pub fn last_days_from(today: NaiveDate, days: u32) -> Self {
        Self {
            start: today - Duration::days(i64::from(days)),
            end: today,
        }
    }

    /// The last `days` days up to and including today (UTC).
    pub fn last_days(days: u32) -> Self {
        Self::last_days_from(Utc::now().date_naive(), days)
    }

    /// Parses a range from two `YYYY-MM-DD` strings.
    ///
    /// # Errors
    ///
    /// Returns a query error if either date is malformed or the range is inverted.
    pub fn parse(start: &str, end: &str) -> Result<Self, ReportError> {
        let parse = |raw: &str| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|e| ReportError::query(format!("invalid date {raw:?}: {e}")))
        };
        Self::new(parse(start)?, parse(end)?)
    }

    /// First day of the range.
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day of the range.
    pub fn end(&self) -> NaiveDate {
        self.end
    }
}

// ============================================================================
// Report Query
// ============================================================================

/// One metrics request over a date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportQuery {
    /// Normalized account identifier.
    pub account_id: AccountId,
    /// Logical table the fields are selected from.
    pub resource: String,
    /// Dimension fields, in request order.
    pub dimensions: Vec<String>,
    /// Metric fields, in request order.
    pub metrics: Vec<String>,
    /// Date range filter.
    pub date_range: DateRange,
    /// Metric to order by (descending); defaults to the first metric.
    pub order_by: Option<String>,
}

impl ReportQuery {
    /// Creates a validated query against the default logical table.
    ///
    /// # Errors
    ///
    /// Returns a query error if the account id is invalid, no fields are
    /// requested, or a field name contains characters outside
    /// `[A-Za-z0-9_.]`.
    pub fn new<D, M>(
        account_id: &str,
        dimensions: D,
        metrics: M,
        date_range: DateRange,
    ) -> Result<Self, ReportError>
    where
        D: IntoIterator,
        D::Item: Into<String>,
        M: IntoIterator,
        M::Item: Into<String>,
    {
        let query = Self {
            account_id: AccountId::parse(account_id)?,
            resource: DEFAULT_RESOURCE.to_string(),
            dimensions: dimensions.into_iter().map(Into::into).collect(),
            metrics: metrics.into_iter().map(Into::into).collect(),
            date_range,
            order_by: None,
        };
        query.validate()?;
        Ok(query)
    }

    /// Campaign performance: id, name, status and the delivery metrics.
    ///
    /// # Errors
    ///
    /// Returns a query error if the account id is invalid.
    pub fn campaign_performance(
        account_id: &str,
        date_range: DateRange,
    ) -> Result<Self, ReportError> {
        Self::new(
            account_id,
            ["campaign.id", "campaign.name", "campaign.status"],
            [
                "impressions",
                "clicks",
                "cost_micros",
                "conversions",
                "conversions_value",
                "ctr",
                "average_cpc",
            ],
            date_range,
        )
    }

    /// Daily active and new users.
    ///
    /// # Errors
    ///
    /// Returns a query error if the account id is invalid.
    pub fn active_users(account_id: &str, date_range: DateRange) -> Result<Self, ReportError> {
        Self::new(account_id, ["date"], ["activeUsers", "newUsers"], date_range)
    }

    /// Sessions and active users per traffic source.
    ///
    /// # Errors
    ///
    /// Returns a query error if the account id is invalid.
    pub fn traffic_sources(account_id: &str, date_range: DateRange) -> Result<Self, ReportError> {
        Self::new(
            account_id,
            ["sessionSource"],
            ["sessions", "activeUsers"],
            date_range,
        )
    }

    /// Selects from a different logical table.
    ///
    /// # Errors
    ///
    /// Returns a query error if the table name is not a plain identifier.
    pub fn with_resource(mut self, resource: impl Into<String>) -> Result<Self, ReportError> {
        self.resource = resource.into();
        self.validate()?;
        Ok(self)
    }

    /// Orders by a different metric.
    ///
    /// # Errors
    ///
    /// Returns a query error if the metric is not one of the requested metrics.
    pub fn with_order_by(mut self, metric: impl Into<String>) -> Result<Self, ReportError> {
        self.order_by = Some(metric.into());
        self.validate()?;
        Ok(self)
    }

    /// The metric results are ordered by, if any metric is requested.
    pub fn order_metric(&self) -> Option<&str> {
        self.order_by
            .as_deref()
            .or_else(|| self.metrics.first().map(String::as_str))
    }

    /// Re-checks field names, the logical table and the ordering metric.
    ///
    /// # Errors
    ///
    /// Returns a query error describing the first problem found.
    pub fn validate(&self) -> Result<(), ReportError> {
        if self.dimensions.is_empty() && self.metrics.is_empty() {
            return Err(ReportError::query("query selects no fields"));
        }
        if !is_identifier(&self.resource) || self.resource.contains('.') {
            return Err(ReportError::query(format!(
                "invalid resource name: {:?}",
                self.resource
            )));
        }
        for field in self.dimensions.iter().chain(&self.metrics) {
            if !is_identifier(field) {
                return Err(ReportError::query(format!("invalid field name: {field:?}")));
            }
        }
        if let Some(ref order_by) = self.order_by {
            if !self.metrics.contains(order_by) {
                return Err(ReportError::query(format!(
                    "order_by metric {order_by:?} is not selected"
                )));
            }
        }
        Ok(())
    }
}

/// Field names are embedded in the query language, so only a safe subset is allowed.
fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.ends_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_date_range_rejects_inverted() {
        let err = DateRange::new(date("2024-02-01"), date("2024-01-01")).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::QueryError);
    }

    #[test]
    fn test_date_range_deserialize_checks_order() {
        let range: DateRange =
            serde_json::from_str(r#"{"start": "2024-01-01", "end": "2024-01-31"}"#).unwrap();
        assert_eq!(range.end(), date("2024-01-31"));

        let inverted =
            serde_json::from_str::<DateRange>(r#"{"start": "2024-02-01", "end": "2024-01-01"}"#);
        let message = inverted.unwrap_err().to_string();
        assert!(message.contains("invalid date range"), "{message}");
    }

    #[test]
    fn test_date_range_single_day() {
        let range = DateRange::new(date("2024-01-01"), date("2024-01-01")).unwrap();
        assert_eq!(range.start(), range.end());
    }

    #[test]
    fn test_last_days() {
        let range = DateRange::last_days_from(date("2024-03-31"), 30);
        assert_eq!(range.start(), date("2024-03-01"));
        assert_eq!(range.end(), date("2024-03-31"));
    }

    #[test]
    fn test_parse_range() {
        assert!(DateRange::parse("2024-01-01", "2024-01-31").is_ok());
        assert!(DateRange::parse("2024-13-01", "2024-01-31").is_err());
    }

    #[test]
    fn test_query_normalizes_account() {
        let query = ReportQuery::campaign_performance("123-456", DateRange::last_days(30)).unwrap();
        assert_eq!(query.account_id.as_str(), "123456");
        assert_eq!(query.resource, "campaign");
        assert_eq!(query.order_metric(), Some("impressions"));
    }

    #[test]
    fn test_query_rejects_injection() {
        let result = ReportQuery::new(
            "1",
            ["campaign.id"],
            ["clicks FROM x --"],
            DateRange::last_days(1),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_query_rejects_empty_selection() {
        let result = ReportQuery::new(
            "1",
            Vec::<String>::new(),
            Vec::<String>::new(),
            DateRange::last_days(1),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_order_by_must_be_selected() {
        let query = ReportQuery::active_users("1", DateRange::last_days(7)).unwrap();
        assert!(query.clone().with_order_by("newUsers").is_ok());
        assert!(query.with_order_by("sessions").is_err());
    }

    #[test]
    fn test_with_resource() {
        let query = ReportQuery::traffic_sources("1", DateRange::last_days(7)).unwrap();
        assert_eq!(query.clone().with_resource("ad_group").unwrap().resource, "ad_group");
        assert!(query.with_resource("campaign; DROP").is_err());
    }
}
