//! Canonical report rows.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Metric Value
// ============================================================================

/// A metric value.
///
/// Values that do not parse as numbers are kept in their original form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    /// A numeric value.
    Number(f64),
    /// A value that failed numeric parsing.
    Text(String),
}

impl MetricValue {
    /// Parses a raw value, keeping the original text if it is not numeric.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => Self::Number(n),
            _ => Self::Text(raw.to_string()),
        }
    }

    /// Returns the numeric value, if any.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }
}

impl From<f64> for MetricValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

// ============================================================================
// Report Row
// ============================================================================

/// One canonical result row.
///
/// All rows of one query result share the same dimension and metric keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    /// Dimension values by canonical name.
    pub dimension_values: BTreeMap<String, String>,
    /// Metric values by canonical name.
    pub metric_values: BTreeMap<String, MetricValue>,
}

impl ReportRow {
    /// Creates an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a dimension value.
    pub fn dimension(&self, name: &str) -> Option<&str> {
        self.dimension_values.get(name).map(String::as_str)
    }

    /// Returns a metric value.
    pub fn metric(&self, name: &str) -> Option<&MetricValue> {
        self.metric_values.get(name)
    }

    /// Returns a numeric metric value.
    pub fn metric_f64(&self, name: &str) -> Option<f64> {
        self.metric(name).and_then(MetricValue::as_f64)
    }

    /// Flattens dimensions and metrics into one JSON object.
    pub fn to_flat_json(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut map = serde_json::Map::new();
        for (key, value) in &self.dimension_values {
            map.insert(key.clone(), serde_json::Value::String(value.clone()));
        }
        for (key, value) in &self.metric_values {
            let json = match value {
                MetricValue::Number(n) => serde_json::Number::from_f64(*n)
                    .map_or(serde_json::Value::Null, serde_json::Value::Number),
                MetricValue::Text(s) => serde_json::Value::String(s.clone()),
            };
            map.insert(key.clone(), json);
        }
        map
    }

    fn same_schema(&self, other: &Self) -> bool {
        self.dimension_values.keys().eq(other.dimension_values.keys())
            && self.metric_values.keys().eq(other.metric_values.keys())
    }
}

/// Returns true if every row has the same dimension and metric keys.
pub fn has_uniform_schema(rows: &[ReportRow]) -> bool {
    match rows.split_first() {
        Some((first, rest)) => rest.iter().all(|row| row.same_schema(first)),
        None => true,
    }
}
