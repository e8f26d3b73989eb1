//! Maps either transport's raw rows onto canonical [`ReportRow`]s.
//!
//! Every row gets exactly one key per requested dimension and metric, so a
//! result always has a uniform schema. Fields the provider omitted (the REST
//! transport drops zero-valued metrics) become `0` or an empty string.

use adpulse_core::{MetricValue, ReportError, ReportQuery, ReportRow};
use adpulse_fetch::AdapterKind;
use serde_json::Value;
use tracing::debug;

use super::catalog::{
    Conversion, dimension_field, dimension_output, metric_conversion, metric_field, metric_output,
    rest_path,
};
use super::raw::{ProviderRawResult, RpcRow, RpcValue};

/// Adapter-aware normalizer.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseNormalizer;

impl ResponseNormalizer {
    /// Normalizes one raw result for the query that produced it.
    ///
    /// # Errors
    ///
    /// Returns an unknown provider error if the raw shape does not belong to
    /// the adapter kind it is attributed to.
    pub fn normalize(
        raw: &ProviderRawResult,
        source: AdapterKind,
        query: &ReportQuery,
    ) -> Result<Vec<ReportRow>, ReportError> {
        let rows: Vec<ReportRow> = match (raw, source) {
            (ProviderRawResult::Rpc(result), AdapterKind::Primary) => result
                .rows
                .iter()
                .map(|row| Self::from_rpc(row, query))
                .collect(),
            (ProviderRawResult::Rest(result), AdapterKind::Fallback) => result
                .results
                .iter()
                .map(|entry| Self::from_rest(entry, query))
                .collect(),
            _ => {
                return Err(ReportError::unknown(format!(
                    "{source} adapter produced an unexpected result shape"
                )));
            }
        };
        debug!(rows = rows.len(), source = %source, "Normalized rows");
        Ok(rows)
    }

    fn from_rpc(row: &RpcRow, query: &ReportQuery) -> ReportRow {
        let mut out = ReportRow::new();
        for dimension in &query.dimensions {
            let value = row
                .get(&dimension_field(dimension))
                .map(ToString::to_string)
                .unwrap_or_default();
            out.dimension_values.insert(dimension_output(dimension), value);
        }
        for metric in &query.metrics {
            let conversion = metric_conversion(metric);
            let value = match row.get(&metric_field(metric)) {
                #[allow(clippy::cast_precision_loss)]
                Some(RpcValue::Integer(n)) => MetricValue::Number(conversion.apply(*n as f64)),
                Some(RpcValue::Double(n)) => MetricValue::Number(conversion.apply(*n)),
                Some(RpcValue::Text(s)) => convert_text(s, conversion),
                Some(RpcValue::Bool(b)) => MetricValue::Text(b.to_string()),
                None => MetricValue::Number(0.0),
            };
            out.metric_values.insert(metric_output(metric), value);
        }
        out
    }

    fn from_rest(entry: &Value, query: &ReportQuery) -> ReportRow {
        let mut out = ReportRow::new();
        for dimension in &query.dimensions {
            let value = match lookup(entry, &rest_path(&dimension_field(dimension))) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            };
            out.dimension_values.insert(dimension_output(dimension), value);
        }
        for metric in &query.metrics {
            let conversion = metric_conversion(metric);
            let value = match lookup(entry, &rest_path(&metric_field(metric))) {
                Some(Value::String(s)) => convert_text(s, conversion),
                Some(Value::Number(n)) => n.as_f64().map_or_else(
                    || MetricValue::Text(n.to_string()),
                    |v| MetricValue::Number(conversion.apply(v)),
                ),
                Some(Value::Null) | None => MetricValue::Number(0.0),
                Some(other) => MetricValue::Text(other.to_string()),
            };
            out.metric_values.insert(metric_output(metric), value);
        }
        out
    }
}

/// Numeric text is converted; anything else is kept verbatim.
fn convert_text(raw: &str, conversion: Conversion) -> MetricValue {
    match MetricValue::parse(raw) {
        MetricValue::Number(n) => MetricValue::Number(conversion.apply(n)),
        text @ MetricValue::Text(_) => text,
    }
}

fn lookup<'a>(entry: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(entry, |value, key| value.get(key))
}
