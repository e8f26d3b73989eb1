//! Provider-shaped results, one variant per transport.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Raw result of one successful adapter call.
///
/// Zero entries means the provider genuinely matched no rows.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderRawResult {
    /// Typed rows from the native transport.
    Rpc(RpcSearchResult),
    /// Parsed JSON entries from the REST transport.
    Rest(RestSearchResult),
}

impl ProviderRawResult {
    /// Number of entries.
    pub fn len(&self) -> usize {
        match self {
            Self::Rpc(result) => result.rows.len(),
            Self::Rest(result) => result.results.len(),
        }
    }

    /// Returns true if the provider matched no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Native transport rows
// ============================================================================

/// Result of the native transport's `search` method.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RpcSearchResult {
    /// Rows keyed by fully-qualified, snake-case field path.
    #[serde(default)]
    pub rows: Vec<RpcRow>,
}

/// One typed row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RpcRow(pub BTreeMap<String, RpcValue>);

impl RpcRow {
    /// Returns the value of a field.
    pub fn get(&self, field: &str) -> Option<&RpcValue> {
        self.0.get(field)
    }
}

/// A typed field value. Enum fields arrive as their names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RpcValue {
    /// 64-bit integer (counts, micros, ids).
    Integer(i64),
    /// Floating point (ratios, conversions).
    Double(f64),
    /// Boolean.
    Bool(bool),
    /// String or enum name.
    Text(String),
}

impl fmt::Display for RpcValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

// ============================================================================
// REST transport entries
// ============================================================================

/// Accumulated `results` of every page of a REST search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestSearchResult {
    /// Result entries: nested dimension objects plus a `metrics` object.
    pub results: Vec<serde_json::Value>,
}
