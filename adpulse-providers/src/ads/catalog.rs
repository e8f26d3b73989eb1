//! Field catalog: provider field paths, canonical output names and unit
//! conversions for requested dimensions and metrics.

/// How a raw metric value is converted before it lands in a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    /// Used as is.
    None,
    /// Micro-units, divided by 1,000,000.
    Micros,
    /// A ratio, multiplied by 100.
    Percent,
}

impl Conversion {
    /// Applies the conversion.
    pub fn apply(self, value: f64) -> f64 {
        match self {
            Self::None => value,
            Self::Micros => value / 1_000_000.0,
            Self::Percent => value * 100.0,
        }
    }
}

struct MetricSpec {
    field: &'static str,
    output: &'static str,
    conversion: Conversion,
}

const METRICS: &[MetricSpec] = &[
    MetricSpec {
        field: "cost_micros",
        output: "cost",
        conversion: Conversion::Micros,
    },
    MetricSpec {
        field: "conversions_value",
        output: "conversion_value",
        conversion: Conversion::None,
    },
    MetricSpec {
        field: "average_cpc",
        output: "average_cpc",
        conversion: Conversion::Micros,
    },
    MetricSpec {
        field: "average_cpm",
        output: "average_cpm",
        conversion: Conversion::Micros,
    },
    MetricSpec {
        field: "cost_per_conversion",
        output: "cost_per_conversion",
        conversion: Conversion::Micros,
    },
    MetricSpec {
        field: "ctr",
        output: "ctr",
        conversion: Conversion::Percent,
    },
    MetricSpec {
        field: "conversions_from_interactions_rate",
        output: "conversion_rate",
        conversion: Conversion::Percent,
    },
];

/// Dimension aliases that live in the `segments` namespace.
const SEGMENT_ALIASES: &[(&str, &str)] = &[
    ("date", "segments.date"),
    ("week", "segments.week"),
    ("month", "segments.month"),
    ("device", "segments.device"),
];

/// Converts `camelCase` to `snake_case`. Already-snake input is unchanged.
pub fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            if !out.is_empty() {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Converts `snake_case` to `camelCase`, the REST transport's key style.
pub fn to_camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn metric_spec(requested: &str) -> Option<&'static MetricSpec> {
    let field = to_snake_case(requested);
    METRICS.iter().find(|spec| spec.field == field)
}

/// Fully-qualified query field for a requested metric, e.g. `metrics.cost_micros`.
pub fn metric_field(requested: &str) -> String {
    format!("metrics.{}", to_snake_case(requested))
}

/// Canonical row key for a requested metric.
///
/// Cataloged metrics get their reporting name (`cost_micros` becomes `cost`);
/// anything else keeps the name it was requested under.
pub fn metric_output(requested: &str) -> String {
    metric_spec(requested).map_or_else(|| requested.to_string(), |spec| spec.output.to_string())
}

/// Unit conversion for a requested metric.
pub fn metric_conversion(requested: &str) -> Conversion {
    metric_spec(requested).map_or(Conversion::None, |spec| spec.conversion)
}

/// Fully-qualified query field for a requested dimension.
///
/// Dotted names are used as given; bare names resolve through the segment
/// aliases, falling back to the `segments` namespace.
pub fn dimension_field(requested: &str) -> String {
    if requested.contains('.') {
        return requested.to_string();
    }
    SEGMENT_ALIASES
        .iter()
        .find(|(alias, _)| *alias == requested)
        .map_or_else(
            || format!("segments.{}", to_snake_case(requested)),
            |(_, field)| (*field).to_string(),
        )
}

/// Canonical row key for a requested dimension: `campaign.id` becomes
/// `campaign_id`, bare names are kept.
pub fn dimension_output(requested: &str) -> String {
    requested.replace('.', "_")
}

/// Path of a query field inside a REST result entry, in camel case.
pub fn rest_path(field: &str) -> Vec<String> {
    field.split('.').map(to_camel_case).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_conversion() {
        assert_eq!(to_snake_case("activeUsers"), "active_users");
        assert_eq!(to_snake_case("cost_micros"), "cost_micros");
        assert_eq!(to_camel_case("cost_micros"), "costMicros");
        assert_eq!(to_camel_case("conversions_value"), "conversionsValue");
        assert_eq!(to_camel_case("ctr"), "ctr");
    }

    #[test]
    fn test_metric_catalog() {
        assert_eq!(metric_output("cost_micros"), "cost");
        assert_eq!(metric_output("costMicros"), "cost");
        assert_eq!(metric_output("conversions_value"), "conversion_value");
        assert_eq!(metric_output("activeUsers"), "activeUsers");
        assert_eq!(metric_conversion("average_cpc"), Conversion::Micros);
        assert_eq!(metric_conversion("ctr"), Conversion::Percent);
        assert_eq!(metric_conversion("clicks"), Conversion::None);
    }

    #[test]
    fn test_conversions() {
        assert_eq!(Conversion::Micros.apply(2_500_000.0), 2.5);
        assert_eq!(Conversion::Percent.apply(0.0534), 5.34);
        assert_eq!(Conversion::None.apply(7.0), 7.0);
    }

    #[test]
    fn test_dimension_fields() {
        assert_eq!(dimension_field("campaign.id"), "campaign.id");
        assert_eq!(dimension_field("date"), "segments.date");
        assert_eq!(dimension_field("sessionSource"), "segments.session_source");
        assert_eq!(dimension_output("campaign.name"), "campaign_name");
        assert_eq!(dimension_output("date"), "date");
    }

    #[test]
    fn test_rest_path() {
        assert_eq!(rest_path("metrics.cost_micros"), vec!["metrics", "costMicros"]);
        assert_eq!(rest_path("segments.date"), vec!["segments", "date"]);
    }
}
