//! Argument value parsers for the command-line front end

use feature_stats::{SortDirection, StatisticKind};

/// A `--stat FIELD:KIND` argument
#[derive(Debug, Clone, PartialEq)]
pub struct StatArg {
    pub field: String,
    pub kind: StatisticKind,
}

/// A `--order-by FIELD[:asc|desc]` argument
#[derive(Debug, Clone, PartialEq)]
pub struct OrderArg {
    pub field: String,
    pub direction: SortDirection,
}

/// Parse `FIELD:KIND`, splitting on the last colon
pub fn parse_stat(value: &str) -> Result<StatArg, String> {
    let (field, kind) = value
        .rsplit_once(':')
        .ok_or_else(|| format!("expected FIELD:KIND, got '{}'", value))?;
    let field = field.trim();
    if field.is_empty() {
        return Err(format!("missing field name in '{}'", value));
    }
    let kind = kind.parse::<StatisticKind>().map_err(|e| e.to_string())?;
    Ok(StatArg {
        field: field.to_string(),
        kind,
    })
}

/// Parse `FIELD` or `FIELD:asc` / `FIELD:desc`
pub fn parse_order(value: &str) -> Result<OrderArg, String> {
    let (field, direction) = match value.rsplit_once(':') {
        Some((field, dir)) => (field, dir.parse::<SortDirection>().map_err(|e| e.to_string())?),
        None => (value, SortDirection::Ascending),
    };
    let field = field.trim();
    if field.is_empty() {
        return Err(format!("missing field name in '{}'", value));
    }
    Ok(OrderArg {
        field: field.to_string(),
        direction,
    })
}
