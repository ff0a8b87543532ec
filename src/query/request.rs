//! Aggregation requests and their results
//!
//! An [`AggregationRequest`] is an immutable snapshot of the user's
//! selections. It can only be constructed with at least one statistic
//! definition and one group-by field. A service answers it with a list of
//! [`StatisticRecord`]s whose order, and whose key order, is preserved all
//! the way to the display tree.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::{FieldValue, OrderBySpec, StatisticDefinition};

// ============================================================================
// Request
// ============================================================================

/// A validated statistics query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregationRequest {
    statistic_definitions: Vec<StatisticDefinition>,
    group_by_fields: Vec<String>,
    order_by: Vec<OrderBySpec>,
}

impl AggregationRequest {
    /// Create a request, enforcing the completeness invariants
    ///
    /// Repeated definitions and group-by fields are collapsed to their first
    /// occurrence.
    pub fn new(
        statistic_definitions: Vec<StatisticDefinition>,
        group_by_fields: Vec<String>,
        order_by: Vec<OrderBySpec>,
    ) -> Result<Self, ValidationError> {
        if statistic_definitions.is_empty() {
            return Err(ValidationError::NoStatisticDefinitions);
        }
        if group_by_fields.is_empty() {
            return Err(ValidationError::NoGroupByFields);
        }

        let mut seen = HashSet::new();
        let statistic_definitions = statistic_definitions
            .into_iter()
            .filter(|d| seen.insert(d.clone()))
            .collect();

        let mut seen = HashSet::new();
        let group_by_fields: Vec<String> = group_by_fields
            .into_iter()
            .filter(|f| seen.insert(f.clone()))
            .collect();

        for spec in &order_by {
            if !group_by_fields.contains(&spec.field_name) {
                return Err(ValidationError::UnknownOrderBy(spec.field_name.clone()));
            }
        }

        Ok(Self {
            statistic_definitions,
            group_by_fields,
            order_by,
        })
    }

    /// Statistics to compute per group
    pub fn statistic_definitions(&self) -> &[StatisticDefinition] {
        &self.statistic_definitions
    }

    /// Fields to partition records by, in selection order
    pub fn group_by_fields(&self) -> &[String] {
        &self.group_by_fields
    }

    /// Result ordering, in selection order
    pub fn order_by(&self) -> &[OrderBySpec] {
        &self.order_by
    }
}

// ============================================================================
// Result Records
// ============================================================================

/// One group of an aggregation result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticRecord {
    /// Group-by field name to group value, in service order
    pub group_values: Vec<(String, FieldValue)>,

    /// Statistic label (`field(Kind)`) to computed value, in service order
    pub statistics: Vec<(String, f64)>,
}

impl StatisticRecord {
    /// Create an empty record
    pub fn new() -> Self {
        Self {
            group_values: Vec::new(),
            statistics: Vec::new(),
        }
    }

    /// Add a group value
    pub fn with_group(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.group_values.push((field.into(), value.into()));
        self
    }

    /// Add a statistic value
    pub fn with_statistic(mut self, label: impl Into<String>, value: f64) -> Self {
        self.statistics.push((label.into(), value));
        self
    }

    /// Value of a group-by field
    pub fn group_value(&self, field: &str) -> Option<&FieldValue> {
        self.group_values
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, v)| v)
    }

    /// Value of a statistic by label
    pub fn statistic(&self, label: &str) -> Option<f64> {
        self.statistics
            .iter()
            .find(|(name, _)| name == label)
            .map(|(_, v)| *v)
    }
}

impl Default for StatisticRecord {
    fn default() -> Self {
        Self::new()
    }
}
