//! Aggregation Request Builder
//!
//! Holds the mutable selection state behind a statistics query and turns it
//! into an [`AggregationRequest`] snapshot on demand.
//!
//! Every group-by field owns exactly one order-by entry. Selecting a field for
//! grouping creates its entry (ascending); deselecting it deletes the entry
//! and drops it from the order-by selection. Entries are indexed by field
//! name so the cascade never scans unrelated entries.
//!
//! # Example
//!
//! ```rust
//! use feature_stats::query::AggregationRequestBuilder;
//! use feature_stats::types::{SortDirection, StatisticKind};
//!
//! let mut builder = AggregationRequestBuilder::new();
//! builder.add_statistic_definition("Population", StatisticKind::Average);
//! builder.set_group_by_selected("State", true);
//! builder.set_order_by_selected("State", true).unwrap();
//! builder.set_order_direction("State", SortDirection::Descending).unwrap();
//!
//! let request = builder.build_request().unwrap();
//! assert_eq!(request.group_by_fields(), ["State"]);
//! assert_eq!(request.order_by()[0].direction, SortDirection::Descending);
//! ```

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::ValidationError;
use crate::types::{OrderBySpec, SortDirection, StatisticDefinition, StatisticKind};

use super::request::AggregationRequest;

/// An order-by entry as shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderByEntry {
    /// The spec with its current direction
    pub spec: OrderBySpec,

    /// Whether the spec participates in the final ordering
    pub selected: bool,
}

/// Mutable selection state for a statistics query
#[derive(Debug, Clone, Default)]
pub struct AggregationRequestBuilder {
    /// Statistic definitions in insertion order
    definitions: Vec<StatisticDefinition>,

    /// Fast duplicate check for `definitions`
    definition_set: HashSet<StatisticDefinition>,

    /// Group-by fields in selection order
    group_by: Vec<String>,

    /// Field name to its dependent order-by direction
    order_by_index: HashMap<String, SortDirection>,

    /// Selected order-by fields in selection order
    selected_order_by: Vec<String>,
}

impl AggregationRequestBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------------
    // Statistic definitions
    // ------------------------------------------------------------------------

    /// Add a statistic definition
    ///
    /// Returns `false` without changing anything when the same
    /// (field, kind) pair is already present.
    pub fn add_statistic_definition(&mut self, field: &str, kind: StatisticKind) -> bool {
        let definition = StatisticDefinition::new(field, kind);
        if !self.definition_set.insert(definition.clone()) {
            debug!(field, kind = %kind, "Ignoring duplicate statistic definition");
            return false;
        }

        debug!(field, kind = %kind, "Added statistic definition");
        self.definitions.push(definition);
        true
    }

    /// Remove the definitions at the given positions
    ///
    /// Indices refer to [`statistic_definitions`](Self::statistic_definitions)
    /// before the call. Out-of-range and repeated indices are ignored.
    /// Returns the number of definitions removed.
    pub fn remove_statistic_definitions(&mut self, selected_indices: &[usize]) -> usize {
        if selected_indices.is_empty() {
            return 0;
        }

        let selected: HashSet<usize> = selected_indices.iter().copied().collect();
        let before = self.definitions.len();

        let mut index = 0;
        self.definitions.retain(|_| {
            let keep = !selected.contains(&index);
            index += 1;
            keep
        });
        self.definition_set = self.definitions.iter().cloned().collect();

        let removed = before - self.definitions.len();
        debug!(removed, remaining = self.definitions.len(), "Removed statistic definitions");
        removed
    }

    /// Current statistic definitions
    pub fn statistic_definitions(&self) -> &[StatisticDefinition] {
        &self.definitions
    }

    // ------------------------------------------------------------------------
    // Group by
    // ------------------------------------------------------------------------

    /// Select or deselect a field for grouping
    ///
    /// Selecting adds the field and an ascending order-by entry for it.
    /// Deselecting removes the field, its order-by entry and any order-by
    /// selection of it. Returns whether anything changed.
    pub fn set_group_by_selected(&mut self, field: &str, selected: bool) -> bool {
        if selected {
            if self.order_by_index.contains_key(field) {
                return false;
            }
            self.group_by.push(field.to_string());
            self.order_by_index
                .insert(field.to_string(), SortDirection::Ascending);
            debug!(field, "Selected group by field");
            true
        } else {
            if self.order_by_index.remove(field).is_none() {
                return false;
            }
            self.group_by.retain(|f| f != field);
            self.selected_order_by.retain(|f| f != field);
            debug!(field, "Deselected group by field");
            true
        }
    }

    /// Check whether a field is grouped
    pub fn is_group_by_selected(&self, field: &str) -> bool {
        self.order_by_index.contains_key(field)
    }

    /// Current group-by fields in selection order
    pub fn group_by_fields(&self) -> &[String] {
        &self.group_by
    }

    // ------------------------------------------------------------------------
    // Order by
    // ------------------------------------------------------------------------

    /// Include or exclude an order-by entry from the final ordering
    ///
    /// Group-by membership is not affected. Fails when the field has no
    /// order-by entry, i.e. is not grouped.
    pub fn set_order_by_selected(
        &mut self,
        field: &str,
        selected: bool,
    ) -> Result<bool, ValidationError> {
        if !self.order_by_index.contains_key(field) {
            return Err(ValidationError::UnknownOrderBy(field.to_string()));
        }

        let position = self.selected_order_by.iter().position(|f| f == field);
        let changed = match (selected, position) {
            (true, None) => {
                self.selected_order_by.push(field.to_string());
                true
            }
            (false, Some(i)) => {
                self.selected_order_by.remove(i);
                true
            }
            _ => false,
        };
        Ok(changed)
    }

    /// Change the direction of an order-by entry in place
    pub fn set_order_direction(
        &mut self,
        field: &str,
        direction: SortDirection,
    ) -> Result<(), ValidationError> {
        let entry = self
            .order_by_index
            .get_mut(field)
            .ok_or_else(|| ValidationError::UnknownOrderBy(field.to_string()))?;
        *entry = direction;
        Ok(())
    }

    /// Available order-by entries, one per group-by field
    pub fn order_by_entries(&self) -> Vec<OrderByEntry> {
        self.group_by
            .iter()
            .filter_map(|field| {
                self.order_by_index.get(field).map(|&direction| OrderByEntry {
                    spec: OrderBySpec::new(field.clone(), direction),
                    selected: self.selected_order_by.contains(field),
                })
            })
            .collect()
    }

    /// Selected order-by specs in selection order
    pub fn selected_order_by(&self) -> Vec<OrderBySpec> {
        self.selected_order_by
            .iter()
            .filter_map(|field| {
                self.order_by_index
                    .get(field)
                    .map(|&direction| OrderBySpec::new(field.clone(), direction))
            })
            .collect()
    }

    // ------------------------------------------------------------------------
    // Snapshot and reset
    // ------------------------------------------------------------------------

    /// Build an immutable request from the current selections
    pub fn build_request(&self) -> Result<AggregationRequest, ValidationError> {
        AggregationRequest::new(
            self.definitions.clone(),
            self.group_by.clone(),
            self.selected_order_by(),
        )
    }

    /// Clear every selection
    pub fn reset(&mut self) {
        self.definitions.clear();
        self.definition_set.clear();
        self.group_by.clear();
        self.order_by_index.clear();
        self.selected_order_by.clear();
    }

    /// Check whether nothing is selected
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty() && self.group_by.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ===== Statistic definition tests =====

    #[test]
    fn test_add_definition_is_idempotent() {
        let mut builder = AggregationRequestBuilder::new();
        assert!(builder.add_statistic_definition("Population", StatisticKind::Average));
        assert!(!builder.add_statistic_definition("Population", StatisticKind::Average));
        assert_eq!(builder.statistic_definitions().len(), 1);

        assert!(builder.add_statistic_definition("Population", StatisticKind::Sum));
        assert!(builder.add_statistic_definition("Density", StatisticKind::Average));
        assert_eq!(builder.statistic_definitions().len(), 3);
    }

    #[test]
    fn test_remove_definitions_by_index() {
        let mut builder = AggregationRequestBuilder::new();
        builder.add_statistic_definition("Population", StatisticKind::Average);
        builder.add_statistic_definition("Population", StatisticKind::Sum);
        builder.add_statistic_definition("Density", StatisticKind::Maximum);

        assert_eq!(builder.remove_statistic_definitions(&[0, 2, 2, 9]), 2);
        assert_eq!(
            builder.statistic_definitions(),
            [StatisticDefinition::new("Population", StatisticKind::Sum)]
        );

        // A removed definition can be added again
        assert!(builder.add_statistic_definition("Population", StatisticKind::Average));
    }

    #[test]
    fn test_remove_with_empty_selection() {
        let mut builder = AggregationRequestBuilder::new();
        builder.add_statistic_definition("Population", StatisticKind::Average);
        assert_eq!(builder.remove_statistic_definitions(&[]), 0);
        assert_eq!(builder.statistic_definitions().len(), 1);
    }

    // ===== Group by tests =====

    #[test]
    fn test_group_by_creates_order_by_entry() {
        let mut builder = AggregationRequestBuilder::new();
        assert!(builder.set_group_by_selected("State", true));
        assert!(!builder.set_group_by_selected("State", true));

        assert_eq!(builder.group_by_fields(), ["State"]);
        assert_eq!(
            builder.order_by_entries(),
            vec![OrderByEntry {
                spec: OrderBySpec::ascending("State"),
                selected: false,
            }]
        );
    }

    #[test]
    fn test_group_by_deselect_cascades() {
        let mut builder = AggregationRequestBuilder::new();
        builder.set_group_by_selected("State", true);
        builder.set_group_by_selected("County", true);
        builder.set_order_by_selected("County", true).unwrap();
        builder.set_order_by_selected("State", true).unwrap();
        builder
            .set_order_direction("County", SortDirection::Descending)
            .unwrap();

        assert!(builder.set_group_by_selected("State", false));

        assert_eq!(builder.group_by_fields(), ["County"]);
        assert_eq!(
            builder.selected_order_by(),
            vec![OrderBySpec::new("County", SortDirection::Descending)]
        );
        assert_eq!(builder.order_by_entries().len(), 1);
        assert!(!builder.set_group_by_selected("State", false));
    }

    #[test]
    fn test_reselected_field_starts_ascending_and_unselected() {
        let mut builder = AggregationRequestBuilder::new();
        builder.set_group_by_selected("State", true);
        builder.set_order_by_selected("State", true).unwrap();
        builder
            .set_order_direction("State", SortDirection::Descending)
            .unwrap();

        builder.set_group_by_selected("State", false);
        builder.set_group_by_selected("State", true);

        let entries = builder.order_by_entries();
        assert_eq!(entries[0].spec.direction, SortDirection::Ascending);
        assert!(!entries[0].selected);
    }

    // ===== Order by tests =====

    #[test]
    fn test_order_by_selection_order_is_kept() {
        let mut builder = AggregationRequestBuilder::new();
        builder.add_statistic_definition("Population", StatisticKind::Sum);
        builder.set_group_by_selected("State", true);
        builder.set_group_by_selected("County", true);
        builder.set_order_by_selected("County", true).unwrap();
        builder.set_order_by_selected("State", true).unwrap();

        let request = builder.build_request().unwrap();
        let order: Vec<&str> = request
            .order_by()
            .iter()
            .map(|s| s.field_name.as_str())
            .collect();
        assert_eq!(order, vec!["County", "State"]);
        // Group by order is independent of order-by selection order
        assert_eq!(request.group_by_fields(), ["State", "County"]);
    }

    #[test]
    fn test_order_by_toggle_does_not_touch_group_by() {
        let mut builder = AggregationRequestBuilder::new();
        builder.set_group_by_selected("State", true);
        assert_eq!(builder.set_order_by_selected("State", true), Ok(true));
        assert_eq!(builder.set_order_by_selected("State", true), Ok(false));
        assert_eq!(builder.set_order_by_selected("State", false), Ok(true));
        assert!(builder.is_group_by_selected("State"));
    }

    #[test]
    fn test_order_by_unknown_field() {
        let mut builder = AggregationRequestBuilder::new();
        assert_eq!(
            builder.set_order_by_selected("State", true),
            Err(ValidationError::UnknownOrderBy("State".to_string()))
        );
        assert!(builder
            .set_order_direction("State", SortDirection::Descending)
            .is_err());
    }

    #[test]
    fn test_unselected_order_by_excluded_from_request() {
        let mut builder = AggregationRequestBuilder::new();
        builder.add_statistic_definition("Population", StatisticKind::Sum);
        builder.set_group_by_selected("State", true);
        let request = builder.build_request().unwrap();
        assert!(request.order_by().is_empty());
    }

    // ===== Build and reset tests =====

    #[test]
    fn test_build_request_validation() {
        let mut builder = AggregationRequestBuilder::new();
        assert_eq!(
            builder.build_request(),
            Err(ValidationError::NoStatisticDefinitions)
        );

        builder.add_statistic_definition("Population", StatisticKind::Sum);
        assert_eq!(builder.build_request(), Err(ValidationError::NoGroupByFields));

        builder.set_group_by_selected("State", true);
        assert!(builder.build_request().is_ok());
    }

    #[test]
    fn test_request_is_a_snapshot() {
        let mut builder = AggregationRequestBuilder::new();
        builder.add_statistic_definition("Population", StatisticKind::Sum);
        builder.set_group_by_selected("State", true);
        builder.set_order_by_selected("State", true).unwrap();

        let request = builder.build_request().unwrap();
        builder
            .set_order_direction("State", SortDirection::Descending)
            .unwrap();
        builder.add_statistic_definition("Population", StatisticKind::Count);

        assert_eq!(request.order_by()[0].direction, SortDirection::Ascending);
        assert_eq!(request.statistic_definitions().len(), 1);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut builder = AggregationRequestBuilder::new();
        builder.add_statistic_definition("Population", StatisticKind::Sum);
        builder.set_group_by_selected("State", true);
        builder.set_order_by_selected("State", true).unwrap();

        builder.reset();

        assert!(builder.is_empty());
        assert!(builder.statistic_definitions().is_empty());
        assert!(builder.group_by_fields().is_empty());
        assert!(builder.order_by_entries().is_empty());
        assert!(builder.selected_order_by().is_empty());
        assert!(builder.add_statistic_definition("Population", StatisticKind::Sum));
    }
}
