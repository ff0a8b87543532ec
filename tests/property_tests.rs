//! Property tests for request building and result projection
//!
//! Uses property-based testing (proptest) to check the selection invariants
//! of the request builder and the shape of the projected result tree.

use std::collections::HashSet;

use feature_stats::projector::{NodeId, ResultTree};
use feature_stats::query::{AggregationRequestBuilder, StatisticRecord};
use feature_stats::service::StatisticAccumulator;
use feature_stats::types::{SortDirection, StatisticKind};
use proptest::prelude::*;

// =============================================================================
// Test Data Strategies
// =============================================================================

const FIELDS: [&str; 5] = ["STATE_NAME", "SUB_REGION", "POP2007", "POP07_SQMI", "NAME"];

fn field_name() -> impl Strategy<Value = String> {
    prop::sample::select(FIELDS.to_vec()).prop_map(str::to_string)
}

fn statistic_kind() -> impl Strategy<Value = StatisticKind> {
    prop::sample::select(StatisticKind::ALL.to_vec())
}

/// One user action against the builder
#[derive(Debug, Clone)]
enum Action {
    Add(String, StatisticKind),
    Remove(Vec<usize>),
    Group(String, bool),
    Order(String, bool),
    Direction(String, SortDirection),
}

fn action() -> impl Strategy<Value = Action> {
    prop_oneof![
        (field_name(), statistic_kind()).prop_map(|(f, k)| Action::Add(f, k)),
        prop::collection::vec(0usize..8, 0..4).prop_map(Action::Remove),
        (field_name(), any::<bool>()).prop_map(|(f, s)| Action::Group(f, s)),
        (field_name(), any::<bool>()).prop_map(|(f, s)| Action::Order(f, s)),
        (field_name(), any::<bool>()).prop_map(|(f, desc)| {
            let direction = if desc {
                SortDirection::Descending
            } else {
                SortDirection::Ascending
            };
            Action::Direction(f, direction)
        }),
    ]
}

fn apply(builder: &mut AggregationRequestBuilder, action: &Action) {
    match action {
        Action::Add(field, kind) => {
            builder.add_statistic_definition(field, *kind);
        }
        Action::Remove(indices) => {
            builder.remove_statistic_definitions(indices);
        }
        Action::Group(field, selected) => {
            builder.set_group_by_selected(field, *selected);
        }
        Action::Order(field, selected) => {
            let _ = builder.set_order_by_selected(field, *selected);
        }
        Action::Direction(field, direction) => {
            let _ = builder.set_order_direction(field, *direction);
        }
    }
}

fn record(groups: usize, statistics: usize) -> StatisticRecord {
    let mut record = StatisticRecord::new();
    for g in 0..groups {
        record = record.with_group(format!("G{}", g), format!("value-{}", g));
    }
    for s in 0..statistics {
        record = record.with_statistic(format!("S{}(Sum)", s), s as f64);
    }
    record
}

// =============================================================================
// Builder Invariants
// =============================================================================

mod builder_props {
    use super::*;

    proptest! {
        /// No sequence of actions yields a duplicate definition
        #[test]
        fn definitions_stay_unique(actions in prop::collection::vec(action(), 0..64)) {
            let mut builder = AggregationRequestBuilder::new();
            for a in &actions {
                apply(&mut builder, a);
            }

            let definitions = builder.statistic_definitions();
            let unique: HashSet<_> = definitions.iter().collect();
            prop_assert_eq!(unique.len(), definitions.len());
        }

        /// Order-by entries always mirror the group-by fields
        #[test]
        fn order_by_follows_group_by(actions in prop::collection::vec(action(), 0..64)) {
            let mut builder = AggregationRequestBuilder::new();
            for a in &actions {
                apply(&mut builder, a);
            }

            let entries: Vec<String> = builder
                .order_by_entries()
                .into_iter()
                .map(|e| e.spec.field_name)
                .collect();
            prop_assert_eq!(entries.as_slice(), builder.group_by_fields());

            for spec in builder.selected_order_by() {
                prop_assert!(builder.is_group_by_selected(&spec.field_name));
            }
        }

        /// Deselecting a grouped field removes exactly its order-by state
        #[test]
        fn deselect_cascades_to_order_by(
            actions in prop::collection::vec(action(), 0..64),
            target in field_name(),
        ) {
            let mut builder = AggregationRequestBuilder::new();
            for a in &actions {
                apply(&mut builder, a);
            }

            let before: Vec<String> = builder
                .selected_order_by()
                .into_iter()
                .map(|s| s.field_name)
                .filter(|f| *f != target)
                .collect();
            let others: Vec<String> = builder
                .group_by_fields()
                .iter()
                .filter(|f| **f != target)
                .cloned()
                .collect();

            builder.set_group_by_selected(&target, false);

            let after: Vec<String> = builder
                .selected_order_by()
                .into_iter()
                .map(|s| s.field_name)
                .collect();
            prop_assert_eq!(after, before);
            prop_assert_eq!(builder.group_by_fields(), others.as_slice());
        }

        /// A request builds iff definitions and group-by are both non-empty
        #[test]
        fn build_requires_definitions_and_groups(
            actions in prop::collection::vec(action(), 0..64)
        ) {
            let mut builder = AggregationRequestBuilder::new();
            for a in &actions {
                apply(&mut builder, a);
            }

            let expected_ok = !builder.statistic_definitions().is_empty()
                && !builder.group_by_fields().is_empty();
            match builder.build_request() {
                Ok(request) => {
                    prop_assert!(expected_ok);
                    let selected = builder.selected_order_by();
                    prop_assert_eq!(request.order_by(), selected.as_slice());
                }
                Err(_) => prop_assert!(!expected_ok),
            }
        }
    }
}

// =============================================================================
// Projection Invariants
// =============================================================================

mod projection_props {
    use super::*;

    proptest! {
        /// N records give N roots, each with one child per statistic
        #[test]
        fn projection_preserves_shape(
            shapes in prop::collection::vec(0usize..6, 0..40),
            groups in 1usize..4,
        ) {
            let records: Vec<StatisticRecord> =
                shapes.iter().map(|&n| record(groups, n)).collect();
            let group_by: Vec<String> = (0..groups).map(|g| format!("G{}", g)).collect();

            let mut tree = ResultTree::new();
            tree.replace(records, &group_by);

            prop_assert_eq!(tree.root_count(), shapes.len());
            for (i, &n) in shapes.iter().enumerate() {
                prop_assert_eq!(tree.child_count(NodeId::Root(i)), Some(n));
                prop_assert_eq!(tree.is_expandable(NodeId::Root(i)), n > 0);
                if n > 0 {
                    prop_assert_eq!(tree.expand(i).map(|c| c.len()), Some(n));
                }
            }
        }
    }
}

// =============================================================================
// Accumulator Invariants
// =============================================================================

mod accumulator_props {
    use super::*;

    proptest! {
        /// Merging partial accumulators matches a single pass
        #[test]
        fn merge_matches_single_pass(
            values in prop::collection::vec(-1e6..1e6f64, 1..200),
            split in 0usize..200,
        ) {
            let split = split.min(values.len());
            let mut whole = StatisticAccumulator::new();
            let mut left = StatisticAccumulator::new();
            let mut right = StatisticAccumulator::new();
            for (i, &v) in values.iter().enumerate() {
                whole.add(v);
                if i < split { left.add(v) } else { right.add(v) }
            }
            left.merge(&right);

            for kind in StatisticKind::ALL {
                let a = whole.finalize(kind).unwrap_or(0.0);
                let b = left.finalize(kind).unwrap_or(0.0);
                let tolerance = 1e-6 * a.abs().max(1.0);
                prop_assert!((a - b).abs() <= tolerance, "{}: {} vs {}", kind, a, b);
            }
        }
    }
}
