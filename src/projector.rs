//! Result Projector
//!
//! Turns a list of [`StatisticRecord`]s into a two-level display tree:
//!
//! ```text
//! Ohio, Franklin                  <- root: group values joined
//!   ├── Population(Average): 1.2  <- leaf: "<label>: <value>"
//!   └── Density(Sum): 88
//! Texas, Travis
//!   └── ...
//! ```
//!
//! Roots keep the service order. Leaves keep the statistic key order of each
//! record and are materialized lazily on first expansion. A new result set
//! replaces the whole tree, expansion state included.

use std::fmt::Write as _;

use crate::query::StatisticRecord;

/// Separator between group values in a root label
pub const DEFAULT_GROUP_SEPARATOR: &str = ", ";

/// Address of a node in the result tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeId {
    /// A group node
    Root(usize),
    /// A statistic under a group node
    Leaf {
        /// Index of the parent group
        root: usize,
        /// Index of the statistic in the record
        index: usize,
    },
}

/// A group node and its lazily built children
#[derive(Debug, Clone)]
struct RootNode {
    record: StatisticRecord,
    label: String,
    children: Option<Vec<String>>,
    expanded: bool,
}

/// Display tree over the current aggregation result
#[derive(Debug, Clone)]
pub struct ResultTree {
    roots: Vec<RootNode>,
    group_by_fields: Vec<String>,
    separator: String,
}

impl ResultTree {
    /// Empty tree
    pub fn new() -> Self {
        Self::with_separator(DEFAULT_GROUP_SEPARATOR)
    }

    /// Empty tree with a custom group separator
    pub fn with_separator(separator: impl Into<String>) -> Self {
        Self {
            roots: Vec::new(),
            group_by_fields: Vec::new(),
            separator: separator.into(),
        }
    }

    /// Replace the tree with a new result set
    ///
    /// `group_by_fields` is the group-by selection of the request that
    /// produced `records`; it drives root labels.
    pub fn replace(&mut self, records: Vec<StatisticRecord>, group_by_fields: &[String]) {
        self.group_by_fields = group_by_fields.to_vec();
        self.roots = records
            .into_iter()
            .map(|record| {
                let label = root_label(&record, &self.group_by_fields, &self.separator);
                RootNode {
                    record,
                    label,
                    children: None,
                    expanded: false,
                }
            })
            .collect();
    }

    /// Drop every node
    pub fn clear(&mut self) {
        self.roots.clear();
        self.group_by_fields.clear();
    }

    /// Number of root nodes
    pub fn root_count(&self) -> usize {
        self.roots.len()
    }

    /// Check for an empty tree
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Number of children of a node, `None` for unknown nodes
    pub fn child_count(&self, node: NodeId) -> Option<usize> {
        match node {
            NodeId::Root(i) => self.roots.get(i).map(|r| r.record.statistics.len()),
            NodeId::Leaf { root, index } => self
                .roots
                .get(root)
                .filter(|r| index < r.record.statistics.len())
                .map(|_| 0),
        }
    }

    /// Whether a node can be expanded
    pub fn is_expandable(&self, node: NodeId) -> bool {
        match node {
            NodeId::Root(i) => self
                .roots
                .get(i)
                .is_some_and(|r| !r.record.statistics.is_empty()),
            NodeId::Leaf { .. } => false,
        }
    }

    /// Display label of a node
    pub fn label(&self, node: NodeId) -> Option<String> {
        match node {
            NodeId::Root(i) => self.roots.get(i).map(|r| r.label.clone()),
            NodeId::Leaf { root, index } => {
                let root = self.roots.get(root)?;
                match &root.children {
                    Some(children) => children.get(index).cloned(),
                    None => root
                        .record
                        .statistics
                        .get(index)
                        .map(|(label, value)| leaf_label(label, *value)),
                }
            }
        }
    }

    /// Expand a group node, materializing its children
    ///
    /// Returns the child labels, or `None` when the node is not expandable.
    pub fn expand(&mut self, root: usize) -> Option<&[String]> {
        let node = self.roots.get_mut(root)?;
        if node.record.statistics.is_empty() {
            return None;
        }

        node.expanded = true;
        if node.children.is_none() {
            let built = node
                .record
                .statistics
                .iter()
                .map(|(label, value)| leaf_label(label, *value))
                .collect();
            node.children = Some(built);
        }
        node.children.as_deref()
    }

    /// Collapse a group node; its children stay cached
    pub fn collapse(&mut self, root: usize) {
        if let Some(node) = self.roots.get_mut(root) {
            node.expanded = false;
        }
    }

    /// Whether a group node is currently expanded
    pub fn is_expanded(&self, root: usize) -> bool {
        self.roots.get(root).is_some_and(|r| r.expanded)
    }

    /// Record behind a group node
    pub fn record(&self, root: usize) -> Option<&StatisticRecord> {
        self.roots.get(root).map(|r| &r.record)
    }

    /// All records in display order
    pub fn records(&self) -> impl Iterator<Item = &StatisticRecord> {
        self.roots.iter().map(|r| &r.record)
    }

    /// Group-by fields the current labels were built from
    pub fn group_by_fields(&self) -> &[String] {
        &self.group_by_fields
    }

    /// Render the whole tree as indented text, every node expanded
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for root in &self.roots {
            let _ = writeln!(out, "{}", root.label);
            for (label, value) in &root.record.statistics {
                let _ = writeln!(out, "  {}", leaf_label(label, *value));
            }
        }
        out
    }
}

impl Default for ResultTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Label of a group node
///
/// Values of the selected group-by fields in selection order. Fields the
/// record has no value for, and null values, are skipped.
pub fn root_label(record: &StatisticRecord, group_by_fields: &[String], separator: &str) -> String {
    group_by_fields
        .iter()
        .filter_map(|field| record.group_value(field))
        .filter(|value| !value.is_null())
        .map(|value| value.to_string())
        .collect::<Vec<_>>()
        .join(separator)
}

/// Label of a statistic leaf
pub fn leaf_label(label: &str, value: f64) -> String {
    format!("{}: {}", label, value)
}
