//! Feature Stats - grouped statistical queries over feature datasets
//!
//! This library drives an interactive statistics query workflow:
//! - Field catalog derived from a dataset schema
//! - Statistic definitions, group-by and order-by selection with cascading rules
//! - Immutable aggregation requests submitted through an async service seam
//! - A two-level, display-ready result tree
//! - Extrusion height expressions over feature attributes

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod catalog;
pub mod error;
pub mod projector;
pub mod session;
pub mod types;

/// Prometheus metrics and telemetry
pub mod metrics;

/// Configuration management with TOML support
pub mod config;

/// Request building, validation and query errors
pub mod query;

/// Feature service abstraction and the in-memory feature table
pub mod service;

/// Attribute expressions used to extrude features
pub mod extrusion;

// Re-export main types
pub use catalog::FieldCatalog;
pub use config::Config;
pub use error::{Error, Result};
pub use projector::{NodeId, ResultTree};
pub use query::{AggregationRequest, AggregationRequestBuilder, StatisticRecord};
pub use service::{FeatureService, InMemoryFeatureTable};
pub use session::{QueryOutcome, StatisticsSession};
pub use types::{
    DatasetSchema, FieldDescriptor, FieldType, FieldValue, OrderBySpec, SortDirection,
    StatisticDefinition, StatisticKind,
};
