//! Error types for the statistics pipeline

use thiserror::Error;

use crate::query::error::QueryError;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    /// Dataset schema could not be loaded
    #[error("Schema load error: {0}")]
    SchemaLoad(#[from] SchemaLoadError),

    /// Aggregation request failed validation
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Aggregation query failed in the service layer
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    /// Session rejected the operation in its current state
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Extrusion expression error
    #[error("Extrusion error: {0}")]
    Extrusion(#[from] ExtrusionError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Schema load errors
///
/// A failed load never leaves a partially populated catalog behind.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaLoadError {
    /// The feature service could not be reached or refused the load
    #[error("Feature service unavailable: {0}")]
    Unavailable(String),

    /// The schema was delivered but is malformed
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    /// Two fields in the schema share a name
    #[error("Duplicate field name in schema: {0}")]
    DuplicateField(String),
}

/// Request validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// No statistic definitions were added
    #[error("At least one statistic definition is required")]
    NoStatisticDefinitions,

    /// No group-by field was selected
    #[error("At least one group by field is required")]
    NoGroupByFields,

    /// Field does not exist in the catalog
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// Field is not eligible as a statistic target
    #[error("Field {0} is not numeric")]
    NotNumeric(String),

    /// Field is not eligible for grouping
    #[error("Field {0} cannot be used for grouping")]
    NotGroupable(String),

    /// Order-by spec references a field that is not grouped
    #[error("No order by entry for field: {0}")]
    UnknownOrderBy(String),

    /// Value could not be parsed
    #[error("Invalid format for {field}: {message}")]
    InvalidFormat {
        /// What was being parsed
        field: String,
        /// Description of the format error
        message: String,
    },
}

/// Session lifecycle errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A query is already outstanding
    #[error("A statistics query is already pending (generation {0})")]
    RequestPending(u64),

    /// The dataset schema has not been loaded yet
    #[error("Dataset schema is not loaded")]
    NotLoaded,
}

/// Extrusion expression errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtrusionError {
    /// Expression text could not be parsed
    #[error("Parse error at '{remaining}': {message}")]
    Parse {
        /// Unconsumed input where parsing stopped
        remaining: String,
        /// Description of the failure
        message: String,
    },

    /// Referenced attribute is missing from the feature
    #[error("Missing attribute: {0}")]
    MissingAttribute(String),

    /// Referenced attribute is not numeric
    #[error("Attribute {0} is not numeric")]
    NonNumericAttribute(String),

    /// Division by zero during evaluation
    #[error("Division by zero")]
    DivisionByZero,
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
