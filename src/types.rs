//! Core data types used throughout the statistics pipeline
//!
//! # Key Types
//!
//! - **`FieldType`**: Declared type tag of a dataset attribute
//! - **`FieldDescriptor`** / **`DatasetSchema`**: The loaded dataset layout
//! - **`FieldValue`**: A single attribute value (group keys, feature rows)
//! - **`StatisticKind`**: The aggregation applied to a field
//! - **`StatisticDefinition`**: A (field, kind) pair, one output column
//! - **`OrderBySpec`**: A (field, direction) pair controlling result order
//!
//! All selection types are immutable values compared structurally.
//!
//! # Example
//!
//! ```rust
//! use feature_stats::types::{StatisticDefinition, StatisticKind};
//!
//! let def = StatisticDefinition::new("Population", StatisticKind::Average);
//! assert_eq!(def.output_label(), "Population(Average)");
//! assert_eq!(def.to_string(), "Population (Average)");
//! ```

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{SchemaLoadError, ValidationError};

// ============================================================================
// Schema Types
// ============================================================================

/// Declared type of a dataset field
///
/// Serializes as its canonical name. Deserialization accepts every name
/// `FromStr` does, aliases included, case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum FieldType {
    /// System object identifier
    ObjectId,
    /// System global identifier
    GlobalId,
    /// 16-bit integer
    Int16,
    /// 32-bit integer
    Int32,
    /// 64-bit integer
    Int64,
    /// Single precision float
    Float,
    /// Double precision float
    Double,
    /// Text
    Text,
    /// Date
    Date,
    /// User GUID
    Guid,
    /// Geometry column
    Geometry,
    /// Binary blob
    Blob,
    /// Raster
    Raster,
    /// XML document
    Xml,
}

impl FieldType {
    /// Identifier and system-generated fields never appear in the catalog
    pub fn is_identifier(&self) -> bool {
        matches!(self, FieldType::ObjectId | FieldType::GlobalId)
    }

    /// Types eligible as statistic targets
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldType::Double | FieldType::Float | FieldType::Int32 | FieldType::Int16
        )
    }

    /// Canonical lower-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::ObjectId => "object_id",
            FieldType::GlobalId => "global_id",
            FieldType::Int16 => "int16",
            FieldType::Int32 => "int32",
            FieldType::Int64 => "int64",
            FieldType::Float => "float",
            FieldType::Double => "double",
            FieldType::Text => "text",
            FieldType::Date => "date",
            FieldType::Guid => "guid",
            FieldType::Geometry => "geometry",
            FieldType::Blob => "blob",
            FieldType::Raster => "raster",
            FieldType::Xml => "xml",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = match s.to_ascii_lowercase().as_str() {
            "object_id" | "oid" => FieldType::ObjectId,
            "global_id" | "globalid" => FieldType::GlobalId,
            "int16" | "short" => FieldType::Int16,
            "int32" | "integer" => FieldType::Int32,
            "int64" | "long" => FieldType::Int64,
            "float" | "single" => FieldType::Float,
            "double" => FieldType::Double,
            "text" | "string" => FieldType::Text,
            "date" => FieldType::Date,
            "guid" => FieldType::Guid,
            "geometry" => FieldType::Geometry,
            "blob" => FieldType::Blob,
            "raster" => FieldType::Raster,
            "xml" => FieldType::Xml,
            other => {
                return Err(ValidationError::InvalidFormat {
                    field: "field type".to_string(),
                    message: format!("unrecognized type '{}'", other),
                })
            }
        };
        Ok(parsed)
    }
}

impl TryFrom<String> for FieldType {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A single field in a dataset schema
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Field name, unique within the dataset
    pub name: String,

    /// Declared type tag
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl FieldDescriptor {
    /// Create a new field descriptor
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

/// The layout of a loaded dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSchema {
    /// Human-readable dataset name
    pub name: String,

    /// Fields in declaration order
    pub fields: Vec<FieldDescriptor>,
}

impl DatasetSchema {
    /// Create a schema from a name and ordered fields
    pub fn new(name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Check that field names are non-empty and unique
    pub fn validate(&self) -> Result<(), SchemaLoadError> {
        let mut seen = HashSet::with_capacity(self.fields.len());
        for field in &self.fields {
            if field.name.trim().is_empty() {
                return Err(SchemaLoadError::InvalidSchema(
                    "field with empty name".to_string(),
                ));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaLoadError::DuplicateField(field.name.clone()));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Attribute Values
// ============================================================================

/// A single attribute value
///
/// Deserializes from plain JSON scalars: `null`, integers, floats and strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Missing value
    Null,
    /// Integer value
    Integer(i64),
    /// Floating point value
    Double(f64),
    /// Text value
    Text(String),
}

impl FieldValue {
    /// Numeric view of the value, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(v) => Some(*v as f64),
            FieldValue::Double(v) => Some(*v),
            FieldValue::Null | FieldValue::Text(_) => None,
        }
    }

    /// Check for a missing value
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Total order used when sorting grouped results
    ///
    /// Nulls sort first, then numbers (compared numerically), then text.
    pub fn sort_cmp(&self, other: &FieldValue) -> Ordering {
        fn rank(v: &FieldValue) -> u8 {
            match v {
                FieldValue::Null => 0,
                FieldValue::Integer(_) | FieldValue::Double(_) => 1,
                FieldValue::Text(_) => 2,
            }
        }

        match (self, other) {
            (FieldValue::Integer(a), FieldValue::Integer(b)) => a.cmp(b),
            (FieldValue::Text(a), FieldValue::Text(b)) => a.cmp(b),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                _ => rank(self).cmp(&rank(other)),
            },
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Integer(v) => write!(f, "{}", v),
            FieldValue::Double(v) => write!(f, "{}", v),
            FieldValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Double(v)
    }
}

// ============================================================================
// Statistic Definitions
// ============================================================================

/// Aggregation applied to a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StatisticKind {
    /// Arithmetic mean
    Average,
    /// Number of non-null values
    Count,
    /// Largest value
    Maximum,
    /// Smallest value
    Minimum,
    /// Sample standard deviation
    StandardDeviation,
    /// Sum of values
    Sum,
    /// Sample variance
    Variance,
}

impl StatisticKind {
    /// All kinds in presentation order
    pub const ALL: [StatisticKind; 7] = [
        StatisticKind::Average,
        StatisticKind::Count,
        StatisticKind::Maximum,
        StatisticKind::Minimum,
        StatisticKind::StandardDeviation,
        StatisticKind::Sum,
        StatisticKind::Variance,
    ];

    /// Display name
    pub fn as_str(&self) -> &'static str {
        match self {
            StatisticKind::Average => "Average",
            StatisticKind::Count => "Count",
            StatisticKind::Maximum => "Maximum",
            StatisticKind::Minimum => "Minimum",
            StatisticKind::StandardDeviation => "StandardDeviation",
            StatisticKind::Sum => "Sum",
            StatisticKind::Variance => "Variance",
        }
    }
}

impl fmt::Display for StatisticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatisticKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        StatisticKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str().eq_ignore_ascii_case(wanted))
            .or(match wanted.to_ascii_lowercase().as_str() {
                "avg" | "mean" => Some(StatisticKind::Average),
                "max" => Some(StatisticKind::Maximum),
                "min" => Some(StatisticKind::Minimum),
                "stddev" | "std" => Some(StatisticKind::StandardDeviation),
                "var" => Some(StatisticKind::Variance),
                _ => None,
            })
            .ok_or_else(|| ValidationError::InvalidFormat {
                field: "statistic kind".to_string(),
                message: format!("unrecognized statistic '{}'", wanted),
            })
    }
}

/// One computed output column: a statistic over a field
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatisticDefinition {
    /// Field the statistic is computed on
    pub field_name: String,

    /// Aggregation applied
    pub kind: StatisticKind,
}

impl StatisticDefinition {
    /// Create a new statistic definition
    pub fn new(field_name: impl Into<String>, kind: StatisticKind) -> Self {
        Self {
            field_name: field_name.into(),
            kind,
        }
    }

    /// Key used for this statistic in result records: `field(Kind)`
    pub fn output_label(&self) -> String {
        format!("{}({})", self.field_name, self.kind)
    }
}

impl fmt::Display for StatisticDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.field_name, self.kind)
    }
}

// ============================================================================
// Ordering
// ============================================================================

/// Sort direction of an order-by entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortDirection {
    /// Smallest first
    #[default]
    Ascending,
    /// Largest first
    Descending,
}

impl SortDirection {
    /// Apply this direction to an ascending comparison
    pub fn apply(&self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Ascending => f.write_str("Ascending"),
            SortDirection::Descending => f.write_str("Descending"),
        }
    }
}

impl FromStr for SortDirection {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortDirection::Ascending),
            "desc" | "descending" => Ok(SortDirection::Descending),
            other => Err(ValidationError::InvalidFormat {
                field: "sort direction".to_string(),
                message: format!("expected asc or desc, got '{}'", other),
            }),
        }
    }
}

/// A (field, direction) pair controlling result order
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderBySpec {
    /// Grouped field to order by
    pub field_name: String,

    /// Sort direction
    pub direction: SortDirection,
}

impl OrderBySpec {
    /// Create a new order-by spec
    pub fn new(field_name: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field_name: field_name.into(),
            direction,
        }
    }

    /// Ascending order on a field
    pub fn ascending(field_name: impl Into<String>) -> Self {
        Self::new(field_name, SortDirection::Ascending)
    }
}
