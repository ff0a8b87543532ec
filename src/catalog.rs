//! Field Catalog
//!
//! Derives the selectable fields of a loaded dataset. The catalog is built
//! once from a complete schema and never changes afterwards; a failed load
//! produces no catalog at all.

use tracing::debug;

use crate::error::SchemaLoadError;
use crate::types::{DatasetSchema, FieldDescriptor, FieldType};

/// Selectable fields derived from a dataset schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldCatalog {
    /// Dataset name shown as the catalog title
    dataset_name: String,

    /// All non-identifier fields, in schema order
    fields: Vec<FieldDescriptor>,

    /// Indices into `fields` of the numeric subset
    numeric: Vec<usize>,
}

impl FieldCatalog {
    /// Build a catalog from a loaded schema
    ///
    /// The schema is validated first; on error nothing is derived.
    pub fn from_schema(schema: &DatasetSchema) -> Result<Self, SchemaLoadError> {
        schema.validate()?;

        let fields: Vec<FieldDescriptor> = schema
            .fields
            .iter()
            .filter(|f| !f.field_type.is_identifier())
            .cloned()
            .collect();

        let numeric = fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.field_type.is_numeric())
            .map(|(i, _)| i)
            .collect::<Vec<_>>();

        debug!(
            dataset = %schema.name,
            schema_fields = schema.fields.len(),
            groupable = fields.len(),
            numeric = numeric.len(),
            "Built field catalog"
        );

        Ok(Self {
            dataset_name: schema.name.clone(),
            fields,
            numeric,
        })
    }

    /// Human-readable dataset name
    pub fn dataset_name(&self) -> &str {
        &self.dataset_name
    }

    /// Title used by presentation layers
    pub fn title(&self) -> String {
        format!("Statistics: {}", self.dataset_name)
    }

    /// Fields available for grouping (identifiers excluded)
    pub fn group_by_fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Fields available as statistic targets
    pub fn numeric_fields(&self) -> impl Iterator<Item = &FieldDescriptor> + '_ {
        self.numeric.iter().map(move |&i| &self.fields[i])
    }

    /// Names of the group-by candidates
    pub fn group_by_field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Names of the numeric subset
    pub fn numeric_field_names(&self) -> Vec<&str> {
        self.numeric_fields().map(|f| f.name.as_str()).collect()
    }

    /// Look up a selectable field
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Declared type of a selectable field
    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.field(name).map(|f| f.field_type)
    }

    /// Check whether a field can be grouped on
    pub fn is_groupable(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Check whether a field can carry a statistic
    pub fn is_numeric(&self, name: &str) -> bool {
        self.field_type(name).is_some_and(|t| t.is_numeric())
    }

    /// Number of selectable fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if no field is selectable
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
