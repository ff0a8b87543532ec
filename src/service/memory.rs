//! In-memory feature table
//!
//! A [`FeatureService`] over an owned schema and attribute rows. It computes
//! grouped statistics locally, which makes it the reference service for tests
//! and for the command-line front end.
//!
//! Grouping keeps groups in first-seen order. When the request carries
//! order-by specs, groups are then stably sorted by them. Statistics that
//! have no value for a group (for example the average of a group whose
//! values are all null) are left out of that group's record.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result, SchemaLoadError};
use crate::query::{AggregationRequest, QueryError, QueryErrorKind, QueryResult, StatisticRecord};
use crate::types::{DatasetSchema, FieldDescriptor, FieldValue};

use super::accumulator::StatisticAccumulator;
use super::FeatureService;

/// A single feature's attributes
pub type Feature = HashMap<String, FieldValue>;

// ============================================================================
// Dataset Document
// ============================================================================

/// JSON layout accepted by [`InMemoryFeatureTable::from_json_str`]
///
/// ```json
/// {
///   "name": "Counties",
///   "fields": [{ "name": "State", "type": "text" }],
///   "features": [{ "State": "Ohio" }]
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetDocument {
    /// Dataset name
    pub name: String,

    /// Fields in declaration order
    pub fields: Vec<FieldDescriptor>,

    /// Feature attribute rows
    #[serde(default)]
    pub features: Vec<Feature>,
}

// ============================================================================
// Group Keys
// ============================================================================

/// Hashable identity of one group value
///
/// Integral finite doubles collapse onto integers so `2` and `2.0` share a
/// group. NaN is canonicalized and stays distinct from null.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum GroupKey {
    Null,
    Integer(i64),
    Float(u64),
    Text(String),
}

impl From<&FieldValue> for GroupKey {
    fn from(value: &FieldValue) -> Self {
        // 2^63; every integral double in [-2^63, 2^63) fits an i64
        const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

        match value {
            FieldValue::Null => GroupKey::Null,
            FieldValue::Integer(v) => GroupKey::Integer(*v),
            FieldValue::Double(v)
                if v.is_finite() && v.fract() == 0.0 && (-I64_BOUND..I64_BOUND).contains(v) =>
            {
                GroupKey::Integer(*v as i64)
            }
            FieldValue::Double(v) if v.is_nan() => GroupKey::Float(f64::NAN.to_bits()),
            FieldValue::Double(v) => GroupKey::Float(v.to_bits()),
            FieldValue::Text(v) => GroupKey::Text(v.clone()),
        }
    }
}

// ============================================================================
// In-Memory Table
// ============================================================================

/// Feature service backed by rows held in memory
#[derive(Debug)]
pub struct InMemoryFeatureTable {
    /// Dataset layout
    schema: DatasetSchema,

    /// Attribute rows
    features: Vec<Feature>,

    /// Simulated service latency
    latency: Option<Duration>,

    /// Maximum groups a query may return
    max_records: Option<usize>,

    /// Error returned by every schema load while set
    schema_failure: Mutex<Option<SchemaLoadError>>,

    /// Error returned by the next query only
    query_failure: Mutex<Option<(QueryErrorKind, String)>>,
}

impl InMemoryFeatureTable {
    /// Create a table from a schema and rows
    pub fn new(schema: DatasetSchema, features: Vec<Feature>) -> Self {
        Self {
            schema,
            features,
            latency: None,
            max_records: None,
            schema_failure: Mutex::new(None),
            query_failure: Mutex::new(None),
        }
    }

    /// Create a table from a parsed dataset document
    pub fn from_document(document: DatasetDocument) -> Self {
        let schema = DatasetSchema::new(document.name, document.fields);
        Self::new(schema, document.features)
    }

    /// Parse a dataset document from JSON text
    pub fn from_json_str(json: &str) -> Result<Self> {
        let document: DatasetDocument =
            serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(Self::from_document(document))
    }

    /// Read a dataset document from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&contents)
    }

    /// Delay every service call by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Fail queries that would return more than `limit` groups
    pub fn with_max_records(mut self, limit: usize) -> Self {
        self.max_records = Some(limit);
        self
    }

    /// Make schema loads fail until cleared with `None`
    pub fn set_schema_failure(&self, failure: Option<SchemaLoadError>) {
        *self.schema_failure.lock() = failure;
    }

    /// Make the next query fail
    pub fn fail_next_query(&self, kind: QueryErrorKind, message: impl Into<String>) {
        *self.query_failure.lock() = Some((kind, message.into()));
    }

    /// Append a feature row
    pub fn push_feature(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    /// Number of feature rows
    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    /// Schema of the table
    pub fn schema(&self) -> &DatasetSchema {
        &self.schema
    }

    /// Feature rows
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    /// Check that every referenced field exists and fits its role
    fn check_request(&self, request: &AggregationRequest) -> QueryResult<()> {
        for field in request.group_by_fields() {
            if self.schema.field(field).is_none() {
                return Err(QueryError::rejected(format!(
                    "group by field '{}' does not exist",
                    field
                )));
            }
        }

        for definition in request.statistic_definitions() {
            match self.schema.field(&definition.field_name) {
                None => {
                    return Err(QueryError::rejected(format!(
                        "statistic field '{}' does not exist",
                        definition.field_name
                    )))
                }
                Some(f) if !f.field_type.is_numeric() => {
                    return Err(QueryError::rejected(format!(
                        "statistic field '{}' is not numeric ({})",
                        definition.field_name, f.field_type
                    )))
                }
                Some(_) => {}
            }
        }

        Ok(())
    }

    /// Compute grouped statistics
    pub fn compute(&self, request: &AggregationRequest) -> QueryResult<Vec<StatisticRecord>> {
        self.check_request(request)?;

        let group_by = request.group_by_fields();
        let definitions = request.statistic_definitions();

        let mut group_index: HashMap<Vec<GroupKey>, usize> = HashMap::new();
        let mut groups: Vec<(Vec<FieldValue>, Vec<StatisticAccumulator>)> = Vec::new();

        for feature in &self.features {
            let key: Vec<FieldValue> = group_by
                .iter()
                .map(|f| feature.get(f).cloned().unwrap_or(FieldValue::Null))
                .collect();
            let normalized = key.iter().map(GroupKey::from).collect();

            let slot = *group_index.entry(normalized).or_insert_with(|| {
                groups.push((key, vec![StatisticAccumulator::new(); definitions.len()]));
                groups.len() - 1
            });

            let accumulators = &mut groups[slot].1;
            for (acc, definition) in accumulators.iter_mut().zip(definitions) {
                if let Some(value) = feature.get(&definition.field_name).and_then(|v| v.as_f64())
                {
                    acc.add(value);
                }
            }
        }

        if let Some(limit) = self.max_records {
            if groups.len() > limit {
                return Err(QueryError::resource_limit(format!(
                    "query produced {} groups (limit: {})",
                    groups.len(),
                    limit
                )));
            }
        }

        let mut records: Vec<StatisticRecord> = groups
            .into_iter()
            .map(|(key, accumulators)| {
                let group_values = group_by.iter().cloned().zip(key).collect();
                let statistics = definitions
                    .iter()
                    .zip(&accumulators)
                    .filter_map(|(d, acc)| acc.finalize(d.kind).map(|v| (d.output_label(), v)))
                    .collect();
                StatisticRecord {
                    group_values,
                    statistics,
                }
            })
            .collect();

        if !request.order_by().is_empty() {
            records.sort_by(|a, b| {
                request
                    .order_by()
                    .iter()
                    .map(|spec| {
                        let left = a.group_value(&spec.field_name).unwrap_or(&FieldValue::Null);
                        let right = b.group_value(&spec.field_name).unwrap_or(&FieldValue::Null);
                        spec.direction.apply(left.sort_cmp(right))
                    })
                    .find(|o| o.is_ne())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }

        debug!(
            dataset = %self.schema.name,
            features = self.features.len(),
            groups = records.len(),
            statistics = definitions.len(),
            "Computed grouped statistics"
        );

        Ok(records)
    }
}

#[async_trait]
impl FeatureService for InMemoryFeatureTable {
    async fn load_schema(&self) -> std::result::Result<DatasetSchema, SchemaLoadError> {
        self.simulate_latency().await;

        if let Some(failure) = self.schema_failure.lock().clone() {
            warn!(dataset = %self.schema.name, error = %failure, "Schema load failed");
            return Err(failure);
        }

        Ok(self.schema.clone())
    }

    async fn query_statistics(
        &self,
        request: &AggregationRequest,
    ) -> QueryResult<Vec<StatisticRecord>> {
        self.simulate_latency().await;

        if let Some((kind, message)) = self.query_failure.lock().take() {
            return Err(QueryError::new(kind, message));
        }

        self.compute(request)
    }
}
