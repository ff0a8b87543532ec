//! Feature service seam
//!
//! The pipeline never talks to a dataset directly. It loads a schema and
//! runs statistics queries through a [`FeatureService`], which in production
//! wraps a remote feature-service client and in tests is an
//! [`InMemoryFeatureTable`].

pub mod accumulator;
pub mod memory;

use async_trait::async_trait;

use crate::error::SchemaLoadError;
use crate::query::{AggregationRequest, QueryResult, StatisticRecord};
use crate::types::DatasetSchema;

pub use accumulator::StatisticAccumulator;
pub use memory::{DatasetDocument, InMemoryFeatureTable};

/// Source of dataset schemas and grouped statistics
#[async_trait]
pub trait FeatureService: Send + Sync {
    /// Load the dataset schema
    ///
    /// Either the complete schema or a single error; never a partial result.
    async fn load_schema(&self) -> Result<DatasetSchema, SchemaLoadError>;

    /// Execute a grouped statistics query
    ///
    /// Record order and statistic key order are defined by the service.
    async fn query_statistics(
        &self,
        request: &AggregationRequest,
    ) -> QueryResult<Vec<StatisticRecord>>;
}
