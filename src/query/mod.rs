//! Statistics query construction
//!
//! ```text
//! user selections
//!      │
//!      ▼
//! ┌──────────────────────────┐
//! │ AggregationRequestBuilder│  definitions, group by, order by
//! └──────────────────────────┘
//!      │ build_request()
//!      ▼
//! ┌──────────────────────────┐
//! │   AggregationRequest     │  immutable, validated snapshot
//! └──────────────────────────┘
//!      │ FeatureService::query_statistics
//!      ▼
//! ┌──────────────────────────┐
//! │  Vec<StatisticRecord>    │  service order preserved
//! └──────────────────────────┘
//! ```

pub mod builder;
pub mod error;
pub mod request;

// Re-export main types
pub use builder::{AggregationRequestBuilder, OrderByEntry};
pub use error::{QueryError, QueryErrorKind, QueryResult};
pub use request::{AggregationRequest, StatisticRecord};
