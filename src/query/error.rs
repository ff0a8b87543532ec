//! Statistics query error types
//!
//! Errors raised by a feature service while executing an aggregation
//! request. The session surfaces them to the caller and keeps the prior
//! result set untouched.

use std::fmt;

use thiserror::Error;

/// A failed statistics query as reported by the feature service
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct QueryError {
    /// What went wrong on the service side
    pub kind: QueryErrorKind,
    /// Service-provided detail
    pub message: String,
    /// Transport or backend error behind this one
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl QueryError {
    /// Error of `kind` with a service message
    pub fn new(kind: QueryErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Attach the transport or backend error that caused this failure
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// The service could not be reached
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(QueryErrorKind::Unavailable, message)
    }

    /// The service refused the request: unknown or non-numeric field
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(QueryErrorKind::Rejected, message)
    }

    /// The request was accepted but computing the statistics failed
    pub fn execution(message: impl Into<String>) -> Self {
        Self::new(QueryErrorKind::ExecutionError, message)
    }

    /// No response within the service's time limit
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(QueryErrorKind::Timeout, message)
    }

    /// The grouping produced more records than the service returns
    pub fn resource_limit(message: impl Into<String>) -> Self {
        Self::new(QueryErrorKind::ResourceLimit, message)
    }

    /// Whether re-issuing the same request may succeed
    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

/// Service-side failure categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// Service unreachable or not loaded
    Unavailable,
    /// Request refused by the service (unknown field, bad statistic)
    Rejected,
    /// Statistics computation failed
    ExecutionError,
    /// Service exceeded its time limit
    Timeout,
    /// Too many groups for the service to return
    ResourceLimit,
}

impl QueryErrorKind {
    /// `status` label on the query metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryErrorKind::Unavailable => "unavailable",
            QueryErrorKind::Rejected => "rejected",
            QueryErrorKind::ExecutionError => "execution",
            QueryErrorKind::Timeout => "timeout",
            QueryErrorKind::ResourceLimit => "resource_limit",
        }
    }

    /// Outages and timeouts; the request itself was fine
    pub fn is_transient(&self) -> bool {
        matches!(self, QueryErrorKind::Unavailable | QueryErrorKind::Timeout)
    }
}

impl fmt::Display for QueryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            QueryErrorKind::Unavailable => "service unavailable",
            QueryErrorKind::Rejected => "request rejected",
            QueryErrorKind::ExecutionError => "statistics computation failed",
            QueryErrorKind::Timeout => "query timed out",
            QueryErrorKind::ResourceLimit => "too many groups",
        };
        f.write_str(text)
    }
}

/// Result of a statistics query
pub type QueryResult<T> = std::result::Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    // ===== QueryError tests =====

    #[test]
    fn test_rejected_field_message() {
        let err = QueryError::rejected("statistic field 'STATE_NAME' is not numeric");
        assert_eq!(err.kind, QueryErrorKind::Rejected);
        assert_eq!(
            err.to_string(),
            "request rejected: statistic field 'STATE_NAME' is not numeric"
        );
        assert!(!err.is_transient());
    }

    #[test]
    fn test_transport_cause_is_chained() {
        use std::error::Error;
        let io_err = std::io::Error::new(std::io::ErrorKind::TimedOut, "socket timed out");
        let err = QueryError::timeout("statistics request timed out").with_source(io_err);
        assert!(err.is_transient());
        assert_eq!(err.source().unwrap().to_string(), "socket timed out");
        assert!(QueryError::unavailable("offline").source().is_none());
    }

    // ===== QueryErrorKind tests =====

    #[test]
    fn test_transient_kinds() {
        assert!(QueryErrorKind::Unavailable.is_transient());
        assert!(QueryErrorKind::Timeout.is_transient());
        assert!(!QueryErrorKind::ResourceLimit.is_transient());
        assert!(!QueryErrorKind::ExecutionError.is_transient());
    }

    #[test]
    fn test_metric_labels() {
        assert_eq!(QueryErrorKind::ResourceLimit.as_str(), "resource_limit");
        assert_eq!(QueryErrorKind::ExecutionError.as_str(), "execution");
    }
}
