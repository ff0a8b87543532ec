//! Statistics session
//!
//! Ties the catalog, the request builder and the result tree to one dataset
//! and drives the request lifecycle:
//!
//! ```text
//!          begin_query() ok
//!   Idle ────────────────────▶ Pending(generation)
//!    ▲                              │
//!    │  complete_query(ticket)      │  success: results replaced
//!    └──────────────────────────────┘  failure: results kept, error returned
//! ```
//!
//! At most one query is outstanding. `begin_query` while Pending is rejected.
//! Every query carries the generation it was issued under; `reset` bumps the
//! generation so a response that arrives afterwards is discarded instead of
//! overwriting the cleared state.
//!
//! All mutation happens through `&mut self` on one logical thread.

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::catalog::FieldCatalog;
use crate::error::{Result, SchemaLoadError, SessionError, ValidationError};
use crate::metrics;
use crate::projector::{ResultTree, DEFAULT_GROUP_SEPARATOR};
use crate::query::{
    AggregationRequest, AggregationRequestBuilder, OrderByEntry, QueryResult, StatisticRecord,
};
use crate::service::FeatureService;
use crate::types::{DatasetSchema, SortDirection, StatisticDefinition, StatisticKind};

// ============================================================================
// Lifecycle Types
// ============================================================================

/// Request lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// No query outstanding
    Idle,
    /// A query is outstanding
    Pending {
        /// Generation the query was issued under
        generation: u64,
    },
}

/// Handle for an issued query
///
/// Carries the request snapshot to send and the generation used to match
/// the response to the session state.
#[derive(Debug)]
pub struct QueryTicket {
    generation: u64,
    request: AggregationRequest,
}

impl QueryTicket {
    /// Generation the query was issued under
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The request to send to the service
    pub fn request(&self) -> &AggregationRequest {
        &self.request
    }
}

/// What happened to a query response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOutcome {
    /// Results replaced the previous result set
    Applied {
        /// Number of groups now displayed
        records: usize,
    },
    /// The session moved on; the response was dropped
    Discarded,
}

// ============================================================================
// Session
// ============================================================================

/// Selection and result state for one dataset
#[derive(Debug)]
pub struct StatisticsSession {
    catalog: Option<FieldCatalog>,
    builder: AggregationRequestBuilder,
    results: ResultTree,
    state: RequestState,
    generation: u64,
}

impl StatisticsSession {
    /// Create a session with no dataset loaded
    pub fn new() -> Self {
        Self::with_separator(DEFAULT_GROUP_SEPARATOR)
    }

    /// Create a session using `separator` between group values in labels
    pub fn with_separator(separator: impl Into<String>) -> Self {
        Self {
            catalog: None,
            builder: AggregationRequestBuilder::new(),
            results: ResultTree::with_separator(separator),
            state: RequestState::Idle,
            generation: 0,
        }
    }

    // ------------------------------------------------------------------------
    // Dataset
    // ------------------------------------------------------------------------

    /// Load the dataset schema from a service and build the catalog
    pub async fn load(&mut self, service: &dyn FeatureService) -> Result<&FieldCatalog> {
        let schema = service.load_schema().await.inspect_err(|e| {
            metrics::record_schema_load(false);
            warn!(error = %e, "Error while loading feature table");
        })?;
        Ok(self.apply_schema(&schema)?)
    }

    /// Build the catalog from an already loaded schema
    ///
    /// On error the current catalog is left as it was. Replacing a loaded
    /// catalog resets the session first, so no selection or result outlives
    /// the catalog it was made against and an outstanding query goes stale.
    pub fn apply_schema(
        &mut self,
        schema: &DatasetSchema,
    ) -> std::result::Result<&FieldCatalog, SchemaLoadError> {
        let catalog = FieldCatalog::from_schema(schema).inspect_err(|e| {
            metrics::record_schema_load(false);
            warn!(dataset = %schema.name, error = %e, "Rejected dataset schema");
        })?;

        metrics::record_schema_load(true);
        if self.catalog.is_some() {
            debug!(dataset = %schema.name, "Replacing loaded catalog");
            self.reset();
        }
        info!(
            dataset = %schema.name,
            fields = catalog.len(),
            "Loaded dataset schema"
        );
        Ok(self.catalog.insert(catalog))
    }

    /// The field catalog, once loaded
    pub fn catalog(&self) -> Option<&FieldCatalog> {
        self.catalog.as_ref()
    }

    fn loaded_catalog(&self) -> std::result::Result<&FieldCatalog, SessionError> {
        self.catalog.as_ref().ok_or(SessionError::NotLoaded)
    }

    // ------------------------------------------------------------------------
    // Selections
    // ------------------------------------------------------------------------

    /// Add a statistic on a numeric catalog field
    ///
    /// Returns `Ok(false)` when the definition already exists.
    pub fn add_statistic_definition(&mut self, field: &str, kind: StatisticKind) -> Result<bool> {
        let catalog = self.loaded_catalog()?;
        if !catalog.is_groupable(field) {
            return Err(ValidationError::UnknownField(field.to_string()).into());
        }
        if !catalog.is_numeric(field) {
            return Err(ValidationError::NotNumeric(field.to_string()).into());
        }

        let added = self.builder.add_statistic_definition(field, kind);
        if !added {
            metrics::DUPLICATE_DEFINITIONS_TOTAL.inc();
        }
        Ok(added)
    }

    /// Remove statistic definitions by position
    pub fn remove_statistic_definitions(&mut self, selected_indices: &[usize]) -> usize {
        self.builder.remove_statistic_definitions(selected_indices)
    }

    /// Select or deselect a catalog field for grouping
    pub fn set_group_by_selected(&mut self, field: &str, selected: bool) -> Result<bool> {
        let catalog = self.loaded_catalog()?;
        if selected && !catalog.is_groupable(field) {
            return Err(ValidationError::NotGroupable(field.to_string()).into());
        }
        Ok(self.builder.set_group_by_selected(field, selected))
    }

    /// Include or exclude a grouped field from the result ordering
    pub fn set_order_by_selected(&mut self, field: &str, selected: bool) -> Result<bool> {
        Ok(self.builder.set_order_by_selected(field, selected)?)
    }

    /// Change the direction of a grouped field's ordering
    pub fn set_order_direction(&mut self, field: &str, direction: SortDirection) -> Result<()> {
        Ok(self.builder.set_order_direction(field, direction)?)
    }

    /// Current statistic definitions
    pub fn statistic_definitions(&self) -> &[StatisticDefinition] {
        self.builder.statistic_definitions()
    }

    /// Current group-by fields
    pub fn group_by_fields(&self) -> &[String] {
        self.builder.group_by_fields()
    }

    /// Order-by entries with selection flags and directions
    pub fn order_by_entries(&self) -> Vec<OrderByEntry> {
        self.builder.order_by_entries()
    }

    /// Snapshot the current selections without issuing anything
    pub fn build_request(&self) -> std::result::Result<AggregationRequest, ValidationError> {
        self.builder.build_request()
    }

    // ------------------------------------------------------------------------
    // Results
    // ------------------------------------------------------------------------

    /// Current result tree
    pub fn results(&self) -> &ResultTree {
        &self.results
    }

    /// Current result tree, for expansion
    pub fn results_mut(&mut self) -> &mut ResultTree {
        &mut self.results
    }

    /// Lifecycle state
    pub fn state(&self) -> RequestState {
        self.state
    }

    /// Whether a query is outstanding
    pub fn is_pending(&self) -> bool {
        matches!(self.state, RequestState::Pending { .. })
    }

    /// Current generation
    pub fn generation(&self) -> u64 {
        self.generation
    }

    // ------------------------------------------------------------------------
    // Request lifecycle
    // ------------------------------------------------------------------------

    /// Validate the selections and move to Pending
    pub fn begin_query(&mut self) -> Result<QueryTicket> {
        if let RequestState::Pending { generation } = self.state {
            metrics::PENDING_REJECTIONS_TOTAL.inc();
            return Err(SessionError::RequestPending(generation).into());
        }

        let request = self.builder.build_request().inspect_err(|e| {
            let reason = match e {
                ValidationError::NoStatisticDefinitions => "no_statistic_definitions",
                ValidationError::NoGroupByFields => "no_group_by_fields",
                _ => "invalid",
            };
            metrics::record_validation_failure(reason);
            warn!(error = %e, "Statistics request not sent");
        })?;

        self.generation += 1;
        self.state = RequestState::Pending {
            generation: self.generation,
        };

        info!(
            generation = self.generation,
            definitions = request.statistic_definitions().len(),
            group_by = ?request.group_by_fields(),
            order_by = request.order_by().len(),
            "Issuing statistics query"
        );

        Ok(QueryTicket {
            generation: self.generation,
            request,
        })
    }

    /// Apply the response to an issued query
    ///
    /// A response for anything but the current pending generation is
    /// discarded. On success the result tree is replaced; on failure it is
    /// kept and the query error is returned. Either way the session is Idle
    /// afterwards.
    pub fn complete_query(
        &mut self,
        ticket: QueryTicket,
        response: QueryResult<Vec<StatisticRecord>>,
    ) -> Result<QueryOutcome> {
        let current = matches!(
            self.state,
            RequestState::Pending { generation } if generation == ticket.generation
        );
        if !current {
            metrics::STALE_RESPONSES_TOTAL.inc();
            debug!(
                ticket = ticket.generation,
                current = self.generation,
                "Discarding stale statistics response"
            );
            return Ok(QueryOutcome::Discarded);
        }

        self.state = RequestState::Idle;

        match response {
            Ok(records) => {
                let count = records.len();
                self.results
                    .replace(records, ticket.request.group_by_fields());
                metrics::update_result_records(count);
                info!(generation = ticket.generation, records = count, "Applied statistics result");
                Ok(QueryOutcome::Applied { records: count })
            }
            Err(e) => {
                warn!(
                    generation = ticket.generation,
                    error = %e,
                    transient = e.is_transient(),
                    "Error while executing statistics query"
                );
                Err(e.into())
            }
        }
    }

    /// Issue a query against `service` and apply its response
    pub async fn execute(&mut self, service: &dyn FeatureService) -> Result<QueryOutcome> {
        let ticket = self.begin_query()?;

        let started = Instant::now();
        let response = service.query_statistics(ticket.request()).await;
        let elapsed = started.elapsed().as_secs_f64();

        match &response {
            Ok(_) => metrics::record_query("success", elapsed),
            Err(e) => metrics::record_query(e.kind.as_str(), elapsed),
        }

        self.complete_query(ticket, response)
    }

    /// Clear selections and results
    ///
    /// The catalog stays loaded. An outstanding query becomes stale.
    pub fn reset(&mut self) {
        if self.is_pending() {
            debug!(generation = self.generation, "Reset while query pending");
        }
        self.generation += 1;
        self.state = RequestState::Idle;
        self.builder.reset();
        self.results.clear();
        metrics::update_result_records(0);
    }
}

impl Default for StatisticsSession {
    fn default() -> Self {
        Self::new()
    }
}
