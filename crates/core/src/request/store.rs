//! Request storage trait.

use crate::manifest::LineItem;
use crate::request::{ProcessingRequest, RequestStatus};

/// Error type for request store operations.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// Request not found.
    #[error("Request not found: {0}")]
    NotFound(String),

    /// Rejected status change (transitions are forward-only).
    #[error("Cannot move request {request_id} from {from} to {to}")]
    InvalidTransition {
        request_id: String,
        from: &'static str,
        to: &'static str,
    },

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

/// Trait for request storage backends.
///
/// Every mutating operation commits atomically: either all of its writes
/// land or none do. No operation ever spans two requests.
pub trait RequestStore: Send + Sync {
    /// Create a new request in `Pending` status together with all of its
    /// items, all-or-nothing. Returns the created request.
    fn create(&self, items: &[LineItem]) -> Result<ProcessingRequest, RequestError>;

    /// Get a request (with items in manifest order) by id.
    fn get(&self, id: &str) -> Result<Option<ProcessingRequest>, RequestError>;

    /// Advance a request's status, refreshing `updated_at`.
    /// Backward moves are rejected with `InvalidTransition`.
    fn update_status(&self, id: &str, status: RequestStatus) -> Result<(), RequestError>;

    /// Record every item's output refs and mark the request `Completed` in a
    /// single transaction. `outputs` is indexed by item position and each
    /// entry must match the item's input refs in length and order.
    fn complete_with_outputs(&self, id: &str, outputs: &[Vec<String>])
        -> Result<(), RequestError>;

    /// Record the generated artifact reference.
    fn set_artifact(&self, id: &str, artifact_ref: &str) -> Result<(), RequestError>;

    /// Count requests currently in the given status.
    fn count_by_status(&self, status: RequestStatus) -> Result<i64, RequestError>;
}
