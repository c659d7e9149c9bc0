//! Core request data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current status of a processing request.
///
/// Transitions are forward-only:
/// ```text
/// Pending -> Processing -> Completed
/// ```
/// `Failed` exists in the domain but the pipeline never sets it; a run that
/// dies mid-flight leaves the request at its last committed status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl RequestStatus {
    /// Returns the status as a string (persisted form and filter key).
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Processing => "processing",
            RequestStatus::Completed => "completed",
            RequestStatus::Failed => "failed",
        }
    }

    /// Parse the persisted form back into a status.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RequestStatus::Pending),
            "processing" => Some(RequestStatus::Processing),
            "completed" => Some(RequestStatus::Completed),
            "failed" => Some(RequestStatus::Failed),
            _ => None,
        }
    }

    /// Position in the forward-only ordering. Used to reject regressions.
    fn rank(&self) -> u8 {
        match self {
            RequestStatus::Pending => 0,
            RequestStatus::Processing => 1,
            RequestStatus::Completed => 2,
            RequestStatus::Failed => 3,
        }
    }

    /// Returns true if moving from `self` to `next` goes forward.
    pub fn can_advance_to(&self, next: RequestStatus) -> bool {
        next.rank() > self.rank()
    }

    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Failed)
    }
}

/// One product row owned by a processing request.
///
/// Items have no lifecycle of their own: they are created with their request
/// and only ever mutated through it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Item {
    /// Serial number copied verbatim from the manifest.
    pub serial_number: String,
    /// Product name copied verbatim from the manifest.
    pub display_name: String,
    /// Source image references, in manifest order.
    pub input_refs: Vec<String>,
    /// Derived references, same length and order as `input_refs` once the
    /// request completes. Empty until transformation runs.
    pub output_refs: Vec<String>,
}

/// A batch processing request and its owned items.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessingRequest {
    /// Unique identifier (UUID), the externally visible handle.
    pub id: String,
    /// Current status.
    pub status: RequestStatus,
    /// When the request was created.
    pub created_at: DateTime<Utc>,
    /// Refreshed on every status change.
    pub updated_at: DateTime<Utc>,
    /// Reference to the generated result artifact, present once completed.
    pub artifact_ref: Option<String>,
    /// Owned items in manifest row order.
    pub items: Vec<Item>,
}
