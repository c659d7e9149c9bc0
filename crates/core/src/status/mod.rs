//! Read-only status projection.

use std::sync::Arc;

use serde::Serialize;

use crate::request::{Item, ProcessingRequest, RequestError, RequestStatus, RequestStore};

/// Current view of one request, as exposed to callers polling for progress.
#[derive(Debug, Clone, Serialize)]
pub struct StatusView {
    pub request_id: String,
    pub status: RequestStatus,
    pub items: Vec<ItemView>,
    pub artifact_ref: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// One item within a status view.
#[derive(Debug, Clone, Serialize)]
pub struct ItemView {
    pub serial_number: String,
    pub display_name: String,
    pub input_refs: Vec<String>,
    pub output_refs: Vec<String>,
}

impl From<Item> for ItemView {
    fn from(item: Item) -> Self {
        Self {
            serial_number: item.serial_number,
            display_name: item.display_name,
            input_refs: item.input_refs,
            output_refs: item.output_refs,
        }
    }
}

impl From<ProcessingRequest> for StatusView {
    fn from(request: ProcessingRequest) -> Self {
        Self {
            request_id: request.id,
            status: request.status,
            items: request.items.into_iter().map(ItemView::from).collect(),
            artifact_ref: request.artifact_ref,
            created_at: request.created_at.to_rfc3339(),
            updated_at: request.updated_at.to_rfc3339(),
        }
    }
}

/// Projects whatever the store currently holds; never waits for completion.
pub struct StatusReporter {
    store: Arc<dyn RequestStore>,
}

impl StatusReporter {
    pub fn new(store: Arc<dyn RequestStore>) -> Self {
        Self { store }
    }

    /// Get the current status view for a request. `None` means unknown id.
    pub fn get_status(&self, request_id: &str) -> Result<Option<StatusView>, RequestError> {
        Ok(self.store.get(request_id)?.map(StatusView::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::LineItem;
    use crate::request::SqliteRequestStore;

    #[test]
    fn test_get_status_projects_store_state() {
        let store = Arc::new(SqliteRequestStore::in_memory().unwrap());
        let created = store
            .create(&[LineItem {
                serial_number: "1".to_string(),
                display_name: "Widget".to_string(),
                input_refs: vec!["http://a.com/x.png".to_string()],
            }])
            .unwrap();

        let reporter = StatusReporter::new(store);
        let view = reporter.get_status(&created.id).unwrap().unwrap();

        assert_eq!(view.request_id, created.id);
        assert_eq!(view.status, RequestStatus::Pending);
        assert_eq!(view.items.len(), 1);
        assert!(view.artifact_ref.is_none());
        assert!(view.items[0].output_refs.is_empty());
    }

    #[test]
    fn test_get_status_unknown_id() {
        let store = Arc::new(SqliteRequestStore::in_memory().unwrap());
        let reporter = StatusReporter::new(store);
        assert!(reporter.get_status("nope").unwrap().is_none());
    }
}
