//! Request and item entities plus durable storage.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteRequestStore;
pub use store::{RequestError, RequestStore};
pub use types::{Item, ProcessingRequest, RequestStatus};
