//! SQLite-backed request store implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::manifest::LineItem;

use super::store::{RequestError, RequestStore};
use super::types::{Item, ProcessingRequest, RequestStatus};

/// Separator used for the persisted ref list columns.
const REF_SEPARATOR: &str = ", ";

/// SQLite-backed request store.
pub struct SqliteRequestStore {
    conn: Mutex<Connection>,
}

impl SqliteRequestStore {
    /// Create a new SQLite request store, creating the database file and
    /// tables if needed.
    pub fn new(path: &Path) -> Result<Self, RequestError> {
        let conn = Connection::open(path).map_err(|e| RequestError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite request store (useful for testing).
    pub fn in_memory() -> Result<Self, RequestError> {
        let conn =
            Connection::open_in_memory().map_err(|e| RequestError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), RequestError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS processing_requests (
                request_id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                artifact_ref TEXT
            );

            CREATE TABLE IF NOT EXISTS items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                request_id TEXT NOT NULL REFERENCES processing_requests(request_id),
                position INTEGER NOT NULL,
                serial_number TEXT NOT NULL,
                display_name TEXT NOT NULL,
                input_refs TEXT NOT NULL,
                output_refs TEXT NOT NULL DEFAULT ''
            );

            CREATE INDEX IF NOT EXISTS idx_items_request_id ON items(request_id);
            CREATE INDEX IF NOT EXISTS idx_requests_status ON processing_requests(status);
            "#,
        )
        .map_err(|e| RequestError::Database(e.to_string()))?;

        Ok(())
    }

    fn split_refs(joined: &str) -> Vec<String> {
        joined
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// A status column that fails to parse is corruption, not a default.
    fn parse_status(s: &str, id: &str) -> Result<RequestStatus, RequestError> {
        RequestStatus::parse(s).ok_or_else(|| {
            RequestError::Database(format!("invalid persisted status '{}' for request {}", s, id))
        })
    }

    fn parse_timestamp(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    /// Load the request header row without items. Returns NotFound if absent.
    fn load_header(
        conn: &Connection,
        id: &str,
    ) -> Result<(RequestStatus, DateTime<Utc>, Option<String>), RequestError> {
        let result = conn.query_row(
            "SELECT status, created_at, artifact_ref FROM processing_requests WHERE request_id = ?",
            params![id],
            |row| {
                let status: String = row.get(0)?;
                let created_at: String = row.get(1)?;
                let artifact_ref: Option<String> = row.get(2)?;
                Ok((status, created_at, artifact_ref))
            },
        );

        match result {
            Ok((status, created_at, artifact_ref)) => {
                let status = Self::parse_status(&status, id)?;
                Ok((status, Self::parse_timestamp(&created_at), artifact_ref))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(RequestError::NotFound(id.to_string())),
            Err(e) => Err(RequestError::Database(e.to_string())),
        }
    }

    fn load_items(conn: &Connection, id: &str) -> Result<Vec<Item>, RequestError> {
        let mut stmt = conn
            .prepare(
                "SELECT serial_number, display_name, input_refs, output_refs FROM items \
                 WHERE request_id = ? ORDER BY position ASC",
            )
            .map_err(|e| RequestError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![id], |row| {
                let serial_number: String = row.get(0)?;
                let display_name: String = row.get(1)?;
                let input_refs: String = row.get(2)?;
                let output_refs: String = row.get(3)?;
                Ok(Item {
                    serial_number,
                    display_name,
                    input_refs: Self::split_refs(&input_refs),
                    output_refs: Self::split_refs(&output_refs),
                })
            })
            .map_err(|e| RequestError::Database(e.to_string()))?;

        let mut items = Vec::new();
        for row_result in rows {
            items.push(row_result.map_err(|e| RequestError::Database(e.to_string()))?);
        }
        Ok(items)
    }
}

impl RequestStore for SqliteRequestStore {
    fn create(&self, line_items: &[LineItem]) -> Result<ProcessingRequest, RequestError> {
        let mut conn = self.conn.lock().unwrap();

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();

        let tx = conn
            .transaction()
            .map_err(|e| RequestError::Database(e.to_string()))?;

        tx.execute(
            "INSERT INTO processing_requests (request_id, status, created_at, updated_at) \
             VALUES (?, ?, ?, ?)",
            params![
                id,
                RequestStatus::Pending.as_str(),
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )
        .map_err(|e| RequestError::Database(e.to_string()))?;

        for (position, item) in line_items.iter().enumerate() {
            tx.execute(
                "INSERT INTO items (request_id, position, serial_number, display_name, input_refs, output_refs) \
                 VALUES (?, ?, ?, ?, ?, '')",
                params![
                    id,
                    position as i64,
                    item.serial_number,
                    item.display_name,
                    item.input_refs.join(REF_SEPARATOR),
                ],
            )
            .map_err(|e| RequestError::Database(e.to_string()))?;
        }

        tx.commit()
            .map_err(|e| RequestError::Database(e.to_string()))?;

        Ok(ProcessingRequest {
            id,
            status: RequestStatus::Pending,
            created_at: now,
            updated_at: now,
            artifact_ref: None,
            items: line_items
                .iter()
                .map(|li| Item {
                    serial_number: li.serial_number.clone(),
                    display_name: li.display_name.clone(),
                    input_refs: li.input_refs.clone(),
                    output_refs: vec![],
                })
                .collect(),
        })
    }

    fn get(&self, id: &str) -> Result<Option<ProcessingRequest>, RequestError> {
        let conn = self.conn.lock().unwrap();

        let result = conn.query_row(
            "SELECT status, created_at, updated_at, artifact_ref \
             FROM processing_requests WHERE request_id = ?",
            params![id],
            |row| {
                let status: String = row.get(0)?;
                let created_at: String = row.get(1)?;
                let updated_at: String = row.get(2)?;
                let artifact_ref: Option<String> = row.get(3)?;
                Ok((status, created_at, updated_at, artifact_ref))
            },
        );

        let (status, created_at, updated_at, artifact_ref) = match result {
            Ok(header) => header,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(RequestError::Database(e.to_string())),
        };

        let items = Self::load_items(&conn, id)?;

        Ok(Some(ProcessingRequest {
            id: id.to_string(),
            status: Self::parse_status(&status, id)?,
            created_at: Self::parse_timestamp(&created_at),
            updated_at: Self::parse_timestamp(&updated_at),
            artifact_ref,
            items,
        }))
    }

    fn update_status(&self, id: &str, status: RequestStatus) -> Result<(), RequestError> {
        let mut conn = self.conn.lock().unwrap();

        let tx = conn
            .transaction()
            .map_err(|e| RequestError::Database(e.to_string()))?;

        let (current, _, _) = Self::load_header(&tx, id)?;
        if !current.can_advance_to(status) {
            return Err(RequestError::InvalidTransition {
                request_id: id.to_string(),
                from: current.as_str(),
                to: status.as_str(),
            });
        }

        tx.execute(
            "UPDATE processing_requests SET status = ?, updated_at = ? WHERE request_id = ?",
            params![status.as_str(), Utc::now().to_rfc3339(), id],
        )
        .map_err(|e| RequestError::Database(e.to_string()))?;

        tx.commit()
            .map_err(|e| RequestError::Database(e.to_string()))
    }

    fn complete_with_outputs(
        &self,
        id: &str,
        outputs: &[Vec<String>],
    ) -> Result<(), RequestError> {
        let mut conn = self.conn.lock().unwrap();

        let tx = conn
            .transaction()
            .map_err(|e| RequestError::Database(e.to_string()))?;

        let (current, _, _) = Self::load_header(&tx, id)?;
        if !current.can_advance_to(RequestStatus::Completed) {
            return Err(RequestError::InvalidTransition {
                request_id: id.to_string(),
                from: current.as_str(),
                to: RequestStatus::Completed.as_str(),
            });
        }

        for (position, refs) in outputs.iter().enumerate() {
            tx.execute(
                "UPDATE items SET output_refs = ? WHERE request_id = ? AND position = ?",
                params![refs.join(REF_SEPARATOR), id, position as i64],
            )
            .map_err(|e| RequestError::Database(e.to_string()))?;
        }

        tx.execute(
            "UPDATE processing_requests SET status = ?, updated_at = ? WHERE request_id = ?",
            params![
                RequestStatus::Completed.as_str(),
                Utc::now().to_rfc3339(),
                id
            ],
        )
        .map_err(|e| RequestError::Database(e.to_string()))?;

        tx.commit()
            .map_err(|e| RequestError::Database(e.to_string()))
    }

    fn set_artifact(&self, id: &str, artifact_ref: &str) -> Result<(), RequestError> {
        let conn = self.conn.lock().unwrap();

        Self::load_header(&conn, id)?;

        conn.execute(
            "UPDATE processing_requests SET artifact_ref = ?, updated_at = ? WHERE request_id = ?",
            params![artifact_ref, Utc::now().to_rfc3339(), id],
        )
        .map_err(|e| RequestError::Database(e.to_string()))?;

        Ok(())
    }

    fn count_by_status(&self, status: RequestStatus) -> Result<i64, RequestError> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "SELECT COUNT(*) FROM processing_requests WHERE status = ?",
            params![status.as_str()],
            |row| row.get(0),
        )
        .map_err(|e| RequestError::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_store() -> SqliteRequestStore {
        SqliteRequestStore::in_memory().unwrap()
    }

    fn sample_items() -> Vec<LineItem> {
        vec![
            LineItem {
                serial_number: "1".to_string(),
                display_name: "Widget".to_string(),
                input_refs: vec![
                    "http://a.com/x.png".to_string(),
                    "http://a.com/y.jpg".to_string(),
                ],
            },
            LineItem {
                serial_number: "2".to_string(),
                display_name: "Gadget".to_string(),
                input_refs: vec!["https://b.com/z.webp".to_string()],
            },
        ]
    }

    #[test]
    fn test_create_request() {
        let store = create_test_store();
        let request = store.create(&sample_items()).unwrap();

        assert!(!request.id.is_empty());
        assert_eq!(request.status, RequestStatus::Pending);
        assert!(request.artifact_ref.is_none());
        assert_eq!(request.items.len(), 2);
        assert!(request.items.iter().all(|i| i.output_refs.is_empty()));
    }

    #[test]
    fn test_get_round_trips_items_in_order() {
        let store = create_test_store();
        let created = store.create(&sample_items()).unwrap();

        let fetched = store.get(&created.id).unwrap().unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.items.len(), 2);
        assert_eq!(fetched.items[0].serial_number, "1");
        assert_eq!(fetched.items[1].serial_number, "2");
        assert_eq!(
            fetched.items[0].input_refs,
            vec!["http://a.com/x.png", "http://a.com/y.jpg"]
        );
    }

    #[test]
    fn test_get_nonexistent_request() {
        let store = create_test_store();
        assert!(store.get("nonexistent-id").unwrap().is_none());
    }

    #[test]
    fn test_create_is_atomic_per_request() {
        let store = create_test_store();
        let a = store.create(&sample_items()).unwrap();
        let b = store.create(&sample_items()).unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(store.get(&a.id).unwrap().unwrap().items.len(), 2);
        assert_eq!(store.get(&b.id).unwrap().unwrap().items.len(), 2);
    }

    #[test]
    fn test_update_status_forward() {
        let store = create_test_store();
        let request = store.create(&sample_items()).unwrap();

        store
            .update_status(&request.id, RequestStatus::Processing)
            .unwrap();

        let fetched = store.get(&request.id).unwrap().unwrap();
        assert_eq!(fetched.status, RequestStatus::Processing);
        assert!(fetched.updated_at >= fetched.created_at);
    }

    #[test]
    fn test_update_status_rejects_regression() {
        let store = create_test_store();
        let request = store.create(&sample_items()).unwrap();

        store
            .update_status(&request.id, RequestStatus::Processing)
            .unwrap();

        let result = store.update_status(&request.id, RequestStatus::Pending);
        assert!(matches!(
            result,
            Err(RequestError::InvalidTransition { .. })
        ));

        // Status unchanged after the rejected move.
        let fetched = store.get(&request.id).unwrap().unwrap();
        assert_eq!(fetched.status, RequestStatus::Processing);
    }

    #[test]
    fn test_update_status_nonexistent() {
        let store = create_test_store();
        let result = store.update_status("nonexistent-id", RequestStatus::Processing);
        assert!(matches!(result, Err(RequestError::NotFound(_))));
    }

    #[test]
    fn test_complete_with_outputs() {
        let store = create_test_store();
        let request = store.create(&sample_items()).unwrap();
        store
            .update_status(&request.id, RequestStatus::Processing)
            .unwrap();

        let outputs = vec![
            vec![
                "http://a.com/x.png?compressed=50".to_string(),
                "http://a.com/y.jpg?compressed=50".to_string(),
            ],
            vec!["https://b.com/z.webp?compressed=50".to_string()],
        ];
        store.complete_with_outputs(&request.id, &outputs).unwrap();

        let fetched = store.get(&request.id).unwrap().unwrap();
        assert_eq!(fetched.status, RequestStatus::Completed);
        for item in &fetched.items {
            assert_eq!(item.output_refs.len(), item.input_refs.len());
        }
        assert_eq!(
            fetched.items[0].output_refs[0],
            "http://a.com/x.png?compressed=50"
        );
    }

    #[test]
    fn test_complete_rejects_already_completed() {
        let store = create_test_store();
        let request = store.create(&sample_items()).unwrap();
        let outputs: Vec<Vec<String>> = vec![vec![], vec![]];

        store.complete_with_outputs(&request.id, &outputs).unwrap();
        let result = store.complete_with_outputs(&request.id, &outputs);
        assert!(matches!(
            result,
            Err(RequestError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_set_artifact() {
        let store = create_test_store();
        let request = store.create(&sample_items()).unwrap();

        store
            .set_artifact(&request.id, "./output_test.csv")
            .unwrap();

        let fetched = store.get(&request.id).unwrap().unwrap();
        assert_eq!(fetched.artifact_ref.as_deref(), Some("./output_test.csv"));
    }

    #[test]
    fn test_set_artifact_nonexistent() {
        let store = create_test_store();
        let result = store.set_artifact("nonexistent-id", "x.csv");
        assert!(matches!(result, Err(RequestError::NotFound(_))));
    }

    #[test]
    fn test_count_by_status() {
        let store = create_test_store();
        let a = store.create(&sample_items()).unwrap();
        store.create(&sample_items()).unwrap();

        store
            .update_status(&a.id, RequestStatus::Processing)
            .unwrap();

        assert_eq!(store.count_by_status(RequestStatus::Pending).unwrap(), 1);
        assert_eq!(store.count_by_status(RequestStatus::Processing).unwrap(), 1);
        assert_eq!(store.count_by_status(RequestStatus::Completed).unwrap(), 0);
    }

    #[test]
    fn test_corrupt_persisted_status_is_a_database_error() {
        let store = create_test_store();
        let request = store.create(&sample_items()).unwrap();

        store
            .conn
            .lock()
            .unwrap()
            .execute(
                "UPDATE processing_requests SET status = 'garbled' WHERE request_id = ?",
                params![request.id],
            )
            .unwrap();

        // Corruption must surface, not masquerade as a fresh request.
        assert!(matches!(
            store.get(&request.id),
            Err(RequestError::Database(_))
        ));
        assert!(matches!(
            store.update_status(&request.id, RequestStatus::Processing),
            Err(RequestError::Database(_))
        ));
    }

    #[test]
    fn test_file_based_store() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("requests.db");

        let store = SqliteRequestStore::new(&db_path).unwrap();
        let request = store.create(&sample_items()).unwrap();

        assert!(db_path.exists());
        assert!(store.get(&request.id).unwrap().is_some());
    }
}
