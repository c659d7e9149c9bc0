//! Common test utilities for in-process API testing.
//!
//! Provides a fixture that wires the full server router to a temp-directory
//! SQLite store, a running orchestrator and a mock notifier, so tests can
//! exercise the HTTP surface without binding a socket.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use batchpix_core::{
    testing::MockNotifier, ArtifactConfig, ArtifactGenerator, Config, DatabaseConfig, Notifier,
    ProcessingOrchestrator, RequestStore, SqliteRequestStore,
};
use batchpix_server::api::create_router;
use batchpix_server::state::AppState;

/// Boundary used for hand-built multipart bodies.
const BOUNDARY: &str = "batchpix-test-boundary";

/// Test fixture providing an in-process server over real storage.
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Direct handle on the request store for assertions
    pub store: Arc<SqliteRequestStore>,
    /// Mock notifier - inspect webhook deliveries
    pub notifier: MockNotifier,
    /// Temporary directory for the database and artifacts
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with a started orchestrator.
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");
        let artifact_dir = temp_dir.path().join("artifacts");

        let config = Config {
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            artifacts: ArtifactConfig {
                output_dir: artifact_dir,
            },
            ..Config::default()
        };

        let store =
            Arc::new(SqliteRequestStore::new(&db_path).expect("Failed to create request store"));
        let notifier = MockNotifier::new();

        let orchestrator = Arc::new(ProcessingOrchestrator::new(
            config.orchestrator.clone(),
            Arc::clone(&store) as Arc<dyn RequestStore>,
            ArtifactGenerator::new(config.artifacts.clone()),
            Some(Arc::new(notifier.clone()) as Arc<dyn Notifier>),
        ));
        orchestrator.start().await;

        let state = Arc::new(AppState::new(
            config,
            Arc::clone(&store) as Arc<dyn RequestStore>,
            orchestrator,
        ));

        let router = create_router(state);

        Self {
            router,
            store,
            notifier,
            temp_dir,
        }
    }

    /// Send a GET request and parse the body as JSON.
    pub async fn get(&self, path: &str) -> TestResponse {
        let (status, body) = self.get_raw(path).await;
        let body = serde_json::from_str(&body).unwrap_or(Value::Null);
        TestResponse { status, body }
    }

    /// Send a GET request and return the raw body text.
    pub async fn get_raw(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        (status, String::from_utf8_lossy(&body_bytes).to_string())
    }

    /// Upload a manifest file via multipart form data.
    pub async fn upload(&self, filename: &str, content: &str) -> TestResponse {
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
             Content-Type: text/csv\r\n\
             \r\n\
             {content}\r\n\
             --{boundary}--\r\n",
            boundary = BOUNDARY,
            filename = filename,
            content = content,
        );

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/requests")
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }

    /// Poll a request's status endpoint until it reports the given status.
    pub async fn wait_for_status(&self, request_id: &str, target: &str) -> Value {
        for _ in 0..100 {
            let response = self.get(&format!("/api/v1/requests/{}", request_id)).await;
            assert_eq!(response.status, StatusCode::OK);
            if response.body["status"] == target {
                return response.body;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("Request {} never reached status '{}'", request_id, target);
    }
}

/// A manifest that passes validation.
pub fn valid_manifest() -> &'static str {
    "S. No.,Product Name,Input Image Urls\n\
     1,Widget,\"https://cdn.example.com/widget-front.jpg, https://cdn.example.com/widget-back.png\"\n\
     2,Gadget,https://cdn.example.com/gadget.webp\n"
}
