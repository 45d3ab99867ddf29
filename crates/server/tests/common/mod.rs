//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that creates an in-process router
//! over an on-disk database with a mock catalog source, so the whole API can
//! be exercised without a Sonarr instance.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use arrmate::{api::create_router, state::AppState};
use arrmate_core::{
    testing::MockCatalogSource, CatalogSource, CatalogSync, ConfigStore, Pool, PoolOptions,
    Schema, SeriesMirror,
};

/// Re-export fixtures for test convenience
pub use arrmate_core::testing::fixtures;

/// Test fixture for API testing with a mock catalog source.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_health() {
///     let fixture = TestFixture::new();
///     let response = fixture.get("/api/v1/health").await;
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    pub pool: Pool,
    pub store: ConfigStore,
    pub mirror: SeriesMirror,
    /// Mock source - configure the snapshot the synchronizer receives
    pub source: Arc<MockCatalogSource>,
    pub sync: Arc<CatalogSync>,
    /// Temporary directory holding the test database
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub text: String,
}

impl TestFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");

        let pool = Pool::open(
            &db_path,
            &Schema::bundled(),
            PoolOptions::default().with_max_size(4),
        )
        .expect("Failed to open pool");
        let store = ConfigStore::new(pool.clone());
        let mirror = SeriesMirror::new(pool.clone());
        let source = Arc::new(MockCatalogSource::new());
        let sync = Arc::new(CatalogSync::new(
            store.clone(),
            mirror.clone(),
            Arc::clone(&source) as Arc<dyn CatalogSource>,
        ));

        let state = Arc::new(AppState::new(pool.clone(), Arc::clone(&sync)));
        let router = create_router(state);

        Self {
            router,
            pool,
            store,
            mirror,
            source,
            sync,
            temp_dir,
        }
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    pub async fn put(&self, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

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

        let text = String::from_utf8_lossy(&body_bytes).into_owned();
        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body, text }
    }
}
