//! HTTP API integration tests.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use chrono::NaiveDate;
use serde_json::json;

use arrmate_core::{keys, SourceError};
use common::{fixtures, TestFixture};

async fn configure(fixture: &TestFixture) {
    let response = fixture
        .put(
            "/api/v1/config/starr.sonarr.url",
            json!({ "value": "http://sonarr:8989" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = fixture
        .put("/api/v1/config/starr.sonarr.token", json!({ "value": "secret" }))
        .await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_health() {
    let fixture = TestFixture::new();
    let response = fixture.get("/api/v1/health").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
    assert_eq!(response.body["schema_version"], 2);
}

#[tokio::test]
async fn test_health_degraded_after_close() {
    let fixture = TestFixture::new();
    fixture.pool.close();

    let response = fixture.get("/api/v1/health").await;
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.body["status"], "degraded");
}

#[tokio::test]
async fn test_config_crud() {
    let fixture = TestFixture::new();
    configure(&fixture).await;

    let response = fixture.get("/api/v1/config").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.body["keys"],
        json!(["starr.sonarr.token", "starr.sonarr.url"])
    );

    let response = fixture.get("/api/v1/config/starr.sonarr.url").await;
    assert_eq!(response.body["value"], "http://sonarr:8989");

    // Tokens are never echoed back.
    let response = fixture.get("/api/v1/config/starr.sonarr.token").await;
    assert_eq!(response.body["value"], "********");
    assert_eq!(
        fixture.store.get(keys::SONARR_TOKEN).unwrap().as_deref(),
        Some("secret")
    );

    let response = fixture.delete("/api/v1/config/starr.sonarr.token").await;
    assert_eq!(response.body["deleted"], 1);
    let response = fixture.delete("/api/v1/config/starr.sonarr.token").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["deleted"], 0);

    let response = fixture.get("/api/v1/config/starr.sonarr.token").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "no config for starr.sonarr.token");
}

#[tokio::test]
async fn test_set_config_rejects_bad_body() {
    let fixture = TestFixture::new();
    let response = fixture
        .put("/api/v1/config/some.key", json!({ "nope": 1 }))
        .await;
    assert!(response.status.is_client_error());
    assert!(fixture.store.get("some.key").unwrap().is_none());
}

#[tokio::test]
async fn test_sync_and_search() {
    let fixture = TestFixture::new();
    configure(&fixture).await;
    fixture
        .source
        .set_series(vec![
            fixtures::ended_series(
                1,
                "The Sopranos",
                "HBO",
                NaiveDate::from_ymd_opt(2007, 6, 10).unwrap(),
            ),
            fixtures::series(2, "Succession"),
        ])
        .await;

    let response = fixture.post_empty("/api/v1/sonarr/sync").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!({ "outcome": "replaced", "records": 2 }));

    let response = fixture.get("/api/v1/sonarr/search?q=sopranos").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["matches"], 1);
    assert_eq!(
        response.body["chunks"],
        json!(["id=1 title=The Sopranos status=ended previous=2007-06-10 added=2020-01-01\n"])
    );

    let response = fixture.get("/api/v1/sonarr/search?q=nothing").await;
    assert_eq!(response.body["matches"], 0);
    assert_eq!(response.body["chunks"], json!(["no results for 'nothing'"]));

    let response = fixture.get("/api/v1/sonarr/sync").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["records"], 2);
    assert_eq!(response.body["state"], "idle");
    assert_eq!(response.body["runs"], 1);
    assert_eq!(response.body["source"], "mock");
}

#[tokio::test]
async fn test_search_chunks_large_result() {
    let fixture = TestFixture::new();
    let records: Vec<_> = (1..=100)
        .map(|i| fixtures::series(i, &format!("Show number {i:03}")))
        .collect();
    fixture.mirror.replace(&records).unwrap();

    let response = fixture.get("/api/v1/sonarr/search?q=show").await;
    assert_eq!(response.body["matches"], 100);

    let chunks = response.body["chunks"].as_array().unwrap();
    assert!(chunks.len() > 1);
    let lines: usize = chunks
        .iter()
        .map(|c| c.as_str().unwrap().lines().count())
        .sum();
    assert_eq!(lines, 100);
    for chunk in &chunks[..chunks.len() - 1] {
        assert!(chunk.as_str().unwrap().len() >= 1500);
    }
}

#[tokio::test]
async fn test_sync_errors_map_to_status() {
    let fixture = TestFixture::new();

    let response = fixture.post_empty("/api/v1/sonarr/sync").await;
    assert_eq!(response.status, StatusCode::PRECONDITION_FAILED);
    assert_eq!(response.body["error"], "no config for starr.sonarr.url");

    configure(&fixture).await;
    fixture.source.set_next_error(SourceError::Unauthorized).await;
    let response = fixture.post_empty("/api/v1/sonarr/sync").await;
    assert_eq!(response.status, StatusCode::BAD_GATEWAY);

    let response = fixture.get("/api/v1/sonarr/sync").await;
    assert_eq!(response.body["failures"], 2);
    assert_eq!(response.body["state"], "failed");
}

#[tokio::test]
async fn test_overlapping_sync_is_skipped() {
    let fixture = TestFixture::new();
    configure(&fixture).await;
    fixture.source.set_delay(Duration::from_millis(300)).await;

    let sync = fixture.sync.clone();
    let first = tokio::spawn(async move { sync.run_once().await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let response = fixture.post_empty("/api/v1/sonarr/sync").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!({ "outcome": "skipped" }));

    first.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_chat_messages() {
    let fixture = TestFixture::new();
    fixture
        .mirror
        .replace(&[fixtures::series(7, "Dark")])
        .unwrap();

    let response = fixture
        .post("/api/v1/messages", json!({ "text": "!sonarr search dark" }))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["handled"], true);
    assert_eq!(
        response.body["messages"],
        json!(["id=7 title=Dark status=continuing previous= added=2020-01-01\n"])
    );

    let response = fixture
        .post("/api/v1/messages", json!({ "text": "good morning" }))
        .await;
    assert_eq!(response.body["handled"], false);
    assert_eq!(response.body["messages"], json!([]));
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let fixture = TestFixture::new();
    fixture.get("/api/v1/sonarr/search?q=x").await;

    let response = fixture.get("/metrics").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.text.contains("arrmate_search_queries_total"));
    assert!(response.text.contains("arrmate_http_requests_total"));
    assert!(response.text.contains("arrmate_db_pool_connections"));
}

#[tokio::test]
async fn test_unknown_route() {
    let fixture = TestFixture::new();
    let response = fixture.get("/api/v1/nope").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
