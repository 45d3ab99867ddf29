//! Sonarr mirror API handlers.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use arrmate_core::{CatalogError, DbError, StoreError, SyncError, SyncOutcome, SyncStatus};

use super::handlers::ErrorResponse;
use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub matches: usize,
    pub chunks: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SyncStatusResponse {
    pub source: String,
    pub records: u64,
    #[serde(flatten)]
    pub status: SyncStatus,
}

fn catalog_error(e: CatalogError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &e {
        CatalogError::Db(DbError::PoolClosed) | CatalogError::Db(DbError::ConnectionUnavailable(_)) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorResponse::new(e)))
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/sonarr/search?q=<term>
///
/// Search the mirror by title; returns the same chunks a chat reply would.
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, impl IntoResponse> {
    let search = state.search().clone();
    let term = params.q.clone();

    let result = tokio::task::spawn_blocking(move || {
        let mut chunks = Vec::new();
        search
            .run(&term, |chunk| chunks.push(chunk))
            .map(|matches| (matches, chunks))
    })
    .await;

    match result {
        Ok(Ok((matches, chunks))) => Ok(Json(SearchResponse {
            query: params.q,
            matches,
            chunks,
        })),
        Ok(Err(e)) => Err(catalog_error(e)),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(e)),
        )),
    }
}

/// GET /api/v1/sonarr/sync
pub async fn sync_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SyncStatusResponse>, impl IntoResponse> {
    let status = state.sync().status().await;
    match state.mirror().count() {
        Ok(records) => Ok(Json(SyncStatusResponse {
            source: state.sync().source_name().to_string(),
            records,
            status,
        })),
        Err(e) => Err(catalog_error(e)),
    }
}

/// POST /api/v1/sonarr/sync
///
/// Run a sync now. Returns `skipped` if one is already in progress.
pub async fn trigger_sync(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SyncOutcome>, impl IntoResponse> {
    match state.sync().run_once().await {
        Ok(outcome) => Ok(Json(outcome)),
        Err(e) => {
            let status = match &e {
                SyncError::Store(StoreError::MissingKey(_)) => {
                    StatusCode::PRECONDITION_FAILED
                }
                SyncError::Source(_) => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            Err((status, Json(ErrorResponse::new(e))))
        }
    }
}
