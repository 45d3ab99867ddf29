//! Runtime configuration API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use arrmate_core::{DbError, StoreError};

use super::handlers::ErrorResponse;
use crate::state::AppState;

/// Placeholder returned instead of credential values.
pub const REDACTED: &str = "********";

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ConfigKeysResponse {
    pub keys: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ConfigEntryResponse {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct SetConfigRequest {
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteConfigResponse {
    pub deleted: usize,
}

/// Whether `key` holds a credential that must not be echoed back.
pub fn is_secret_key(key: &str) -> bool {
    key == "token" || key.ends_with(".token")
}

/// Value safe to show for `key`.
pub fn display_value(key: &str, value: &str) -> String {
    if is_secret_key(key) {
        REDACTED.to_string()
    } else {
        value.to_string()
    }
}

pub(crate) fn store_error(e: StoreError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &e {
        StoreError::MissingKey(_) => StatusCode::NOT_FOUND,
        StoreError::Db(DbError::PoolClosed) | StoreError::Db(DbError::ConnectionUnavailable(_)) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorResponse::new(e)))
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/config
///
/// List configured keys.
pub async fn list_config(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ConfigKeysResponse>, impl IntoResponse> {
    match state.config_store().list() {
        Ok(mut keys) => {
            keys.sort();
            Ok(Json(ConfigKeysResponse { keys }))
        }
        Err(e) => Err(store_error(e)),
    }
}

/// GET /api/v1/config/{key}
pub async fn get_config(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<ConfigEntryResponse>, impl IntoResponse> {
    match state.config_store().require(&key) {
        Ok(value) => Ok(Json(ConfigEntryResponse {
            value: display_value(&key, &value),
            key,
        })),
        Err(e) => Err(store_error(e)),
    }
}

/// PUT /api/v1/config/{key}
pub async fn set_config(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Json(request): Json<SetConfigRequest>,
) -> Result<Json<ConfigEntryResponse>, impl IntoResponse> {
    match state.config_store().set(&key, &request.value) {
        Ok(()) => {
            info!(key = %key, "Config key updated via API");
            Ok(Json(ConfigEntryResponse {
                value: display_value(&key, &request.value),
                key,
            }))
        }
        Err(e) => Err(store_error(e)),
    }
}

/// DELETE /api/v1/config/{key}
///
/// Deleting a missing key is not an error; `deleted` is then 0.
pub async fn delete_config(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<DeleteConfigResponse>, impl IntoResponse> {
    match state.config_store().delete(&key) {
        Ok(deleted) => {
            info!(key = %key, deleted, "Config key deleted via API");
            Ok(Json(DeleteConfigResponse { deleted }))
        }
        Err(e) => Err(store_error(e)),
    }
}
