use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::error;
use uuid::Uuid;

use comicden_db::StoreError;
use comicden_types::api::Claims;

use crate::auth::AppState;
use crate::{comic_from_row, store_error_status};

/// POST /comics/{id}/library — put a comic on the caller's shelf.
/// Idempotent: `added` is false when it was already there.
pub async fn add_to_library(
    State(state): State<AppState>,
    Path(comic_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let cid = comic_id.to_string();
    let uid = claims.sub.to_string();
    let added = tokio::task::spawn_blocking(move || {
        if db.db.get_comic(&cid)?.is_none() {
            return Err(StoreError::NotFound);
        }
        db.db.add_to_library(&uid, &cid)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(store_error_status)?;

    Ok(Json(serde_json::json!({ "added": added })))
}

/// DELETE /comics/{id}/library — take a comic off the caller's shelf.
/// `removed` is false when it was not a member.
pub async fn remove_from_library(
    State(state): State<AppState>,
    Path(comic_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let cid = comic_id.to_string();
    let uid = claims.sub.to_string();
    let removed = tokio::task::spawn_blocking(move || db.db.remove_from_library(&uid, &cid))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(store_error_status)?;

    Ok(Json(serde_json::json!({ "removed": removed })))
}

/// GET /library — the caller's shelf, resolved to comic records. Entries
/// whose comic no longer exists are dropped by the store.
pub async fn list_library(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let uid = claims.sub.to_string();
    let rows = tokio::task::spawn_blocking(move || db.db.list_library(&uid))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(store_error_status)?;

    Ok(Json(rows.iter().map(comic_from_row).collect::<Vec<_>>()))
}
