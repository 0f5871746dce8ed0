use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::error;
use uuid::Uuid;

use comicden_db::StoreError;
use comicden_types::api::{AddReviewRequest, Claims};

use crate::auth::AppState;
use crate::{review_from_row, store_error_status};

/// POST /comics/{id}/reviews — attach a star rating and text to a comic.
/// Out-of-range ratings are rejected by the store before anything is
/// written. A user may review the same comic more than once.
pub async fn add_review(
    State(state): State<AppState>,
    Path(comic_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AddReviewRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let review_id = Uuid::new_v4();

    let db = state.clone();
    let rid = review_id.to_string();
    let cid = comic_id.to_string();
    let uid = claims.sub.to_string();
    let row = tokio::task::spawn_blocking(move || {
        if db.db.get_comic(&cid)?.is_none() {
            return Err(StoreError::NotFound);
        }
        db.db.add_review(&rid, &uid, &cid, &req.text, req.rating)?;
        let reviews = db.db.list_reviews_by_comic(&cid)?;
        reviews
            .into_iter()
            .find(|r| r.id == rid)
            .ok_or(StoreError::NotFound)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(store_error_status)?;

    Ok((StatusCode::CREATED, Json(review_from_row(&row))))
}
