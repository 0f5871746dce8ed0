use axum::{
    Extension, Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::error;
use uuid::Uuid;

use comicden_db::StoreError;
use comicden_types::api::{Claims, ComicDetailResponse, UploadComicResponse};
use comicden_types::models::Comic;

use crate::auth::AppState;
use crate::{comic_from_row, review_from_row, store_error_status};

/// 16 MiB upload cap for comic files. The server's body limit is set just
/// above this so the explicit check here is the one that fires.
pub const MAX_UPLOAD_SIZE: usize = 16 * 1024 * 1024;

/// Only PDF uploads are accepted, matched on the file extension.
fn allowed_file(filename: &str) -> bool {
    std::path::Path::new(filename)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// GET / — the ten most recently uploaded comics. Recency is a
/// presentation concern: the catalog listing is unordered and we sort
/// here.
pub async fn recent_comics(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.list_comics())
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(store_error_status)?;

    let mut comics: Vec<Comic> = rows.iter().map(comic_from_row).collect();
    comics.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
    comics.truncate(10);

    Ok(Json(comics))
}

/// GET /comics — the full catalog.
pub async fn list_comics(State(state): State<AppState>) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.list_comics())
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(store_error_status)?;

    Ok(Json(rows.iter().map(comic_from_row).collect::<Vec<_>>()))
}

/// GET /comics/search?q= — substring search over title and description.
/// An empty query yields an empty result, not the whole catalog.
pub async fn search_comics(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.search_comics(&query.q))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(store_error_status)?;

    Ok(Json(rows.iter().map(comic_from_row).collect::<Vec<_>>()))
}

/// POST /comics — multipart upload: `title`, `description`, `comic_file`.
/// The catalog row is only written after the file is safely on disk, so a
/// storage failure never leaves an orphaned comic record.
pub async fn upload_comic(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, StatusCode> {
    let mut title = String::new();
    let mut description = String::new();
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("title") => {
                title = field.text().await.map_err(|_| StatusCode::BAD_REQUEST)?;
            }
            Some("description") => {
                description = field.text().await.map_err(|_| StatusCode::BAD_REQUEST)?;
            }
            Some("comic_file") => {
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or(StatusCode::BAD_REQUEST)?;
                if !allowed_file(&filename) {
                    return Err(StatusCode::BAD_REQUEST);
                }
                let bytes = field.bytes().await.map_err(|_| StatusCode::BAD_REQUEST)?;
                file = Some((filename, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let (filename, bytes) = file.ok_or(StatusCode::BAD_REQUEST)?;
    if bytes.is_empty() || title.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    if bytes.len() > MAX_UPLOAD_SIZE {
        return Err(StatusCode::PAYLOAD_TOO_LARGE);
    }

    // File first, row second
    let stored_name = state.storage.save(&bytes, &filename).await.map_err(|e| {
        error!("failed to store upload: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let comic_id = Uuid::new_v4();
    let db = state.clone();
    let cid = comic_id.to_string();
    let owner_id = claims.sub.to_string();
    let stored = stored_name.clone();
    let insert = tokio::task::spawn_blocking(move || {
        db.db
            .create_comic(&cid, title.trim(), description.trim(), &stored, &owner_id)?;
        db.db.get_comic(&cid)?.ok_or(StoreError::NotFound)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let row = match insert {
        Ok(row) => row,
        Err(err) => {
            // the stored file must not outlive a failed insert
            let _ = state.storage.delete(&stored_name).await;
            return Err(store_error_status(err));
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(UploadComicResponse {
            comic: comic_from_row(&row),
        }),
    ))
}

/// GET /comics/{id} — detail payload for one comic. Each visit bumps the
/// view counter; the count returned is the one before this visit, as on
/// the original detail page.
pub async fn comic_detail(
    State(state): State<AppState>,
    Path(comic_id): Path<Uuid>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let id = comic_id.to_string();
    let (comic, owner, reviews) = tokio::task::spawn_blocking(move || {
        let comic = db.db.get_comic(&id)?.ok_or(StoreError::NotFound)?;
        db.db.increment_views(&id)?;
        let owner = db.db.get_user_by_id(&comic.owner_id)?;
        let reviews = db.db.list_reviews_by_comic(&id)?;
        Ok::<_, StoreError>((comic, owner, reviews))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(store_error_status)?;

    Ok(Json(ComicDetailResponse {
        comic: comic_from_row(&comic),
        owner_username: owner.map(|u| u.username),
        reviews: reviews.iter().map(review_from_row).collect(),
    }))
}

/// GET /comics/{id}/read — the stored PDF bytes.
pub async fn read_comic(
    State(state): State<AppState>,
    Path(comic_id): Path<Uuid>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let id = comic_id.to_string();
    let comic = tokio::task::spawn_blocking(move || db.db.get_comic(&id))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(store_error_status)?
        .ok_or(StatusCode::NOT_FOUND)?;

    let bytes = state.storage.read(&comic.filename).await.map_err(|e| {
        error!("failed to read stored file {}: {}", comic.filename, e);
        StatusCode::NOT_FOUND
    })?;

    Ok((
        [(axum::http::header::CONTENT_TYPE, "application/pdf")],
        bytes,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pdf_extensions_are_allowed() {
        assert!(allowed_file("batman.pdf"));
        assert!(allowed_file("BATMAN.PDF"));
        assert!(allowed_file("issue.1.pdf"));
        assert!(!allowed_file("batman.cbz"));
        assert!(!allowed_file("batman.pdf.exe"));
        assert!(!allowed_file("pdf"));
        assert!(!allowed_file(""));
    }
}
