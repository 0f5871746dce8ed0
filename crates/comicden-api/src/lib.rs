pub mod auth;
pub mod comics;
pub mod library;
pub mod middleware;
pub mod reviews;

use axum::http::StatusCode;
use chrono::{DateTime, NaiveDateTime, Utc};
use comicden_db::StoreError;
use comicden_db::models::{ComicRow, ReviewRow};
use comicden_types::models::{Comic, Review};
use tracing::error;

/// Map store failures onto HTTP statuses. Validation errors are the
/// caller's to fix; everything else is logged and reported generically.
pub(crate) fn store_error_status(err: StoreError) -> StatusCode {
    match err {
        StoreError::DuplicateUsername | StoreError::DuplicateEmail => StatusCode::CONFLICT,
        StoreError::BadCredential => StatusCode::UNAUTHORIZED,
        StoreError::InvalidRating(_) => StatusCode::BAD_REQUEST,
        StoreError::NotFound => StatusCode::NOT_FOUND,
        StoreError::LockPoisoned | StoreError::Db(_) => {
            error!("store error: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// SQLite's datetime('now') format. Rows written by migrations always
/// parse; malformed values degrade to the epoch rather than failing a
/// whole listing.
pub(crate) fn parse_db_time(s: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|t| t.and_utc())
        .unwrap_or(DateTime::UNIX_EPOCH)
}

pub(crate) fn comic_from_row(row: &ComicRow) -> Comic {
    Comic {
        id: row.id.parse().unwrap_or_default(),
        title: row.title.clone(),
        description: row.description.clone(),
        owner_id: row.owner_id.parse().unwrap_or_default(),
        uploaded_at: parse_db_time(&row.uploaded_at),
        views: row.views,
    }
}

pub(crate) fn review_from_row(row: &ReviewRow) -> Review {
    Review {
        id: row.id.parse().unwrap_or_default(),
        user_id: row.user_id.parse().unwrap_or_default(),
        comic_id: row.comic_id.parse().unwrap_or_default(),
        text: row.body.clone(),
        rating: row.rating,
        created_at: parse_db_time(&row.created_at),
    }
}
