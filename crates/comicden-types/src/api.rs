use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Comic, Review, User};

// -- JWT Claims --

/// JWT claims shared between the auth handlers (token issuance) and the
/// middleware (token validation). Canonical definition lives here in
/// comicden-types to eliminate duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub token: String,
}

// -- Catalog --

#[derive(Debug, Serialize)]
pub struct UploadComicResponse {
    pub comic: Comic,
}

/// Comic detail page payload: the comic, its reviews, and the uploader's
/// username when the owner still exists (orphaned owners are tolerated).
#[derive(Debug, Serialize)]
pub struct ComicDetailResponse {
    pub comic: Comic,
    pub owner_username: Option<String>,
    pub reviews: Vec<Review>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: User,
    pub comics: Vec<Comic>,
}

// -- Reviews --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddReviewRequest {
    pub text: String,
    pub rating: i64,
}
