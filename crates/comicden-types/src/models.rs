use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// A comic as exposed over the API. The stored file itself is addressed
/// by an opaque name and served separately; clients never see disk paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comic {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub owner_id: Uuid,
    pub uploaded_at: DateTime<Utc>,
    pub views: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub user_id: Uuid,
    pub comic_id: Uuid,
    pub text: String,
    pub rating: i64,
    pub created_at: DateTime<Utc>,
}
