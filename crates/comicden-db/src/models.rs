/// Database row types — these map directly to SQLite rows.
/// Distinct from the comicden-types API models to keep the DB layer
/// independent.

#[derive(Debug)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub created_at: String,
}

pub struct ComicRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub filename: String,
    pub owner_id: String,
    pub uploaded_at: String,
    pub views: i64,
}

pub struct ReviewRow {
    pub id: String,
    pub user_id: String,
    pub comic_id: String,
    pub body: String,
    pub rating: i64,
    pub created_at: String,
}
