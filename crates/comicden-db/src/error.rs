use thiserror::Error;

/// Failures surfaced by the data-access layer. Validation variants are
/// detected before any mutation, so a failed operation never leaves a
/// partial write behind.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("username already taken")]
    DuplicateUsername,

    #[error("email already in use")]
    DuplicateEmail,

    #[error("invalid username or password")]
    BadCredential,

    #[error("rating must be between 1 and 5, got {0}")]
    InvalidRating(i64),

    #[error("record not found")]
    NotFound,

    #[error("database lock poisoned")]
    LockPoisoned,

    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),
}
