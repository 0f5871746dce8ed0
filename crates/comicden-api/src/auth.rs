use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::error;
use uuid::Uuid;

use comicden_db::{Database, StoreError, models::UserRow};
use comicden_storage::Storage;
use comicden_types::api::{
    Claims, LoginRequest, LoginResponse, ProfileResponse, RegisterRequest, RegisterResponse,
};
use comicden_types::models::User;

use crate::{comic_from_row, parse_db_time, store_error_status};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub storage: Storage,
    pub jwt_secret: String,
}

/// Hash a password with argon2id and a fresh random salt. The PHC string
/// embeds salt and parameters, so verification needs nothing else.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))?;
    Ok(hash.to_string())
}

/// Look up a user by exact username and check the supplied password
/// against the stored hash. Unknown usernames and wrong passwords are
/// indistinguishable to the caller, so login responses leak nothing
/// about which accounts exist.
pub fn verify_credentials(
    db: &Database,
    username: &str,
    password: &str,
) -> Result<UserRow, StoreError> {
    let user = db
        .get_user_by_username(username)?
        .ok_or(StoreError::BadCredential)?;

    let parsed_hash = PasswordHash::new(&user.password).map_err(|e| {
        error!("stored hash for {} is unparseable: {}", username, e);
        StoreError::BadCredential
    })?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| StoreError::BadCredential)?;

    Ok(user)
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    // Validate input
    if req.username.len() < 3 || req.username.len() > 32 {
        return Err(StatusCode::BAD_REQUEST);
    }
    if req.password.len() < 8 {
        return Err(StatusCode::BAD_REQUEST);
    }
    if !req.email.contains('@') {
        return Err(StatusCode::BAD_REQUEST);
    }

    // Argon2 is deliberately slow; keep it off the async runtime
    let password = req.password.clone();
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            error!("{}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let user_id = Uuid::new_v4();

    let db = state.clone();
    let uid = user_id.to_string();
    let username = req.username.clone();
    let email = req.email.clone();
    tokio::task::spawn_blocking(move || db.db.create_user(&uid, &username, &email, &password_hash))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(store_error_status)?;

    let token = create_token(&state.jwt_secret, user_id, &req.username)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse { user_id, token }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let username = req.username.clone();
    let user =
        tokio::task::spawn_blocking(move || verify_credentials(&db.db, &username, &req.password))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            })?
            .map_err(store_error_status)?;

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let token = create_token(&state.jwt_secret, user_id, &user.username)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(LoginResponse {
        user_id,
        username: user.username,
        token,
    }))
}

/// GET /profile — the authenticated user plus the comics they uploaded.
pub async fn profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let uid = claims.sub.to_string();
    let (user, comics) = tokio::task::spawn_blocking(move || {
        let user = db.db.get_user_by_id(&uid)?;
        let comics = db.db.list_comics_by_owner(&uid)?;
        Ok::<_, StoreError>((user, comics))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?
    .map_err(store_error_status)?;

    let user = user.ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(ProfileResponse {
        user: User {
            id: claims.sub,
            username: user.username,
            email: user.email,
            created_at: parse_db_time(&user.created_at),
        },
        comics: comics.iter().map(comic_from_row).collect(),
    }))
}

fn create_token(secret: &str, user_id: Uuid, username: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_db(username: &str, email: &str, password: &str) -> Database {
        let db = Database::open_in_memory().unwrap();
        let hash = hash_password(password).unwrap();
        db.create_user(&Uuid::new_v4().to_string(), username, email, &hash)
            .unwrap();
        db
    }

    #[test]
    fn correct_password_verifies() {
        let db = seeded_db("alice", "a@x.com", "correct horse battery");

        let user = verify_credentials(&db, "alice", "correct horse battery").unwrap();
        assert_eq!(user.username, "alice");
        // plaintext is never stored
        assert_ne!(user.password, "correct horse battery");
        assert!(user.password.starts_with("$argon2"));
    }

    #[test]
    fn wrong_password_is_rejected() {
        let db = seeded_db("alice", "a@x.com", "correct horse battery");

        let err = verify_credentials(&db, "alice", "wrong").unwrap_err();
        assert!(matches!(err, StoreError::BadCredential));
    }

    #[test]
    fn unknown_user_gets_the_same_error_as_wrong_password() {
        let db = seeded_db("alice", "a@x.com", "correct horse battery");

        let err = verify_credentials(&db, "nobody", "whatever").unwrap_err();
        assert!(matches!(err, StoreError::BadCredential));
    }

    #[test]
    fn same_password_hashes_to_distinct_strings() {
        let a = hash_password("hunter2hunter2").unwrap();
        let b = hash_password("hunter2hunter2").unwrap();
        assert_ne!(a, b); // fresh salt every time
    }
}
