use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use comicden_api::auth::{self, AppState, AppStateInner};
use comicden_api::comics::{self, MAX_UPLOAD_SIZE};
use comicden_api::library;
use comicden_api::middleware::require_auth;
use comicden_api::reviews;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "comicden=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("COMICDEN_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("COMICDEN_DB_PATH").unwrap_or_else(|_| "comicden.db".into());
    let upload_dir = std::env::var("COMICDEN_UPLOAD_DIR").unwrap_or_else(|_| "uploads".into());
    let host = std::env::var("COMICDEN_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("COMICDEN_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database and upload storage
    let db = comicden_db::Database::open(&PathBuf::from(&db_path))?;
    let storage = comicden_storage::Storage::new(PathBuf::from(&upload_dir)).await?;

    // Shared state
    let app_state: AppState = Arc::new(AppStateInner {
        db,
        storage,
        jwt_secret,
    });

    // Routes
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/", get(comics::recent_comics))
        .route("/comics", get(comics::list_comics))
        .route("/comics/search", get(comics::search_comics))
        .route("/comics/{comic_id}", get(comics::comic_detail))
        .route("/comics/{comic_id}/read", get(comics::read_comic))
        .with_state(app_state.clone());

    let protected_routes = Router::new()
        .route("/comics", post(comics::upload_comic))
        .route("/comics/{comic_id}/reviews", post(reviews::add_review))
        .route(
            "/comics/{comic_id}/library",
            post(library::add_to_library).delete(library::remove_from_library),
        )
        .route("/library", get(library::list_library))
        .route("/profile", get(auth::profile))
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ))
        .with_state(app_state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        // leave headroom above the comic-file cap for multipart framing
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE + 1024 * 1024))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Comicden server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
