use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            username    TEXT NOT NULL UNIQUE,
            email       TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- owner_id is deliberately not a foreign key: a comic whose owner
        -- disappears stays in the catalog with a dangling reference.
        CREATE TABLE IF NOT EXISTS comics (
            id           TEXT PRIMARY KEY,
            title        TEXT NOT NULL,
            description  TEXT NOT NULL,
            filename     TEXT NOT NULL,
            owner_id     TEXT NOT NULL,
            uploaded_at  TEXT NOT NULL DEFAULT (datetime('now')),
            views        INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS reviews (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            comic_id    TEXT NOT NULL REFERENCES comics(id),
            body        TEXT NOT NULL,
            rating      INTEGER NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_reviews_comic
            ON reviews(comic_id);

        CREATE TABLE IF NOT EXISTS library (
            user_id     TEXT NOT NULL,
            comic_id    TEXT NOT NULL,
            added_at    TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (user_id, comic_id)
        );

        CREATE INDEX IF NOT EXISTS idx_library_user
            ON library(user_id);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
