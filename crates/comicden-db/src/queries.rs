use crate::Database;
use crate::error::StoreError;
use crate::models::{ComicRow, ReviewRow, UserRow};
use rusqlite::{Connection, OptionalExtension, Row};

impl Database {
    // -- Users --

    /// Insert a new user. The caller hashes the password; plaintext never
    /// reaches this layer. Uniqueness is pre-checked for a precise error,
    /// with the UNIQUE constraints backstopping concurrent registrations.
    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            if query_user_by_username(conn, username)?.is_some() {
                return Err(StoreError::DuplicateUsername);
            }
            if query_user_by_email(conn, email)?.is_some() {
                return Err(StoreError::DuplicateEmail);
            }

            conn.execute(
                "INSERT INTO users (id, username, email, password) VALUES (?1, ?2, ?3, ?4)",
                (id, username, email, password_hash),
            )
            .map_err(map_unique_violation)?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>, StoreError> {
        self.with_conn(|conn| query_user_by_username(conn, username))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>, StoreError> {
        self.with_conn(|conn| query_user_by_email(conn, email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>, StoreError> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, username, email, password, created_at FROM users WHERE id = ?1",
                    [id],
                    read_user_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    // -- Comics --

    pub fn create_comic(
        &self,
        id: &str,
        title: &str,
        description: &str,
        filename: &str,
        owner_id: &str,
    ) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO comics (id, title, description, filename, owner_id)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (id, title, description, filename, owner_id),
            )?;
            Ok(())
        })
    }

    pub fn get_comic(&self, id: &str) -> Result<Option<ComicRow>, StoreError> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("{COMIC_COLUMNS} WHERE id = ?1"),
                    [id],
                    read_comic_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Full catalog, unordered. Callers sort for presentation.
    pub fn list_comics(&self) -> Result<Vec<ComicRow>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(COMIC_COLUMNS)?;
            let rows = stmt
                .query_map([], read_comic_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_comics_by_owner(&self, owner_id: &str) -> Result<Vec<ComicRow>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{COMIC_COLUMNS} WHERE owner_id = ?1"))?;
            let rows = stmt
                .query_map([owner_id], read_comic_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Bump the view counter by one. A single UPDATE keeps the
    /// read-modify-write atomic, so concurrent visits never lose counts.
    pub fn increment_views(&self, id: &str) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute("UPDATE comics SET views = views + 1 WHERE id = ?1", [id])?;
            if changed == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
    }

    /// Case-insensitive substring match against title or description.
    /// An empty or whitespace-only query returns no results rather than
    /// the full catalog.
    pub fn search_comics(&self, query: &str) -> Result<Vec<ComicRow>, StoreError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let pattern = format!("%{}%", escape_like(query));
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{COMIC_COLUMNS}
                 WHERE title LIKE ?1 ESCAPE '\\' OR description LIKE ?1 ESCAPE '\\'"
            ))?;
            let rows = stmt
                .query_map([&pattern], read_comic_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Reviews --

    /// Persist a review. Ratings outside [1,5] are rejected before any
    /// write. A user may review the same comic more than once.
    pub fn add_review(
        &self,
        id: &str,
        user_id: &str,
        comic_id: &str,
        body: &str,
        rating: i64,
    ) -> Result<(), StoreError> {
        if !(1..=5).contains(&rating) {
            return Err(StoreError::InvalidRating(rating));
        }

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO reviews (id, user_id, comic_id, body, rating)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (id, user_id, comic_id, body, rating),
            )?;
            Ok(())
        })
    }

    pub fn list_reviews_by_comic(&self, comic_id: &str) -> Result<Vec<ReviewRow>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, comic_id, body, rating, created_at
                 FROM reviews WHERE comic_id = ?1",
            )?;
            let rows = stmt
                .query_map([comic_id], |row| {
                    Ok(ReviewRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        comic_id: row.get(2)?,
                        body: row.get(3)?,
                        rating: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Library --

    /// Add a comic to a user's shelf. Returns true if newly added, false
    /// if it was already there; the pair primary key makes this idempotent.
    pub fn add_to_library(&self, user_id: &str, comic_id: &str) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO library (user_id, comic_id) VALUES (?1, ?2)",
                (user_id, comic_id),
            )?;
            Ok(changed > 0)
        })
    }

    /// Returns true if a membership row was removed, false if the comic
    /// was not on the shelf.
    pub fn remove_from_library(&self, user_id: &str, comic_id: &str) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM library WHERE user_id = ?1 AND comic_id = ?2",
                (user_id, comic_id),
            )?;
            Ok(changed > 0)
        })
    }

    /// Resolve a user's shelf to comic rows. The inner join silently drops
    /// entries whose comic no longer exists.
    pub fn list_library(&self, user_id: &str) -> Result<Vec<ComicRow>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.title, c.description, c.filename, c.owner_id,
                        c.uploaded_at, c.views
                 FROM library l
                 JOIN comics c ON l.comic_id = c.id
                 WHERE l.user_id = ?1",
            )?;
            let rows = stmt
                .query_map([user_id], read_comic_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

const COMIC_COLUMNS: &str =
    "SELECT id, title, description, filename, owner_id, uploaded_at, views FROM comics";

fn read_user_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn read_comic_row(row: &Row<'_>) -> rusqlite::Result<ComicRow> {
    Ok(ComicRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        filename: row.get(3)?,
        owner_id: row.get(4)?,
        uploaded_at: row.get(5)?,
        views: row.get(6)?,
    })
}

fn query_user_by_username(
    conn: &Connection,
    username: &str,
) -> Result<Option<UserRow>, StoreError> {
    let row = conn
        .query_row(
            "SELECT id, username, email, password, created_at FROM users WHERE username = ?1",
            [username],
            read_user_row,
        )
        .optional()?;
    Ok(row)
}

fn query_user_by_email(conn: &Connection, email: &str) -> Result<Option<UserRow>, StoreError> {
    let row = conn
        .query_row(
            "SELECT id, username, email, password, created_at FROM users WHERE email = ?1",
            [email],
            read_user_row,
        )
        .optional()?;
    Ok(row)
}

/// LIKE wildcards in user input are literals, not patterns.
fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Translate a UNIQUE constraint failure into the matching duplicate
/// variant. This is the backstop for registrations racing past the
/// pre-check.
fn map_unique_violation(err: rusqlite::Error) -> StoreError {
    if let rusqlite::Error::SqliteFailure(code, Some(msg)) = &err {
        if code.code == rusqlite::ErrorCode::ConstraintViolation {
            if msg.contains("users.username") {
                return StoreError::DuplicateUsername;
            }
            if msg.contains("users.email") {
                return StoreError::DuplicateEmail;
            }
        }
    }
    StoreError::Db(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use uuid::Uuid;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn new_id() -> String {
        Uuid::new_v4().to_string()
    }

    fn seed_user(db: &Database, username: &str, email: &str) -> String {
        let id = new_id();
        db.create_user(&id, username, email, "fake-hash").unwrap();
        id
    }

    fn seed_comic(db: &Database, title: &str, description: &str, owner_id: &str) -> String {
        let id = new_id();
        db.create_comic(&id, title, description, "file.pdf", owner_id)
            .unwrap();
        id
    }

    #[test]
    fn duplicate_username_rejected() {
        let db = db();
        seed_user(&db, "alice", "a@x.com");

        let err = db
            .create_user(&new_id(), "alice", "b@x.com", "pw2-hash")
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateUsername));

        // No second row was created
        assert!(db.get_user_by_email("b@x.com").unwrap().is_none());
    }

    #[test]
    fn duplicate_email_rejected() {
        let db = db();
        seed_user(&db, "alice", "a@x.com");

        let err = db
            .create_user(&new_id(), "bob", "a@x.com", "hash")
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
        assert!(db.get_user_by_username("bob").unwrap().is_none());
    }

    #[test]
    fn username_lookup_is_case_sensitive() {
        let db = db();
        seed_user(&db, "Alice", "upper@x.com");
        seed_user(&db, "alice", "lower@x.com");

        let upper = db.get_user_by_username("Alice").unwrap().unwrap();
        let lower = db.get_user_by_username("alice").unwrap().unwrap();
        assert_ne!(upper.id, lower.id);
        assert_eq!(upper.email, "upper@x.com");
    }

    #[test]
    fn user_lookup_by_id_and_email() {
        let db = db();
        let id = seed_user(&db, "carol", "c@x.com");

        assert_eq!(db.get_user_by_id(&id).unwrap().unwrap().username, "carol");
        assert_eq!(db.get_user_by_email("c@x.com").unwrap().unwrap().id, id);
        assert!(db.get_user_by_id("missing").unwrap().is_none());
    }

    #[test]
    fn new_comic_starts_with_zero_views() {
        let db = db();
        let owner = seed_user(&db, "alice", "a@x.com");
        let id = seed_comic(&db, "Batman", "caped crusader", &owner);

        let comic = db.get_comic(&id).unwrap().unwrap();
        assert_eq!(comic.views, 0);
        assert_eq!(comic.title, "Batman");
        assert_eq!(comic.owner_id, owner);
    }

    #[test]
    fn list_by_owner_only_returns_their_comics() {
        let db = db();
        let alice = seed_user(&db, "alice", "a@x.com");
        let bob = seed_user(&db, "bob", "b@x.com");
        seed_comic(&db, "Batman", "", &alice);
        seed_comic(&db, "Superman", "", &alice);
        seed_comic(&db, "Spawn", "", &bob);

        assert_eq!(db.list_comics_by_owner(&alice).unwrap().len(), 2);
        assert_eq!(db.list_comics_by_owner(&bob).unwrap().len(), 1);
        assert_eq!(db.list_comics().unwrap().len(), 3);
    }

    #[test]
    fn increment_views_counts_every_call() {
        let db = db();
        let owner = seed_user(&db, "alice", "a@x.com");
        let id = seed_comic(&db, "Batman", "", &owner);

        for _ in 0..25 {
            db.increment_views(&id).unwrap();
        }
        assert_eq!(db.get_comic(&id).unwrap().unwrap().views, 25);
    }

    #[test]
    fn increment_views_is_safe_under_concurrency() {
        let db = Arc::new(db());
        let owner = seed_user(&db, "alice", "a@x.com");
        let id = seed_comic(&db, "Batman", "", &owner);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let db = Arc::clone(&db);
                let id = id.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        db.increment_views(&id).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(db.get_comic(&id).unwrap().unwrap().views, 100);
    }

    #[test]
    fn increment_views_on_missing_comic_is_not_found() {
        let db = db();
        let err = db.increment_views("no-such-comic").unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[test]
    fn search_matches_title_and_description_case_insensitively() {
        let db = db();
        let owner = seed_user(&db, "alice", "a@x.com");
        let batman = seed_comic(&db, "Batman", "the dark knight", &owner);
        seed_comic(&db, "Superman", "man of steel", &owner);

        let hits = db.search_comics("bat").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, batman);

        // description matches too
        assert_eq!(db.search_comics("KNIGHT").unwrap().len(), 1);
        // "man" appears in both titles
        assert_eq!(db.search_comics("man").unwrap().len(), 2);
        assert!(db.search_comics("zzz").unwrap().is_empty());
    }

    #[test]
    fn empty_search_returns_nothing() {
        let db = db();
        let owner = seed_user(&db, "alice", "a@x.com");
        seed_comic(&db, "Batman", "", &owner);

        assert!(db.search_comics("").unwrap().is_empty());
        assert!(db.search_comics("   ").unwrap().is_empty());
    }

    #[test]
    fn search_treats_wildcards_as_literals() {
        let db = db();
        let owner = seed_user(&db, "alice", "a@x.com");
        seed_comic(&db, "100% Wolf", "", &owner);
        seed_comic(&db, "Batman", "", &owner);

        let hits = db.search_comics("100%").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "100% Wolf");
        assert!(db.search_comics("%").unwrap().len() == 1);
    }

    #[test]
    fn review_rating_bounds_enforced() {
        let db = db();
        let user = seed_user(&db, "alice", "a@x.com");
        let comic = seed_comic(&db, "Batman", "", &user);

        for bad in [0, 6, -1, 42] {
            let err = db
                .add_review(&new_id(), &user, &comic, "nope", bad)
                .unwrap_err();
            assert!(matches!(err, StoreError::InvalidRating(r) if r == bad));
        }
        // Rejected submissions persist nothing
        assert!(db.list_reviews_by_comic(&comic).unwrap().is_empty());

        for good in 1..=5 {
            db.add_review(&new_id(), &user, &comic, "ok", good).unwrap();
        }
        assert_eq!(db.list_reviews_by_comic(&comic).unwrap().len(), 5);
    }

    #[test]
    fn same_user_may_review_a_comic_twice() {
        let db = db();
        let user = seed_user(&db, "alice", "a@x.com");
        let comic = seed_comic(&db, "Batman", "", &user);

        db.add_review(&new_id(), &user, &comic, "great", 5).unwrap();
        db.add_review(&new_id(), &user, &comic, "still great", 4)
            .unwrap();

        let reviews = db.list_reviews_by_comic(&comic).unwrap();
        assert_eq!(reviews.len(), 2);
        assert!(reviews.iter().all(|r| r.user_id == user));
    }

    #[test]
    fn add_to_library_is_idempotent() {
        let db = db();
        let alice = seed_user(&db, "alice", "a@x.com");
        let comic = seed_comic(&db, "Batman", "", &alice);

        assert!(db.add_to_library(&alice, &comic).unwrap());
        assert!(!db.add_to_library(&alice, &comic).unwrap());

        let shelf = db.list_library(&alice).unwrap();
        assert_eq!(shelf.len(), 1);
        assert_eq!(shelf[0].id, comic);
    }

    #[test]
    fn remove_from_library_reports_membership() {
        let db = db();
        let alice = seed_user(&db, "alice", "a@x.com");
        let comic = seed_comic(&db, "Batman", "", &alice);

        // not a member yet
        assert!(!db.remove_from_library(&alice, &comic).unwrap());
        assert!(db.list_library(&alice).unwrap().is_empty());

        db.add_to_library(&alice, &comic).unwrap();
        assert!(db.remove_from_library(&alice, &comic).unwrap());
        assert!(db.list_library(&alice).unwrap().is_empty());
    }

    #[test]
    fn list_library_drops_dangling_comic_ids() {
        let db = db();
        let alice = seed_user(&db, "alice", "a@x.com");
        let comic = seed_comic(&db, "Batman", "", &alice);

        db.add_to_library(&alice, &comic).unwrap();
        // membership row pointing at a comic that was never created
        db.add_to_library(&alice, "ghost-comic").unwrap();

        let shelf = db.list_library(&alice).unwrap();
        assert_eq!(shelf.len(), 1);
        assert_eq!(shelf[0].id, comic);
    }
}
