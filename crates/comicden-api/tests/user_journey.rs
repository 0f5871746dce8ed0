//! End-to-end exercise of the stores the way the handlers drive them:
//! register, log in, upload, browse, shelve, review.

use comicden_api::auth::{hash_password, verify_credentials};
use comicden_db::{Database, StoreError};
use comicden_storage::Storage;
use uuid::Uuid;

fn register(db: &Database, username: &str, email: &str, password: &str) -> Result<String, StoreError> {
    let id = Uuid::new_v4().to_string();
    let hash = hash_password(password).unwrap();
    db.create_user(&id, username, email, &hash)?;
    Ok(id)
}

#[test]
fn full_user_journey() {
    let db = Database::open_in_memory().unwrap();

    // Registration and the duplicate rules
    let alice = register(&db, "alice", "a@x.com", "pw1-long-enough").unwrap();
    let err = register(&db, "alice", "b@x.com", "pw2-long-enough").unwrap_err();
    assert!(matches!(err, StoreError::DuplicateUsername));
    let err = register(&db, "bob", "a@x.com", "pw3-long-enough").unwrap_err();
    assert!(matches!(err, StoreError::DuplicateEmail));

    // Login
    let user = verify_credentials(&db, "alice", "pw1-long-enough").unwrap();
    assert_eq!(user.id, alice);
    assert!(matches!(
        verify_credentials(&db, "alice", "wrong-password").unwrap_err(),
        StoreError::BadCredential
    ));

    // Upload and search
    let batman = Uuid::new_v4().to_string();
    db.create_comic(&batman, "Batman", "the dark knight", "stored.pdf", &alice)
        .unwrap();
    let hits = db.search_comics("bat").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, batman);
    assert!(db.search_comics("zzz").unwrap().is_empty());

    // Detail-page visits bump the counter
    for _ in 0..3 {
        db.increment_views(&batman).unwrap();
    }
    assert_eq!(db.get_comic(&batman).unwrap().unwrap().views, 3);

    // Shelving is idempotent
    assert!(db.add_to_library(&alice, &batman).unwrap());
    assert!(!db.add_to_library(&alice, &batman).unwrap());
    assert_eq!(db.list_library(&alice).unwrap().len(), 1);

    // Reviews: 6 is rejected with nothing written, 3 goes through
    let err = db
        .add_review(&Uuid::new_v4().to_string(), &alice, &batman, "!!", 6)
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidRating(6)));
    assert!(db.list_reviews_by_comic(&batman).unwrap().is_empty());

    db.add_review(&Uuid::new_v4().to_string(), &alice, &batman, "solid", 3)
        .unwrap();
    let reviews = db.list_reviews_by_comic(&batman).unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0].rating, 3);
}

#[tokio::test]
async fn upload_stores_file_before_catalog_row() {
    let db = Database::open_in_memory().unwrap();
    let dir = std::env::temp_dir().join(format!("comicden-journey-{}", Uuid::new_v4()));
    let storage = Storage::new(dir).await.unwrap();

    let alice = register(&db, "alice", "a@x.com", "pw1-long-enough").unwrap();

    // The handler's ordering: bytes hit disk, then the row is written
    // with the stored name.
    let stored = storage.save(b"%PDF-1.4", "batman.pdf").await.unwrap();
    let comic = Uuid::new_v4().to_string();
    db.create_comic(&comic, "Batman", "", &stored, &alice).unwrap();

    let row = db.get_comic(&comic).unwrap().unwrap();
    assert_eq!(storage.read(&row.filename).await.unwrap(), b"%PDF-1.4");
}
