mod common;

use messenger_service::server::error::ServiceError;
use messenger_service::server::{auth, users};

#[tokio::test]
async fn register_then_lookup_is_case_insensitive() {
    let (db, _guard) = common::test_db().await;
    let config = common::test_config();

    auth::register(db.clone(), "Marko", "Antoljak", "Marko@Example.com", "secret99", &config)
        .await
        .expect("register");

    let user = users::get_user(db.clone(), "MARKO@EXAMPLE.COM").await.expect("lookup");
    assert_eq!(user.first_name, "Marko");
    assert_eq!(user.last_name, "Antoljak");
    assert_eq!(user.email, "marko@example.com");
    assert_eq!(user.full_name, "Marko Antoljak");
    assert!(!user.has_profile_picture);
}

#[tokio::test]
async fn duplicate_email_is_refused() {
    let (db, _guard) = common::test_db().await;
    let config = common::test_config();

    auth::register(db.clone(), "Ana", "First", "ana@example.com", "secret99", &config)
        .await
        .expect("first register");
    let err = auth::register(db.clone(), "Ana", "Second", "ANA@example.com", "other999", &config)
        .await
        .expect_err("duplicate must fail");
    assert!(matches!(err, ServiceError::EmailTaken));
}

#[tokio::test]
async fn signup_input_is_validated() {
    let (db, _guard) = common::test_db().await;
    let config = common::test_config();

    let err = auth::register(db.clone(), "", "Antoljak", "a@example.com", "secret99", &config)
        .await
        .expect_err("blank first name");
    assert!(matches!(err, ServiceError::InvalidInput(_)));

    let err = auth::register(db.clone(), "Marko", "Antoljak", "not-an-email", "secret99", &config)
        .await
        .expect_err("email without @");
    assert!(matches!(err, ServiceError::InvalidInput(_)));

    let err = auth::register(db.clone(), "Marko", "Antoljak", "a@example.com", "short", &config)
        .await
        .expect_err("password too short");
    assert!(matches!(err, ServiceError::InvalidInput(_)));
}

#[tokio::test]
async fn unknown_user_lookup_fails() {
    let (db, _guard) = common::test_db().await;

    let err = users::get_user(db.clone(), "nobody@example.com")
        .await
        .expect_err("missing user");
    assert!(matches!(err, ServiceError::UserNotFound(_)));
}

#[tokio::test]
async fn list_all_returns_every_identity() {
    let (db, _guard) = common::test_db().await;
    let config = common::test_config();

    for (first, last, email) in [
        ("Marko", "Antoljak", "marko@example.com"),
        ("Ana", "Babic", "ana@example.com"),
        ("Ivan", "Horvat", "ivan@example.com"),
    ] {
        auth::register(db.clone(), first, last, email, "secret99", &config)
            .await
            .expect("register");
    }

    let all = users::list_all(db.clone(), None).await.expect("list");
    assert_eq!(all.len(), 3);

    let without_ana = users::list_all(db.clone(), Some("ANA@example.com")).await.expect("list");
    assert_eq!(without_ana.len(), 2);
    assert!(without_ana.iter().all(|u| u.email != "ana@example.com"));
}

#[tokio::test]
async fn search_matches_full_name_prefix_case_insensitively() {
    let (db, _guard) = common::test_db().await;
    let config = common::test_config();

    for (first, last, email) in [
        ("Marko", "Antoljak", "marko@example.com"),
        ("Marta", "Babic", "marta@example.com"),
        ("Bob", "Marley", "bob@example.com"),
    ] {
        auth::register(db.clone(), first, last, email, "secret99", &config)
            .await
            .expect("register");
    }

    let found = users::search_by_name_prefix(db.clone(), "MAR").await.expect("search");
    let mut names: Vec<String> = found.iter().map(|u| u.full_name.clone()).collect();
    names.sort();
    // "Bob Marley" contains "mar" but does not start with it
    assert_eq!(names, vec!["Marko Antoljak".to_string(), "Marta Babic".to_string()]);

    let found = users::search_by_name_prefix(db.clone(), "marko a").await.expect("search");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].email, "marko@example.com");

    let found = users::search_by_name_prefix(db.clone(), "zz").await.expect("search");
    assert!(found.is_empty());
}
