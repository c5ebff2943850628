use messenger_service::server::error::ServiceError;
use messenger_service::server::storage::ObjectStore;

#[test]
fn put_then_download_url_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = ObjectStore::new(dir.path(), Some("https://cdn.example.com".to_string()));

    let key = ObjectStore::profile_picture_key("Alice@Example.com", "profilePhoto.png");
    assert_eq!(key, "users/alice@example.com/profilePhoto.png");

    let url = store.put(&key, b"png-bytes").expect("put");
    assert_eq!(url, "https://cdn.example.com/users/alice@example.com/profilePhoto.png");
    assert_eq!(store.download_url(&key).expect("url"), url);
    assert_eq!(std::fs::read(dir.path().join(&key)).expect("read"), b"png-bytes");
}

#[test]
fn file_urls_are_issued_without_a_public_base() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = ObjectStore::new(dir.path(), None);

    let url = store.put("users/a@example.com/p.png", b"x").expect("put");
    assert!(url.starts_with("file://"), "{}", url);
}

#[test]
fn missing_blob_has_no_download_url() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = ObjectStore::new(dir.path(), None);

    let err = store.download_url("users/a@example.com/missing.png").expect_err("missing");
    assert!(matches!(err, ServiceError::DownloadUrl));
}

#[test]
fn traversal_keys_are_refused() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = ObjectStore::new(dir.path(), None);

    for key in ["../../etc/passwd", "users//x.png", "", "users/./x.png"] {
        let err = store.put(key, b"x").expect_err("bad key");
        assert!(matches!(err, ServiceError::InvalidInput(_)), "{}", key);
    }
}
