mod common;

use base64::{engine::general_purpose, Engine as _};
use messenger_service::server::connection::Server;
use serde_json::Value;

fn session_token(resp: &str) -> String {
    resp.split("SESSION:").nth(1).expect("session token").trim().to_string()
}

fn json_payload(resp: &str) -> Value {
    serde_json::from_str(resp.strip_prefix("OK: ").expect("OK response")).expect("json payload")
}

#[tokio::test]
async fn full_chat_flow_over_the_command_surface() {
    let (db, guard) = common::test_db().await;
    let mut config = common::test_config();
    config.storage_root = guard.path().join("storage").display().to_string();
    let server = Server::new(db.clone(), config);

    let resp = server
        .handle_command("/register", &["Alice@Example.com", "secret99", "Alice", "Smith"])
        .await;
    assert!(resp.starts_with("OK: Registered as alice@example.com"), "{}", resp);
    let alice = session_token(&resp);

    let resp = server
        .handle_command("/register", &["bob@example.com", "secret99", "Bob", "Jones"])
        .await;
    assert!(resp.starts_with("OK: Registered as bob@example.com"), "{}", resp);
    let bob = session_token(&resp);

    // name-prefix search
    let resp = server.handle_command("/search_users", &[&alice, "bob"]).await;
    let found = json_payload(&resp);
    assert_eq!(found.as_array().expect("array").len(), 1);
    assert_eq!(found[0]["email"], "bob@example.com");

    // first message opens the conversation on both sides
    let resp = server
        .handle_command("/create_conversation", &[&alice, "bob@example.com", "hello", "bob!"])
        .await;
    let conversation_id = resp.strip_prefix("OK: ").expect("conversation id").to_string();
    assert!(conversation_id.starts_with("conversation_"), "{}", conversation_id);

    let resp = server.handle_command("/list_conversations", &[&bob]).await;
    let list = json_payload(&resp);
    assert_eq!(list.as_array().expect("array").len(), 1);
    assert_eq!(list[0]["id"], conversation_id.as_str());
    assert_eq!(list[0]["name"], "Alice Smith");
    assert_eq!(list[0]["latest_message"]["text"], "hello bob!");

    // reply lands behind the first message
    let resp = server
        .handle_command("/send_message", &[&bob, &conversation_id, "hi", "alice"])
        .await;
    assert_eq!(resp, "OK: Message sent");

    let resp = server.handle_command("/get_messages", &[&alice, &conversation_id]).await;
    let log = json_payload(&resp);
    assert_eq!(log.as_array().expect("array").len(), 2);
    assert_eq!(log[0]["content"], "hello bob!");
    assert_eq!(log[0]["sender_email"], "alice@example.com");
    assert_eq!(log[1]["content"], "hi alice");
    assert_eq!(log[1]["sender_email"], "bob@example.com");
    assert_eq!(log[1]["kind"], "text");

    // profile picture upload flips the flag and yields a stable URL
    let photo = general_purpose::STANDARD.encode(b"png-bytes");
    let resp = server
        .handle_command("/upload_photo", &[&alice, "profilePhoto.png", &photo])
        .await;
    assert!(resp.starts_with("OK: "), "{}", resp);

    let resp = server
        .handle_command("/photo_url", &[&bob, "users/alice@example.com/profilePhoto.png"])
        .await;
    assert!(resp.starts_with("OK: file://"), "{}", resp);

    let resp = server.handle_command("/get_user", &[&bob, "alice@example.com"]).await;
    let user = json_payload(&resp);
    assert_eq!(user["has_profile_picture"], true);

    // sign-out invalidates the session for further calls
    let resp = server.handle_command("/logout", &[&alice]).await;
    assert_eq!(resp, "OK: Logged out");
    let resp = server.handle_command("/list_conversations", &[&alice]).await;
    assert_eq!(resp, "ERR: Invalid or expired session");
}

#[tokio::test]
async fn bad_sessions_and_bad_commands_are_refused() {
    let (db, guard) = common::test_db().await;
    let mut config = common::test_config();
    config.storage_root = guard.path().join("storage").display().to_string();
    let server = Server::new(db.clone(), config);

    let resp = server.handle_command("/list_conversations", &["bogus-token"]).await;
    assert_eq!(resp, "ERR: Invalid or expired session");

    let resp = server.handle_command("/frobnicate", &[]).await;
    assert_eq!(resp, "ERR: Unknown or invalid command");

    // arity mismatch falls through to the same refusal
    let resp = server.handle_command("/login", &["only-email"]).await;
    assert_eq!(resp, "ERR: Unknown or invalid command");

    let resp = server.handle_command("/help", &[]).await;
    assert!(resp.contains("/create_conversation"));
}

#[tokio::test]
async fn sending_into_a_foreign_conversation_is_refused() {
    let (db, guard) = common::test_db().await;
    let mut config = common::test_config();
    config.storage_root = guard.path().join("storage").display().to_string();
    let server = Server::new(db.clone(), config);

    let resp = server
        .handle_command("/register", &["alice@example.com", "secret99", "Alice", "Smith"])
        .await;
    let alice = session_token(&resp);
    let resp = server
        .handle_command("/register", &["bob@example.com", "secret99", "Bob", "Jones"])
        .await;
    let _bob = session_token(&resp);
    let resp = server
        .handle_command("/register", &["mallory@example.com", "secret99", "Mallory", "Crane"])
        .await;
    let mallory = session_token(&resp);

    let resp = server
        .handle_command("/create_conversation", &[&alice, "bob@example.com", "hello"])
        .await;
    let conversation_id = resp.strip_prefix("OK: ").expect("conversation id").to_string();

    // mallory holds no summary for this conversation, so the counterpart
    // cannot be resolved for her
    let resp = server
        .handle_command("/send_message", &[&mallory, &conversation_id, "hi"])
        .await;
    assert!(resp.starts_with("ERR: Conversation not found"), "{}", resp);
}
