mod common;

use messenger_service::common::models::{ConversationSummary, LatestMessage, Message};
use messenger_service::server::conversations;
use messenger_service::server::error::ServiceError;

#[tokio::test]
async fn first_message_creates_summary_on_both_sides() {
    let (db, _guard) = common::test_db().await;
    let config = common::test_config();
    let alice = common::seed_user(&db, &config, "Alice", "Smith", "alice@example.com").await;
    let bob = common::seed_user(&db, &config, "Bob", "Jones", "bob@example.com").await;

    let first = Message::new_text(&alice.email, &bob.email, &bob.full_name, "hello bob");
    let conversation_id = conversations::create_conversation(db.clone(), &alice, &bob, &first)
        .await
        .expect("create");
    assert_eq!(conversation_id, format!("conversation_{}", first.id));

    let alice_list = conversations::list_conversations(db.clone(), "alice@example.com")
        .await
        .expect("list alice");
    assert_eq!(alice_list.len(), 1);
    assert_eq!(alice_list[0].id, conversation_id);
    assert_eq!(alice_list[0].name, "Bob Jones");
    assert_eq!(alice_list[0].other_user_email, "bob@example.com");
    assert_eq!(alice_list[0].latest_message.text, "hello bob");
    assert!(!alice_list[0].latest_message.is_read);

    let bob_list = conversations::list_conversations(db.clone(), "bob@example.com")
        .await
        .expect("list bob");
    assert_eq!(bob_list.len(), 1);
    assert_eq!(bob_list[0].id, conversation_id);
    assert_eq!(bob_list[0].name, "Alice Smith");
    assert_eq!(bob_list[0].other_user_email, "alice@example.com");
    assert_eq!(bob_list[0].latest_message, alice_list[0].latest_message);
}

#[tokio::test]
async fn empty_index_lists_nothing() {
    let (db, _guard) = common::test_db().await;
    let config = common::test_config();
    common::seed_user(&db, &config, "Alice", "Smith", "alice@example.com").await;

    let list = conversations::list_conversations(db.clone(), "alice@example.com")
        .await
        .expect("list");
    assert!(list.is_empty());
}

fn summary(id: &str, other_email: &str, other_name: &str) -> ConversationSummary {
    ConversationSummary {
        id: id.to_string(),
        name: other_name.to_string(),
        other_user_email: other_email.to_string(),
        latest_message: LatestMessage {
            date: chrono::Utc::now().timestamp(),
            text: "hi".to_string(),
            is_read: false,
        },
    }
}

// The original stored the whole conversation list as one array and rewrote it
// on every append, so one of two concurrent appends could vanish. Appends are
// per-row here and both must survive.
#[tokio::test]
async fn concurrent_appends_to_one_owner_both_survive() {
    let (db, _guard) = common::test_db().await;
    let config = common::test_config();
    common::seed_user(&db, &config, "Alice", "Smith", "alice@example.com").await;

    let s1 = summary("conversation_one", "bob@example.com", "Bob Jones");
    let s2 = summary("conversation_two", "carol@example.com", "Carol White");
    let (r1, r2) = tokio::join!(
        conversations::append_conversation(db.clone(), "alice@example.com", &s1),
        conversations::append_conversation(db.clone(), "alice@example.com", &s2),
    );
    r1.expect("first append");
    r2.expect("second append");

    let list = conversations::list_conversations(db.clone(), "alice@example.com")
        .await
        .expect("list");
    assert_eq!(list.len(), 2);
}

#[tokio::test]
async fn unknown_conversation_lookup_fails() {
    let (db, _guard) = common::test_db().await;
    let config = common::test_config();
    common::seed_user(&db, &config, "Alice", "Smith", "alice@example.com").await;

    let err = conversations::find_for_owner(db.clone(), "alice@example.com", "conversation_nope")
        .await
        .expect_err("missing conversation");
    assert!(matches!(err, ServiceError::ConversationNotFound(_)));
}
