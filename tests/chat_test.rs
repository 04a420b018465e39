mod common;
use common::*;

use std::collections::HashSet;
use uuid::Uuid;

use worklane::chat::{
    ConversationsQuery, CreateConversationRequest, MarkAsReadRequest, MessagesQuery, SendMessageRequest,
};
use worklane::errors::AppError;
use worklane::events::DomainEvent;
use worklane::models::chat::Conversation;

async fn open(app: &TestApp, from: Uuid, to: Uuid) -> Conversation {
    app.state
        .chat
        .create_or_get_conversation(
            CreateConversationRequest {
                recipient_id: to,
                initial_message: None,
            },
            from,
        )
        .await
        .expect("open conversation")
        .conversation
}

async fn send(app: &TestApp, conversation_id: Uuid, sender: Uuid, content: &str) {
    app.state
        .chat
        .send_message(
            SendMessageRequest {
                conversation_id,
                content: content.to_string(),
            },
            sender,
        )
        .await
        .expect("send message");
}

// --- Tests ---

#[tokio::test]
async fn test_conversation_is_shared_by_both_directions() {
    let app = setup();
    let (alice, bob) = seed_users(&app.store).await;

    let first = app
        .state
        .chat
        .create_or_get_conversation(
            CreateConversationRequest {
                recipient_id: bob.id,
                initial_message: None,
            },
            alice.id,
        )
        .await
        .unwrap();
    assert!(first.is_new);

    let second = app
        .state
        .chat
        .create_or_get_conversation(
            CreateConversationRequest {
                recipient_id: alice.id,
                initial_message: Some("ignored on an existing conversation".to_string()),
            },
            bob.id,
        )
        .await
        .unwrap();
    assert!(!second.is_new);
    assert_eq!(second.conversation.id, first.conversation.id);
    assert!(second.conversation.user_one_id < second.conversation.user_two_id);
    assert!(second.conversation.last_message_preview.is_none());
}

#[tokio::test]
async fn test_conversation_with_self_or_unknown_user_is_rejected() {
    let app = setup();
    let (alice, _) = seed_users(&app.store).await;

    let err = app
        .state
        .chat
        .create_or_get_conversation(
            CreateConversationRequest {
                recipient_id: alice.id,
                initial_message: None,
            },
            alice.id,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = app
        .state
        .chat
        .create_or_get_conversation(
            CreateConversationRequest {
                recipient_id: Uuid::new_v4(),
                initial_message: None,
            },
            alice.id,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_initial_message_sets_preview_and_notifies() {
    let mut app = setup();
    let (alice, bob) = seed_users(&app.store).await;
    let long = "y".repeat(150);

    let result = app
        .state
        .chat
        .create_or_get_conversation(
            CreateConversationRequest {
                recipient_id: bob.id,
                initial_message: Some(format!("  {long}  ")),
            },
            alice.id,
        )
        .await
        .unwrap();
    let preview = result.conversation.last_message_preview.expect("preview");
    assert_eq!(preview.chars().count(), 100);
    assert!(result.conversation.last_message_at.is_some());

    match app.events.recv().await {
        Some(DomainEvent::MessageSent {
            sender_name,
            recipient_id,
            ..
        }) => {
            assert_eq!(sender_name, "Alice");
            assert_eq!(recipient_id, bob.id);
        }
        other => panic!("expected MessageSent, got {other:?}"),
    }
}

#[tokio::test]
async fn test_blank_initial_message_creates_nothing() {
    let app = setup();
    let (alice, bob) = seed_users(&app.store).await;

    let err = app
        .state
        .chat
        .create_or_get_conversation(
            CreateConversationRequest {
                recipient_id: bob.id,
                initial_message: Some("   ".to_string()),
            },
            alice.id,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let list = app
        .state
        .chat
        .get_user_conversations(alice.id, ConversationsQuery::default())
        .await
        .unwrap();
    assert!(list.is_empty());
}

#[tokio::test]
async fn test_send_message_checks_membership_then_content() {
    let app = setup();
    let (alice, bob) = seed_users(&app.store).await;
    let mallory = app.store.add_user("Mallory", None).await;
    let conversation = open(&app, alice.id, bob.id).await;

    let err = app
        .state
        .chat
        .send_message(
            SendMessageRequest {
                conversation_id: conversation.id,
                content: "hi".to_string(),
            },
            mallory.id,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = app
        .state
        .chat
        .send_message(
            SendMessageRequest {
                conversation_id: Uuid::new_v4(),
                content: "hi".to_string(),
            },
            alice.id,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = app
        .state
        .chat
        .send_message(
            SendMessageRequest {
                conversation_id: conversation.id,
                content: "x".repeat(2001),
            },
            alice.id,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let sent = app
        .state
        .chat
        .send_message(
            SendMessageRequest {
                conversation_id: conversation.id,
                content: "  see you at ten  ".to_string(),
            },
            alice.id,
        )
        .await
        .unwrap();
    assert_eq!(sent.message.content, "see you at ten");
    assert_eq!(sent.conversation_preview, "see you at ten");
}

#[tokio::test]
async fn test_get_conversation_hides_from_outsiders() {
    let app = setup();
    let (alice, bob) = seed_users(&app.store).await;
    let mallory = app.store.add_user("Mallory", None).await;
    let conversation = open(&app, alice.id, bob.id).await;

    assert_eq!(app.state.chat.get_conversation(conversation.id, bob.id).await.unwrap().id, conversation.id);
    let err = app.state.chat.get_conversation(conversation.id, mallory.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_pagination_walks_history_without_gaps() {
    let app = setup();
    let (alice, bob) = seed_users(&app.store).await;
    let conversation = open(&app, alice.id, bob.id).await;

    for i in 0..150 {
        let sender = if i % 2 == 0 { alice.id } else { bob.id };
        send(&app, conversation.id, sender, &format!("message {i}")).await;
    }

    let mut seen = Vec::new();
    let mut cursor = None;
    let mut pages = 0;
    loop {
        let page = app
            .state
            .chat
            .get_messages(conversation.id, alice.id, MessagesQuery { limit: None, cursor })
            .await
            .unwrap();
        pages += 1;
        assert!(page.messages.len() <= 50);
        seen.extend(page.messages.iter().map(|m| m.content.clone()));
        if !page.has_more {
            assert!(page.next_cursor.is_none());
            break;
        }
        cursor = page.next_cursor;
    }

    assert_eq!(pages, 3);
    let expected: Vec<String> = (0..150).rev().map(|i| format!("message {i}")).collect();
    assert_eq!(seen, expected);
    let unique: HashSet<&String> = seen.iter().collect();
    assert_eq!(unique.len(), 150);
}

#[tokio::test]
async fn test_page_size_is_clamped_and_marks_own_messages() {
    let app = setup();
    let (alice, bob) = seed_users(&app.store).await;
    let conversation = open(&app, alice.id, bob.id).await;
    send(&app, conversation.id, alice.id, "one").await;
    send(&app, conversation.id, bob.id, "two").await;

    let page = app
        .state
        .chat
        .get_messages(
            conversation.id,
            alice.id,
            MessagesQuery {
                limit: Some(0),
                cursor: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(page.messages.len(), 1);
    assert!(page.has_more);
    assert_eq!(page.messages[0].content, "two");
    assert!(!page.messages[0].is_mine);
    assert_eq!(page.messages[0].sender.name, "Bob");
}

#[tokio::test]
async fn test_deleted_sender_gets_placeholder() {
    let app = setup();
    let (alice, bob) = seed_users(&app.store).await;
    let conversation = open(&app, alice.id, bob.id).await;
    send(&app, conversation.id, bob.id, "bye").await;
    app.store.remove_user(bob.id).await;

    let page = app
        .state
        .chat
        .get_messages(conversation.id, alice.id, MessagesQuery::default())
        .await
        .unwrap();
    assert_eq!(page.messages[0].sender.id, bob.id);
    assert_eq!(page.messages[0].sender.name, "Deleted user");
}

#[tokio::test]
async fn test_mark_as_read_is_idempotent_and_skips_own_messages() {
    let app = setup();
    let (alice, bob) = seed_users(&app.store).await;
    let conversation = open(&app, alice.id, bob.id).await;
    send(&app, conversation.id, bob.id, "one").await;
    send(&app, conversation.id, bob.id, "two").await;
    send(&app, conversation.id, alice.id, "three").await;

    let request = || MarkAsReadRequest {
        conversation_id: conversation.id,
        message_ids: vec![],
    };
    assert_eq!(app.state.chat.mark_messages_as_read(request(), alice.id).await.unwrap(), 2);
    assert_eq!(app.state.chat.mark_messages_as_read(request(), alice.id).await.unwrap(), 0);
    assert_eq!(app.state.chat.mark_messages_as_read(request(), bob.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_mark_selected_messages_as_read() {
    let app = setup();
    let (alice, bob) = seed_users(&app.store).await;
    let mallory = app.store.add_user("Mallory", None).await;
    let conversation = open(&app, alice.id, bob.id).await;
    send(&app, conversation.id, bob.id, "one").await;
    send(&app, conversation.id, bob.id, "two").await;

    let page = app
        .state
        .chat
        .get_messages(conversation.id, alice.id, MessagesQuery::default())
        .await
        .unwrap();
    let newest = page.messages[0].id;

    let count = app
        .state
        .chat
        .mark_messages_as_read(
            MarkAsReadRequest {
                conversation_id: conversation.id,
                message_ids: vec![newest],
            },
            alice.id,
        )
        .await
        .unwrap();
    assert_eq!(count, 1);

    let list = app
        .state
        .chat
        .get_user_conversations(alice.id, ConversationsQuery::default())
        .await
        .unwrap();
    assert_eq!(list[0].unread_count, 1);

    let err = app
        .state
        .chat
        .mark_messages_as_read(
            MarkAsReadRequest {
                conversation_id: conversation.id,
                message_ids: vec![],
            },
            mallory.id,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn test_conversation_list_orders_by_latest_message() {
    let app = setup();
    let (alice, bob) = seed_users(&app.store).await;
    let carol = app.store.add_user("Carol", None).await;
    let dave = app.store.add_user("Dave", None).await;

    let with_bob = open(&app, alice.id, bob.id).await;
    let with_carol = open(&app, carol.id, alice.id).await;
    let with_dave = open(&app, alice.id, dave.id).await;
    send(&app, with_bob.id, bob.id, "first").await;
    send(&app, with_carol.id, carol.id, "second").await;
    send(&app, with_carol.id, carol.id, "third").await;

    let list = app
        .state
        .chat
        .get_user_conversations(alice.id, ConversationsQuery::default())
        .await
        .unwrap();
    let ids: Vec<Uuid> = list.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![with_carol.id, with_bob.id, with_dave.id]);
    assert_eq!(list[0].other_user.name, "Carol");
    assert_eq!(list[0].unread_count, 2);
    assert_eq!(list[0].last_message_preview.as_deref(), Some("third"));
    assert_eq!(list[2].unread_count, 0);

    let page_two = app
        .state
        .chat
        .get_user_conversations(
            alice.id,
            ConversationsQuery {
                page: Some(2),
                limit: Some(2),
            },
        )
        .await
        .unwrap();
    assert_eq!(page_two.len(), 1);
    assert_eq!(page_two[0].id, with_dave.id);

    let err = app
        .state
        .chat
        .get_user_conversations(
            alice.id,
            ConversationsQuery {
                page: Some(i64::MAX),
                limit: Some(100),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_conversation_with_removed_user_is_dropped_from_list() {
    let app = setup();
    let (alice, bob) = seed_users(&app.store).await;
    let carol = app.store.add_user("Carol", None).await;
    open(&app, alice.id, bob.id).await;
    let with_carol = open(&app, alice.id, carol.id).await;
    app.store.remove_user(bob.id).await;

    let list = app
        .state
        .chat
        .get_user_conversations(alice.id, ConversationsQuery::default())
        .await
        .unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].id, with_carol.id);
}
