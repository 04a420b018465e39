mod common;
use common::*;

use uuid::Uuid;

use worklane::chat::{CreateConversationRequest, SendMessageRequest};
use worklane::errors::AppError;
use worklane::events::DomainEvent;
use worklane::models::notification::NotificationKind;
use worklane::notifications::{deliver, spawn_notifier};
use worklane::scheduling::CreateMeetingRequest;
use worklane::scheduling::roster::AddParticipantsRequest;

// --- Tests ---

#[tokio::test]
async fn test_notifier_persists_events_until_bus_is_dropped() {
    let TestApp { store, state, events, .. } = setup();
    let (alice, bob) = seed_users(&store).await;
    let handle = spawn_notifier(events, store.clone());

    let meeting = state
        .scheduler
        .create(
            CreateMeetingRequest {
                title: "Roadmap".to_string(),
                description: Some("Q3".to_string()),
                start_time: at(16, 0),
                end_time: at(17, 0),
                project_id: None,
            },
            alice.id,
        )
        .await
        .unwrap();
    state
        .roster
        .add_participants(
            meeting.id,
            AddParticipantsRequest {
                user_ids: vec![bob.id],
                role: None,
            },
        )
        .await
        .unwrap();
    let conversation = state
        .chat
        .create_or_get_conversation(
            CreateConversationRequest {
                recipient_id: bob.id,
                initial_message: None,
            },
            alice.id,
        )
        .await
        .unwrap()
        .conversation;
    state
        .chat
        .send_message(
            SendMessageRequest {
                conversation_id: conversation.id,
                content: "Agenda attached".to_string(),
            },
            alice.id,
        )
        .await
        .unwrap();
    state.scheduler.remove(meeting.id).await.unwrap();

    drop(state);
    handle.await.expect("notifier task");

    let kinds: Vec<NotificationKind> = store.notifications_for(bob.id).await.iter().map(|n| n.kind).collect();
    assert_eq!(
        kinds,
        vec![
            NotificationKind::MeetingInvitation,
            NotificationKind::NewMessage,
            NotificationKind::MeetingCancelled,
        ]
    );
    assert!(store.notifications_for(alice.id).await.is_empty());

    let bob_notes = store.notifications_for(bob.id).await;
    assert_eq!(bob_notes[1].message, "New message from Alice");
    assert_eq!(bob_notes[1].content.as_deref(), Some("Agenda attached"));
    assert_eq!(bob_notes[1].entity_type.as_deref(), Some("conversation"));
    assert_eq!(bob_notes[1].entity_id, Some(conversation.id));
    assert_eq!(bob_notes[0].entity_id, Some(meeting.id));
}

#[tokio::test]
async fn test_list_and_mark_read() {
    let app = setup();
    let (alice, bob) = seed_users(&app.store).await;
    for i in 0..3 {
        deliver(
            app.store.as_ref(),
            DomainEvent::MessageSent {
                conversation_id: Uuid::new_v4(),
                message_id: Uuid::new_v4(),
                sender_id: alice.id,
                sender_name: "Alice".to_string(),
                recipient_id: bob.id,
                preview: format!("ping {i}"),
            },
        )
        .await;
    }

    let service = &app.state.notifications;
    assert_eq!(service.list(bob.id, None).await.unwrap().len(), 3);
    assert_eq!(service.list(bob.id, Some(2)).await.unwrap().len(), 2);
    assert!(service.list(alice.id, None).await.unwrap().is_empty());

    let target = service.list(bob.id, None).await.unwrap()[0].id;
    let err = service.mark_read(target, alice.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let read = service.mark_read(target, bob.id).await.unwrap();
    assert!(read.is_read);
    let unread = service
        .list(bob.id, None)
        .await
        .unwrap()
        .into_iter()
        .filter(|n| !n.is_read)
        .count();
    assert_eq!(unread, 2);
}
