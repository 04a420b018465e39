mod common;
use common::*;

use serde_json::json;
use uuid::Uuid;

use worklane::errors::AppError;
use worklane::events::EventBus;
use worklane::models::meeting::{Meeting, MeetingStatus};
use worklane::models::participant::ParticipantStatus;
use worklane::scheduling::roster::AddParticipantsRequest;
use worklane::scheduling::webhooks::{WebhookEvent, WebhookOutcome, compute_signature};
use worklane::scheduling::{CreateMeetingRequest, Roster, WebhookProcessor};

async fn schedule(app: &TestApp, organizer: Uuid) -> Meeting {
    app.state
        .scheduler
        .create(
            CreateMeetingRequest {
                title: "Demo".to_string(),
                description: None,
                start_time: at(14, 0),
                end_time: at(15, 0),
                project_id: None,
            },
            organizer,
        )
        .await
        .expect("schedule meeting")
}

fn event(kind: &str, room: &str, user_id: Option<&str>) -> WebhookEvent {
    let mut payload = json!({ "room": room, "mtg_session_id": "sess-1" });
    if let Some(user_id) = user_id {
        payload["participant"] = json!({ "user_id": user_id, "user_name": "Bob" });
    }
    serde_json::from_value(json!({
        "type": kind,
        "id": "evt-1",
        "timestamp": "2026-06-01T14:00:00Z",
        "payload": payload,
    }))
    .expect("webhook event")
}

// --- Tests ---

#[tokio::test]
async fn test_lifecycle_events_drive_meeting_status() {
    let app = setup();
    let (alice, _) = seed_users(&app.store).await;
    let meeting = schedule(&app, alice.id).await;
    let room = meeting.room_name.clone().unwrap();
    let webhooks = &app.state.webhooks;

    let outcome = webhooks.handle(event("meeting.started", &room, None)).await.unwrap();
    assert_eq!(
        outcome,
        WebhookOutcome::StatusChanged {
            meeting_id: meeting.id,
            status: MeetingStatus::InProgress
        }
    );

    webhooks.handle(event("meeting.ended", &room, None)).await.unwrap();
    let stored = app.state.scheduler.find_one(meeting.id).await.unwrap();
    assert_eq!(stored.status, MeetingStatus::Completed);
}

#[tokio::test]
async fn test_room_url_also_identifies_the_meeting() {
    let app = setup();
    let (alice, _) = seed_users(&app.store).await;
    let meeting = schedule(&app, alice.id).await;
    let url = meeting.room_url.clone().unwrap();

    let outcome = app.state.webhooks.handle(event("room.created", &url, None)).await.unwrap();
    assert!(matches!(outcome, WebhookOutcome::StatusChanged { status: MeetingStatus::InProgress, .. }));

    app.state.webhooks.handle(event("room.deleted", &url, None)).await.unwrap();
    assert_eq!(
        app.state.scheduler.find_one(meeting.id).await.unwrap().status,
        MeetingStatus::Completed
    );
}

#[tokio::test]
async fn test_unknown_room_is_ignored() {
    let app = setup();
    let outcome = app
        .state
        .webhooks
        .handle(event("meeting.started", "meeting-0-deadbeef", None))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        WebhookOutcome::MeetingNotFound {
            room: "meeting-0-deadbeef".to_string()
        }
    );
}

#[tokio::test]
async fn test_participant_join_and_leave() {
    let app = setup();
    let (alice, bob) = seed_users(&app.store).await;
    let meeting = schedule(&app, alice.id).await;
    let room = meeting.room_name.clone().unwrap();
    app.state
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

    let bob_id = bob.id.to_string();
    let outcome = app
        .state
        .webhooks
        .handle(event("participant.joined", &room, Some(&bob_id)))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        WebhookOutcome::ParticipantUpdated {
            meeting_id: meeting.id,
            user_id: bob.id
        }
    );

    app.state
        .webhooks
        .handle(event("participant.left", &room, Some(&bob_id)))
        .await
        .unwrap();
    let participants = app.state.roster.list_participants(meeting.id).await.unwrap();
    assert_eq!(participants[0].status, ParticipantStatus::Left);
    assert!(participants[0].joined_at.is_some());
    assert!(participants[0].left_at.is_some());
}

#[tokio::test]
async fn test_participant_events_without_usable_user_are_skipped() {
    let app = setup();
    let (alice, bob) = seed_users(&app.store).await;
    let meeting = schedule(&app, alice.id).await;
    let room = meeting.room_name.clone().unwrap();

    let outcome = app
        .state
        .webhooks
        .handle(event("participant.joined", &room, Some("guest-42")))
        .await
        .unwrap();
    assert!(matches!(outcome, WebhookOutcome::ParticipantSkipped { .. }));

    let outcome = app
        .state
        .webhooks
        .handle(event("participant.joined", &room, None))
        .await
        .unwrap();
    assert!(matches!(outcome, WebhookOutcome::ParticipantSkipped { .. }));

    // A real user who was never invited.
    let outcome = app
        .state
        .webhooks
        .handle(event("participant.joined", &room, Some(&bob.id.to_string())))
        .await
        .unwrap();
    assert!(matches!(outcome, WebhookOutcome::ParticipantSkipped { .. }));
}

#[tokio::test]
async fn test_unhandled_event_type() {
    let app = setup();
    let (alice, _) = seed_users(&app.store).await;
    let meeting = schedule(&app, alice.id).await;

    let outcome = app
        .state
        .webhooks
        .handle(event("recording.ready", meeting.room_name.as_deref().unwrap(), None))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        WebhookOutcome::Unhandled {
            event_type: "recording.ready".to_string()
        }
    );
    assert_eq!(
        app.state.scheduler.find_one(meeting.id).await.unwrap().status,
        MeetingStatus::Scheduled
    );
}

#[tokio::test]
async fn test_authenticate_checks_signature() {
    let app = setup();
    let body = br#"{"type":"meeting.started","payload":{"room":"r"}}"#;
    let ts = chrono::Utc::now().timestamp().to_string();
    let sig = compute_signature(WEBHOOK_SECRET, &ts, body).unwrap();

    assert!(app.state.webhooks.authenticate(Some(&ts), Some(&sig), body).is_ok());
    let err = app
        .state
        .webhooks
        .authenticate(Some(&ts), Some(&sig), b"{}")
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn test_authenticate_without_secret_refuses_everything() {
    let app = setup();
    let (bus, _rx) = EventBus::channel();
    let roster = Roster::new(app.store.clone(), app.store.clone(), app.store.clone(), bus);
    let processor = WebhookProcessor::new(app.store.clone(), roster, None);

    let body = b"{}";
    let ts = chrono::Utc::now().timestamp().to_string();
    let sig = compute_signature("anything", &ts, body).unwrap();
    let err = processor.authenticate(Some(&ts), Some(&sig), body).unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}
