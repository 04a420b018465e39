mod common;
use common::*;

use actix_web::http::{StatusCode, header};
use actix_web::{App, test, web};
use chrono::Duration;
use serde_json::{Value, json};

use worklane::auth::TokenVerifier;
use worklane::events::DomainEvent;
use worklane::handlers::api_v1;
use worklane::notifications::deliver;
use worklane::scheduling::CreateMeetingRequest;
use worklane::scheduling::webhooks::{SIGNATURE_HEADER, TIMESTAMP_HEADER, compute_signature};

const JWT_SECRET: &[u8] = b"api-test-secret";

fn bearer(user_id: uuid::Uuid) -> (header::HeaderName, String) {
    let token = TokenVerifier::new(JWT_SECRET)
        .issue(user_id, None, Duration::hours(1))
        .expect("token");
    (header::AUTHORIZATION, format!("Bearer {token}"))
}

macro_rules! init_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state))
                .app_data(web::Data::new(TokenVerifier::new(JWT_SECRET)))
                .service(web::scope("/api/v1").configure(api_v1::configure)),
        )
        .await
    };
}

// --- Tests ---

#[actix_web::test]
async fn test_health_without_database() {
    let fixture = setup();
    let app = init_app!(fixture.state.clone());

    let req = test::TestRequest::get().uri("/api/v1/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "skipped");
}

#[actix_web::test]
async fn test_protected_routes_require_bearer_token() {
    let fixture = setup();
    let app = init_app!(fixture.state.clone());

    let req = test::TestRequest::get().uri("/api/v1/meetings").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Unauthorized");

    let req = test::TestRequest::get()
        .uri("/api/v1/chat/conversations")
        .insert_header((header::AUTHORIZATION, "Bearer not-a-jwt"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_create_and_list_meetings() {
    let fixture = setup();
    let (alice, _) = seed_users(&fixture.store).await;
    let app = init_app!(fixture.state.clone());

    let req = test::TestRequest::post()
        .uri("/api/v1/meetings")
        .insert_header(bearer(alice.id))
        .set_json(json!({
            "title": "Sprint review",
            "startTime": "2026-06-01T10:00:00Z",
            "endTime": "2026-06-01T11:00:00Z"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = test::read_body_json(resp).await;
    assert_eq!(created["title"], "Sprint review");
    assert_eq!(created["status"], "SCHEDULED");
    assert_eq!(created["createdById"], alice.id.to_string());

    let req = test::TestRequest::post()
        .uri("/api/v1/meetings")
        .insert_header(bearer(alice.id))
        .set_json(json!({
            "title": "Overlapping",
            "startTime": "2026-06-01T10:30:00Z",
            "endTime": "2026-06-01T11:30:00Z"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::get()
        .uri("/api/v1/meetings")
        .insert_header(bearer(alice.id))
        .to_request();
    let list: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(list.as_array().map(Vec::len), Some(1));
}

#[actix_web::test]
async fn test_mutations_require_json_content_type() {
    let fixture = setup();
    let (alice, _) = seed_users(&fixture.store).await;
    let app = init_app!(fixture.state.clone());

    let req = test::TestRequest::post()
        .uri("/api/v1/meetings")
        .insert_header(bearer(alice.id))
        .insert_header((header::CONTENT_TYPE, "text/plain"))
        .set_payload("title=Sprint review")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[actix_web::test]
async fn test_malformed_input_is_a_validation_error() {
    let fixture = setup();
    let (alice, _) = seed_users(&fixture.store).await;
    let app = init_app!(fixture.state.clone());

    let req = test::TestRequest::post()
        .uri("/api/v1/meetings")
        .insert_header(bearer(alice.id))
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .set_payload(r#"{"title": "#)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Validation failed");

    let req = test::TestRequest::get()
        .uri("/api/v1/meetings/not-a-uuid")
        .insert_header(bearer(alice.id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_webhook_requires_valid_signature() {
    let fixture = setup();
    let (alice, _) = seed_users(&fixture.store).await;
    let meeting = fixture
        .state
        .scheduler
        .create(
            CreateMeetingRequest {
                title: "Call".to_string(),
                description: None,
                start_time: at(10, 0),
                end_time: at(11, 0),
                project_id: None,
            },
            alice.id,
        )
        .await
        .unwrap();
    let app = init_app!(fixture.state.clone());

    let body = json!({
        "type": "meeting.started",
        "payload": { "room": meeting.room_name.clone().unwrap() }
    })
    .to_string();
    let ts = chrono::Utc::now().timestamp().to_string();

    let req = test::TestRequest::post()
        .uri("/api/v1/meetings/webhook")
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .insert_header((TIMESTAMP_HEADER, ts.clone()))
        .insert_header((SIGNATURE_HEADER, "00".repeat(32)))
        .set_payload(body.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let signature = compute_signature(WEBHOOK_SECRET, &ts, body.as_bytes()).unwrap();
    let req = test::TestRequest::post()
        .uri("/api/v1/meetings/webhook")
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .insert_header((TIMESTAMP_HEADER, ts))
        .insert_header((SIGNATURE_HEADER, signature))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let outcome: Value = test::read_body_json(resp).await;
    assert_eq!(outcome["outcome"], "status_changed");
    assert_eq!(outcome["status"], "IN_PROGRESS");
}

#[actix_web::test]
async fn test_chat_conversation_flow() {
    let fixture = setup();
    let (alice, bob) = seed_users(&fixture.store).await;
    let app = init_app!(fixture.state.clone());

    let open = |user| {
        test::TestRequest::post()
            .uri("/api/v1/chat/conversations")
            .insert_header(bearer(user))
            .set_json(json!({ "recipientId": bob.id, "initialMessage": "hello" }))
            .to_request()
    };
    let resp = test::call_service(&app, open(alice.id)).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = test::read_body_json(resp).await;
    assert_eq!(created["isNew"], true);
    assert_eq!(created["conversation"]["lastMessagePreview"], "hello");
    let conversation_id = created["conversation"]["id"].as_str().unwrap().to_string();

    let resp = test::call_service(&app, open(alice.id)).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/chat/conversations/{conversation_id}/messages?limit=10"))
        .insert_header(bearer(bob.id))
        .to_request();
    let page: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(page["hasMore"], false);
    assert_eq!(page["messages"][0]["content"], "hello");
    assert_eq!(page["messages"][0]["isMine"], false);

    let req = test::TestRequest::patch()
        .uri("/api/v1/chat/messages/mark-read")
        .insert_header(bearer(bob.id))
        .set_json(json!({ "conversationId": conversation_id }))
        .to_request();
    let marked: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(marked["success"], true);
    assert_eq!(marked["count"], 1);
}

#[actix_web::test]
async fn test_realtime_token_needs_configured_backend() {
    let fixture = setup();
    let (alice, _) = seed_users(&fixture.store).await;
    let app = init_app!(fixture.state.clone());

    let req = test::TestRequest::get()
        .uri("/api/v1/chat/realtime-token")
        .insert_header(bearer(alice.id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
}

#[actix_web::test]
async fn test_notification_marked_read_with_patch() {
    let fixture = setup();
    let (alice, bob) = seed_users(&fixture.store).await;
    deliver(
        fixture.store.as_ref(),
        DomainEvent::MessageSent {
            conversation_id: uuid::Uuid::new_v4(),
            message_id: uuid::Uuid::new_v4(),
            sender_id: alice.id,
            sender_name: "Alice".to_string(),
            recipient_id: bob.id,
            preview: "ping".to_string(),
        },
    )
    .await;
    let id = fixture.store.notifications_for(bob.id).await[0].id;
    let app = init_app!(fixture.state.clone());

    let req = test::TestRequest::patch()
        .uri(&format!("/api/v1/notifications/{id}/read"))
        .insert_header(bearer(bob.id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["isRead"], true);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/notifications/{id}/read"))
        .insert_header(bearer(bob.id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
}
