//! Shared fixtures: the in-memory store plus a scriptable video provider.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use worklane::errors::AppError;
use worklane::events::{EventBus, EventReceiver};
use worklane::models::user::UserSummary;
use worklane::scheduling::video::{Room, RoomRequest, VideoProvider};
use worklane::state::AppState;
use worklane::store::{MemoryStore, PgStore};

pub const WEBHOOK_SECRET: &str = "whsec_test";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoCall {
    Create(String),
    Delete(String),
}

/// Records every call; failures and "room already gone" are toggled per test.
#[derive(Default)]
pub struct FakeVideo {
    calls: Mutex<Vec<VideoCall>>,
    pub fail_create: AtomicBool,
    pub fail_delete: AtomicBool,
    pub rooms_missing: AtomicBool,
}

impl FakeVideo {
    pub fn calls(&self) -> Vec<VideoCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                VideoCall::Delete(name) => Some(name),
                VideoCall::Create(_) => None,
            })
            .collect()
    }
}

#[async_trait]
impl VideoProvider for FakeVideo {
    async fn create_room(&self, request: &RoomRequest) -> Result<Room, AppError> {
        self.calls.lock().unwrap().push(VideoCall::Create(request.name.clone()));
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(AppError::Upstream("Failed to create video room: provider down".to_string()));
        }
        Ok(Room {
            name: request.name.clone(),
            url: format!("https://video.example.com/{}", request.name),
        })
    }

    async fn delete_room(&self, name: &str) -> Result<bool, AppError> {
        self.calls.lock().unwrap().push(VideoCall::Delete(name.to_string()));
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(AppError::Upstream("Failed to delete video room: provider down".to_string()));
        }
        Ok(!self.rooms_missing.load(Ordering::SeqCst))
    }
}

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub video: Arc<FakeVideo>,
    pub state: AppState,
    pub events: EventReceiver,
}

pub fn setup() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let video = Arc::new(FakeVideo::default());
    let (bus, events) = EventBus::channel();
    let state = AppState::new(
        store.clone(),
        video.clone(),
        bus,
        Some(WEBHOOK_SECRET.to_string()),
        None,
    );
    TestApp {
        store,
        video,
        state,
        events,
    }
}

pub async fn seed_users(store: &MemoryStore) -> (UserSummary, UserSummary) {
    let alice = store.add_user("Alice", Some("alice@test.com")).await;
    let bob = store.add_user("Bob", Some("bob@test.com")).await;
    (alice, bob)
}

/// 2026-06-01 at the given time, UTC.
pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, hour, minute, 0).unwrap()
}

/// App state over a real database; the video provider stays scripted.
pub fn setup_pg(pool: sqlx::PgPool) -> (AppState, Arc<FakeVideo>, EventReceiver) {
    let video = Arc::new(FakeVideo::default());
    let (bus, events) = EventBus::channel();
    let state = AppState::new(
        Arc::new(PgStore::new(pool)),
        video.clone(),
        bus,
        Some(WEBHOOK_SECRET.to_string()),
        None,
    );
    (state, video, events)
}

/// Users are owned upstream; tests insert the mirrored rows directly.
pub async fn insert_user(pool: &sqlx::PgPool, name: &str) -> UserSummary {
    let id = uuid::Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, name) VALUES ($1, $2)")
        .bind(id)
        .bind(name)
        .execute(pool)
        .await
        .expect("insert user");
    UserSummary {
        id,
        name: name.to_string(),
        email: None,
    }
}
