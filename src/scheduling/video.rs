use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::config::VideoConfig;
use crate::errors::AppError;

/// A provisioned video room.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Room {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct RoomRequest {
    pub name: String,
    pub is_private: bool,
    /// Unix seconds after which the provider may expire the room.
    pub expires_at: Option<i64>,
}

#[async_trait]
pub trait VideoProvider: Send + Sync {
    async fn create_room(&self, request: &RoomRequest) -> Result<Room, AppError>;

    /// `Ok(false)` when the provider no longer knows the room.
    async fn delete_room(&self, name: &str) -> Result<bool, AppError>;
}

/// `meeting-<unix millis>-<random hex>`
pub fn generate_room_name() -> String {
    let suffix: u32 = rand::rng().random();
    format!("meeting-{}-{:08x}", Utc::now().timestamp_millis(), suffix)
}

#[derive(Serialize)]
struct CreateRoomBody<'a> {
    name: &'a str,
    privacy: &'static str,
    properties: RoomProperties,
}

#[derive(Serialize)]
struct RoomProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    exp: Option<i64>,
}

#[derive(Deserialize)]
struct DeleteRoomResponse {
    deleted: bool,
}

#[derive(Deserialize)]
struct ProviderError {
    info: Option<String>,
    error: Option<String>,
}

/// REST client for a Daily-compatible room API.
pub struct DailyClient {
    api_url: String,
    api_key: String,
    client: Client,
}

impl DailyClient {
    pub fn new(config: &VideoConfig) -> Result<Self, AppError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(DailyClient {
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            client,
        })
    }
}

/// Best-effort message from a provider error body.
fn describe_failure(action: &str, status: StatusCode, body: &str) -> String {
    let detail = serde_json::from_str::<ProviderError>(body)
        .ok()
        .and_then(|e| e.info.or(e.error))
        .unwrap_or_else(|| body.chars().take(200).collect());
    if detail.is_empty() {
        format!("Failed to {action} ({status})")
    } else {
        format!("Failed to {action}: {detail}")
    }
}

#[async_trait]
impl VideoProvider for DailyClient {
    async fn create_room(&self, request: &RoomRequest) -> Result<Room, AppError> {
        let body = CreateRoomBody {
            name: &request.name,
            privacy: if request.is_private { "private" } else { "public" },
            properties: RoomProperties { exp: request.expires_at },
        };
        let response = self
            .client
            .post(format!("{}/rooms", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(AppError::Upstream(describe_failure("create video room", status, &text)));
        }
        serde_json::from_str(&text)
            .map_err(|e| AppError::Upstream(format!("Unexpected room payload: {e}")))
    }

    async fn delete_room(&self, name: &str) -> Result<bool, AppError> {
        let response = self
            .client
            .delete(format!("{}/rooms/{}", self.api_url, name))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        let text = response.text().await?;
        if !status.is_success() {
            return Err(AppError::Upstream(describe_failure("delete video room", status, &text)));
        }
        let parsed: DeleteRoomResponse = serde_json::from_str(&text)
            .map_err(|e| AppError::Upstream(format!("Unexpected delete payload: {e}")))?;
        Ok(parsed.deleted)
    }
}
