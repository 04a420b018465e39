//! Access tokens for the hosted realtime backend. Browsers subscribe to the
//! `messages` and `conversations` tables there directly.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::RealtimeConfig;
use crate::errors::AppError;

pub const TOKEN_TTL_MINUTES: i64 = 60;
const AUDIENCE: &str = "authenticated";

#[derive(Debug, Serialize, Deserialize)]
pub struct UserMetadata {
    pub user_id: Uuid,
    pub email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RealtimeClaims {
    pub sub: String,
    pub email: Option<String>,
    pub aud: String,
    pub role: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub user_metadata: UserMetadata,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelConfig {
    pub schema: &'static str,
    pub table: &'static str,
    pub event: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    pub url: String,
    pub anon_key: String,
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    pub channels: Vec<ChannelConfig>,
}

#[derive(Clone)]
pub struct RealtimeTokens {
    config: Option<RealtimeConfig>,
}

impl RealtimeTokens {
    pub fn new(config: Option<RealtimeConfig>) -> Self {
        RealtimeTokens { config }
    }

    fn config(&self) -> Result<&RealtimeConfig, AppError> {
        self.config
            .as_ref()
            .ok_or_else(|| AppError::Upstream("Realtime backend is not configured".to_string()))
    }

    pub fn issue_token(&self, user_id: Uuid, email: Option<&str>) -> Result<RealtimeToken, AppError> {
        self.issue_token_at(user_id, email, Utc::now())
    }

    fn issue_token_at(&self, user_id: Uuid, email: Option<&str>, now: DateTime<Utc>) -> Result<RealtimeToken, AppError> {
        let config = self.config()?;
        let expires_at = now + Duration::minutes(TOKEN_TTL_MINUTES);
        let claims = RealtimeClaims {
            sub: user_id.to_string(),
            email: email.map(str::to_string),
            aud: AUDIENCE.to_string(),
            role: AUDIENCE.to_string(),
            iss: config.url.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            user_metadata: UserMetadata {
                user_id,
                email: email.map(str::to_string),
            },
        };
        let access_token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
        )?;
        log::info!("Issued realtime token for {user_id}");
        Ok(RealtimeToken {
            access_token,
            expires_at,
            user_id,
        })
    }

    /// Everything a browser needs to open its realtime connection.
    pub fn client_config(&self, user_id: Uuid, email: Option<&str>) -> Result<ClientConfig, AppError> {
        let config = self.config()?;
        let token = self.issue_token(user_id, email)?;
        let channel = |table| ChannelConfig {
            schema: "public",
            table,
            event: "*",
        };
        Ok(ClientConfig {
            url: config.url.clone(),
            anon_key: config.anon_key.clone(),
            access_token: token.access_token,
            expires_at: token.expires_at,
            channels: vec![channel("messages"), channel("conversations")],
        })
    }
}
