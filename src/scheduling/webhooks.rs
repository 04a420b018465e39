//! Inbound video-provider webhooks.
//!
//! Requests are authenticated with `X-Webhook-Timestamp` (unix seconds) and
//! `X-Webhook-Signature`, the hex HMAC-SHA256 of `"{timestamp}.{raw body}"`
//! under the shared secret.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use uuid::Uuid;

use super::Roster;
use crate::errors::AppError;
use crate::models::meeting::MeetingStatus;
use crate::store::MeetingStore;

pub const TIMESTAMP_HEADER: &str = "X-Webhook-Timestamp";
pub const SIGNATURE_HEADER: &str = "X-Webhook-Signature";
pub const TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: Option<String>,
    pub timestamp: Option<String>,
    pub payload: WebhookPayload,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    pub room: String,
    pub mtg_session_id: Option<String>,
    pub participant: Option<WebhookParticipant>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookParticipant {
    pub user_id: Option<String>,
    pub user_name: Option<String>,
}

/// What the processor did with an event; returned to the provider as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WebhookOutcome {
    MeetingNotFound { room: String },
    StatusChanged { meeting_id: Uuid, status: MeetingStatus },
    ParticipantUpdated { meeting_id: Uuid, user_id: Uuid },
    ParticipantSkipped { reason: String },
    Unhandled { event_type: String },
}

fn sign(secret: &str, timestamp: &str, body: &[u8]) -> Result<Hmac<Sha256>, AppError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|_| AppError::Internal("Invalid webhook secret".to_string()))?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body);
    Ok(mac)
}

/// Hex signature for a body; what a well-behaved sender puts in the header.
pub fn compute_signature(secret: &str, timestamp: &str, body: &[u8]) -> Result<String, AppError> {
    Ok(hex::encode(sign(secret, timestamp, body)?.finalize().into_bytes()))
}

/// Check timestamp freshness and signature (constant-time compare).
pub fn verify_signature(
    secret: &str,
    timestamp: Option<&str>,
    signature: Option<&str>,
    body: &[u8],
    now_unix: i64,
) -> Result<(), AppError> {
    let (Some(timestamp), Some(signature)) = (timestamp, signature) else {
        return Err(AppError::Forbidden("Missing webhook signature".to_string()));
    };
    let sent_at: i64 = timestamp
        .trim()
        .parse()
        .map_err(|_| AppError::Forbidden("Invalid webhook timestamp".to_string()))?;
    if now_unix.abs_diff(sent_at) > TOLERANCE_SECS.unsigned_abs() {
        return Err(AppError::Forbidden("Webhook timestamp outside tolerance".to_string()));
    }
    let expected = hex::decode(signature.trim())
        .map_err(|_| AppError::Forbidden("Invalid webhook signature".to_string()))?;
    sign(secret, timestamp.trim(), body)?
        .verify_slice(&expected)
        .map_err(|_| AppError::Forbidden("Invalid webhook signature".to_string()))
}

#[derive(Clone)]
pub struct WebhookProcessor {
    meetings: Arc<dyn MeetingStore>,
    roster: Roster,
    secret: Option<String>,
}

impl WebhookProcessor {
    pub fn new(meetings: Arc<dyn MeetingStore>, roster: Roster, secret: Option<String>) -> Self {
        WebhookProcessor { meetings, roster, secret }
    }

    /// Without a configured secret every webhook is refused.
    pub fn authenticate(&self, timestamp: Option<&str>, signature: Option<&str>, body: &[u8]) -> Result<(), AppError> {
        let Some(secret) = self.secret.as_deref() else {
            log::warn!("Rejecting webhook: no webhook secret configured");
            return Err(AppError::Forbidden("Webhooks are not enabled".to_string()));
        };
        verify_signature(secret, timestamp, signature, body, chrono::Utc::now().timestamp())
    }

    pub async fn handle(&self, event: WebhookEvent) -> Result<WebhookOutcome, AppError> {
        let room = event.payload.room.as_str();
        log::info!("Received webhook {} for room {}", event.kind, room);

        let Some(meeting) = self.meetings.find_meeting_by_room(room).await? else {
            log::warn!("No meeting for webhook room {room}, ignoring");
            return Ok(WebhookOutcome::MeetingNotFound { room: room.to_string() });
        };

        match event.kind.as_str() {
            "meeting.started" | "room.created" => self.set_status(meeting.id, MeetingStatus::InProgress).await,
            "meeting.ended" | "room.deleted" => self.set_status(meeting.id, MeetingStatus::Completed).await,
            "participant.joined" | "participant.left" => {
                let user_id = match participant_id(&event.payload) {
                    Ok(id) => id,
                    Err(reason) => {
                        log::warn!("Skipping {} for meeting {}: {}", event.kind, meeting.id, reason);
                        return Ok(WebhookOutcome::ParticipantSkipped { reason });
                    }
                };
                let updated = if event.kind == "participant.joined" {
                    self.roster.mark_as_joined(meeting.id, user_id).await?
                } else {
                    self.roster.mark_as_left(meeting.id, user_id).await?
                };
                match updated {
                    Some(_) => Ok(WebhookOutcome::ParticipantUpdated {
                        meeting_id: meeting.id,
                        user_id,
                    }),
                    None => Ok(WebhookOutcome::ParticipantSkipped {
                        reason: format!("User {user_id} is not a participant"),
                    }),
                }
            }
            other => {
                log::warn!("Unhandled webhook type {other}");
                Ok(WebhookOutcome::Unhandled {
                    event_type: other.to_string(),
                })
            }
        }
    }

    async fn set_status(&self, meeting_id: Uuid, status: MeetingStatus) -> Result<WebhookOutcome, AppError> {
        self.meetings
            .set_meeting_status(meeting_id, status)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Meeting {meeting_id} not found")))?;
        log::info!("Meeting {meeting_id} is now {status}");
        Ok(WebhookOutcome::StatusChanged { meeting_id, status })
    }
}

fn participant_id(payload: &WebhookPayload) -> Result<Uuid, String> {
    let raw = payload
        .participant
        .as_ref()
        .and_then(|p| p.user_id.as_deref())
        .ok_or_else(|| "No user_id provided".to_string())?;
    Uuid::parse_str(raw).map_err(|_| format!("user_id '{raw}' is not a valid id"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";
    const BODY: &[u8] = br#"{"type":"meeting.started","payload":{"room":"meeting-1-abc"}}"#;

    #[test]
    fn test_valid_signature_accepted() {
        let sig = compute_signature(SECRET, "1700000000", BODY).unwrap();
        assert!(verify_signature(SECRET, Some("1700000000"), Some(&sig), BODY, 1_700_000_100).is_ok());
    }

    #[test]
    fn test_tampered_body_rejected() {
        let sig = compute_signature(SECRET, "1700000000", BODY).unwrap();
        let result = verify_signature(SECRET, Some("1700000000"), Some(&sig), b"{}", 1_700_000_000);
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let sig = compute_signature(SECRET, "1700000000", BODY).unwrap();
        let result = verify_signature(SECRET, Some("1700000000"), Some(&sig), BODY, 1_700_000_301);
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[test]
    fn test_missing_or_malformed_headers_rejected() {
        assert!(verify_signature(SECRET, None, Some("00"), BODY, 0).is_err());
        assert!(verify_signature(SECRET, Some("0"), None, BODY, 0).is_err());
        assert!(verify_signature(SECRET, Some("soon"), Some("00"), BODY, 0).is_err());
        assert!(verify_signature(SECRET, Some("0"), Some("not-hex"), BODY, 0).is_err());

        let ts = i64::MIN.to_string();
        let sig = compute_signature(SECRET, &ts, BODY).unwrap();
        let err = verify_signature(SECRET, Some(&ts), Some(&sig), BODY, 1_700_000_000).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn test_participant_id_parsing() {
        let payload = |user_id: Option<&str>| WebhookPayload {
            room: "r".to_string(),
            mtg_session_id: None,
            participant: Some(WebhookParticipant {
                user_id: user_id.map(str::to_string),
                user_name: None,
            }),
        };
        let id = Uuid::new_v4();
        assert_eq!(participant_id(&payload(Some(&id.to_string()))), Ok(id));
        assert!(participant_id(&payload(None)).is_err());
        assert!(participant_id(&payload(Some("guest-42"))).is_err());
    }
}
