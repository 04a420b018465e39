use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    NewMessage,
    MeetingInvitation,
    MeetingCancelled,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::NewMessage => "NEW_MESSAGE",
            NotificationKind::MeetingInvitation => "MEETING_INVITATION",
            NotificationKind::MeetingCancelled => "MEETING_CANCELLED",
        }
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW_MESSAGE" => Ok(NotificationKind::NewMessage),
            "MEETING_INVITATION" => Ok(NotificationKind::MeetingInvitation),
            "MEETING_CANCELLED" => Ok(NotificationKind::MeetingCancelled),
            other => Err(format!("unknown notification kind '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub message: String,
    pub content: Option<String>,
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub message: String,
    pub content: Option<String>,
    pub entity_type: Option<&'static str>,
    pub entity_id: Option<Uuid>,
}

#[derive(sqlx::FromRow)]
pub(crate) struct NotificationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub message: String,
    pub content: Option<String>,
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = sqlx::Error;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        Ok(Notification {
            id: row.id,
            user_id: row.user_id,
            kind: row.kind.parse().map_err(|e: String| sqlx::Error::Decode(e.into()))?,
            message: row.message,
            content: row.content,
            entity_type: row.entity_type,
            entity_id: row.entity_id,
            is_read: row.is_read,
            created_at: row.created_at,
        })
    }
}
