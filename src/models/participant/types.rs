use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipantRole {
    Host,
    #[default]
    Participant,
    Observer,
}

impl ParticipantRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantRole::Host => "HOST",
            ParticipantRole::Participant => "PARTICIPANT",
            ParticipantRole::Observer => "OBSERVER",
        }
    }
}

impl FromStr for ParticipantRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HOST" => Ok(ParticipantRole::Host),
            "PARTICIPANT" => Ok(ParticipantRole::Participant),
            "OBSERVER" => Ok(ParticipantRole::Observer),
            other => Err(format!("unknown participant role '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipantStatus {
    #[default]
    Invited,
    Joined,
    Left,
    Rejected,
}

impl ParticipantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantStatus::Invited => "INVITED",
            ParticipantStatus::Joined => "JOINED",
            ParticipantStatus::Left => "LEFT",
            ParticipantStatus::Rejected => "REJECTED",
        }
    }
}

impl FromStr for ParticipantStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INVITED" => Ok(ParticipantStatus::Invited),
            "JOINED" => Ok(ParticipantStatus::Joined),
            "LEFT" => Ok(ParticipantStatus::Left),
            "REJECTED" => Ok(ParticipantStatus::Rejected),
            other => Err(format!("unknown participant status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingParticipant {
    pub id: Uuid,
    pub meeting_id: Uuid,
    pub user_id: Uuid,
    pub role: ParticipantRole,
    pub status: ParticipantStatus,
    pub joined_at: Option<DateTime<Utc>>,
    pub left_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ParticipantChanges {
    pub role: Option<ParticipantRole>,
    pub status: Option<ParticipantStatus>,
}

impl ParticipantChanges {
    pub fn status(status: ParticipantStatus) -> Self {
        ParticipantChanges {
            role: None,
            status: Some(status),
        }
    }

    /// Merge onto a stored row. Joining or leaving stamps the matching timestamp.
    pub fn apply(&self, participant: &MeetingParticipant, now: DateTime<Utc>) -> MeetingParticipant {
        let status = self.status.unwrap_or(participant.status);
        let joined_at = match self.status {
            Some(ParticipantStatus::Joined) => Some(now),
            _ => participant.joined_at,
        };
        let left_at = match self.status {
            Some(ParticipantStatus::Left) => Some(now),
            _ => participant.left_at,
        };
        MeetingParticipant {
            role: self.role.unwrap_or(participant.role),
            status,
            joined_at,
            left_at,
            updated_at: now,
            ..participant.clone()
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct ParticipantRow {
    pub id: Uuid,
    pub meeting_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub status: String,
    pub joined_at: Option<DateTime<Utc>>,
    pub left_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ParticipantRow> for MeetingParticipant {
    type Error = sqlx::Error;

    fn try_from(row: ParticipantRow) -> Result<Self, Self::Error> {
        Ok(MeetingParticipant {
            id: row.id,
            meeting_id: row.meeting_id,
            user_id: row.user_id,
            role: row.role.parse().map_err(|e: String| sqlx::Error::Decode(e.into()))?,
            status: row.status.parse().map_err(|e: String| sqlx::Error::Decode(e.into()))?,
            joined_at: row.joined_at,
            left_at: row.left_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
