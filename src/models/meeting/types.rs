use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MeetingStatus {
    Scheduled,
    WaitingRoom,
    InProgress,
    Completed,
    Cancelled,
    Failed,
    Deleted,
}

impl MeetingStatus {
    pub const TERMINAL: [MeetingStatus; 3] = [
        MeetingStatus::Completed,
        MeetingStatus::Cancelled,
        MeetingStatus::Deleted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MeetingStatus::Scheduled => "SCHEDULED",
            MeetingStatus::WaitingRoom => "WAITING_ROOM",
            MeetingStatus::InProgress => "IN_PROGRESS",
            MeetingStatus::Completed => "COMPLETED",
            MeetingStatus::Cancelled => "CANCELLED",
            MeetingStatus::Failed => "FAILED",
            MeetingStatus::Deleted => "DELETED",
        }
    }

    /// Terminal meetings no longer occupy their organizer's calendar.
    pub fn is_terminal(&self) -> bool {
        Self::TERMINAL.contains(self)
    }
}

impl fmt::Display for MeetingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MeetingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SCHEDULED" => Ok(MeetingStatus::Scheduled),
            "WAITING_ROOM" => Ok(MeetingStatus::WaitingRoom),
            "IN_PROGRESS" => Ok(MeetingStatus::InProgress),
            "COMPLETED" => Ok(MeetingStatus::Completed),
            "CANCELLED" => Ok(MeetingStatus::Cancelled),
            "FAILED" => Ok(MeetingStatus::Failed),
            "DELETED" => Ok(MeetingStatus::Deleted),
            other => Err(format!("unknown meeting status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: MeetingStatus,
    pub project_id: Option<Uuid>,
    pub created_by_id: Uuid,
    pub room_url: Option<String>,
    pub room_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A validated meeting ready to be persisted, room already provisioned.
#[derive(Debug, Clone)]
pub struct NewMeeting {
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub project_id: Option<Uuid>,
    pub created_by_id: Uuid,
    pub room_url: Option<String>,
    pub room_name: Option<String>,
}

/// Partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct MeetingChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: Option<MeetingStatus>,
    pub project_id: Option<Uuid>,
}

impl MeetingChanges {
    pub fn touches_schedule(&self) -> bool {
        self.start_time.is_some() || self.end_time.is_some()
    }

    /// A live result must be re-checked when its times moved or when it
    /// comes back from a terminal status.
    pub fn rechecks_overlap(&self, current: &Meeting, updated: &Meeting) -> bool {
        !updated.status.is_terminal() && (self.touches_schedule() || current.status.is_terminal())
    }

    /// Apply onto a stored meeting, producing the row that will be written.
    pub fn apply(&self, meeting: &Meeting, now: DateTime<Utc>) -> Meeting {
        Meeting {
            title: self.title.clone().unwrap_or_else(|| meeting.title.clone()),
            description: self.description.clone().or_else(|| meeting.description.clone()),
            start_time: self.start_time.unwrap_or(meeting.start_time),
            end_time: self.end_time.unwrap_or(meeting.end_time),
            status: self.status.unwrap_or(meeting.status),
            project_id: self.project_id.or(meeting.project_id),
            updated_at: now,
            ..meeting.clone()
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct MeetingRow {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: String,
    pub project_id: Option<Uuid>,
    pub created_by_id: Uuid,
    pub room_url: Option<String>,
    pub room_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<MeetingRow> for Meeting {
    type Error = sqlx::Error;

    fn try_from(row: MeetingRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<MeetingStatus>()
            .map_err(|e| sqlx::Error::Decode(e.into()))?;
        Ok(Meeting {
            id: row.id,
            title: row.title,
            description: row.description,
            start_time: row.start_time,
            end_time: row.end_time,
            status,
            project_id: row.project_id,
            created_by_id: row.created_by_id,
            room_url: row.room_url,
            room_name: row.room_name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
