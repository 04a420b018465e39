pub mod overlap;
pub mod roster;
pub mod video;
pub mod webhooks;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::validate;
use crate::errors::AppError;
use crate::events::{DomainEvent, EventBus};
use crate::models::meeting::{Meeting, MeetingChanges, MeetingStatus, NewMeeting};
use crate::store::{MeetingStore, RosterStore};
use overlap::TimeRange;
use video::{RoomRequest, VideoProvider};

pub use roster::Roster;
pub use webhooks::WebhookProcessor;

pub const TITLE_MAX_CHARS: usize = 200;
pub const DESCRIPTION_MAX_CHARS: usize = 2000;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMeetingRequest {
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub project_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMeetingRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: Option<MeetingStatus>,
    pub project_id: Option<Uuid>,
}

impl UpdateMeetingRequest {
    fn into_changes(self) -> Result<MeetingChanges, AppError> {
        let mut errors = Vec::new();
        if let Some(title) = &self.title {
            errors.extend(validate::validate_required(title, "Title", TITLE_MAX_CHARS));
        }
        errors.extend(validate::validate_optional(
            self.description.as_deref(),
            "Description",
            DESCRIPTION_MAX_CHARS,
        ));
        validate::into_result(errors)?;

        Ok(MeetingChanges {
            title: self.title.map(|t| t.trim().to_string()),
            description: validate::non_blank(self.description.as_deref()),
            start_time: self.start_time,
            end_time: self.end_time,
            status: self.status,
            project_id: self.project_id,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Removal {
    pub message: String,
}

/// Meeting lifecycle: no double-booking per organizer, one provider room per meeting.
#[derive(Clone)]
pub struct Scheduler {
    meetings: Arc<dyn MeetingStore>,
    roster: Arc<dyn RosterStore>,
    video: Arc<dyn VideoProvider>,
    events: EventBus,
}

impl Scheduler {
    pub fn new(
        meetings: Arc<dyn MeetingStore>,
        roster: Arc<dyn RosterStore>,
        video: Arc<dyn VideoProvider>,
        events: EventBus,
    ) -> Self {
        Scheduler {
            meetings,
            roster,
            video,
            events,
        }
    }

    pub async fn create(&self, request: CreateMeetingRequest, organizer_id: Uuid) -> Result<Meeting, AppError> {
        let mut errors = Vec::new();
        errors.extend(validate::validate_required(&request.title, "Title", TITLE_MAX_CHARS));
        errors.extend(validate::validate_optional(
            request.description.as_deref(),
            "Description",
            DESCRIPTION_MAX_CHARS,
        ));
        validate::into_result(errors)?;
        let range = TimeRange::new(request.start_time, request.end_time)?;

        // Checked again by the store, atomically with the insert.
        let existing = self.meetings.find_active_for_organizer(organizer_id).await?;
        overlap::ensure_available(&range, &existing, None)?;

        let room = self
            .video
            .create_room(&RoomRequest {
                name: video::generate_room_name(),
                is_private: false,
                expires_at: None,
            })
            .await?;

        let new = NewMeeting {
            title: request.title.trim().to_string(),
            description: validate::non_blank(request.description.as_deref()),
            start_time: range.start,
            end_time: range.end,
            project_id: request.project_id,
            created_by_id: organizer_id,
            room_url: Some(room.url.clone()),
            room_name: Some(room.name.clone()),
        };

        match self.meetings.insert_meeting(&new).await {
            Ok(meeting) => {
                log::info!("Meeting {} scheduled by {} in room {}", meeting.id, organizer_id, room.name);
                Ok(meeting)
            }
            Err(e) => {
                self.release_room(&room.name).await;
                Err(e)
            }
        }
    }

    /// Undo a room provisioned for a meeting that was never stored.
    async fn release_room(&self, name: &str) {
        match self.video.delete_room(name).await {
            Ok(_) => log::warn!("Released room {name} after failed meeting insert"),
            Err(e) => log::error!("Room {name} is orphaned, release failed: {e}"),
        }
    }

    pub async fn find_all(&self) -> Result<Vec<Meeting>, AppError> {
        self.meetings.list_meetings().await
    }

    pub async fn find_one(&self, id: Uuid) -> Result<Meeting, AppError> {
        self.meetings
            .find_meeting(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Meeting {id} not found")))
    }

    pub async fn update(&self, id: Uuid, request: UpdateMeetingRequest) -> Result<Meeting, AppError> {
        let changes = request.into_changes()?;
        let meeting = self.meetings.update_meeting(id, &changes).await?;
        log::info!("Meeting {id} updated");
        Ok(meeting)
    }

    /// Deletes the provider room before the record. If the room cannot be
    /// deleted the meeting stays, so no room is ever left without a record.
    pub async fn remove(&self, id: Uuid) -> Result<Removal, AppError> {
        let meeting = self.find_one(id).await?;

        if let Some(room) = &meeting.room_name {
            match self.video.delete_room(room).await {
                Ok(true) => log::info!("Deleted room {room} for meeting {id}"),
                Ok(false) => log::warn!("Room {room} for meeting {id} was already gone"),
                Err(e) => {
                    log::error!("Keeping meeting {id}, room {room} could not be deleted: {e}");
                    return Err(e);
                }
            }
        }

        let participant_ids: Vec<Uuid> = self
            .roster
            .list_participants(id)
            .await?
            .into_iter()
            .map(|p| p.user_id)
            .collect();

        if !self.meetings.delete_meeting(id).await? {
            return Err(AppError::NotFound(format!("Meeting {id} not found")));
        }
        log::info!("Meeting {id} removed");

        if !participant_ids.is_empty() {
            self.events.emit(DomainEvent::MeetingRemoved {
                meeting_id: id,
                title: meeting.title,
                participant_ids,
            });
        }

        Ok(Removal {
            message: format!("Meeting with ID {id} has been removed"),
        })
    }
}
