use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::errors::AppError;
use crate::events::{DomainEvent, EventBus};
use crate::models::meeting::Meeting;
use crate::models::participant::{MeetingParticipant, ParticipantChanges, ParticipantRole, ParticipantStatus};
use crate::store::{MeetingStore, RosterStore, UserDirectory};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddParticipantsRequest {
    pub user_ids: Vec<Uuid>,
    pub role: Option<ParticipantRole>,
}

/// Who is invited to, attending, or done with a meeting.
#[derive(Clone)]
pub struct Roster {
    meetings: Arc<dyn MeetingStore>,
    participants: Arc<dyn RosterStore>,
    users: Arc<dyn UserDirectory>,
    events: EventBus,
}

impl Roster {
    pub fn new(
        meetings: Arc<dyn MeetingStore>,
        participants: Arc<dyn RosterStore>,
        users: Arc<dyn UserDirectory>,
        events: EventBus,
    ) -> Self {
        Roster {
            meetings,
            participants,
            users,
            events,
        }
    }

    async fn require_meeting(&self, meeting_id: Uuid) -> Result<Meeting, AppError> {
        self.meetings
            .find_meeting(meeting_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Meeting {meeting_id} not found")))
    }

    /// Invite a batch of users. The batch is rejected as a whole if any user is
    /// unknown or already on the roster.
    pub async fn add_participants(
        &self,
        meeting_id: Uuid,
        request: AddParticipantsRequest,
    ) -> Result<Vec<MeetingParticipant>, AppError> {
        let meeting = self.require_meeting(meeting_id).await?;

        let user_ids = request.user_ids;
        if user_ids.is_empty() {
            return Err(AppError::Validation("At least one user id is required".to_string()));
        }
        let mut seen = HashSet::with_capacity(user_ids.len());
        if !user_ids.iter().all(|id| seen.insert(*id)) {
            return Err(AppError::Validation("User ids must not repeat".to_string()));
        }

        let found = self.users.find_users(&user_ids).await?;
        if found.len() != user_ids.len() {
            return Err(AppError::Validation("Some users do not exist".to_string()));
        }

        let added = self
            .participants
            .add_participants(meeting_id, &user_ids, request.role.unwrap_or_default())
            .await?;
        log::info!("Added {} participant(s) to meeting {}", added.len(), meeting_id);

        self.events.emit(DomainEvent::ParticipantsInvited {
            meeting_id,
            title: meeting.title,
            user_ids,
        });
        Ok(added)
    }

    pub async fn list_participants(&self, meeting_id: Uuid) -> Result<Vec<MeetingParticipant>, AppError> {
        self.require_meeting(meeting_id).await?;
        self.participants.list_participants(meeting_id).await
    }

    pub async fn remove_participant(&self, meeting_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        if !self.participants.remove_participant(meeting_id, user_id).await? {
            return Err(not_a_participant(meeting_id, user_id));
        }
        log::info!("Removed participant {user_id} from meeting {meeting_id}");
        Ok(())
    }

    pub async fn update_participant(
        &self,
        meeting_id: Uuid,
        user_id: Uuid,
        changes: ParticipantChanges,
    ) -> Result<MeetingParticipant, AppError> {
        self.participants
            .update_participant(meeting_id, user_id, changes)
            .await?
            .ok_or_else(|| not_a_participant(meeting_id, user_id))
    }

    /// Idempotent: an unknown participant is logged and ignored.
    pub async fn mark_as_joined(
        &self,
        meeting_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<MeetingParticipant>, AppError> {
        self.mark(meeting_id, user_id, ParticipantStatus::Joined).await
    }

    /// Idempotent: an unknown participant is logged and ignored.
    pub async fn mark_as_left(&self, meeting_id: Uuid, user_id: Uuid) -> Result<Option<MeetingParticipant>, AppError> {
        self.mark(meeting_id, user_id, ParticipantStatus::Left).await
    }

    async fn mark(
        &self,
        meeting_id: Uuid,
        user_id: Uuid,
        status: ParticipantStatus,
    ) -> Result<Option<MeetingParticipant>, AppError> {
        let updated = self
            .participants
            .update_participant(meeting_id, user_id, ParticipantChanges::status(status))
            .await?;
        if updated.is_none() {
            log::warn!(
                "No participant {user_id} in meeting {meeting_id}, ignoring {} transition",
                status.as_str()
            );
        }
        Ok(updated)
    }
}

fn not_a_participant(meeting_id: Uuid, user_id: Uuid) -> AppError {
    AppError::NotFound(format!("User {user_id} is not a participant of meeting {meeting_id}"))
}
