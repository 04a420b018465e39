use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{ChatStore, MeetingStore, NotificationStore, RosterStore, UserDirectory};
use crate::db::DbPool;
use crate::errors::{AppError, is_unique_violation};
use crate::models::chat::{self, CanonicalPair, Conversation, ConversationListRow, Message, MessageRecord};
use crate::models::meeting::{self, Meeting, MeetingChanges, MeetingStatus, NewMeeting};
use crate::models::notification::{self, NewNotification, Notification};
use crate::models::participant::{self, MeetingParticipant, ParticipantChanges, ParticipantRole};
use crate::models::user::{self, UserSummary};
use crate::scheduling::overlap::{self, TimeRange};

#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        PgStore { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl UserDirectory for PgStore {
    async fn find_user(&self, id: Uuid) -> Result<Option<UserSummary>, AppError> {
        Ok(user::find_by_id(&self.pool, id).await?)
    }

    async fn find_users(&self, ids: &[Uuid]) -> Result<Vec<UserSummary>, AppError> {
        Ok(user::find_by_ids(&self.pool, ids).await?)
    }
}

#[async_trait]
impl MeetingStore for PgStore {
    async fn list_meetings(&self) -> Result<Vec<Meeting>, AppError> {
        Ok(meeting::find_all(&self.pool).await?)
    }

    async fn find_meeting(&self, id: Uuid) -> Result<Option<Meeting>, AppError> {
        Ok(meeting::find_by_id(&self.pool, id).await?)
    }

    async fn find_active_for_organizer(&self, organizer_id: Uuid) -> Result<Vec<Meeting>, AppError> {
        Ok(meeting::find_active_for_organizer(&self.pool, organizer_id).await?)
    }

    async fn find_meeting_by_room(&self, room: &str) -> Result<Option<Meeting>, AppError> {
        Ok(meeting::find_by_room(&self.pool, room).await?)
    }

    async fn insert_meeting(&self, new: &NewMeeting) -> Result<Meeting, AppError> {
        let range = TimeRange::new(new.start_time, new.end_time)?;
        let mut tx = self.pool.begin().await?;

        meeting::lock_organizer(&mut *tx, new.created_by_id).await?;
        let existing = meeting::find_active_for_organizer(&mut *tx, new.created_by_id).await?;
        overlap::ensure_available(&range, &existing, None)?;

        let created = meeting::insert(&mut *tx, new, Utc::now()).await.map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Room name already in use".to_string())
            } else {
                AppError::Db(e)
            }
        })?;
        tx.commit().await?;
        Ok(created)
    }

    async fn update_meeting(&self, id: Uuid, changes: &MeetingChanges) -> Result<Meeting, AppError> {
        let mut tx = self.pool.begin().await?;

        let current = meeting::find_by_id(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Meeting {id} not found")))?;
        let updated = changes.apply(&current, Utc::now());
        let range = TimeRange::new(updated.start_time, updated.end_time)?;

        if changes.rechecks_overlap(&current, &updated) {
            meeting::lock_organizer(&mut *tx, current.created_by_id).await?;
            let existing = meeting::find_active_for_organizer(&mut *tx, current.created_by_id).await?;
            overlap::ensure_available(&range, &existing, Some(id))?;
        }

        let saved = meeting::save(&mut *tx, &updated)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Meeting {id} not found")))?;
        tx.commit().await?;
        Ok(saved)
    }

    async fn set_meeting_status(&self, id: Uuid, status: MeetingStatus) -> Result<Option<Meeting>, AppError> {
        Ok(meeting::update_status(&self.pool, id, status, Utc::now()).await?)
    }

    async fn delete_meeting(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(meeting::delete(&self.pool, id).await?)
    }
}

#[async_trait]
impl RosterStore for PgStore {
    async fn list_participants(&self, meeting_id: Uuid) -> Result<Vec<MeetingParticipant>, AppError> {
        Ok(participant::find_by_meeting(&self.pool, meeting_id).await?)
    }

    async fn add_participants(
        &self,
        meeting_id: Uuid,
        user_ids: &[Uuid],
        role: ParticipantRole,
    ) -> Result<Vec<MeetingParticipant>, AppError> {
        let mut tx = self.pool.begin().await?;

        let existing = participant::find_existing_user_ids(&mut *tx, meeting_id, user_ids).await?;
        if !existing.is_empty() {
            return Err(already_participants(&existing));
        }

        let now = Utc::now();
        let mut added = Vec::with_capacity(user_ids.len());
        for &user_id in user_ids {
            // A concurrent add of the same user surfaces as a unique violation.
            let row = participant::insert(&mut *tx, meeting_id, user_id, role, now)
                .await
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        already_participants(&[user_id])
                    } else {
                        AppError::Db(e)
                    }
                })?;
            added.push(row);
        }
        tx.commit().await?;
        Ok(added)
    }

    async fn update_participant(
        &self,
        meeting_id: Uuid,
        user_id: Uuid,
        changes: ParticipantChanges,
    ) -> Result<Option<MeetingParticipant>, AppError> {
        let mut tx = self.pool.begin().await?;
        let Some(current) = participant::find_one(&mut *tx, meeting_id, user_id).await? else {
            return Ok(None);
        };
        let saved = participant::save(&mut *tx, &changes.apply(&current, Utc::now())).await?;
        tx.commit().await?;
        Ok(saved)
    }

    async fn remove_participant(&self, meeting_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        Ok(participant::delete(&self.pool, meeting_id, user_id).await?)
    }
}

pub(crate) fn already_participants(user_ids: &[Uuid]) -> AppError {
    let ids: Vec<String> = user_ids.iter().map(Uuid::to_string).collect();
    AppError::Conflict(format!("Users already participating: {}", ids.join(", ")))
}

#[async_trait]
impl ChatStore for PgStore {
    async fn find_conversation(&self, id: Uuid) -> Result<Option<Conversation>, AppError> {
        Ok(chat::find_by_id(&self.pool, id).await?)
    }

    async fn insert_or_get_conversation(&self, pair: CanonicalPair) -> Result<(Conversation, bool), AppError> {
        if let Some(created) = chat::insert_if_absent(&self.pool, &pair, Utc::now()).await? {
            return Ok((created, true));
        }
        let existing = chat::find_by_pair(&self.pool, &pair)
            .await?
            .ok_or_else(|| AppError::Internal("Conversation vanished after conflicting insert".to_string()))?;
        Ok((existing, false))
    }

    async fn append_message(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: &str,
    ) -> Result<(Message, Conversation), AppError> {
        let mut tx = self.pool.begin().await?;

        let conversation = chat::find_for_update(&mut *tx, conversation_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Conversation {conversation_id} not found")))?;
        let sent_at = chat::next_sent_at(Utc::now(), conversation.last_message_at);

        let message = chat::insert_message(&mut *tx, conversation_id, sender_id, content, sent_at).await?;
        let conversation =
            chat::update_last_message(&mut *tx, conversation_id, sent_at, &chat::preview(content)).await?;
        tx.commit().await?;
        Ok((message, conversation))
    }

    async fn list_messages(
        &self,
        conversation_id: Uuid,
        before: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<MessageRecord>, AppError> {
        Ok(chat::find_messages(&self.pool, conversation_id, before, limit).await?)
    }

    async fn mark_read(
        &self,
        conversation_id: Uuid,
        reader_id: Uuid,
        message_ids: Option<&[Uuid]>,
    ) -> Result<u64, AppError> {
        Ok(chat::mark_read(&self.pool, conversation_id, reader_id, message_ids, Utc::now()).await?)
    }

    async fn list_conversations(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ConversationListRow>, AppError> {
        Ok(chat::find_for_user(&self.pool, user_id, limit, offset).await?)
    }
}

#[async_trait]
impl NotificationStore for PgStore {
    async fn insert_notification(&self, new: &NewNotification) -> Result<Notification, AppError> {
        Ok(notification::insert(&self.pool, new, Utc::now()).await?)
    }

    async fn list_notifications(&self, user_id: Uuid, limit: i64) -> Result<Vec<Notification>, AppError> {
        Ok(notification::find_by_user(&self.pool, user_id, limit).await?)
    }

    async fn mark_notification_read(&self, id: Uuid, user_id: Uuid) -> Result<Option<Notification>, AppError> {
        Ok(notification::mark_read(&self.pool, id, user_id).await?)
    }
}
