//! Persistence seams. Services hold these as `Arc<dyn Trait>` so the same
//! logic runs against PostgreSQL in production and `MemoryStore` in tests.
//!
//! Every method that spans more than one statement is atomic: the PostgreSQL
//! implementation runs it in one transaction, the memory implementation holds
//! its lock for the whole call.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::chat::{CanonicalPair, Conversation, ConversationListRow, Message, MessageRecord};
use crate::models::meeting::{Meeting, MeetingChanges, MeetingStatus, NewMeeting};
use crate::models::notification::{NewNotification, Notification};
use crate::models::participant::{MeetingParticipant, ParticipantChanges, ParticipantRole};
use crate::models::user::UserSummary;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, id: Uuid) -> Result<Option<UserSummary>, AppError>;

    /// Unknown ids are absent from the result.
    async fn find_users(&self, ids: &[Uuid]) -> Result<Vec<UserSummary>, AppError>;
}

#[async_trait]
pub trait MeetingStore: Send + Sync {
    async fn list_meetings(&self) -> Result<Vec<Meeting>, AppError>;

    async fn find_meeting(&self, id: Uuid) -> Result<Option<Meeting>, AppError>;

    async fn find_active_for_organizer(&self, organizer_id: Uuid) -> Result<Vec<Meeting>, AppError>;

    async fn find_meeting_by_room(&self, room: &str) -> Result<Option<Meeting>, AppError>;

    /// Re-run the organizer's overlap check and insert, atomically.
    async fn insert_meeting(&self, new: &NewMeeting) -> Result<Meeting, AppError>;

    /// Merge `changes` onto the stored row. When the schedule moves, the overlap
    /// check runs against the organizer's other meetings in the same unit.
    async fn update_meeting(&self, id: Uuid, changes: &MeetingChanges) -> Result<Meeting, AppError>;

    async fn set_meeting_status(&self, id: Uuid, status: MeetingStatus) -> Result<Option<Meeting>, AppError>;

    async fn delete_meeting(&self, id: Uuid) -> Result<bool, AppError>;
}

#[async_trait]
pub trait RosterStore: Send + Sync {
    async fn list_participants(&self, meeting_id: Uuid) -> Result<Vec<MeetingParticipant>, AppError>;

    /// All-or-nothing: `Conflict` when any user is already on the roster.
    async fn add_participants(
        &self,
        meeting_id: Uuid,
        user_ids: &[Uuid],
        role: ParticipantRole,
    ) -> Result<Vec<MeetingParticipant>, AppError>;

    async fn update_participant(
        &self,
        meeting_id: Uuid,
        user_id: Uuid,
        changes: ParticipantChanges,
    ) -> Result<Option<MeetingParticipant>, AppError>;

    async fn remove_participant(&self, meeting_id: Uuid, user_id: Uuid) -> Result<bool, AppError>;
}

#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn find_conversation(&self, id: Uuid) -> Result<Option<Conversation>, AppError>;

    /// Returns the pair's conversation and whether this call created it.
    async fn insert_or_get_conversation(&self, pair: CanonicalPair) -> Result<(Conversation, bool), AppError>;

    /// Insert the message and refresh the conversation's preview in one unit.
    /// `sent_at` is assigned here and is strictly increasing per conversation.
    async fn append_message(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: &str,
    ) -> Result<(Message, Conversation), AppError>;

    /// Newest first, strictly older than `before`, at most `limit` rows.
    async fn list_messages(
        &self,
        conversation_id: Uuid,
        before: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<MessageRecord>, AppError>;

    /// Returns how many messages moved from unread to read.
    async fn mark_read(
        &self,
        conversation_id: Uuid,
        reader_id: Uuid,
        message_ids: Option<&[Uuid]>,
    ) -> Result<u64, AppError>;

    async fn list_conversations(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ConversationListRow>, AppError>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert_notification(&self, new: &NewNotification) -> Result<Notification, AppError>;

    async fn list_notifications(&self, user_id: Uuid, limit: i64) -> Result<Vec<Notification>, AppError>;

    async fn mark_notification_read(&self, id: Uuid, user_id: Uuid) -> Result<Option<Notification>, AppError>;
}
