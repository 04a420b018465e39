//! In-process store used by the test suites. One mutex guards all state and is
//! held for the whole of each call, so multi-step methods are atomic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::postgres::already_participants;
use super::{ChatStore, MeetingStore, NotificationStore, RosterStore, UserDirectory};
use crate::errors::AppError;
use crate::models::chat::{
    self, CanonicalPair, Conversation, ConversationListRow, Message, MessageRecord,
};
use crate::models::meeting::{Meeting, MeetingChanges, MeetingStatus, NewMeeting};
use crate::models::notification::{NewNotification, Notification};
use crate::models::participant::{MeetingParticipant, ParticipantChanges, ParticipantRole, ParticipantStatus};
use crate::models::user::UserSummary;
use crate::scheduling::overlap::{self, TimeRange};

#[derive(Default)]
struct State {
    users: HashMap<Uuid, UserSummary>,
    meetings: HashMap<Uuid, Meeting>,
    participants: Vec<MeetingParticipant>,
    conversations: HashMap<Uuid, Conversation>,
    messages: Vec<Message>,
    notifications: Vec<Notification>,
}

impl State {
    fn active_for_organizer(&self, organizer_id: Uuid) -> Vec<Meeting> {
        let mut meetings: Vec<Meeting> = self
            .meetings
            .values()
            .filter(|m| m.created_by_id == organizer_id && !m.status.is_terminal())
            .cloned()
            .collect();
        meetings.sort_by_key(|m| m.start_time);
        meetings
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, name: &str, email: Option<&str>) -> UserSummary {
        let user = UserSummary {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.map(str::to_string),
        };
        self.state.lock().await.users.insert(user.id, user.clone());
        user
    }

    /// Drop a user from the directory. Rows that reference it stay.
    pub async fn remove_user(&self, id: Uuid) {
        self.state.lock().await.users.remove(&id);
    }

    pub async fn notifications_for(&self, user_id: Uuid) -> Vec<Notification> {
        let state = self.state.lock().await;
        state
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect()
    }

    pub async fn meeting_count(&self) -> usize {
        self.state.lock().await.meetings.len()
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn find_user(&self, id: Uuid) -> Result<Option<UserSummary>, AppError> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn find_users(&self, ids: &[Uuid]) -> Result<Vec<UserSummary>, AppError> {
        let state = self.state.lock().await;
        Ok(ids.iter().filter_map(|id| state.users.get(id).cloned()).collect())
    }
}

#[async_trait]
impl MeetingStore for MemoryStore {
    async fn list_meetings(&self) -> Result<Vec<Meeting>, AppError> {
        let mut meetings: Vec<Meeting> = self.state.lock().await.meetings.values().cloned().collect();
        meetings.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(meetings)
    }

    async fn find_meeting(&self, id: Uuid) -> Result<Option<Meeting>, AppError> {
        Ok(self.state.lock().await.meetings.get(&id).cloned())
    }

    async fn find_active_for_organizer(&self, organizer_id: Uuid) -> Result<Vec<Meeting>, AppError> {
        Ok(self.state.lock().await.active_for_organizer(organizer_id))
    }

    async fn find_meeting_by_room(&self, room: &str) -> Result<Option<Meeting>, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .meetings
            .values()
            .find(|m| m.room_name.as_deref() == Some(room) || m.room_url.as_deref() == Some(room))
            .cloned())
    }

    async fn insert_meeting(&self, new: &NewMeeting) -> Result<Meeting, AppError> {
        let range = TimeRange::new(new.start_time, new.end_time)?;
        let mut state = self.state.lock().await;

        overlap::ensure_available(&range, &state.active_for_organizer(new.created_by_id), None)?;
        if new.room_name.is_some() && state.meetings.values().any(|m| m.room_name == new.room_name) {
            return Err(AppError::Conflict("Room name already in use".to_string()));
        }

        let now = Utc::now();
        let meeting = Meeting {
            id: Uuid::new_v4(),
            title: new.title.clone(),
            description: new.description.clone(),
            start_time: new.start_time,
            end_time: new.end_time,
            status: MeetingStatus::Scheduled,
            project_id: new.project_id,
            created_by_id: new.created_by_id,
            room_url: new.room_url.clone(),
            room_name: new.room_name.clone(),
            created_at: now,
            updated_at: now,
        };
        state.meetings.insert(meeting.id, meeting.clone());
        Ok(meeting)
    }

    async fn update_meeting(&self, id: Uuid, changes: &MeetingChanges) -> Result<Meeting, AppError> {
        let mut state = self.state.lock().await;

        let current = state
            .meetings
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Meeting {id} not found")))?;
        let updated = changes.apply(&current, Utc::now());
        let range = TimeRange::new(updated.start_time, updated.end_time)?;

        if changes.rechecks_overlap(&current, &updated) {
            let existing = state.active_for_organizer(current.created_by_id);
            overlap::ensure_available(&range, &existing, Some(id))?;
        }

        state.meetings.insert(id, updated.clone());
        Ok(updated)
    }

    async fn set_meeting_status(&self, id: Uuid, status: MeetingStatus) -> Result<Option<Meeting>, AppError> {
        let mut state = self.state.lock().await;
        Ok(state.meetings.get_mut(&id).map(|m| {
            m.status = status;
            m.updated_at = Utc::now();
            m.clone()
        }))
    }

    async fn delete_meeting(&self, id: Uuid) -> Result<bool, AppError> {
        let mut state = self.state.lock().await;
        let removed = state.meetings.remove(&id).is_some();
        if removed {
            state.participants.retain(|p| p.meeting_id != id);
        }
        Ok(removed)
    }
}

#[async_trait]
impl RosterStore for MemoryStore {
    async fn list_participants(&self, meeting_id: Uuid) -> Result<Vec<MeetingParticipant>, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .participants
            .iter()
            .filter(|p| p.meeting_id == meeting_id)
            .cloned()
            .collect())
    }

    async fn add_participants(
        &self,
        meeting_id: Uuid,
        user_ids: &[Uuid],
        role: ParticipantRole,
    ) -> Result<Vec<MeetingParticipant>, AppError> {
        let mut state = self.state.lock().await;

        let existing: Vec<Uuid> = user_ids
            .iter()
            .copied()
            .filter(|id| {
                state
                    .participants
                    .iter()
                    .any(|p| p.meeting_id == meeting_id && p.user_id == *id)
            })
            .collect();
        if !existing.is_empty() {
            return Err(already_participants(&existing));
        }

        let now = Utc::now();
        let added: Vec<MeetingParticipant> = user_ids
            .iter()
            .map(|&user_id| MeetingParticipant {
                id: Uuid::new_v4(),
                meeting_id,
                user_id,
                role,
                status: ParticipantStatus::Invited,
                joined_at: None,
                left_at: None,
                created_at: now,
                updated_at: now,
            })
            .collect();
        state.participants.extend(added.iter().cloned());
        Ok(added)
    }

    async fn update_participant(
        &self,
        meeting_id: Uuid,
        user_id: Uuid,
        changes: ParticipantChanges,
    ) -> Result<Option<MeetingParticipant>, AppError> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        Ok(state
            .participants
            .iter_mut()
            .find(|p| p.meeting_id == meeting_id && p.user_id == user_id)
            .map(|p| {
                *p = changes.apply(p, now);
                p.clone()
            }))
    }

    async fn remove_participant(&self, meeting_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        let mut state = self.state.lock().await;
        let before = state.participants.len();
        state
            .participants
            .retain(|p| !(p.meeting_id == meeting_id && p.user_id == user_id));
        Ok(state.participants.len() < before)
    }
}

#[async_trait]
impl ChatStore for MemoryStore {
    async fn find_conversation(&self, id: Uuid) -> Result<Option<Conversation>, AppError> {
        Ok(self.state.lock().await.conversations.get(&id).cloned())
    }

    async fn insert_or_get_conversation(&self, pair: CanonicalPair) -> Result<(Conversation, bool), AppError> {
        let mut state = self.state.lock().await;
        if let Some(existing) = state
            .conversations
            .values()
            .find(|c| c.user_one_id == pair.user_one_id && c.user_two_id == pair.user_two_id)
        {
            return Ok((existing.clone(), false));
        }

        let now = Utc::now();
        let conversation = Conversation {
            id: Uuid::new_v4(),
            user_one_id: pair.user_one_id,
            user_two_id: pair.user_two_id,
            last_message_at: None,
            last_message_preview: None,
            created_at: now,
            updated_at: now,
        };
        state.conversations.insert(conversation.id, conversation.clone());
        Ok((conversation, true))
    }

    async fn append_message(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: &str,
    ) -> Result<(Message, Conversation), AppError> {
        let mut state = self.state.lock().await;

        let conversation = state
            .conversations
            .get_mut(&conversation_id)
            .ok_or_else(|| AppError::NotFound(format!("Conversation {conversation_id} not found")))?;
        let sent_at = chat::next_sent_at(Utc::now(), conversation.last_message_at);
        conversation.last_message_at = Some(sent_at);
        conversation.last_message_preview = Some(chat::preview(content));
        conversation.updated_at = sent_at;
        let conversation = conversation.clone();

        let message = Message {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id,
            content: content.to_string(),
            sent_at,
            read_at: None,
            delivered_at: None,
        };
        state.messages.push(message.clone());
        Ok((message, conversation))
    }

    async fn list_messages(
        &self,
        conversation_id: Uuid,
        before: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<MessageRecord>, AppError> {
        let state = self.state.lock().await;
        let mut messages: Vec<&Message> = state
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .filter(|m| before.is_none_or(|cursor| m.sent_at < cursor))
            .collect();
        messages.sort_by(|a, b| b.sent_at.cmp(&a.sent_at));
        Ok(messages
            .into_iter()
            .take(usize::try_from(limit).unwrap_or(0))
            .map(|m| MessageRecord {
                message: m.clone(),
                sender: state.users.get(&m.sender_id).cloned(),
            })
            .collect())
    }

    async fn mark_read(
        &self,
        conversation_id: Uuid,
        reader_id: Uuid,
        message_ids: Option<&[Uuid]>,
    ) -> Result<u64, AppError> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let mut count = 0;
        for message in state.messages.iter_mut().filter(|m| {
            m.conversation_id == conversation_id
                && m.sender_id != reader_id
                && m.read_at.is_none()
                && message_ids.is_none_or(|ids| ids.contains(&m.id))
        }) {
            message.read_at = Some(now);
            count += 1;
        }
        Ok(count)
    }

    async fn list_conversations(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ConversationListRow>, AppError> {
        let state = self.state.lock().await;
        let mut conversations: Vec<&Conversation> = state
            .conversations
            .values()
            .filter(|c| c.has_participant(user_id))
            .collect();
        // NULLS LAST on last_message_at, then most recently updated.
        conversations.sort_by(|a, b| match (a.last_message_at, b.last_message_at) {
            (Some(x), Some(y)) => y.cmp(&x).then(b.updated_at.cmp(&a.updated_at)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => b.updated_at.cmp(&a.updated_at),
        });

        Ok(conversations
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .map(|c| {
                let other_id = c.other_participant(user_id);
                let unread_count = state
                    .messages
                    .iter()
                    .filter(|m| m.conversation_id == c.id && m.sender_id != user_id && m.read_at.is_none())
                    .count() as i64;
                ConversationListRow {
                    conversation: c.clone(),
                    other_user: state.users.get(&other_id).cloned(),
                    unread_count,
                }
            })
            .collect())
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn insert_notification(&self, new: &NewNotification) -> Result<Notification, AppError> {
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            kind: new.kind,
            message: new.message.clone(),
            content: new.content.clone(),
            entity_type: new.entity_type.map(str::to_string),
            entity_id: new.entity_id,
            is_read: false,
            created_at: Utc::now(),
        };
        self.state.lock().await.notifications.push(notification.clone());
        Ok(notification)
    }

    async fn list_notifications(&self, user_id: Uuid, limit: i64) -> Result<Vec<Notification>, AppError> {
        let state = self.state.lock().await;
        let mut notifications: Vec<Notification> = state
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        notifications.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(notifications)
    }

    async fn mark_notification_read(&self, id: Uuid, user_id: Uuid) -> Result<Option<Notification>, AppError> {
        let mut state = self.state.lock().await;
        Ok(state
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.user_id == user_id)
            .map(|n| {
                n.is_read = true;
                n.clone()
            }))
    }
}
