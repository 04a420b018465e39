use chrono::{DateTime, Duration, DurationRound, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::user::UserSummary;

/// Characters of the latest message cached on the conversation row.
pub const PREVIEW_CHARS: usize = 100;

/// An unordered pair of distinct users, stored with the smaller id first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CanonicalPair {
    pub user_one_id: Uuid,
    pub user_two_id: Uuid,
}

impl CanonicalPair {
    /// `None` when both ids are the same user.
    pub fn new(a: Uuid, b: Uuid) -> Option<Self> {
        if a == b {
            return None;
        }
        let (user_one_id, user_two_id) = if a < b { (a, b) } else { (b, a) };
        Some(CanonicalPair { user_one_id, user_two_id })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: Uuid,
    pub user_one_id: Uuid,
    pub user_two_id: Uuid,
    pub last_message_at: Option<DateTime<Utc>>,
    pub last_message_preview: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn has_participant(&self, user_id: Uuid) -> bool {
        self.user_one_id == user_id || self.user_two_id == user_id
    }

    /// The participant that is not `user_id`.
    pub fn other_participant(&self, user_id: Uuid) -> Uuid {
        if self.user_one_id == user_id {
            self.user_two_id
        } else {
            self.user_one_id
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub sent_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

/// A stored message joined with whatever is known about its sender.
#[derive(Debug, Clone)]
pub struct MessageRecord {
    pub message: Message,
    pub sender: Option<UserSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageWithSender {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender: UserSummary,
    pub content: String,
    pub sent_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub is_mine: bool,
}

impl MessageWithSender {
    pub fn from_record(record: MessageRecord, viewer_id: Uuid) -> Self {
        let MessageRecord { message, sender } = record;
        MessageWithSender {
            sender: sender.unwrap_or_else(|| UserSummary::deleted(message.sender_id)),
            is_mine: message.sender_id == viewer_id,
            id: message.id,
            conversation_id: message.conversation_id,
            content: message.content,
            sent_at: message.sent_at,
            read_at: message.read_at,
            delivered_at: message.delivered_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage {
    pub messages: Vec<MessageWithSender>,
    pub has_more: bool,
    pub next_cursor: Option<DateTime<Utc>>,
}

/// Raw row for the conversation list before the other user is resolved.
#[derive(Debug, Clone)]
pub struct ConversationListRow {
    pub conversation: Conversation,
    pub other_user: Option<UserSummary>,
    pub unread_count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: Uuid,
    pub other_user: UserSummary,
    pub last_message_at: Option<DateTime<Utc>>,
    pub last_message_preview: Option<String>,
    pub unread_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn preview(content: &str) -> String {
    content.chars().take(PREVIEW_CHARS).collect()
}

/// Timestamp for the next message of a conversation: wall clock at microsecond
/// precision, bumped past the previous message so `sent_at` is strictly increasing.
pub fn next_sent_at(now: DateTime<Utc>, last_message_at: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let micro = Duration::microseconds(1);
    let now = now.duration_trunc(micro).unwrap_or(now);
    match last_message_at {
        Some(last) if last >= now => last + micro,
        _ => now,
    }
}
