pub mod realtime;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::errors::AppError;
use crate::events::{DomainEvent, EventBus};
use crate::models::chat::{CanonicalPair, Conversation, ConversationSummary, Message, MessagePage, MessageWithSender};
use crate::store::{ChatStore, UserDirectory};

pub const CONTENT_MAX_CHARS: usize = 2000;
pub const DEFAULT_MESSAGE_LIMIT: i64 = 50;
pub const DEFAULT_CONVERSATION_LIMIT: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversationRequest {
    pub recipient_id: Uuid,
    pub initial_message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationResult {
    pub conversation: Conversation,
    pub is_new: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub conversation_id: Uuid,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResult {
    pub message: Message,
    pub conversation_preview: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAsReadRequest {
    pub conversation_id: Uuid,
    #[serde(default)]
    pub message_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagesQuery {
    pub limit: Option<i64>,
    pub cursor: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConversationsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Trim and bound message text.
pub fn normalize_content(content: &str) -> Result<&str, AppError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("Message content is required".to_string()));
    }
    if trimmed.chars().count() > CONTENT_MAX_CHARS {
        return Err(AppError::Validation(format!(
            "Message content must be at most {CONTENT_MAX_CHARS} characters"
        )));
    }
    Ok(trimmed)
}

/// Two-party conversations and their append-only message log.
#[derive(Clone)]
pub struct ChatService {
    store: Arc<dyn ChatStore>,
    users: Arc<dyn UserDirectory>,
    events: EventBus,
}

impl ChatService {
    pub fn new(store: Arc<dyn ChatStore>, users: Arc<dyn UserDirectory>, events: EventBus) -> Self {
        ChatService { store, users, events }
    }

    pub async fn create_or_get_conversation(
        &self,
        request: CreateConversationRequest,
        current_user_id: Uuid,
    ) -> Result<ConversationResult, AppError> {
        let pair = CanonicalPair::new(current_user_id, request.recipient_id)
            .ok_or_else(|| AppError::Validation("Cannot start a conversation with yourself".to_string()))?;
        // Checked before anything is written.
        let initial = request.initial_message.as_deref().map(normalize_content).transpose()?;

        if self.users.find_user(request.recipient_id).await?.is_none() {
            return Err(AppError::NotFound(format!("User {} not found", request.recipient_id)));
        }

        let (mut conversation, is_new) = self.store.insert_or_get_conversation(pair).await?;
        if is_new {
            log::info!("Conversation {} opened between {} and {}", conversation.id, pair.user_one_id, pair.user_two_id);
            if let Some(content) = initial {
                let (_, updated) = self.append(&conversation, current_user_id, content).await?;
                conversation = updated;
            }
        }
        Ok(ConversationResult { conversation, is_new })
    }

    /// NotFound also covers conversations the user is not part of.
    pub async fn get_conversation(&self, id: Uuid, user_id: Uuid) -> Result<Conversation, AppError> {
        self.store
            .find_conversation(id)
            .await?
            .filter(|c| c.has_participant(user_id))
            .ok_or_else(|| AppError::NotFound(format!("Conversation {id} not found")))
    }

    async fn require_member(&self, conversation_id: Uuid, user_id: Uuid) -> Result<Conversation, AppError> {
        let conversation = self
            .store
            .find_conversation(conversation_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Conversation {conversation_id} not found")))?;
        if !conversation.has_participant(user_id) {
            return Err(AppError::Forbidden("Not a participant of this conversation".to_string()));
        }
        Ok(conversation)
    }

    pub async fn send_message(&self, request: SendMessageRequest, sender_id: Uuid) -> Result<SendMessageResult, AppError> {
        let conversation = self.require_member(request.conversation_id, sender_id).await?;
        let content = normalize_content(&request.content)?;
        let (message, updated) = self.append(&conversation, sender_id, content).await?;
        Ok(SendMessageResult {
            message,
            conversation_preview: updated.last_message_preview.unwrap_or_default(),
        })
    }

    async fn append(
        &self,
        conversation: &Conversation,
        sender_id: Uuid,
        content: &str,
    ) -> Result<(Message, Conversation), AppError> {
        let (message, updated) = self.store.append_message(conversation.id, sender_id, content).await?;

        let sender_name = match self.users.find_user(sender_id).await {
            Ok(Some(user)) => user.name,
            Ok(None) => "Someone".to_string(),
            Err(e) => {
                log::warn!("Could not resolve sender {sender_id} for notification: {e}");
                "Someone".to_string()
            }
        };
        self.events.emit(DomainEvent::MessageSent {
            conversation_id: conversation.id,
            message_id: message.id,
            sender_id,
            sender_name,
            recipient_id: conversation.other_participant(sender_id),
            preview: updated.last_message_preview.clone().unwrap_or_default(),
        });
        Ok((message, updated))
    }

    /// Newest first. Pass `next_cursor` back as `cursor` to continue.
    pub async fn get_messages(
        &self,
        conversation_id: Uuid,
        requester_id: Uuid,
        query: MessagesQuery,
    ) -> Result<MessagePage, AppError> {
        self.require_member(conversation_id, requester_id).await?;
        let limit = query.limit.unwrap_or(DEFAULT_MESSAGE_LIMIT).clamp(1, MAX_PAGE_SIZE);

        let mut records = self.store.list_messages(conversation_id, query.cursor, limit + 1).await?;
        let has_more = records.len() as i64 > limit;
        records.truncate(limit as usize);

        let messages: Vec<MessageWithSender> = records
            .into_iter()
            .map(|r| MessageWithSender::from_record(r, requester_id))
            .collect();
        let next_cursor = if has_more { messages.last().map(|m| m.sent_at) } else { None };

        Ok(MessagePage {
            messages,
            has_more,
            next_cursor,
        })
    }

    /// An empty id list marks everything the reader has received.
    pub async fn mark_messages_as_read(&self, request: MarkAsReadRequest, reader_id: Uuid) -> Result<u64, AppError> {
        self.require_member(request.conversation_id, reader_id).await?;
        let ids = (!request.message_ids.is_empty()).then_some(request.message_ids.as_slice());
        let count = self.store.mark_read(request.conversation_id, reader_id, ids).await?;
        if count > 0 {
            log::info!("{reader_id} read {count} message(s) in {}", request.conversation_id);
        }
        Ok(count)
    }

    pub async fn get_user_conversations(
        &self,
        user_id: Uuid,
        query: ConversationsQuery,
    ) -> Result<Vec<ConversationSummary>, AppError> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(DEFAULT_CONVERSATION_LIMIT).clamp(1, MAX_PAGE_SIZE);
        let offset = (page - 1)
            .checked_mul(limit)
            .ok_or_else(|| AppError::Validation("Page is out of range".to_string()))?;
        let rows = self.store.list_conversations(user_id, limit, offset).await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let Some(other_user) = row.other_user else {
                    log::warn!(
                        "Dropping conversation {} from list: other participant no longer resolves",
                        row.conversation.id
                    );
                    return None;
                };
                let c = row.conversation;
                Some(ConversationSummary {
                    id: c.id,
                    other_user,
                    last_message_at: c.last_message_at,
                    last_message_preview: c.last_message_preview,
                    unread_count: row.unread_count,
                    created_at: c.created_at,
                    updated_at: c.updated_at,
                })
            })
            .collect())
    }
}
