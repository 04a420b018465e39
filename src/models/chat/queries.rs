use chrono::{DateTime, Utc};
use sqlx::PgExecutor;
use uuid::Uuid;

use super::types::*;
use crate::models::user::UserSummary;

const CONVERSATION_COLUMNS: &str =
    "id, user_one_id, user_two_id, last_message_at, last_message_preview, created_at, updated_at";

pub async fn find_by_id<'e>(exec: impl PgExecutor<'e>, id: Uuid) -> Result<Option<Conversation>, sqlx::Error> {
    sqlx::query_as::<_, Conversation>(&format!(
        "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(exec)
    .await
}

/// Same as `find_by_id` but row-locks the conversation for the rest of the transaction.
pub async fn find_for_update<'e>(exec: impl PgExecutor<'e>, id: Uuid) -> Result<Option<Conversation>, sqlx::Error> {
    sqlx::query_as::<_, Conversation>(&format!(
        "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(exec)
    .await
}

pub async fn find_by_pair<'e>(
    exec: impl PgExecutor<'e>,
    pair: &CanonicalPair,
) -> Result<Option<Conversation>, sqlx::Error> {
    sqlx::query_as::<_, Conversation>(&format!(
        "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE user_one_id = $1 AND user_two_id = $2"
    ))
    .bind(pair.user_one_id)
    .bind(pair.user_two_id)
    .fetch_optional(exec)
    .await
}

/// Insert a conversation for the pair. Returns `None` when the pair already has one.
pub async fn insert_if_absent<'e>(
    exec: impl PgExecutor<'e>,
    pair: &CanonicalPair,
    now: DateTime<Utc>,
) -> Result<Option<Conversation>, sqlx::Error> {
    sqlx::query_as::<_, Conversation>(&format!(
        "INSERT INTO conversations (id, user_one_id, user_two_id, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $4) \
         ON CONFLICT (user_one_id, user_two_id) DO NOTHING \
         RETURNING {CONVERSATION_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(pair.user_one_id)
    .bind(pair.user_two_id)
    .bind(now)
    .fetch_optional(exec)
    .await
}

pub async fn update_last_message<'e>(
    exec: impl PgExecutor<'e>,
    id: Uuid,
    sent_at: DateTime<Utc>,
    preview: &str,
) -> Result<Conversation, sqlx::Error> {
    sqlx::query_as::<_, Conversation>(&format!(
        "UPDATE conversations \
         SET last_message_at = $2, last_message_preview = $3, updated_at = $2 \
         WHERE id = $1 \
         RETURNING {CONVERSATION_COLUMNS}"
    ))
    .bind(id)
    .bind(sent_at)
    .bind(preview)
    .fetch_one(exec)
    .await
}

pub async fn insert_message<'e>(
    exec: impl PgExecutor<'e>,
    conversation_id: Uuid,
    sender_id: Uuid,
    content: &str,
    sent_at: DateTime<Utc>,
) -> Result<Message, sqlx::Error> {
    sqlx::query_as::<_, Message>(
        "INSERT INTO messages (id, conversation_id, sender_id, content, sent_at) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING id, conversation_id, sender_id, content, sent_at, read_at, delivered_at",
    )
    .bind(Uuid::new_v4())
    .bind(conversation_id)
    .bind(sender_id)
    .bind(content)
    .bind(sent_at)
    .fetch_one(exec)
    .await
}

#[derive(sqlx::FromRow)]
struct MessageJoinRow {
    id: Uuid,
    conversation_id: Uuid,
    sender_id: Uuid,
    content: String,
    sent_at: DateTime<Utc>,
    read_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    sender_name: Option<String>,
    sender_email: Option<String>,
}

/// Newest-first page of messages strictly older than `before` (when given).
pub async fn find_messages<'e>(
    exec: impl PgExecutor<'e>,
    conversation_id: Uuid,
    before: Option<DateTime<Utc>>,
    limit: i64,
) -> Result<Vec<MessageRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, MessageJoinRow>(
        "SELECT m.id, m.conversation_id, m.sender_id, m.content, m.sent_at, m.read_at, m.delivered_at, \
                u.name AS sender_name, u.email AS sender_email \
         FROM messages m \
         LEFT JOIN users u ON u.id = m.sender_id \
         WHERE m.conversation_id = $1 \
           AND ($2::timestamptz IS NULL OR m.sent_at < $2) \
         ORDER BY m.sent_at DESC \
         LIMIT $3",
    )
    .bind(conversation_id)
    .bind(before)
    .bind(limit)
    .fetch_all(exec)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let sender = row.sender_name.map(|name| UserSummary {
                id: row.sender_id,
                name,
                email: row.sender_email,
            });
            MessageRecord {
                message: Message {
                    id: row.id,
                    conversation_id: row.conversation_id,
                    sender_id: row.sender_id,
                    content: row.content,
                    sent_at: row.sent_at,
                    read_at: row.read_at,
                    delivered_at: row.delivered_at,
                },
                sender,
            }
        })
        .collect())
}

/// Stamp `read_at` on unread messages the reader received. Returns rows transitioned.
pub async fn mark_read<'e>(
    exec: impl PgExecutor<'e>,
    conversation_id: Uuid,
    reader_id: Uuid,
    message_ids: Option<&[Uuid]>,
    now: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE messages SET read_at = $3 \
         WHERE conversation_id = $1 \
           AND sender_id <> $2 \
           AND read_at IS NULL \
           AND ($4::uuid[] IS NULL OR id = ANY($4))",
    )
    .bind(conversation_id)
    .bind(reader_id)
    .bind(now)
    .bind(message_ids)
    .execute(exec)
    .await?;
    Ok(result.rows_affected())
}

#[derive(sqlx::FromRow)]
struct ConversationListJoinRow {
    id: Uuid,
    user_one_id: Uuid,
    user_two_id: Uuid,
    last_message_at: Option<DateTime<Utc>>,
    last_message_preview: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    other_name: Option<String>,
    other_email: Option<String>,
    unread_count: i64,
}

/// Conversations the user takes part in, most recent activity first.
pub async fn find_for_user<'e>(
    exec: impl PgExecutor<'e>,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<ConversationListRow>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ConversationListJoinRow>(
        "SELECT c.id, c.user_one_id, c.user_two_id, c.last_message_at, c.last_message_preview, \
                c.created_at, c.updated_at, \
                u.name AS other_name, u.email AS other_email, \
                (SELECT COUNT(*) FROM messages m \
                 WHERE m.conversation_id = c.id AND m.sender_id <> $1 AND m.read_at IS NULL) AS unread_count \
         FROM conversations c \
         LEFT JOIN users u \
             ON u.id = CASE WHEN c.user_one_id = $1 THEN c.user_two_id ELSE c.user_one_id END \
         WHERE c.user_one_id = $1 OR c.user_two_id = $1 \
         ORDER BY c.last_message_at DESC NULLS LAST, c.updated_at DESC \
         LIMIT $2 OFFSET $3",
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(exec)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let conversation = Conversation {
                id: row.id,
                user_one_id: row.user_one_id,
                user_two_id: row.user_two_id,
                last_message_at: row.last_message_at,
                last_message_preview: row.last_message_preview,
                created_at: row.created_at,
                updated_at: row.updated_at,
            };
            let other_id = conversation.other_participant(user_id);
            let other_user = row.other_name.map(|name| UserSummary {
                id: other_id,
                name,
                email: row.other_email,
            });
            ConversationListRow {
                conversation,
                other_user,
                unread_count: row.unread_count,
            }
        })
        .collect())
}
