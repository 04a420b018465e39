use chrono::{DateTime, Utc};
use sqlx::PgExecutor;
use uuid::Uuid;

use super::types::*;

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, kind, message, content, entity_type, entity_id, is_read, created_at";

pub async fn insert<'e>(
    exec: impl PgExecutor<'e>,
    new: &NewNotification,
    now: DateTime<Utc>,
) -> Result<Notification, sqlx::Error> {
    let row = sqlx::query_as::<_, NotificationRow>(&format!(
        "INSERT INTO notifications (id, user_id, kind, message, content, entity_type, entity_id, is_read, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, FALSE, $8) \
         RETURNING {NOTIFICATION_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(new.user_id)
    .bind(new.kind.as_str())
    .bind(&new.message)
    .bind(&new.content)
    .bind(new.entity_type)
    .bind(new.entity_id)
    .bind(now)
    .fetch_one(exec)
    .await?;
    Notification::try_from(row)
}

/// Newest first.
pub async fn find_by_user<'e>(
    exec: impl PgExecutor<'e>,
    user_id: Uuid,
    limit: i64,
) -> Result<Vec<Notification>, sqlx::Error> {
    let rows = sqlx::query_as::<_, NotificationRow>(&format!(
        "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
         WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2"
    ))
    .bind(user_id)
    .bind(limit)
    .fetch_all(exec)
    .await?;
    rows.into_iter().map(Notification::try_from).collect()
}

/// Only touches the row when it belongs to `user_id`.
pub async fn mark_read<'e>(
    exec: impl PgExecutor<'e>,
    id: Uuid,
    user_id: Uuid,
) -> Result<Option<Notification>, sqlx::Error> {
    let row = sqlx::query_as::<_, NotificationRow>(&format!(
        "UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2 \
         RETURNING {NOTIFICATION_COLUMNS}"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(exec)
    .await?;
    row.map(Notification::try_from).transpose()
}
