use sqlx::PgExecutor;
use uuid::Uuid;

use super::types::UserSummary;

pub async fn find_by_id<'e>(exec: impl PgExecutor<'e>, id: Uuid) -> Result<Option<UserSummary>, sqlx::Error> {
    sqlx::query_as::<_, UserSummary>("SELECT id, name, email FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(exec)
        .await
}

/// Resolve many users at once. Unknown ids are simply absent from the result.
pub async fn find_by_ids<'e>(exec: impl PgExecutor<'e>, ids: &[Uuid]) -> Result<Vec<UserSummary>, sqlx::Error> {
    sqlx::query_as::<_, UserSummary>("SELECT id, name, email FROM users WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(exec)
        .await
}
