use chrono::{DateTime, Utc};
use sqlx::PgExecutor;
use uuid::Uuid;

use super::types::*;

const PARTICIPANT_COLUMNS: &str =
    "id, meeting_id, user_id, role, status, joined_at, left_at, created_at, updated_at";

pub async fn find_by_meeting<'e>(
    exec: impl PgExecutor<'e>,
    meeting_id: Uuid,
) -> Result<Vec<MeetingParticipant>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ParticipantRow>(&format!(
        "SELECT {PARTICIPANT_COLUMNS} FROM meeting_participants WHERE meeting_id = $1 ORDER BY created_at, id"
    ))
    .bind(meeting_id)
    .fetch_all(exec)
    .await?;
    rows.into_iter().map(MeetingParticipant::try_from).collect()
}

pub async fn find_one<'e>(
    exec: impl PgExecutor<'e>,
    meeting_id: Uuid,
    user_id: Uuid,
) -> Result<Option<MeetingParticipant>, sqlx::Error> {
    let row = sqlx::query_as::<_, ParticipantRow>(&format!(
        "SELECT {PARTICIPANT_COLUMNS} FROM meeting_participants WHERE meeting_id = $1 AND user_id = $2"
    ))
    .bind(meeting_id)
    .bind(user_id)
    .fetch_optional(exec)
    .await?;
    row.map(MeetingParticipant::try_from).transpose()
}

/// Which of `user_ids` already sit on the meeting's roster.
pub async fn find_existing_user_ids<'e>(
    exec: impl PgExecutor<'e>,
    meeting_id: Uuid,
    user_ids: &[Uuid],
) -> Result<Vec<Uuid>, sqlx::Error> {
    let rows: Vec<(Uuid,)> = sqlx::query_as(
        "SELECT user_id FROM meeting_participants WHERE meeting_id = $1 AND user_id = ANY($2)",
    )
    .bind(meeting_id)
    .bind(user_ids)
    .fetch_all(exec)
    .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

pub async fn insert<'e>(
    exec: impl PgExecutor<'e>,
    meeting_id: Uuid,
    user_id: Uuid,
    role: ParticipantRole,
    now: DateTime<Utc>,
) -> Result<MeetingParticipant, sqlx::Error> {
    let row = sqlx::query_as::<_, ParticipantRow>(&format!(
        "INSERT INTO meeting_participants (id, meeting_id, user_id, role, status, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $6) \
         RETURNING {PARTICIPANT_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(meeting_id)
    .bind(user_id)
    .bind(role.as_str())
    .bind(ParticipantStatus::Invited.as_str())
    .bind(now)
    .fetch_one(exec)
    .await?;
    MeetingParticipant::try_from(row)
}

pub async fn save<'e>(
    exec: impl PgExecutor<'e>,
    participant: &MeetingParticipant,
) -> Result<Option<MeetingParticipant>, sqlx::Error> {
    let row = sqlx::query_as::<_, ParticipantRow>(&format!(
        "UPDATE meeting_participants \
         SET role = $3, status = $4, joined_at = $5, left_at = $6, updated_at = $7 \
         WHERE meeting_id = $1 AND user_id = $2 \
         RETURNING {PARTICIPANT_COLUMNS}"
    ))
    .bind(participant.meeting_id)
    .bind(participant.user_id)
    .bind(participant.role.as_str())
    .bind(participant.status.as_str())
    .bind(participant.joined_at)
    .bind(participant.left_at)
    .bind(participant.updated_at)
    .fetch_optional(exec)
    .await?;
    row.map(MeetingParticipant::try_from).transpose()
}

pub async fn delete<'e>(exec: impl PgExecutor<'e>, meeting_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM meeting_participants WHERE meeting_id = $1 AND user_id = $2")
        .bind(meeting_id)
        .bind(user_id)
        .execute(exec)
        .await?;
    Ok(result.rows_affected() > 0)
}
