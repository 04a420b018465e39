use chrono::{DateTime, Utc};
use sqlx::PgExecutor;
use uuid::Uuid;

use super::types::*;

const MEETING_COLUMNS: &str = "id, title, description, start_time, end_time, status, project_id, \
     created_by_id, room_url, room_name, created_at, updated_at";

fn into_meetings(rows: Vec<MeetingRow>) -> Result<Vec<Meeting>, sqlx::Error> {
    rows.into_iter().map(Meeting::try_from).collect()
}

/// All meetings, newest start first.
pub async fn find_all<'e>(exec: impl PgExecutor<'e>) -> Result<Vec<Meeting>, sqlx::Error> {
    let rows = sqlx::query_as::<_, MeetingRow>(&format!(
        "SELECT {MEETING_COLUMNS} FROM meetings ORDER BY start_time DESC"
    ))
    .fetch_all(exec)
    .await?;
    into_meetings(rows)
}

pub async fn find_by_id<'e>(exec: impl PgExecutor<'e>, id: Uuid) -> Result<Option<Meeting>, sqlx::Error> {
    let row = sqlx::query_as::<_, MeetingRow>(&format!(
        "SELECT {MEETING_COLUMNS} FROM meetings WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(exec)
    .await?;
    row.map(Meeting::try_from).transpose()
}

/// Meetings of an organizer that still occupy their calendar (status not terminal).
pub async fn find_active_for_organizer<'e>(
    exec: impl PgExecutor<'e>,
    organizer_id: Uuid,
) -> Result<Vec<Meeting>, sqlx::Error> {
    let terminal: Vec<&str> = MeetingStatus::TERMINAL.iter().map(|s| s.as_str()).collect();
    let rows = sqlx::query_as::<_, MeetingRow>(&format!(
        "SELECT {MEETING_COLUMNS} FROM meetings \
         WHERE created_by_id = $1 AND status <> ALL($2) \
         ORDER BY start_time"
    ))
    .bind(organizer_id)
    .bind(&terminal)
    .fetch_all(exec)
    .await?;
    into_meetings(rows)
}

/// Exact match on the provider room name or URL.
pub async fn find_by_room<'e>(exec: impl PgExecutor<'e>, room: &str) -> Result<Option<Meeting>, sqlx::Error> {
    let row = sqlx::query_as::<_, MeetingRow>(&format!(
        "SELECT {MEETING_COLUMNS} FROM meetings WHERE room_name = $1 OR room_url = $1 LIMIT 1"
    ))
    .bind(room)
    .fetch_optional(exec)
    .await?;
    row.map(Meeting::try_from).transpose()
}

pub async fn insert<'e>(
    exec: impl PgExecutor<'e>,
    new: &NewMeeting,
    now: DateTime<Utc>,
) -> Result<Meeting, sqlx::Error> {
    let row = sqlx::query_as::<_, MeetingRow>(&format!(
        "INSERT INTO meetings (id, title, description, start_time, end_time, status, project_id, \
                               created_by_id, room_url, room_name, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11) \
         RETURNING {MEETING_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(&new.title)
    .bind(&new.description)
    .bind(new.start_time)
    .bind(new.end_time)
    .bind(MeetingStatus::Scheduled.as_str())
    .bind(new.project_id)
    .bind(new.created_by_id)
    .bind(&new.room_url)
    .bind(&new.room_name)
    .bind(now)
    .fetch_one(exec)
    .await?;
    Meeting::try_from(row)
}

/// Overwrite the mutable columns with the given (already merged) meeting.
pub async fn save<'e>(exec: impl PgExecutor<'e>, meeting: &Meeting) -> Result<Option<Meeting>, sqlx::Error> {
    let row = sqlx::query_as::<_, MeetingRow>(&format!(
        "UPDATE meetings SET title = $2, description = $3, start_time = $4, end_time = $5, \
                status = $6, project_id = $7, updated_at = $8 \
         WHERE id = $1 \
         RETURNING {MEETING_COLUMNS}"
    ))
    .bind(meeting.id)
    .bind(&meeting.title)
    .bind(&meeting.description)
    .bind(meeting.start_time)
    .bind(meeting.end_time)
    .bind(meeting.status.as_str())
    .bind(meeting.project_id)
    .bind(meeting.updated_at)
    .fetch_optional(exec)
    .await?;
    row.map(Meeting::try_from).transpose()
}

pub async fn update_status<'e>(
    exec: impl PgExecutor<'e>,
    id: Uuid,
    status: MeetingStatus,
    now: DateTime<Utc>,
) -> Result<Option<Meeting>, sqlx::Error> {
    let row = sqlx::query_as::<_, MeetingRow>(&format!(
        "UPDATE meetings SET status = $2, updated_at = $3 WHERE id = $1 RETURNING {MEETING_COLUMNS}"
    ))
    .bind(id)
    .bind(status.as_str())
    .bind(now)
    .fetch_optional(exec)
    .await?;
    row.map(Meeting::try_from).transpose()
}

/// Hard delete. Participant rows cascade.
pub async fn delete<'e>(exec: impl PgExecutor<'e>, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM meetings WHERE id = $1")
        .bind(id)
        .execute(exec)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Serialize scheduling for one organizer until the surrounding transaction ends.
pub async fn lock_organizer<'e>(exec: impl PgExecutor<'e>, organizer_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(organizer_id.to_string())
        .execute(exec)
        .await?;
    Ok(())
}
