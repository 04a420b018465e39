use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::meeting::Meeting;

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, AppError> {
        if end <= start {
            return Err(AppError::Validation("End time must be after start time".to_string()));
        }
        Ok(TimeRange { start, end })
    }

    pub fn of(meeting: &Meeting) -> Self {
        TimeRange {
            start: meeting.start_time,
            end: meeting.end_time,
        }
    }

    /// Touching endpoints do not overlap: 10:00-11:00 and 11:00-12:00 are back-to-back.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// First non-terminal meeting in `existing` that collides with `range`.
pub fn find_conflict<'a>(range: &TimeRange, existing: &'a [Meeting], exclude: Option<Uuid>) -> Option<&'a Meeting> {
    existing
        .iter()
        .filter(|m| Some(m.id) != exclude)
        .filter(|m| !m.status.is_terminal())
        .find(|m| range.overlaps(&TimeRange::of(m)))
}

pub fn ensure_available(range: &TimeRange, existing: &[Meeting], exclude: Option<Uuid>) -> Result<(), AppError> {
    match find_conflict(range, existing, exclude) {
        Some(conflict) => Err(AppError::Conflict(format!(
            "Time slot overlaps with meeting '{}' ({} - {})",
            conflict.title,
            conflict.start_time.to_rfc3339(),
            conflict.end_time.to_rfc3339()
        ))),
        None => Ok(()),
    }
}
