use serde::Serialize;
use time::{Duration, OffsetDateTime};

use super::repo_types::Event;

/// Read-only copy of an event as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventSnapshot {
    pub id: i64,
    pub title: String,
    #[serde(with = "time::serde::rfc3339")]
    pub start_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_at: OffsetDateTime,
    pub image: Option<String>,
    pub short_description: Option<String>,
    pub long_description: Option<String>,
    pub is_active: bool,
    pub user_id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Event> for EventSnapshot {
    fn from(e: Event) -> Self {
        Self {
            id: e.id,
            title: e.title,
            start_at: e.start_at,
            end_at: e.end_at,
            image: e.image,
            short_description: e.short_description,
            long_description: e.long_description,
            is_active: e.is_active,
            user_id: e.user_id,
            created_at: e.created_at,
        }
    }
}

/// Caller-editable event fields. The image travels separately.
#[derive(Debug, Clone)]
pub struct EventInput {
    pub title: String,
    pub start_at: OffsetDateTime,
    pub end_at: OffsetDateTime,
    pub short_description: Option<String>,
    pub long_description: Option<String>,
    pub is_active: bool,
}

/// An event together with the newest upcoming events shown beside it.
#[derive(Debug, Serialize)]
pub struct EventDetail {
    pub event: EventSnapshot,
    pub latest: Vec<EventSnapshot>,
}

/// Prefilled values for the creation form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventTemplate {
    pub user_id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub start_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_at: OffsetDateTime,
    pub is_active: bool,
}

impl EventTemplate {
    /// Starts a day from `now` and lasts two hours.
    pub fn for_owner(user_id: i64, now: OffsetDateTime) -> Self {
        let start_at = now + Duration::days(1);
        Self {
            user_id,
            start_at,
            end_at: start_at + Duration::hours(2),
            is_active: true,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub message: &'static str,
    pub event: EventSnapshot,
}
