use sqlx::FromRow;
use time::OffsetDateTime;

/// Event record in the database.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub start_at: OffsetDateTime,
    pub end_at: OffsetDateTime,
    pub image: Option<String>, // reference path under the upload prefix
    pub short_description: Option<String>,
    pub long_description: Option<String>,
    pub is_active: bool,
    pub user_id: i64,
    pub created_at: OffsetDateTime,
}

/// Values for an event about to be inserted.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub start_at: OffsetDateTime,
    pub end_at: OffsetDateTime,
    pub image: Option<String>,
    pub short_description: Option<String>,
    pub long_description: Option<String>,
    pub is_active: bool,
    pub user_id: i64,
    pub created_at: OffsetDateTime,
}
