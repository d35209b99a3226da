use sqlx::FromRow;
use time::{Date, OffsetDateTime};

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,      // normalized (lowercase)
    pub password: String,   // codec output, never leaves the service layer
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Date,
    pub created_at: OffsetDateTime,
}

/// Values for a user about to be inserted.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Date,
    pub created_at: OffsetDateTime,
}
