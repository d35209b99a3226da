use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

/// PostgreSQL SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

pub const USERS_EMAIL_CONSTRAINT: &str = "uq_users_email";
pub const EVENTS_TITLE_CONSTRAINT: &str = "uq_events_title";

/// Failure reported by a repository.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// A unique index rejected the write; carries the constraint name.
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl RepoError {
    /// Lifts a raw sqlx error, recognising unique-index rejections so that
    /// racing writers surface as conflicts rather than opaque database errors.
    pub fn classify(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
                let constraint = db_err.constraint().unwrap_or("unknown").to_string();
                return Self::UniqueViolation(constraint);
            }
        }
        Self::Database(err)
    }
}

pub async fn connect(database_url: &str) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("connect to database")
}
