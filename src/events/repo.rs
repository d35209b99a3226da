use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;

use crate::db::RepoError;
use crate::events::repo_types::{Event, NewEvent};

/// Persistence for event records.
///
/// Ordering ties on `created_at` are broken by `id` so listings are stable.
#[async_trait]
pub trait EventRepo: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Event>, RepoError>;
    async fn list_all(&self) -> Result<Vec<Event>, RepoError>;
    /// Active events, oldest first.
    async fn list_active(&self) -> Result<Vec<Event>, RepoError>;
    /// Active events starting after `now`, oldest first.
    async fn list_upcoming(&self, now: OffsetDateTime) -> Result<Vec<Event>, RepoError>;
    /// Newest first.
    async fn list_by_owner(&self, user_id: i64) -> Result<Vec<Event>, RepoError>;
    /// Active events starting after `now`, newest first, at most `limit`.
    async fn list_latest_upcoming(
        &self,
        now: OffsetDateTime,
        limit: i64,
    ) -> Result<Vec<Event>, RepoError>;
    async fn title_exists(&self, title: &str, exclude_id: Option<i64>) -> Result<bool, RepoError>;
    async fn insert(&self, event: &NewEvent) -> Result<Event, RepoError>;
    /// Overwrites every mutable column of an existing record.
    async fn update(&self, event: &Event) -> Result<(), RepoError>;
    /// Returns whether a row was removed.
    async fn delete(&self, id: i64) -> Result<bool, RepoError>;
}

pub struct PgEventRepo {
    db: PgPool,
}

impl PgEventRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn fetch(&self, sql: &str) -> Result<Vec<Event>, RepoError> {
        sqlx::query_as::<_, Event>(sql)
            .fetch_all(&self.db)
            .await
            .map_err(RepoError::classify)
    }
}

const EVENT_COLUMNS: &str = "id, title, start_at, end_at, image, short_description, \
     long_description, is_active, user_id, created_at";

#[async_trait]
impl EventRepo for PgEventRepo {
    async fn find_by_id(&self, id: i64) -> Result<Option<Event>, RepoError> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(RepoError::classify)?;
        Ok(event)
    }

    async fn list_all(&self) -> Result<Vec<Event>, RepoError> {
        self.fetch(&format!("SELECT {EVENT_COLUMNS} FROM events ORDER BY id"))
            .await
    }

    async fn list_active(&self) -> Result<Vec<Event>, RepoError> {
        self.fetch(&format!(
            r#"
            SELECT {EVENT_COLUMNS} FROM events
            WHERE is_active
            ORDER BY created_at ASC, id ASC
            "#
        ))
        .await
    }

    async fn list_upcoming(&self, now: OffsetDateTime) -> Result<Vec<Event>, RepoError> {
        let rows = sqlx::query_as::<_, Event>(&format!(
            r#"
            SELECT {EVENT_COLUMNS} FROM events
            WHERE is_active AND start_at > $1
            ORDER BY created_at ASC, id ASC
            "#
        ))
        .bind(now)
        .fetch_all(&self.db)
        .await
        .map_err(RepoError::classify)?;
        Ok(rows)
    }

    async fn list_by_owner(&self, user_id: i64) -> Result<Vec<Event>, RepoError> {
        let rows = sqlx::query_as::<_, Event>(&format!(
            r#"
            SELECT {EVENT_COLUMNS} FROM events
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .map_err(RepoError::classify)?;
        Ok(rows)
    }

    async fn list_latest_upcoming(
        &self,
        now: OffsetDateTime,
        limit: i64,
    ) -> Result<Vec<Event>, RepoError> {
        let rows = sqlx::query_as::<_, Event>(&format!(
            r#"
            SELECT {EVENT_COLUMNS} FROM events
            WHERE is_active AND start_at > $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#
        ))
        .bind(now)
        .bind(limit)
        .fetch_all(&self.db)
        .await
        .map_err(RepoError::classify)?;
        Ok(rows)
    }

    async fn title_exists(&self, title: &str, exclude_id: Option<i64>) -> Result<bool, RepoError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM events
                WHERE title = $1 AND ($2::BIGINT IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(title)
        .bind(exclude_id)
        .fetch_one(&self.db)
        .await
        .map_err(RepoError::classify)?;
        Ok(exists)
    }

    async fn insert(&self, event: &NewEvent) -> Result<Event, RepoError> {
        let created = sqlx::query_as::<_, Event>(&format!(
            r#"
            INSERT INTO events (title, start_at, end_at, image, short_description,
                                long_description, is_active, user_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(&event.title)
        .bind(event.start_at)
        .bind(event.end_at)
        .bind(&event.image)
        .bind(&event.short_description)
        .bind(&event.long_description)
        .bind(event.is_active)
        .bind(event.user_id)
        .bind(event.created_at)
        .fetch_one(&self.db)
        .await
        .map_err(RepoError::classify)?;
        Ok(created)
    }

    async fn update(&self, event: &Event) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            UPDATE events
               SET title = $2, start_at = $3, end_at = $4, image = $5,
                   short_description = $6, long_description = $7, is_active = $8
             WHERE id = $1
            "#,
        )
        .bind(event.id)
        .bind(&event.title)
        .bind(event.start_at)
        .bind(event.end_at)
        .bind(&event.image)
        .bind(&event.short_description)
        .bind(&event.long_description)
        .bind(event.is_active)
        .execute(&self.db)
        .await
        .map_err(RepoError::classify)?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<bool, RepoError> {
        let res = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(RepoError::classify)?;
        Ok(res.rows_affected() > 0)
    }
}
