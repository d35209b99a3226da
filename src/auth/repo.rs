use async_trait::async_trait;
use sqlx::PgPool;

use crate::auth::repo_types::{NewUser, User};
use crate::db::RepoError;

/// Persistence for user records. Emails are passed already normalized.
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepoError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;
    async fn email_exists(&self, email: &str, exclude_id: Option<i64>) -> Result<bool, RepoError>;
    async fn insert(&self, user: &NewUser) -> Result<User, RepoError>;
    /// Writes email, names and birth date of an existing record.
    async fn update(&self, user: &User) -> Result<(), RepoError>;
}

pub struct PgUserRepo {
    db: PgPool,
}

impl PgUserRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const USER_COLUMNS: &str =
    "id, email, password, first_name, last_name, birth_date, created_at";

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(RepoError::classify)?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .map_err(RepoError::classify)?;
        Ok(user)
    }

    async fn email_exists(&self, email: &str, exclude_id: Option<i64>) -> Result<bool, RepoError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM users
                WHERE email = $1 AND ($2::BIGINT IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(email)
        .bind(exclude_id)
        .fetch_one(&self.db)
        .await
        .map_err(RepoError::classify)?;
        Ok(exists)
    }

    async fn insert(&self, user: &NewUser) -> Result<User, RepoError> {
        let created = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password, first_name, last_name, birth_date, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.email)
        .bind(&user.password)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.birth_date)
        .bind(user.created_at)
        .fetch_one(&self.db)
        .await
        .map_err(RepoError::classify)?;
        Ok(created)
    }

    async fn update(&self, user: &User) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            UPDATE users
               SET email = $2, first_name = $3, last_name = $4, birth_date = $5
             WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.birth_date)
        .execute(&self.db)
        .await
        .map_err(RepoError::classify)?;
        Ok(())
    }
}
