use std::sync::Arc;

use time::{Date, OffsetDateTime};
use tracing::{info, warn};

use crate::auth::codec::CredentialCodec;
use crate::auth::dto::{ProfileUpdate, UserSnapshot};
use crate::auth::repo::UserRepo;
use crate::auth::repo_types::NewUser;
use crate::db::RepoError;
use crate::error::{ServiceError, ServiceResult};
use crate::validation::{
    self, EMAIL_MAX_LEN, NAME_MAX_LEN, PASSWORD_REQUIREMENTS, PASSWORD_TOO_LONG,
};

pub const REGISTRATION_SUCCESSFUL: &str = "Registration completed successfully.";
pub const LOGIN_SUCCESSFUL: &str = "Login successful.";
pub const UPDATE_SUCCESSFUL: &str = "Profile updated successfully.";

const EMAIL_TAKEN: &str = "This email address is already in use.";
const EMAIL_NOT_FOUND: &str = "Email address not found.";
const INCORRECT_PASSWORD: &str = "Incorrect password.";
const USER_NOT_FOUND: &str = "User not found.";
const INVALID_EMAIL: &str = "Please enter a valid email address.";

const REGISTRATION_ERROR: &str = "An error occurred during registration: ";
const LOGIN_ERROR: &str = "An error occurred during login: ";
const UPDATE_ERROR: &str = "An error occurred during update: ";

/// Registration, login and profile maintenance over user records.
#[derive(Clone)]
pub struct UserDirectory {
    repo: Arc<dyn UserRepo>,
    codec: Arc<dyn CredentialCodec>,
}

impl UserDirectory {
    pub fn new(repo: Arc<dyn UserRepo>, codec: Arc<dyn CredentialCodec>) -> Self {
        Self { repo, codec }
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
        birth_date: Date,
    ) -> ServiceResult<UserSnapshot> {
        if !validation::is_password_within_limit(password) {
            return Err(ServiceError::validation(PASSWORD_TOO_LONG));
        }
        if !validation::is_password_valid(password) {
            return Err(ServiceError::validation(PASSWORD_REQUIREMENTS));
        }
        let email = validation::normalize_email(email);
        validate_profile(&email, first_name, last_name)?;

        if self
            .email_exists(&email, None)
            .await
            .map_err(|e| ServiceError::internal(REGISTRATION_ERROR, e))?
        {
            warn!(email = %email, "email already registered");
            return Err(ServiceError::Conflict(EMAIL_TAKEN.into()));
        }

        let sealed = self
            .codec
            .seal(password)
            .map_err(|e| ServiceError::internal(REGISTRATION_ERROR, e))?;

        let new_user = NewUser {
            email,
            password: sealed,
            first_name: first_name.trim().to_string(),
            last_name: last_name.trim().to_string(),
            birth_date,
            created_at: OffsetDateTime::now_utc(),
        };
        let user = self
            .repo
            .insert(&new_user)
            .await
            .map_err(|e| map_write_error(e, REGISTRATION_ERROR))?;

        info!(user_id = user.id, email = %user.email, "user registered");
        Ok(user.into())
    }

    pub async fn login(&self, email: &str, password: &str) -> ServiceResult<UserSnapshot> {
        let email = validation::normalize_email(email);
        let user = self
            .repo
            .find_by_email(&email)
            .await
            .map_err(|e| ServiceError::internal(LOGIN_ERROR, e))?;

        let Some(user) = user else {
            warn!(email = %email, "login unknown email");
            return Err(ServiceError::NotFound(EMAIL_NOT_FOUND.into()));
        };

        if !self.codec.verify(password, &user.password) {
            warn!(email = %email, user_id = user.id, "login invalid password");
            return Err(ServiceError::Auth(INCORRECT_PASSWORD.into()));
        }

        info!(user_id = user.id, email = %user.email, "user logged in");
        Ok(user.into())
    }

    pub async fn get_by_id(&self, id: i64) -> ServiceResult<Option<UserSnapshot>> {
        let user = self
            .repo
            .find_by_id(id)
            .await
            .map_err(|e| ServiceError::internal("user lookup failed: ", e))?;
        Ok(user.map(UserSnapshot::from))
    }

    pub async fn get_by_email(&self, email: &str) -> ServiceResult<Option<UserSnapshot>> {
        let user = self
            .repo
            .find_by_email(&validation::normalize_email(email))
            .await
            .map_err(|e| ServiceError::internal("user lookup failed: ", e))?;
        Ok(user.map(UserSnapshot::from))
    }

    /// Applies a profile change and returns the stored result.
    pub async fn update(&self, id: i64, changes: &ProfileUpdate) -> ServiceResult<UserSnapshot> {
        let Some(mut user) = self
            .repo
            .find_by_id(id)
            .await
            .map_err(|e| ServiceError::internal(UPDATE_ERROR, e))?
        else {
            return Err(ServiceError::NotFound(USER_NOT_FOUND.into()));
        };

        let new_email = validation::normalize_email(&changes.email);
        validate_profile(&new_email, &changes.first_name, &changes.last_name)?;

        if new_email != user.email.to_lowercase()
            && self
                .email_exists(&new_email, Some(id))
                .await
                .map_err(|e| ServiceError::internal(UPDATE_ERROR, e))?
        {
            warn!(user_id = id, email = %new_email, "email already registered");
            return Err(ServiceError::Conflict(EMAIL_TAKEN.into()));
        }

        user.email = new_email;
        user.first_name = changes.first_name.trim().to_string();
        user.last_name = changes.last_name.trim().to_string();
        user.birth_date = changes.birth_date;

        self.repo
            .update(&user)
            .await
            .map_err(|e| map_write_error(e, UPDATE_ERROR))?;

        info!(user_id = id, "user profile updated");
        Ok(user.into())
    }

    /// `exclude_id` lets a record ignore itself while it is being updated.
    pub async fn email_exists(&self, email: &str, exclude_id: Option<i64>) -> Result<bool, RepoError> {
        self.repo
            .email_exists(&validation::normalize_email(email), exclude_id)
            .await
    }
}

fn validate_profile(email: &str, first_name: &str, last_name: &str) -> ServiceResult<()> {
    if !validation::is_valid_email(email) {
        return Err(ServiceError::validation(INVALID_EMAIL));
    }
    validation::limit_text("Email", Some(email), EMAIL_MAX_LEN)?;
    validation::require_text("First name", first_name, NAME_MAX_LEN)?;
    validation::require_text("Last name", last_name, NAME_MAX_LEN)?;
    Ok(())
}

/// A unique-index rejection means another writer won the race for the same
/// email; it gets the same message as the pre-check.
fn map_write_error(err: RepoError, context: &str) -> ServiceError {
    match err {
        RepoError::UniqueViolation(_) => ServiceError::Conflict(EMAIL_TAKEN.into()),
        other => ServiceError::internal(context, other),
    }
}
