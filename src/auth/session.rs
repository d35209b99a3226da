//! Session-bound identity on top of `tower-sessions`.
//!
//! The browser only holds an opaque, HTTP-only session id cookie. Values live
//! in the server-side store and expire after a period of inactivity. A session
//! nothing was written to is never stored and gets no cookie.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use time::Duration;
use tower_sessions::{cookie::SameSite, Expiry, Session, SessionManagerLayer, SessionStore};
use tracing::warn;

use crate::auth::dto::UserSnapshot;
use crate::config::SessionConfig;
use crate::error::{ServiceError, ServiceResult};

/// Session key holding the serialized [`UserSnapshot`].
pub const CURRENT_USER_KEY: &str = "current_user";

const LOGIN_REQUIRED: &str = "Please log in to continue.";

/// Cookie and expiry settings shared by every route.
pub fn session_layer<S>(config: &SessionConfig, store: S) -> SessionManagerLayer<S>
where
    S: SessionStore + Clone,
{
    SessionManagerLayer::new(store)
        .with_name(config.cookie_name.clone())
        .with_path("/")
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_secure(config.secure_cookie)
        .with_expiry(Expiry::OnInactivity(Duration::minutes(config.idle_minutes)))
}

pub(crate) fn session_failure(e: tower_sessions::session::Error) -> ServiceError {
    ServiceError::internal("session store failed: ", e)
}

/// Stores the snapshot under [`CURRENT_USER_KEY`].
pub async fn set_current(session: &Session, user: &UserSnapshot) -> ServiceResult<()> {
    session
        .insert(CURRENT_USER_KEY, user)
        .await
        .map_err(session_failure)
}

/// A missing or unreadable value both mean "nobody is logged in".
pub async fn current_user(session: &Session) -> Option<UserSnapshot> {
    match session.get::<UserSnapshot>(CURRENT_USER_KEY).await {
        Ok(user) => user,
        Err(e) => {
            warn!(error = %e, "discarding unreadable session snapshot");
            None
        }
    }
}

pub async fn clear_current(session: &Session) -> ServiceResult<()> {
    session
        .remove::<serde_json::Value>(CURRENT_USER_KEY)
        .await
        .map(|_| ())
        .map_err(session_failure)
}

pub async fn is_logged_in(session: &Session) -> bool {
    current_user(session).await.is_some()
}

/// The logged-in user for the current request, taken from the session.
#[derive(Debug)]
pub struct AuthUser {
    pub user: UserSnapshot,
    pub session: Session,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| ServiceError::Internal(msg.into()))?;
        let user = current_user(&session)
            .await
            .ok_or_else(|| ServiceError::Auth(LOGIN_REQUIRED.into()))?;
        Ok(AuthUser { user, session })
    }
}
