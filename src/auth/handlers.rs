use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, MessageResponse, ProfileUpdate, RegisterRequest, UserSnapshot},
        services::{LOGIN_SUCCESSFUL, REGISTRATION_SUCCESSFUL, UPDATE_SUCCESSFUL},
        session::{clear_current, is_logged_in, session_failure, set_current, AuthUser},
    },
    error::ServiceError,
    state::AppState,
};

const ALREADY_LOGGED_IN: &str = "You are already logged in.";
const PASSWORDS_DO_NOT_MATCH: &str = "Passwords do not match.";
const LOGGED_OUT: &str = "Logged out.";

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/account/register", post(register))
        .route("/account/login", post(login))
        .route("/account/logout", post(logout))
        .route("/account/me", get(get_me))
        .route("/account/profile", put(update_profile))
}

#[instrument(skip(state, session, payload))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ServiceError> {
    if is_logged_in(&session).await {
        return Err(ServiceError::validation(ALREADY_LOGGED_IN));
    }
    if payload.password != payload.confirm_password {
        warn!("registration password confirmation mismatch");
        return Err(ServiceError::validation(PASSWORDS_DO_NOT_MATCH));
    }

    let user = state
        .users
        .register(
            &payload.email,
            &payload.password,
            &payload.first_name,
            &payload.last_name,
            payload.birth_date,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: REGISTRATION_SUCCESSFUL,
            user,
        }),
    ))
}

/// The session is only written once the credentials check out, so failed
/// attempts leave nothing in the store.
#[instrument(skip(state, session, payload))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ServiceError> {
    if is_logged_in(&session).await {
        return Err(ServiceError::validation(ALREADY_LOGGED_IN));
    }

    let user = state.users.login(&payload.email, &payload.password).await?;
    session.cycle_id().await.map_err(session_failure)?;
    set_current(&session, &user).await?;

    Ok(Json(AuthResponse {
        message: LOGIN_SUCCESSFUL,
        user,
    }))
}

#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<Json<MessageResponse>, ServiceError> {
    let was_logged_in = is_logged_in(&session).await;
    clear_current(&session).await?;
    session.flush().await.map_err(session_failure)?;
    if was_logged_in {
        info!("user logged out");
    }
    Ok(Json(MessageResponse { message: LOGGED_OUT }))
}

#[instrument(skip(auth), fields(user_id = auth.user.id))]
pub async fn get_me(auth: AuthUser) -> Json<UserSnapshot> {
    Json(auth.user)
}

/// Only the caller's own profile can be changed; the session copy is
/// reloaded afterwards.
#[instrument(skip(state, auth, payload), fields(user_id = auth.user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<ProfileUpdate>,
) -> Result<Json<AuthResponse>, ServiceError> {
    let id = auth.user.id;
    let mut user = state.users.update(id, &payload).await?;

    if let Some(fresh) = state.users.get_by_id(id).await? {
        user = fresh;
    }
    set_current(&auth.session, &user).await?;

    Ok(Json(AuthResponse {
        message: UPDATE_SUCCESSFUL,
        user,
    }))
}
