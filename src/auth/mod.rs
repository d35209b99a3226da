use crate::state::AppState;
use axum::Router;

pub mod codec;
pub mod dto;
pub mod handlers;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod services;
pub mod session;

pub use services::UserDirectory;
pub use session::AuthUser;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::account_routes())
}
