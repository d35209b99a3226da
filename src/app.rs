use std::net::SocketAddr;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tower_sessions::{MemoryStore, SessionStore};

use crate::auth::session::session_layer;
use crate::state::AppState;
use crate::{auth, events};

// Multipart framing and the text fields ride on top of the image itself.
const BODY_SLACK_BYTES: usize = 256 * 1024;

pub fn build_app(state: AppState) -> Router {
    build_app_with_sessions(state, MemoryStore::default())
}

pub fn build_app_with_sessions<S>(state: AppState, store: S) -> Router
where
    S: SessionStore + Clone,
{
    let sessions = session_layer(&state.config.session, store);
    let uploads = &state.config.uploads;
    let body_limit = uploads.max_bytes as usize + BODY_SLACK_BYTES;
    let static_images = ServeDir::new(&uploads.dir);
    let static_prefix = uploads.url_prefix.clone();

    Router::new()
        .merge(auth::router())
        .merge(events::router())
        .route("/health", get(|| async { "ok" }))
        .nest_service(&static_prefix, static_images)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
        .layer(sessions)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    async fn get_body(app: Router, uri: &str) -> (StatusCode, bytes::Bytes) {
        let res = app
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = res.status();
        (status, to_bytes(res.into_body(), usize::MAX).await.unwrap())
    }

    #[tokio::test]
    async fn calendar_serves_the_upcoming_list() {
        let app = build_app(AppState::fake());
        let home = get_body(app.clone(), "/events").await;
        let calendar = get_body(app, "/events/calendar").await;
        assert_eq!(home.0, StatusCode::OK);
        assert_eq!(home, calendar);
        assert_eq!(&calendar.1[..], b"[]");
    }

    #[tokio::test]
    async fn anonymous_admin_request_is_unauthorized() {
        let app = build_app(AppState::fake());
        let (status, _) = get_body(app, "/admin/events").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn routes_do_not_overlap() {
        // conflicting routes panic while the router is assembled
        let _ = build_app(AppState::fake());
    }
}
