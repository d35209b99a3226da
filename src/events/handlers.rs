use axum::{
    extract::{Multipart, Path, State},
    http::{header, HeaderName, StatusCode},
    routing::get,
    Json, Router,
};
use time::{
    format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime,
    PrimitiveDateTime,
};
use tracing::{instrument, warn};

use crate::{
    auth::{dto::MessageResponse, AuthUser},
    error::{ServiceError, ServiceResult},
    events::{
        dto::{EventDetail, EventInput, EventResponse, EventSnapshot, EventTemplate},
        services::{CREATION_SUCCESSFUL, DELETE_SUCCESSFUL, UPDATE_SUCCESSFUL},
    },
    images::ImageUpload,
    state::AppState,
};

// --- routers ---

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/events", get(list_upcoming))
        .route("/events/calendar", get(list_upcoming))
        .route("/events/active", get(list_active))
        .route("/events/:id", get(event_detail))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/events", get(list_mine).post(create_event))
        .route("/admin/events/new", get(new_event_template))
        .route(
            "/admin/events/:id",
            get(get_mine).put(update_event).delete(delete_event),
        )
}

// --- public handlers ---

/// Home page list and calendar view data.
#[instrument(skip(state))]
pub async fn list_upcoming(
    State(state): State<AppState>,
) -> ServiceResult<Json<Vec<EventSnapshot>>> {
    Ok(Json(state.events.list_upcoming().await?))
}

#[instrument(skip(state))]
pub async fn list_active(State(state): State<AppState>) -> ServiceResult<Json<Vec<EventSnapshot>>> {
    Ok(Json(state.events.list_active().await?))
}

#[instrument(skip(state))]
pub async fn event_detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ServiceResult<Json<EventDetail>> {
    let detail = state
        .events
        .detail(id, state.config.latest_events_count)
        .await?;
    Ok(Json(detail))
}

// --- admin handlers ---

#[instrument(skip(state, auth), fields(user_id = auth.user.id))]
pub async fn list_mine(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ServiceResult<Json<Vec<EventSnapshot>>> {
    Ok(Json(state.events.list_by_owner(auth.user.id).await?))
}

/// Edit form data; events owned by someone else look absent.
#[instrument(skip(state, auth), fields(user_id = auth.user.id))]
pub async fn get_mine(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> ServiceResult<Json<EventSnapshot>> {
    state
        .events
        .get_owned(id, auth.user.id)
        .await?
        .map(Json)
        .ok_or_else(|| ServiceError::NotFound("Event not found.".into()))
}

#[instrument(skip(auth), fields(user_id = auth.user.id))]
pub async fn new_event_template(auth: AuthUser) -> Json<EventTemplate> {
    Json(EventTemplate::for_owner(auth.user.id, OffsetDateTime::now_utc()))
}

/// POST /admin/events (multipart)
/// Fields: title, start, end, short_description, long_description, is_active, image
#[instrument(skip(state, auth, mp), fields(user_id = auth.user.id))]
pub async fn create_event(
    State(state): State<AppState>,
    auth: AuthUser,
    mp: Multipart,
) -> ServiceResult<(StatusCode, [(HeaderName, String); 1], Json<EventResponse>)> {
    let (input, image) = read_event_form(mp).await?.into_parts()?;
    let event = state
        .events
        .create(auth.user.id, &input, image.as_ref())
        .await?;

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/events/{}", event.id))],
        Json(EventResponse {
            message: CREATION_SUCCESSFUL,
            event,
        }),
    ))
}

#[instrument(skip(state, auth, mp), fields(user_id = auth.user.id))]
pub async fn update_event(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
    mp: Multipart,
) -> ServiceResult<Json<EventResponse>> {
    let (input, image) = read_event_form(mp).await?.into_parts()?;
    let event = state
        .events
        .update(auth.user.id, id, &input, image.as_ref())
        .await?;
    Ok(Json(EventResponse {
        message: UPDATE_SUCCESSFUL,
        event,
    }))
}

#[instrument(skip(state, auth), fields(user_id = auth.user.id))]
pub async fn delete_event(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> ServiceResult<Json<MessageResponse>> {
    state.events.delete(auth.user.id, id).await?;
    Ok(Json(MessageResponse {
        message: DELETE_SUCCESSFUL,
    }))
}

// --- form decoding ---

/// Raw multipart fields of the event form.
#[derive(Debug, Default)]
struct EventForm {
    title: Option<String>,
    start: Option<String>,
    end: Option<String>,
    short_description: Option<String>,
    long_description: Option<String>,
    is_active: Option<bool>,
    image: Option<ImageUpload>,
}

async fn read_event_form(mut mp: Multipart) -> ServiceResult<EventForm> {
    let mut form = EventForm::default();
    while let Some(field) = mp.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "image" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().map(str::to_string);
            let body = field.bytes().await.map_err(malformed)?;
            // browsers send an empty part when no file was chosen
            if file_name.is_empty() && body.is_empty() {
                continue;
            }
            form.image = Some(ImageUpload {
                file_name,
                content_type,
                body,
            });
            continue;
        }

        let value = field.text().await.map_err(malformed)?;
        match name.as_str() {
            "title" => form.title = Some(value),
            "start" | "start_at" => form.start = Some(value),
            "end" | "end_at" => form.end = Some(value),
            "short_description" => form.short_description = non_blank(value),
            "long_description" => form.long_description = non_blank(value),
            // checkbox plus hidden "false": any checked value wins
            "is_active" => {
                let checked = is_checked(&value);
                form.is_active = Some(form.is_active.unwrap_or(false) || checked);
            }
            other => warn!(field = %other, "ignoring unknown form field"),
        }
    }
    Ok(form)
}

impl EventForm {
    fn into_parts(self) -> ServiceResult<(EventInput, Option<ImageUpload>)> {
        let title = self
            .title
            .ok_or_else(|| ServiceError::validation("Title is required."))?;
        let start_at = required_datetime("Start date", self.start.as_deref())?;
        let end_at = required_datetime("End date", self.end.as_deref())?;
        let input = EventInput {
            title,
            start_at,
            end_at,
            short_description: self.short_description,
            long_description: self.long_description,
            is_active: self.is_active.unwrap_or(true),
        };
        Ok((input, self.image))
    }
}

fn required_datetime(label: &str, value: Option<&str>) -> ServiceResult<OffsetDateTime> {
    let value = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ServiceError::validation(format!("{label} is required.")))?;
    parse_form_datetime(value)
        .ok_or_else(|| ServiceError::validation(format!("{label} is not a valid date and time.")))
}

/// Accepts RFC 3339, or the zone-less `datetime-local` form which is read as UTC.
fn parse_form_datetime(value: &str) -> Option<OffsetDateTime> {
    if let Ok(dt) = OffsetDateTime::parse(value, &Rfc3339) {
        return Some(dt);
    }
    PrimitiveDateTime::parse(value, format_description!("[year]-[month]-[day]T[hour]:[minute]"))
        .or_else(|_| {
            PrimitiveDateTime::parse(
                value,
                format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
            )
        })
        .ok()
        .map(PrimitiveDateTime::assume_utc)
}

fn is_checked(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "on" | "1")
}

fn non_blank(value: String) -> Option<String> {
    (!value.trim().is_empty()).then_some(value)
}

fn malformed(e: axum::extract::multipart::MultipartError) -> ServiceError {
    warn!(error = %e, "malformed multipart body");
    ServiceError::validation("Malformed form data.")
}

#[cfg(test)]
mod event_form_tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::FromRequest;
    use axum::http::Request;
    use time::macros::datetime;

    const BOUNDARY: &str = "XBOUNDARYX";

    enum Part<'a> {
        Text(&'a str, &'a str),
        File(&'a str, &'a str, &'a [u8]),
    }

    async fn multipart(parts: &[Part<'_>]) -> Multipart {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                            .as_bytes(),
                    );
                }
                Part::File(name, file_name, bytes) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                             Content-Type: application/octet-stream\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(bytes);
                    body.extend_from_slice(b"\r\n");
                }
            }
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let req = Request::builder()
            .method("POST")
            .uri("/admin/events")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        Multipart::from_request(req, &()).await.unwrap()
    }

    #[test]
    fn parses_rfc3339_and_datetime_local() {
        assert_eq!(
            parse_form_datetime("2024-05-01T10:00:00+02:00"),
            Some(datetime!(2024-05-01 08:00 UTC))
        );
        assert_eq!(
            parse_form_datetime("2024-05-01T10:00"),
            Some(datetime!(2024-05-01 10:00 UTC))
        );
        assert_eq!(
            parse_form_datetime("2024-05-01T10:00:30"),
            Some(datetime!(2024-05-01 10:00:30 UTC))
        );
        assert_eq!(parse_form_datetime("tomorrow"), None);
    }

    #[tokio::test]
    async fn reads_full_form_with_image() {
        let mp = multipart(&[
            Part::Text("title", "Conf2024"),
            Part::Text("start", "2030-05-01T10:00"),
            Part::Text("end", "2030-05-01T12:00"),
            Part::Text("short_description", "short"),
            Part::Text("long_description", "  "),
            Part::Text("is_active", "true"),
            Part::Text("is_active", "false"),
            Part::File("image", "cover.png", b"\x89PNG"),
        ])
        .await;

        let (input, image) = read_event_form(mp).await.unwrap().into_parts().unwrap();
        assert_eq!(input.title, "Conf2024");
        assert_eq!(input.start_at, datetime!(2030-05-01 10:00 UTC));
        assert_eq!(input.short_description.as_deref(), Some("short"));
        assert_eq!(input.long_description, None);
        assert!(input.is_active);
        let image = image.unwrap();
        assert_eq!(image.file_name, "cover.png");
        assert_eq!(image.body.len(), 4);
    }

    #[tokio::test]
    async fn empty_file_part_means_no_upload() {
        let mp = multipart(&[
            Part::Text("title", "T"),
            Part::Text("start", "2030-05-01T10:00"),
            Part::Text("end", "2030-05-01T12:00"),
            Part::Text("is_active", "false"),
            Part::File("image", "", b""),
        ])
        .await;
        let (input, image) = read_event_form(mp).await.unwrap().into_parts().unwrap();
        assert!(image.is_none());
        assert!(!input.is_active);
    }

    #[tokio::test]
    async fn missing_dates_are_validation_errors() {
        let mp = multipart(&[Part::Text("title", "T"), Part::Text("end", "2030-05-01T12:00")]).await;
        let err = read_event_form(mp).await.unwrap().into_parts().unwrap_err();
        assert_eq!(err, ServiceError::validation("Start date is required."));

        let mp = multipart(&[
            Part::Text("title", "T"),
            Part::Text("start", "soon"),
            Part::Text("end", "2030-05-01T12:00"),
        ])
        .await;
        let err = read_event_form(mp).await.unwrap().into_parts().unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn detail_hides_missing_events() {
        let state = AppState::fake();
        let err = event_detail(State(state), Path(42)).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
