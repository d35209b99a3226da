use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{info, warn};

use crate::db::RepoError;
use crate::error::{ServiceError, ServiceResult};
use crate::events::dto::{EventDetail, EventInput, EventSnapshot};
use crate::events::repo::EventRepo;
use crate::events::repo_types::{Event, NewEvent};
use crate::images::{ImageAssets, ImageUpload};
use crate::validation::{self, SHORT_DESCRIPTION_MAX_LEN, TITLE_MAX_LEN};

pub const CREATION_SUCCESSFUL: &str = "Event created successfully.";
pub const UPDATE_SUCCESSFUL: &str = "Event updated successfully.";
pub const DELETE_SUCCESSFUL: &str = "Event deleted successfully.";

const INVALID_DATE_RANGE: &str = "End date must be after the start date.";
const TITLE_TAKEN: &str = "This title is already in use.";
const EVENT_NOT_FOUND: &str = "Event not found.";
const IMAGE_UPLOAD_ERROR: &str = "An error occurred while uploading the image.";

const CREATION_ERROR: &str = "An error occurred while creating the event: ";
const UPDATE_ERROR: &str = "An error occurred during update: ";
const DELETE_ERROR: &str = "An error occurred during deletion: ";
const LOOKUP_ERROR: &str = "event lookup failed: ";

/// Event lifecycle and queries, including the images events refer to.
#[derive(Clone)]
pub struct EventCatalog {
    repo: Arc<dyn EventRepo>,
    assets: ImageAssets,
}

impl EventCatalog {
    pub fn new(repo: Arc<dyn EventRepo>, assets: ImageAssets) -> Self {
        Self { repo, assets }
    }

    pub async fn create(
        &self,
        owner_id: i64,
        input: &EventInput,
        image: Option<&ImageUpload>,
    ) -> ServiceResult<EventSnapshot> {
        let title = validate_input(input)?;
        if self
            .title_exists(&title, None)
            .await
            .map_err(|e| ServiceError::internal(CREATION_ERROR, e))?
        {
            warn!(title = %title, "event title already in use");
            return Err(ServiceError::Conflict(TITLE_TAKEN.into()));
        }

        let image_ref = match image {
            Some(upload) => Some(self.store_image(upload).await?),
            None => None,
        };

        let new_event = NewEvent {
            title,
            start_at: input.start_at,
            end_at: input.end_at,
            image: image_ref.clone(),
            short_description: input.short_description.clone(),
            long_description: input.long_description.clone(),
            is_active: input.is_active,
            user_id: owner_id,
            created_at: OffsetDateTime::now_utc(),
        };
        let event = match self.repo.insert(&new_event).await {
            Ok(event) => event,
            Err(e) => {
                if let Some(reference) = &image_ref {
                    self.assets.delete(reference).await;
                }
                return Err(map_write_error(e, CREATION_ERROR));
            }
        };

        info!(event_id = event.id, user_id = owner_id, title = %event.title, "event created");
        Ok(event.into())
    }

    /// Replaces the event's fields. A new image is stored before the old one
    /// is removed, and the old one only goes once the record is saved.
    pub async fn update(
        &self,
        actor_id: i64,
        event_id: i64,
        input: &EventInput,
        image: Option<&ImageUpload>,
    ) -> ServiceResult<EventSnapshot> {
        let mut event = self.require_owned(event_id, actor_id, UPDATE_ERROR).await?;

        let title = validate_input(input)?;
        if title != event.title
            && self
                .title_exists(&title, Some(event_id))
                .await
                .map_err(|e| ServiceError::internal(UPDATE_ERROR, e))?
        {
            warn!(event_id, title = %title, "event title already in use");
            return Err(ServiceError::Conflict(TITLE_TAKEN.into()));
        }

        let new_image = match image {
            Some(upload) => Some(self.store_image(upload).await?),
            None => None,
        };
        let old_image = match &new_image {
            Some(reference) => event.image.replace(reference.clone()),
            None => None,
        };

        event.title = title;
        event.start_at = input.start_at;
        event.end_at = input.end_at;
        event.short_description = input.short_description.clone();
        event.long_description = input.long_description.clone();
        event.is_active = input.is_active;

        if let Err(e) = self.repo.update(&event).await {
            if let Some(reference) = &new_image {
                self.assets.delete(reference).await;
            }
            return Err(map_write_error(e, UPDATE_ERROR));
        }

        if let Some(old) = old_image.filter(|old| !old.is_empty()) {
            self.assets.delete(&old).await;
        }

        info!(event_id, user_id = actor_id, "event updated");
        Ok(event.into())
    }

    /// Removes the record, then its image. A leftover image file never fails
    /// the deletion.
    pub async fn delete(&self, actor_id: i64, event_id: i64) -> ServiceResult<()> {
        let event = self.require_owned(event_id, actor_id, DELETE_ERROR).await?;

        let removed = self
            .repo
            .delete(event_id)
            .await
            .map_err(|e| ServiceError::internal(DELETE_ERROR, e))?;
        if !removed {
            return Err(ServiceError::NotFound(EVENT_NOT_FOUND.into()));
        }

        if let Some(image) = event.image.filter(|i| !i.is_empty()) {
            self.assets.delete(&image).await;
        }

        info!(event_id, user_id = actor_id, "event deleted");
        Ok(())
    }

    pub async fn get_by_id(&self, id: i64) -> ServiceResult<Option<EventSnapshot>> {
        let event = self
            .repo
            .find_by_id(id)
            .await
            .map_err(|e| ServiceError::internal(LOOKUP_ERROR, e))?;
        Ok(event.map(EventSnapshot::from))
    }

    /// The event, but only when `user_id` owns it.
    pub async fn get_owned(&self, id: i64, user_id: i64) -> ServiceResult<Option<EventSnapshot>> {
        Ok(self
            .get_by_id(id)
            .await?
            .filter(|event| event.user_id == user_id))
    }

    /// Public detail view: inactive events are treated as absent.
    pub async fn detail(&self, id: i64, latest_count: i64) -> ServiceResult<EventDetail> {
        let event = self
            .get_by_id(id)
            .await?
            .filter(|event| event.is_active)
            .ok_or_else(|| ServiceError::NotFound(EVENT_NOT_FOUND.into()))?;
        let latest = self.list_latest(latest_count).await?;
        Ok(EventDetail { event, latest })
    }

    pub async fn list_all(&self) -> ServiceResult<Vec<EventSnapshot>> {
        snapshots(self.repo.list_all().await)
    }

    pub async fn list_active(&self) -> ServiceResult<Vec<EventSnapshot>> {
        snapshots(self.repo.list_active().await)
    }

    pub async fn list_upcoming(&self) -> ServiceResult<Vec<EventSnapshot>> {
        snapshots(self.repo.list_upcoming(OffsetDateTime::now_utc()).await)
    }

    pub async fn list_by_owner(&self, user_id: i64) -> ServiceResult<Vec<EventSnapshot>> {
        snapshots(self.repo.list_by_owner(user_id).await)
    }

    pub async fn list_latest(&self, count: i64) -> ServiceResult<Vec<EventSnapshot>> {
        if count <= 0 {
            return Ok(Vec::new());
        }
        snapshots(
            self.repo
                .list_latest_upcoming(OffsetDateTime::now_utc(), count)
                .await,
        )
    }

    pub async fn title_exists(&self, title: &str, exclude_id: Option<i64>) -> Result<bool, RepoError> {
        self.repo.title_exists(title.trim(), exclude_id).await
    }

    async fn require_owned(&self, event_id: i64, actor_id: i64, context: &str) -> ServiceResult<Event> {
        let event = self
            .repo
            .find_by_id(event_id)
            .await
            .map_err(|e| ServiceError::internal(context, e))?;
        match event {
            Some(event) if event.user_id == actor_id => Ok(event),
            Some(_) => {
                warn!(event_id, user_id = actor_id, "event not owned by actor");
                Err(ServiceError::NotFound(EVENT_NOT_FOUND.into()))
            }
            None => Err(ServiceError::NotFound(EVENT_NOT_FOUND.into())),
        }
    }

    async fn store_image(&self, upload: &ImageUpload) -> ServiceResult<String> {
        self.assets.store(upload).await.map_err(|e| {
            warn!(error = %e, file = %upload.file_name, "event image rejected");
            ServiceError::Asset(IMAGE_UPLOAD_ERROR.into())
        })
    }
}

/// Checks the business rules on the input and returns the trimmed title.
fn validate_input(input: &EventInput) -> ServiceResult<String> {
    if !validation::is_date_range_valid(input.start_at, input.end_at) {
        return Err(ServiceError::validation(INVALID_DATE_RANGE));
    }
    let title = input.title.trim();
    validation::require_text("Title", title, TITLE_MAX_LEN)?;
    validation::limit_text(
        "Short description",
        input.short_description.as_deref(),
        SHORT_DESCRIPTION_MAX_LEN,
    )?;
    Ok(title.to_string())
}

fn snapshots(rows: Result<Vec<Event>, RepoError>) -> ServiceResult<Vec<EventSnapshot>> {
    rows.map(|rows| rows.into_iter().map(EventSnapshot::from).collect())
        .map_err(|e| ServiceError::internal("event listing failed: ", e))
}

fn map_write_error(err: RepoError, context: &str) -> ServiceError {
    match err {
        RepoError::UniqueViolation(_) => ServiceError::Conflict(TITLE_TAKEN.into()),
        other => ServiceError::internal(context, other),
    }
}
