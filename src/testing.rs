//! In-memory doubles shared by the unit tests.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use time::OffsetDateTime;
use tower_sessions::session::{Id, Record};
use tower_sessions::{session_store, MemoryStore, SessionStore};

use crate::auth::repo::UserRepo;
use crate::auth::repo_types::{NewUser, User};
use crate::config::UploadConfig;
use crate::db::{RepoError, EVENTS_TITLE_CONSTRAINT, USERS_EMAIL_CONSTRAINT};
use crate::events::repo::EventRepo;
use crate::events::repo_types::{Event, NewEvent};
use crate::images::ImageUpload;
use crate::storage::StorageClient;

pub fn test_upload_config(dir: impl AsRef<Path>) -> UploadConfig {
    UploadConfig {
        dir: dir.as_ref().to_path_buf(),
        url_prefix: "/uploads/events".into(),
        max_bytes: crate::validation::MAX_IMAGE_BYTES,
    }
}

pub fn upload(file_name: &str, len: usize) -> ImageUpload {
    ImageUpload {
        file_name: file_name.into(),
        content_type: None,
        body: Bytes::from(vec![7u8; len]),
    }
}

fn store_unavailable() -> RepoError {
    RepoError::Database(sqlx::Error::PoolTimedOut)
}

// --- blob storage ---

#[derive(Clone, Default)]
pub struct MemoryStorage {
    objects: Arc<Mutex<BTreeMap<String, Bytes>>>,
    failing: bool,
}

impl MemoryStorage {
    /// Every write and delete fails.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn clear(&self) {
        self.objects.lock().unwrap().clear();
    }
}

#[async_trait]
impl StorageClient for MemoryStorage {
    async fn put_object(&self, key: &str, body: Bytes) -> anyhow::Result<()> {
        anyhow::ensure!(!self.failing, "storage offline");
        self.objects.lock().unwrap().insert(key.to_string(), body);
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        anyhow::ensure!(!self.failing, "storage offline");
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
}

// --- sessions ---

/// Memory-backed session store that counts how many records were written.
#[derive(Clone, Debug, Default)]
pub struct CountingSessionStore {
    inner: MemoryStore,
    writes: Arc<AtomicUsize>,
}

impl CountingSessionStore {
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionStore for CountingSessionStore {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.create(record).await
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.save(record).await
    }

    async fn load(&self, id: &Id) -> session_store::Result<Option<Record>> {
        self.inner.load(id).await
    }

    async fn delete(&self, id: &Id) -> session_store::Result<()> {
        self.inner.delete(id).await
    }
}

// --- users ---

#[derive(Clone, Default)]
pub struct MemoryUserRepo {
    users: Arc<Mutex<Vec<User>>>,
    blind: bool,
}

impl MemoryUserRepo {
    /// `email_exists` always answers false, as if a concurrent writer got in
    /// between the check and the insert. The unique index still holds.
    pub fn blind() -> Self {
        Self {
            blind: true,
            ..Self::default()
        }
    }

    pub fn overwrite_password(&self, id: i64, stored: &str) {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.iter_mut().find(|u| u.id == id) {
            user.password = stored.to_string();
        }
    }
}

#[async_trait]
impl UserRepo for MemoryUserRepo {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepoError> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn email_exists(&self, email: &str, exclude_id: Option<i64>) -> Result<bool, RepoError> {
        if self.blind {
            return Ok(false);
        }
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .any(|u| u.email == email && Some(u.id) != exclude_id))
    }

    async fn insert(&self, user: &NewUser) -> Result<User, RepoError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == user.email) {
            return Err(RepoError::UniqueViolation(USERS_EMAIL_CONSTRAINT.into()));
        }
        let created = User {
            id: users.len() as i64 + 1,
            email: user.email.clone(),
            password: user.password.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            birth_date: user.birth_date,
            created_at: user.created_at,
        };
        users.push(created.clone());
        Ok(created)
    }

    async fn update(&self, user: &User) -> Result<(), RepoError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == user.email && u.id != user.id) {
            return Err(RepoError::UniqueViolation(USERS_EMAIL_CONSTRAINT.into()));
        }
        if let Some(existing) = users.iter_mut().find(|u| u.id == user.id) {
            existing.email = user.email.clone();
            existing.first_name = user.first_name.clone();
            existing.last_name = user.last_name.clone();
            existing.birth_date = user.birth_date;
        }
        Ok(())
    }
}

// --- events ---

#[derive(Clone, Default)]
pub struct MemoryEventRepo {
    events: Arc<Mutex<Vec<Event>>>,
    next_id: Arc<Mutex<i64>>,
    fail_writes: Arc<AtomicBool>,
    blind: bool,
}

impl MemoryEventRepo {
    /// `title_exists` always answers false; the unique index still holds.
    pub fn blind() -> Self {
        Self {
            blind: true,
            ..Self::default()
        }
    }

    /// Makes inserts, updates and deletes fail with a database error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_image(&self, id: i64, reference: &str) {
        let mut events = self.events.lock().unwrap();
        if let Some(event) = events.iter_mut().find(|e| e.id == id) {
            event.image = Some(reference.to_string());
        }
    }

    fn check_writable(&self) -> Result<(), RepoError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(store_unavailable());
        }
        Ok(())
    }

    fn select(
        &self,
        keep: impl Fn(&Event) -> bool,
        newest_first: bool,
    ) -> Vec<Event> {
        let mut rows: Vec<Event> = self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| keep(e))
            .cloned()
            .collect();
        rows.sort_by_key(|e| (e.created_at, e.id));
        if newest_first {
            rows.reverse();
        }
        rows
    }
}

fn is_upcoming(event: &Event, now: OffsetDateTime) -> bool {
    event.is_active && event.start_at > now
}

#[async_trait]
impl EventRepo for MemoryEventRepo {
    async fn find_by_id(&self, id: i64) -> Result<Option<Event>, RepoError> {
        Ok(self.events.lock().unwrap().iter().find(|e| e.id == id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Event>, RepoError> {
        let mut rows = self.events.lock().unwrap().clone();
        rows.sort_by_key(|e| e.id);
        Ok(rows)
    }

    async fn list_active(&self) -> Result<Vec<Event>, RepoError> {
        Ok(self.select(|e| e.is_active, false))
    }

    async fn list_upcoming(&self, now: OffsetDateTime) -> Result<Vec<Event>, RepoError> {
        Ok(self.select(|e| is_upcoming(e, now), false))
    }

    async fn list_by_owner(&self, user_id: i64) -> Result<Vec<Event>, RepoError> {
        Ok(self.select(|e| e.user_id == user_id, true))
    }

    async fn list_latest_upcoming(
        &self,
        now: OffsetDateTime,
        limit: i64,
    ) -> Result<Vec<Event>, RepoError> {
        let mut rows = self.select(|e| is_upcoming(e, now), true);
        rows.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(rows)
    }

    async fn title_exists(&self, title: &str, exclude_id: Option<i64>) -> Result<bool, RepoError> {
        if self.blind {
            return Ok(false);
        }
        Ok(self
            .events
            .lock()
            .unwrap()
            .iter()
            .any(|e| e.title == title && Some(e.id) != exclude_id))
    }

    async fn insert(&self, event: &NewEvent) -> Result<Event, RepoError> {
        self.check_writable()?;
        let mut events = self.events.lock().unwrap();
        if events.iter().any(|e| e.title == event.title) {
            return Err(RepoError::UniqueViolation(EVENTS_TITLE_CONSTRAINT.into()));
        }
        let mut next_id = self.next_id.lock().unwrap();
        *next_id += 1;
        let created = Event {
            id: *next_id,
            title: event.title.clone(),
            start_at: event.start_at,
            end_at: event.end_at,
            image: event.image.clone(),
            short_description: event.short_description.clone(),
            long_description: event.long_description.clone(),
            is_active: event.is_active,
            user_id: event.user_id,
            created_at: event.created_at,
        };
        events.push(created.clone());
        Ok(created)
    }

    async fn update(&self, event: &Event) -> Result<(), RepoError> {
        self.check_writable()?;
        let mut events = self.events.lock().unwrap();
        if events.iter().any(|e| e.title == event.title && e.id != event.id) {
            return Err(RepoError::UniqueViolation(EVENTS_TITLE_CONSTRAINT.into()));
        }
        if let Some(existing) = events.iter_mut().find(|e| e.id == event.id) {
            let created_at = existing.created_at;
            let user_id = existing.user_id;
            *existing = Event {
                created_at,
                user_id,
                ..event.clone()
            };
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<bool, RepoError> {
        self.check_writable()?;
        let mut events = self.events.lock().unwrap();
        let before = events.len();
        events.retain(|e| e.id != id);
        Ok(events.len() < before)
    }
}
