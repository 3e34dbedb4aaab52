use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{SessionSummary, TopicId, User, UserId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── SESSION SUMMARIES ─────────────────────────────────────────────────────────
//

/// A persisted summary together with its storage id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummaryRow {
    pub id: i64,
    pub summary: SessionSummary,
}

impl SessionSummaryRow {
    #[must_use]
    pub fn new(id: i64, summary: SessionSummary) -> Self {
        Self { id, summary }
    }
}

/// Append-only store for finished session summaries, keyed by topic.
#[async_trait]
pub trait SessionSummaryRepository: Send + Sync {
    /// Append a summary and return its storage id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the summary cannot be stored.
    async fn append_summary(&self, summary: &SessionSummary) -> Result<i64, StorageError>;

    /// Fetch a summary by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_summary(&self, id: i64) -> Result<SessionSummary, StorageError>;

    /// List summaries for a topic, newest first, optionally bounded by completion time.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query or mapping failures.
    async fn list_summary_rows(
        &self,
        topic: &TopicId,
        completed_from: Option<DateTime<Utc>>,
        completed_until: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<SessionSummaryRow>, StorageError>;
}

//
// ─── USERS ─────────────────────────────────────────────────────────────────────
//

/// Persisted shape of a user, including the password digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub user: User,
    pub password_digest: String,
}

/// Data needed to insert a user; the id is assigned by the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUserRecord {
    pub name: String,
    pub email: String,
    pub password_digest: String,
    pub created_at: DateTime<Utc>,
}

/// Registered users plus the "currently signed in" marker.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the e-mail is already registered.
    async fn insert_user(&self, record: NewUserRecord) -> Result<User, StorageError>;

    /// Look up a user (with digest) by e-mail.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures; a missing user is `Ok(None)`.
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StorageError>;

    /// Record which user is signed in, or clear it with `None`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user id is unknown.
    async fn set_current_user(&self, id: Option<UserId>) -> Result<(), StorageError>;

    /// The signed-in user, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn current_user(&self) -> Result<Option<User>, StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

#[derive(Default)]
struct UserTable {
    next_id: u64,
    by_email: HashMap<String, UserRecord>,
    current: Option<UserId>,
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    summaries: Arc<Mutex<Vec<SessionSummary>>>,
    users: Arc<Mutex<UserTable>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl SessionSummaryRepository for InMemoryRepository {
    async fn append_summary(&self, summary: &SessionSummary) -> Result<i64, StorageError> {
        let mut guard = self.summaries.lock().map_err(poisoned)?;
        guard.push(summary.clone());
        i64::try_from(guard.len()).map_err(|_| StorageError::Serialization("id overflow".into()))
    }

    async fn get_summary(&self, id: i64) -> Result<SessionSummary, StorageError> {
        let guard = self.summaries.lock().map_err(poisoned)?;
        usize::try_from(id)
            .ok()
            .and_then(|id| id.checked_sub(1))
            .and_then(|idx| guard.get(idx))
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list_summary_rows(
        &self,
        topic: &TopicId,
        completed_from: Option<DateTime<Utc>>,
        completed_until: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<SessionSummaryRow>, StorageError> {
        let guard = self.summaries.lock().map_err(poisoned)?;
        let mut rows: Vec<SessionSummaryRow> = guard
            .iter()
            .enumerate()
            .filter(|(_, s)| s.topic() == topic)
            .filter(|(_, s)| completed_from.is_none_or(|from| s.completed_at() >= from))
            .filter(|(_, s)| completed_until.is_none_or(|until| s.completed_at() <= until))
            .map(|(idx, s)| {
                let id = i64::try_from(idx + 1).unwrap_or(i64::MAX);
                SessionSummaryRow::new(id, s.clone())
            })
            .collect();
        rows.sort_by(|a, b| {
            b.summary
                .completed_at()
                .cmp(&a.summary.completed_at())
                .then(b.id.cmp(&a.id))
        });
        rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(rows)
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn insert_user(&self, record: NewUserRecord) -> Result<User, StorageError> {
        let mut guard = self.users.lock().map_err(poisoned)?;
        if guard.by_email.contains_key(&record.email) {
            return Err(StorageError::Conflict);
        }
        guard.next_id += 1;
        let user = User {
            id: UserId::new(guard.next_id),
            name: record.name,
            email: record.email.clone(),
            created_at: record.created_at,
        };
        guard.by_email.insert(
            record.email,
            UserRecord {
                user: user.clone(),
                password_digest: record.password_digest,
            },
        );
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StorageError> {
        let guard = self.users.lock().map_err(poisoned)?;
        Ok(guard.by_email.get(email).cloned())
    }

    async fn set_current_user(&self, id: Option<UserId>) -> Result<(), StorageError> {
        let mut guard = self.users.lock().map_err(poisoned)?;
        if let Some(id) = id {
            if !guard.by_email.values().any(|r| r.user.id == id) {
                return Err(StorageError::NotFound);
            }
        }
        guard.current = id;
        Ok(())
    }

    async fn current_user(&self) -> Result<Option<User>, StorageError> {
        let guard = self.users.lock().map_err(poisoned)?;
        let Some(id) = guard.current else {
            return Ok(None);
        };
        Ok(guard
            .by_email
            .values()
            .find(|r| r.user.id == id)
            .map(|r| r.user.clone()))
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub session_summaries: Arc<dyn SessionSummaryRepository>,
    pub users: Arc<dyn UserRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let session_summaries: Arc<dyn SessionSummaryRepository> = Arc::new(repo.clone());
        let users: Arc<dyn UserRepository> = Arc::new(repo);
        Self {
            session_summaries,
            users,
        }
    }
}
