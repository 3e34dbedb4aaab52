use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use quiz_core::model::{SessionSummary, TopicId};
use storage::repository::{SessionSummaryRepository, SessionSummaryRow};

use crate::Clock;
use crate::error::SessionError;

/// Storage identifier for a persisted session summary.
///
/// NOTE: This is currently `i64` to match `SQLite` row IDs.
pub type SessionSummaryId = i64;

/// Presentation-agnostic list item for a session summary.
///
/// No pre-formatted strings; the UI formats timestamps and durations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummaryListItem {
    pub id: SessionSummaryId,
    pub topic: TopicId,
    pub completed_at: DateTime<Utc>,

    pub correct: u32,
    pub incorrect: u32,
    pub questions: u32,
    pub time_spent_secs: u64,
}

impl SessionSummaryListItem {
    #[must_use]
    pub fn from_summary(id: SessionSummaryId, summary: &SessionSummary) -> Self {
        Self {
            id,
            topic: summary.topic().clone(),
            completed_at: summary.completed_at(),
            correct: summary.correct(),
            incorrect: summary.incorrect(),
            questions: summary.question_count(),
            time_spent_secs: summary.time_spent_secs(),
        }
    }

    #[must_use]
    pub fn from_row(row: &SessionSummaryRow) -> Self {
        Self::from_summary(row.id, &row.summary)
    }
}

/// Read side of the result store: past sessions per topic.
#[derive(Clone)]
pub struct SessionSummaryService {
    clock: Clock,
    summaries: Arc<dyn SessionSummaryRepository>,
}

impl SessionSummaryService {
    #[must_use]
    pub fn new(clock: Clock, summaries: Arc<dyn SessionSummaryRepository>) -> Self {
        Self { clock, summaries }
    }

    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::new(
            clock,
            Arc::new(storage::repository::InMemoryRepository::new()),
        )
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Summaries for a topic completed within the last `days` days, newest first.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on repository failures.
    pub async fn list_recent_summaries(
        &self,
        topic: &TopicId,
        days: i64,
        limit: u32,
    ) -> Result<Vec<SessionSummaryListItem>, SessionError> {
        let now = self.clock.now();
        // Out-of-range windows reach back to the first stored summary.
        let since = Duration::try_days(days.max(0)).and_then(|d| now.checked_sub_signed(d));
        let rows = self
            .summaries
            .list_summary_rows(topic, since, Some(now), limit)
            .await?;
        Ok(rows.iter().map(SessionSummaryListItem::from_row).collect())
    }

    /// All stored summaries for a topic, newest first.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on repository failures.
    pub async fn list_summaries(
        &self,
        topic: &TopicId,
        limit: u32,
    ) -> Result<Vec<SessionSummaryListItem>, SessionError> {
        let rows = self
            .summaries
            .list_summary_rows(topic, None, None, limit)
            .await?;
        Ok(rows.iter().map(SessionSummaryListItem::from_row).collect())
    }

    /// Fetch a session summary by ID.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` when repository access fails.
    pub async fn get_summary(&self, id: SessionSummaryId) -> Result<SessionSummary, SessionError> {
        Ok(self.summaries.get_summary(id).await?)
    }
}
