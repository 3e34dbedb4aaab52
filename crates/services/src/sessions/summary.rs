use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use quiz_core::model::SessionSummary;
use storage::repository::SessionSummaryRepository;

use super::state::SessionState;
use crate::error::{NotAnswerableError, SessionError};

/// Turns a finished session into its `SessionSummary` and stores it.
///
/// Both steps happen at most once per session: the built summary and its
/// storage id are kept on the `SessionState`.
#[derive(Clone)]
pub struct SummaryBuilder {
    summaries: Arc<dyn SessionSummaryRepository>,
}

impl SummaryBuilder {
    #[must_use]
    pub fn new(summaries: Arc<dyn SessionSummaryRepository>) -> Self {
        Self { summaries }
    }

    /// Build the summary for a finished session, or return the one already built.
    ///
    /// A `completed_at` earlier than the session start is clamped to the start.
    ///
    /// # Errors
    ///
    /// Returns `NotAnswerableError::NotAnswered` while questions remain.
    /// Returns `SessionError::Summary` if the answer log is inconsistent.
    pub fn build<'s>(
        &self,
        state: &'s mut SessionState,
        completed_at: DateTime<Utc>,
    ) -> Result<&'s SessionSummary, SessionError> {
        if !state.is_finished() {
            return Err(NotAnswerableError::NotAnswered.into());
        }
        let summary = match state.take_summary() {
            Some(summary) => summary,
            None => SessionSummary::from_records(
                state.topic().clone(),
                state.started_at(),
                completed_at.max(state.started_at()),
                state.questions().len(),
                state.records(),
            )?,
        };
        Ok(state.store_summary(summary))
    }

    /// Build (if needed) and persist the summary, returning it with its storage id.
    ///
    /// A summary that was already stored is not appended again.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the append fails; the built summary
    /// is kept so the call can be repeated.
    pub async fn complete(
        &self,
        state: &mut SessionState,
        completed_at: DateTime<Utc>,
    ) -> Result<(SessionSummary, i64), SessionError> {
        let summary = self.build(state, completed_at)?.clone();
        if let Some(id) = state.summary_id() {
            return Ok((summary, id));
        }

        let id = match self.summaries.append_summary(&summary).await {
            Ok(id) => id,
            Err(err) => {
                warn!(topic = %summary.topic(), error = %err, "failed to store session summary");
                return Err(err.into());
            }
        };
        state.set_summary_id(id);
        info!(
            topic = %summary.topic(),
            summary_id = id,
            correct = summary.correct(),
            incorrect = summary.incorrect(),
            time_spent_secs = summary.time_spent_secs(),
            "session summary stored"
        );
        Ok((summary, id))
    }
}
