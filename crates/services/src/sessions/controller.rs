use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use quiz_core::model::{AnswerRecord, Question, SessionSummary, TopicId};
use storage::repository::SessionSummaryRepository;

use super::progress::{ElapsedTime, SessionProgress};
use super::state::SessionState;
use super::summary::SummaryBuilder;
use crate::Clock;
use crate::error::{NotAnswerableError, SessionError, SupplyError};
use crate::supplier::QuestionSupplier;

//
// ─── RESULTS ───────────────────────────────────────────────────────────────────
//

/// What the presentation layer should show for a session right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Current<'s> {
    Question(&'s Question),
    Complete(&'s SessionSummary),
}

/// Outcome of a successful submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionAnswer {
    pub record: AnswerRecord,
    /// Supplier-provided explanation; may be empty.
    pub explanation: String,
}

/// Outcome of `SessionController::advance`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// The next question is now active.
    Next,
    /// The last question was passed; the summary is built and stored.
    Completed {
        summary: SessionSummary,
        summary_id: i64,
    },
}

//
// ─── CONTROLLER ────────────────────────────────────────────────────────────────
//

/// Drives quiz sessions: start, select, submit, advance.
///
/// Holds no per-session data; each operation takes the `SessionState` it acts on.
#[derive(Clone)]
pub struct SessionController {
    clock: Clock,
    supplier: Arc<dyn QuestionSupplier>,
    builder: SummaryBuilder,
}

impl SessionController {
    #[must_use]
    pub fn new(
        clock: Clock,
        supplier: Arc<dyn QuestionSupplier>,
        summaries: Arc<dyn SessionSummaryRepository>,
    ) -> Self {
        Self {
            clock,
            supplier,
            builder: SummaryBuilder::new(summaries),
        }
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Mutable access to the clock, for stepping a fixed clock in tests.
    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }

    /// Fetch the question set for `topic` and open a session on it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Supply` if the topic is blank, the fetch fails or
    /// the set is empty. No session exists in that case.
    pub async fn start(&self, topic: &str) -> Result<SessionState, SessionError> {
        let topic = TopicId::new(topic).map_err(|_| SupplyError::EmptyTopic)?;
        let questions = match self.supplier.fetch_questions(&topic).await {
            Ok(questions) => questions,
            Err(err) => {
                warn!(topic = %topic, error = %err, "question set unavailable");
                return Err(err.into());
            }
        };

        let state = SessionState::new(topic, questions, self.clock.now())?;
        info!(
            session = %state.id(),
            topic = %state.topic(),
            questions = state.questions().len(),
            "session started"
        );
        Ok(state)
    }

    /// The active question, or the summary once every question was passed.
    ///
    /// Builds the summary here if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Summary` if the summary cannot be built.
    pub fn present_current<'s>(
        &self,
        state: &'s mut SessionState,
    ) -> Result<Current<'s>, SessionError> {
        if state.is_finished() {
            let summary = self.builder.build(state, self.clock.now())?;
            return Ok(Current::Complete(summary));
        }
        state
            .current_question()
            .map(Current::Question)
            .ok_or_else(|| NotAnswerableError::NoActiveQuestion.into())
    }

    /// Choose option `index` for the active question, replacing any earlier choice.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotAnswerable` after the question was answered,
    /// when no question is active, or for an index outside the options.
    pub fn select(&self, state: &mut SessionState, index: usize) -> Result<(), SessionError> {
        state.select(index)?;
        debug!(session = %state.id(), question = state.current_index(), option = index, "option selected");
        Ok(())
    }

    /// Send the selected option to the supplier and record its verdict.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotAnswerable` without a selection or when the
    /// question was already answered. Returns `SessionError::Submit` if the
    /// supplier call fails; the selection is kept for a retry.
    pub async fn submit(&self, state: &mut SessionState) -> Result<SessionAnswer, SessionError> {
        let submission = state.pending_submission(self.clock.now())?;
        let verdict = match self.supplier.submit_answer(state.topic(), &submission).await {
            Ok(verdict) => verdict,
            Err(err) => {
                warn!(
                    session = %state.id(),
                    question = %submission.question_id,
                    error = %err,
                    "answer submission failed"
                );
                return Err(err.into());
            }
        };

        let record = state.record_verdict(&submission, &verdict)?;
        debug!(
            session = %state.id(),
            question = %record.question_id(),
            correct = record.is_correct(),
            elapsed_secs = record.elapsed_secs(),
            "answer recorded"
        );
        Ok(SessionAnswer {
            record,
            explanation: verdict.explanation,
        })
    }

    /// Move past the answered question. Passing the last one builds and stores the summary.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotAnswerable` if the active question is not answered.
    /// Returns `SessionError::Storage` if storing the summary fails; the session
    /// is finished regardless and `finalize_summary` retries the store.
    pub async fn advance(&self, state: &mut SessionState) -> Result<Advance, SessionError> {
        let now = self.clock.now();
        state.advance(now)?;
        if !state.is_finished() {
            debug!(session = %state.id(), question = state.current_index(), "advanced");
            return Ok(Advance::Next);
        }

        let (summary, summary_id) = self.builder.complete(state, now).await?;
        info!(
            session = %state.id(),
            correct = summary.correct(),
            questions = summary.question_count(),
            "session finished"
        );
        Ok(Advance::Completed {
            summary,
            summary_id,
        })
    }

    /// Store the summary of a finished session whose earlier store failed.
    ///
    /// Never rebuilds the summary and never appends it twice.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotAnswerable` while questions remain and
    /// `SessionError::Storage` if the store fails again.
    pub async fn finalize_summary(&self, state: &mut SessionState) -> Result<i64, SessionError> {
        let (_, id) = self.builder.complete(state, self.clock.now()).await?;
        Ok(id)
    }

    #[must_use]
    pub fn elapsed(&self, state: &SessionState) -> ElapsedTime {
        state.elapsed(self.clock.now())
    }

    #[must_use]
    pub fn progress(&self, state: &SessionState) -> SessionProgress {
        state.progress()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration;
    use quiz_core::model::{AnswerSubmission, QuestionId, Verdict};
    use quiz_core::time::fixed_clock;
    use reqwest::StatusCode;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use storage::repository::{InMemoryRepository, SessionSummaryRow, StorageError};

    use crate::error::{Recovery, SubmitError};
    use crate::sessions::QuestionPhase;

    struct ScriptedSupplier {
        questions: Result<Vec<Question>, SupplyError>,
        verdicts: Mutex<VecDeque<Result<Verdict, SubmitError>>>,
        submissions: Mutex<Vec<AnswerSubmission>>,
    }

    impl ScriptedSupplier {
        fn new(questions: Vec<Question>, verdicts: Vec<Result<Verdict, SubmitError>>) -> Self {
            Self {
                questions: Ok(questions),
                verdicts: Mutex::new(verdicts.into()),
                submissions: Mutex::new(Vec::new()),
            }
        }

        fn failing(err: SupplyError) -> Self {
            Self {
                questions: Err(err),
                verdicts: Mutex::new(VecDeque::new()),
                submissions: Mutex::new(Vec::new()),
            }
        }

        fn submissions(&self) -> Vec<AnswerSubmission> {
            self.submissions.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl QuestionSupplier for ScriptedSupplier {
        async fn fetch_questions(&self, _topic: &TopicId) -> Result<Vec<Question>, SupplyError> {
            self.questions.clone()
        }

        async fn submit_answer(
            &self,
            _topic: &TopicId,
            submission: &AnswerSubmission,
        ) -> Result<Verdict, SubmitError> {
            self.submissions.lock().unwrap().push(*submission);
            self.verdicts
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Verdict::new(false, "")))
        }
    }

    /// Summary store whose first `failures` appends fail.
    struct FlakySummaries {
        inner: InMemoryRepository,
        failures: AtomicUsize,
        appends: AtomicUsize,
    }

    #[async_trait]
    impl SessionSummaryRepository for FlakySummaries {
        async fn append_summary(&self, summary: &SessionSummary) -> Result<i64, StorageError> {
            self.appends.fetch_add(1, Ordering::SeqCst);
            if self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(StorageError::Connection("database is locked".into()));
            }
            self.inner.append_summary(summary).await
        }

        async fn get_summary(&self, id: i64) -> Result<SessionSummary, StorageError> {
            self.inner.get_summary(id).await
        }

        async fn list_summary_rows(
            &self,
            topic: &TopicId,
            completed_from: Option<DateTime<Utc>>,
            completed_until: Option<DateTime<Utc>>,
            limit: u32,
        ) -> Result<Vec<SessionSummaryRow>, StorageError> {
            self.inner
                .list_summary_rows(topic, completed_from, completed_until, limit)
                .await
        }
    }

    fn question(id: u64, options: &[&str]) -> Question {
        Question::new(
            QuestionId::new(id),
            Some(format!("Questão {id}")),
            None,
            format!("Enunciado {id}"),
            options.iter().map(|o| (*o).to_owned()).collect(),
        )
        .unwrap()
    }

    fn fractions() -> Vec<Question> {
        vec![
            question(1, &["1/3", "1/2", "2/3"]),
            question(2, &["3/4", "4/3"]),
        ]
    }

    fn build_controller(supplier: Arc<ScriptedSupplier>) -> (SessionController, InMemoryRepository) {
        let repo = InMemoryRepository::new();
        let controller = SessionController::new(fixed_clock(), supplier, Arc::new(repo.clone()));
        (controller, repo)
    }

    #[tokio::test]
    async fn fractions_session_scores_one_of_two() {
        let supplier = Arc::new(ScriptedSupplier::new(
            fractions(),
            vec![
                Ok(Verdict::new(true, "Metade de um inteiro.")),
                Ok(Verdict::new(false, "")),
            ],
        ));
        let (mut controller, repo) = build_controller(supplier.clone());

        let mut state = controller.start("frações").await.unwrap();
        assert!(matches!(
            controller.present_current(&mut state).unwrap(),
            Current::Question(q) if q.id() == QuestionId::new(1)
        ));

        controller.select(&mut state, 1).unwrap();
        controller.clock_mut().advance(Duration::seconds(4));
        let first = controller.submit(&mut state).await.unwrap();
        assert!(first.record.is_correct());
        assert_eq!(first.record.elapsed_secs(), 4);
        assert_eq!(first.explanation, "Metade de um inteiro.");
        assert_eq!(state.score(), 1);
        assert_eq!(controller.advance(&mut state).await.unwrap(), Advance::Next);

        controller.select(&mut state, 0).unwrap();
        controller.clock_mut().advance(Duration::seconds(6));
        let second = controller.submit(&mut state).await.unwrap();
        assert!(!second.record.is_correct());

        let Advance::Completed {
            summary,
            summary_id,
        } = controller.advance(&mut state).await.unwrap()
        else {
            panic!("expected completion");
        };
        assert_eq!(summary.correct(), 1);
        assert_eq!(summary.incorrect(), 1);
        assert_eq!(summary.question_count(), 2);
        assert_eq!(summary.time_spent_secs(), 10);
        assert_eq!(summary.topic().as_str(), "frações");
        assert_eq!(repo.get_summary(summary_id).await.unwrap(), summary);

        let sent = supplier.submissions();
        assert_eq!(sent.len(), 2);
        assert_eq!((sent[0].question_id, sent[0].selected), (QuestionId::new(1), 1));
        assert_eq!((sent[1].question_id, sent[1].selected), (QuestionId::new(2), 0));

        assert!(matches!(
            controller.present_current(&mut state).unwrap(),
            Current::Complete(s) if s.correct() == 1
        ));
    }

    #[tokio::test]
    async fn failed_fetch_creates_no_session() {
        let supplier = Arc::new(ScriptedSupplier::failing(SupplyError::HttpStatus(
            StatusCode::INTERNAL_SERVER_ERROR,
        )));
        let (controller, _) = build_controller(supplier);

        let err = controller.start("tabelas").await.unwrap_err();
        assert!(matches!(err, SessionError::Supply(SupplyError::HttpStatus(_))));
        assert_eq!(err.recovery(), Recovery::Reload);
    }

    #[tokio::test]
    async fn blank_topic_and_empty_set_are_supply_errors() {
        let (controller, _) = build_controller(Arc::new(ScriptedSupplier::new(Vec::new(), Vec::new())));

        assert!(matches!(
            controller.start("   ").await.unwrap_err(),
            SessionError::Supply(SupplyError::EmptyTopic)
        ));
        assert!(matches!(
            controller.start("tabelas").await.unwrap_err(),
            SessionError::Supply(SupplyError::NoQuestions { .. })
        ));
    }

    #[tokio::test]
    async fn advance_without_submit_is_rejected() {
        let (controller, _) = build_controller(Arc::new(ScriptedSupplier::new(fractions(), Vec::new())));
        let mut state = controller.start("frações").await.unwrap();

        controller.select(&mut state, 2).unwrap();
        let err = controller.advance(&mut state).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::NotAnswerable(NotAnswerableError::NotAnswered)
        ));
        assert_eq!(err.recovery(), Recovery::None);
        assert_eq!(state.current_index(), 0);
        assert_eq!(state.phase(), QuestionPhase::Selected(2));
    }

    #[tokio::test]
    async fn second_submit_does_not_append() {
        let supplier = Arc::new(ScriptedSupplier::new(
            fractions(),
            vec![Ok(Verdict::new(true, ""))],
        ));
        let (controller, _) = build_controller(supplier.clone());
        let mut state = controller.start("frações").await.unwrap();

        controller.select(&mut state, 1).unwrap();
        controller.submit(&mut state).await.unwrap();
        let err = controller.submit(&mut state).await.unwrap_err();

        assert!(matches!(
            err,
            SessionError::NotAnswerable(NotAnswerableError::AlreadyAnswered)
        ));
        assert_eq!(state.records().len(), 1);
        assert_eq!(supplier.submissions().len(), 1);
    }

    #[tokio::test]
    async fn transient_submit_failure_keeps_selection_for_retry() {
        let supplier = Arc::new(ScriptedSupplier::new(
            fractions(),
            vec![
                Err(SubmitError::Network("connection reset".into())),
                Ok(Verdict::new(true, "")),
            ],
        ));
        let (controller, _) = build_controller(supplier.clone());
        let mut state = controller.start("frações").await.unwrap();

        controller.select(&mut state, 1).unwrap();
        let err = controller.submit(&mut state).await.unwrap_err();
        assert_eq!(err.recovery(), Recovery::Retry);
        assert_eq!(state.phase(), QuestionPhase::Selected(1));
        assert!(state.records().is_empty());

        let answer = controller.submit(&mut state).await.unwrap();
        assert!(answer.record.is_correct());
        assert_eq!(state.records().len(), 1);
        assert_eq!(state.score(), 1);
        assert_eq!(supplier.submissions().len(), 2);
    }

    #[tokio::test]
    async fn submit_without_selection_never_reaches_supplier() {
        let supplier = Arc::new(ScriptedSupplier::new(fractions(), Vec::new()));
        let (controller, _) = build_controller(supplier.clone());
        let mut state = controller.start("frações").await.unwrap();

        let err = controller.submit(&mut state).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::NotAnswerable(NotAnswerableError::NothingSelected)
        ));
        assert!(supplier.submissions().is_empty());
    }

    #[tokio::test]
    async fn elapsed_never_negative_when_clock_steps_back() {
        let supplier = Arc::new(ScriptedSupplier::new(fractions(), Vec::new()));
        let (mut controller, _) = build_controller(supplier.clone());
        let mut state = controller.start("frações").await.unwrap();

        controller.clock_mut().advance(Duration::seconds(-90));
        assert_eq!(controller.elapsed(&state).session_secs, 0);
        controller.select(&mut state, 0).unwrap();
        let answer = controller.submit(&mut state).await.unwrap();
        assert_eq!(answer.record.elapsed_secs(), 0);
        assert_eq!(supplier.submissions()[0].elapsed_secs, 0);
    }

    #[tokio::test]
    async fn summary_survives_clock_stepping_back_before_completion() {
        let supplier = Arc::new(ScriptedSupplier::new(
            vec![question(1, &["1/2", "2/3"])],
            vec![Ok(Verdict::new(true, ""))],
        ));
        let (mut controller, repo) = build_controller(supplier);
        let mut state = controller.start("frações").await.unwrap();
        let started_at = state.started_at();

        controller.select(&mut state, 0).unwrap();
        controller.submit(&mut state).await.unwrap();
        controller.clock_mut().advance(Duration::seconds(-1));

        let Advance::Completed {
            summary,
            summary_id,
        } = controller.advance(&mut state).await.unwrap()
        else {
            panic!("single-question session should complete");
        };
        assert_eq!(summary.completed_at(), started_at);
        assert_eq!(summary.wall_clock_secs(), 0);
        assert_eq!((summary.correct(), summary.incorrect()), (1, 0));

        controller.clock_mut().advance(Duration::seconds(-60));
        assert!(matches!(
            controller.present_current(&mut state).unwrap(),
            Current::Complete(s) if *s == summary
        ));
        assert_eq!(repo.get_summary(summary_id).await.unwrap(), summary);
        let topic = TopicId::new("frações").unwrap();
        assert_eq!(repo.list_summary_rows(&topic, None, None, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn records_track_submits_and_progress() {
        let (controller, _) = build_controller(Arc::new(ScriptedSupplier::new(fractions(), Vec::new())));
        let mut state = controller.start("frações").await.unwrap();

        assert_eq!(controller.progress(&state).answered, 0);
        controller.select(&mut state, 0).unwrap();
        controller.submit(&mut state).await.unwrap();
        assert_eq!(state.records().len(), 1);
        assert_eq!(controller.progress(&state).percent(), 50);

        controller.advance(&mut state).await.unwrap();
        controller.select(&mut state, 1).unwrap();
        controller.submit(&mut state).await.unwrap();
        assert_eq!(state.records().len(), 2);
        controller.advance(&mut state).await.unwrap();

        let progress = controller.progress(&state);
        assert!(progress.is_complete);
        assert_eq!(progress.remaining, 0);
        assert!(state.records().len() <= state.questions().len());
        assert!(controller.select(&mut state, 0).is_err());
        assert_eq!(state.records().len(), 2);
    }

    #[tokio::test]
    async fn failed_summary_store_is_retried_without_rebuilding() {
        let supplier = Arc::new(ScriptedSupplier::new(
            vec![question(9, &["V", "F"])],
            vec![Ok(Verdict::new(true, ""))],
        ));
        let summaries = Arc::new(FlakySummaries {
            inner: InMemoryRepository::new(),
            failures: AtomicUsize::new(1),
            appends: AtomicUsize::new(0),
        });
        let mut controller = SessionController::new(fixed_clock(), supplier, summaries.clone());
        let mut state = controller.start("proposicoes").await.unwrap();

        controller.select(&mut state, 0).unwrap();
        controller.submit(&mut state).await.unwrap();
        let err = controller.advance(&mut state).await.unwrap_err();
        assert!(matches!(err, SessionError::Storage(_)));
        assert_eq!(err.recovery(), Recovery::Retry);
        assert!(state.is_finished());
        let built = state.summary().cloned().unwrap();

        controller.clock_mut().advance(Duration::minutes(5));
        let id = controller.finalize_summary(&mut state).await.unwrap();
        let stored = summaries.get_summary(id).await.unwrap();
        assert_eq!(stored, built);
        assert_eq!(stored.completed_at(), built.completed_at());

        assert_eq!(controller.finalize_summary(&mut state).await.unwrap(), id);
        assert_eq!(summaries.appends.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn finalize_before_completion_is_rejected() {
        let (controller, _) = build_controller(Arc::new(ScriptedSupplier::new(fractions(), Vec::new())));
        let mut state = controller.start("frações").await.unwrap();

        let err = controller.finalize_summary(&mut state).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::NotAnswerable(NotAnswerableError::NotAnswered)
        ));
        assert!(state.summary().is_none());
    }
}
