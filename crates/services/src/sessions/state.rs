use chrono::{DateTime, Utc};
use std::fmt;

use quiz_core::model::{
    AnswerRecord, AnswerSubmission, Question, Selection, SessionId, SessionSummary, TopicId,
    Verdict,
};
use quiz_core::time::{elapsed_secs, elapsed_secs_u32};

use super::progress::{ElapsedTime, SessionProgress};
use super::recorder::AnswerRecorder;
use crate::error::{NotAnswerableError, SupplyError};

/// Where the active question stands.
///
/// `Unanswered -> Selected -> Answered`; selecting again while `Selected`
/// replaces the choice, and a failed submit stays in `Selected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionPhase {
    Unanswered,
    Selected(usize),
    Answered,
}

/// State of one quiz run, exclusively owned by the caller driving it.
///
/// Every mutation goes through `&mut self`, so at most one operation can be
/// in flight for a session. Dropping the value abandons the session.
pub struct SessionState {
    id: SessionId,
    topic: TopicId,
    questions: Vec<Question>,
    current: usize,
    phase: QuestionPhase,
    recorder: AnswerRecorder,
    score: u32,
    started_at: DateTime<Utc>,
    question_started_at: DateTime<Utc>,
    summary: Option<SessionSummary>,
    summary_id: Option<i64>,
}

impl SessionState {
    /// Create the state for a freshly fetched question set.
    ///
    /// `started_at` should come from the services layer clock to keep time deterministic.
    ///
    /// # Errors
    ///
    /// Returns `SupplyError::NoQuestions` if the set is empty.
    pub(crate) fn new(
        topic: TopicId,
        questions: Vec<Question>,
        started_at: DateTime<Utc>,
    ) -> Result<Self, SupplyError> {
        if questions.is_empty() {
            return Err(SupplyError::NoQuestions {
                topic: topic.to_string(),
            });
        }

        Ok(Self {
            id: SessionId::generate(),
            topic,
            recorder: AnswerRecorder::with_capacity(questions.len()),
            questions,
            current: 0,
            phase: QuestionPhase::Unanswered,
            score: 0,
            started_at,
            question_started_at: started_at,
            summary: None,
            summary_id: None,
        })
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn topic(&self) -> &TopicId {
        &self.topic
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current)
    }

    #[must_use]
    pub fn phase(&self) -> QuestionPhase {
        self.phase
    }

    #[must_use]
    pub fn selection(&self) -> Selection {
        match self.phase {
            QuestionPhase::Selected(i) => Selection::Option(i),
            QuestionPhase::Unanswered | QuestionPhase::Answered => Selection::None,
        }
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn records(&self) -> &[AnswerRecord] {
        self.recorder.records()
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn question_started_at(&self) -> DateTime<Utc> {
        self.question_started_at
    }

    /// True once the index has moved past the last question.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.current >= self.questions.len()
    }

    #[must_use]
    pub fn summary(&self) -> Option<&SessionSummary> {
        self.summary.as_ref()
    }

    #[must_use]
    pub fn summary_id(&self) -> Option<i64> {
        self.summary_id
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let total = self.questions.len();
        let answered = self.recorder.len();
        SessionProgress {
            total,
            answered,
            remaining: total.saturating_sub(answered),
            is_complete: self.is_finished(),
        }
    }

    /// Elapsed time as of `now`. The session clock stops at completion.
    #[must_use]
    pub fn elapsed(&self, now: DateTime<Utc>) -> ElapsedTime {
        let end = self.summary.as_ref().map_or(now, SessionSummary::completed_at);
        let question_secs = match self.phase {
            _ if self.is_finished() => None,
            QuestionPhase::Answered => self.recorder.last().map(|r| u64::from(r.elapsed_secs())),
            QuestionPhase::Unanswered | QuestionPhase::Selected(_) => {
                Some(elapsed_secs(self.question_started_at, now))
            }
        };
        ElapsedTime {
            session_secs: elapsed_secs(self.started_at, end),
            question_secs,
        }
    }

    fn active_question(&self) -> Result<&Question, NotAnswerableError> {
        self.questions
            .get(self.current)
            .ok_or(NotAnswerableError::NoActiveQuestion)
    }

    pub(crate) fn select(&mut self, index: usize) -> Result<(), NotAnswerableError> {
        let question = self.active_question()?;
        if self.phase == QuestionPhase::Answered {
            return Err(NotAnswerableError::AlreadyAnswered);
        }
        if !question.accepts(index) {
            return Err(NotAnswerableError::OptionOutOfRange {
                index,
                options: question.option_count(),
            });
        }
        self.phase = QuestionPhase::Selected(index);
        Ok(())
    }

    /// The request to send for the active question, timed at `now`.
    pub(crate) fn pending_submission(
        &self,
        now: DateTime<Utc>,
    ) -> Result<AnswerSubmission, NotAnswerableError> {
        let question = self.active_question()?;
        let selected = match self.phase {
            QuestionPhase::Selected(i) => i,
            QuestionPhase::Unanswered => return Err(NotAnswerableError::NothingSelected),
            QuestionPhase::Answered => return Err(NotAnswerableError::AlreadyAnswered),
        };
        Ok(AnswerSubmission {
            question_id: question.id(),
            selected,
            elapsed_secs: elapsed_secs_u32(self.question_started_at, now),
        })
    }

    /// Append the verdict for `submission` and mark the question answered.
    pub(crate) fn record_verdict(
        &mut self,
        submission: &AnswerSubmission,
        verdict: &Verdict,
    ) -> Result<AnswerRecord, NotAnswerableError> {
        let question = self.active_question()?;
        if question.id() != submission.question_id {
            return Err(NotAnswerableError::NoActiveQuestion);
        }
        match self.phase {
            QuestionPhase::Selected(i) if i == submission.selected => {}
            QuestionPhase::Answered => return Err(NotAnswerableError::AlreadyAnswered),
            QuestionPhase::Unanswered | QuestionPhase::Selected(_) => {
                return Err(NotAnswerableError::NothingSelected);
            }
        }

        let record = *self
            .recorder
            .append(AnswerRecord::new(
                submission.question_id,
                submission.selected,
                verdict.correct,
                submission.elapsed_secs,
            ))
            .ok_or(NotAnswerableError::NoActiveQuestion)?;
        if verdict.correct {
            self.score = self.score.saturating_add(1);
        }
        self.phase = QuestionPhase::Answered;
        Ok(record)
    }

    /// Move to the next question. Requires the active question to be answered.
    pub(crate) fn advance(&mut self, now: DateTime<Utc>) -> Result<(), NotAnswerableError> {
        self.active_question()?;
        if self.phase != QuestionPhase::Answered {
            return Err(NotAnswerableError::NotAnswered);
        }
        self.current += 1;
        self.phase = QuestionPhase::Unanswered;
        self.question_started_at = now;
        Ok(())
    }

    pub(crate) fn take_summary(&mut self) -> Option<SessionSummary> {
        self.summary.take()
    }

    pub(crate) fn store_summary(&mut self, summary: SessionSummary) -> &SessionSummary {
        self.summary.insert(summary)
    }

    pub(crate) fn set_summary_id(&mut self, id: i64) {
        self.summary_id = Some(id);
    }
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionState")
            .field("id", &self.id)
            .field("topic", &self.topic)
            .field("questions_len", &self.questions.len())
            .field("current", &self.current)
            .field("phase", &self.phase)
            .field("records_len", &self.recorder.len())
            .field("score", &self.score)
            .field("started_at", &self.started_at)
            .field("summary_id", &self.summary_id)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
