use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::model::{AnswerRecord, TopicId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionSummaryError {
    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("too many questions for a single session: {len}")]
    TooManyQuestions { len: usize },

    #[error("{records} answer records for a session of {questions} questions")]
    TooManyRecords { records: usize, questions: u32 },

    #[error("correct ({correct}) + incorrect ({incorrect}) does not match question count ({questions})")]
    CountMismatch {
        correct: u32,
        incorrect: u32,
        questions: u32,
    },

    #[error("correct count ({correct}) does not match correct answer records ({recorded})")]
    ScoreMismatch { correct: u32, recorded: u32 },
}

/// Final report of a finished quiz session.
///
/// Created once when the last question is advanced past and never amended.
/// `time_spent_secs` is the sum of the per-question elapsed times; the
/// wall-clock span is available through [`SessionSummary::wall_clock_secs`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    topic: TopicId,
    #[serde(skip)]
    started_at: DateTime<Utc>,
    #[serde(rename = "date")]
    completed_at: DateTime<Utc>,
    correct: u32,
    incorrect: u32,
    #[serde(rename = "timeSpent")]
    time_spent_secs: u64,
    #[serde(rename = "questions")]
    question_count: u32,
    #[serde(rename = "details")]
    records: Vec<AnswerRecord>,
}

impl SessionSummary {
    /// Rehydrate a session summary from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `SessionSummaryError` if the time range is inverted or the
    /// counts do not line up with each other or with the records.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        topic: TopicId,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        correct: u32,
        incorrect: u32,
        time_spent_secs: u64,
        question_count: u32,
        records: Vec<AnswerRecord>,
    ) -> Result<Self, SessionSummaryError> {
        if completed_at < started_at {
            return Err(SessionSummaryError::InvalidTimeRange);
        }
        if u32::try_from(records.len()).map_or(true, |len| len > question_count) {
            return Err(SessionSummaryError::TooManyRecords {
                records: records.len(),
                questions: question_count,
            });
        }
        if correct.checked_add(incorrect) != Some(question_count) {
            return Err(SessionSummaryError::CountMismatch {
                correct,
                incorrect,
                questions: question_count,
            });
        }
        let recorded = count_correct(&records);
        if recorded != correct {
            return Err(SessionSummaryError::ScoreMismatch { correct, recorded });
        }

        Ok(Self {
            topic,
            started_at,
            completed_at,
            correct,
            incorrect,
            time_spent_secs,
            question_count,
            records,
        })
    }

    /// Build a summary from the answer log of a finished session.
    ///
    /// Questions without a record count as incorrect.
    ///
    /// # Errors
    ///
    /// Returns `SessionSummaryError::InvalidTimeRange` if `completed_at` is before `started_at`.
    /// Returns `SessionSummaryError::TooManyQuestions` if the question count cannot fit in `u32`.
    /// Returns `SessionSummaryError::TooManyRecords` if there are more records than questions.
    pub fn from_records(
        topic: TopicId,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        question_count: usize,
        records: &[AnswerRecord],
    ) -> Result<Self, SessionSummaryError> {
        let questions = u32::try_from(question_count)
            .map_err(|_| SessionSummaryError::TooManyQuestions {
                len: question_count,
            })?;
        if records.len() > question_count {
            return Err(SessionSummaryError::TooManyRecords {
                records: records.len(),
                questions,
            });
        }
        let correct = count_correct(records);
        let time_spent_secs = records
            .iter()
            .map(|r| u64::from(r.elapsed_secs()))
            .sum();

        Self::from_persisted(
            topic,
            started_at,
            completed_at,
            correct,
            questions.saturating_sub(correct),
            time_spent_secs,
            questions,
            records.to_vec(),
        )
    }

    #[must_use]
    pub fn topic(&self) -> &TopicId {
        &self.topic
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn incorrect(&self) -> u32 {
        self.incorrect
    }

    #[must_use]
    pub fn question_count(&self) -> u32 {
        self.question_count
    }

    /// Sum of recorded per-question elapsed seconds.
    #[must_use]
    pub fn time_spent_secs(&self) -> u64 {
        self.time_spent_secs
    }

    /// Whole seconds between session start and completion.
    #[must_use]
    pub fn wall_clock_secs(&self) -> u64 {
        crate::time::elapsed_secs(self.started_at, self.completed_at)
    }

    #[must_use]
    pub fn records(&self) -> &[AnswerRecord] {
        &self.records
    }

    /// Rounded share of correct answers, `0` for an empty session.
    #[must_use]
    pub fn accuracy_percent(&self) -> u32 {
        crate::model::percentage(u64::from(self.correct), u64::from(self.question_count))
    }
}

fn count_correct(records: &[AnswerRecord]) -> u32 {
    let n = records.iter().filter(|r| r.is_correct()).count();
    u32::try_from(n).unwrap_or(u32::MAX)
}
