use serde::{Deserialize, Serialize};

use crate::model::ids::QuestionId;

//
// ─── VERDICT ───────────────────────────────────────────────────────────────────
//

/// Correctness decision returned by the question supplier for one submission.
///
/// The supplier is the authority on correctness; the engine never holds an
/// answer key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    #[serde(rename = "correta")]
    pub correct: bool,
    #[serde(rename = "explicacao", default)]
    pub explanation: String,
}

impl Verdict {
    #[must_use]
    pub fn new(correct: bool, explanation: impl Into<String>) -> Self {
        Self {
            correct,
            explanation: explanation.into(),
        }
    }
}

/// Body sent to the supplier when the user submits an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnswerSubmission {
    #[serde(rename = "questao_id")]
    pub question_id: QuestionId,
    #[serde(rename = "resposta")]
    pub selected: usize,
    #[serde(rename = "tempo")]
    pub elapsed_secs: u32,
}

//
// ─── ANSWER RECORD ─────────────────────────────────────────────────────────────
//

/// Outcome of one answered question within a session.
///
/// Created once per question when the supplier returns a verdict and never
/// mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    #[serde(rename = "questionId")]
    question_id: QuestionId,
    #[serde(rename = "selectedOption")]
    selected: usize,
    #[serde(rename = "correta")]
    correct: bool,
    #[serde(rename = "tempo")]
    elapsed_secs: u32,
}

impl AnswerRecord {
    #[must_use]
    pub fn new(question_id: QuestionId, selected: usize, correct: bool, elapsed_secs: u32) -> Self {
        Self {
            question_id,
            selected,
            correct,
            elapsed_secs,
        }
    }

    #[must_use]
    pub fn question_id(&self) -> QuestionId {
        self.question_id
    }

    #[must_use]
    pub fn selected(&self) -> usize {
        self.selected
    }

    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.correct
    }

    #[must_use]
    pub fn elapsed_secs(&self) -> u32 {
        self.elapsed_secs
    }
}
