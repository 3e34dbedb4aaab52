use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question {id} has no options")]
    NoOptions { id: QuestionId },
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A multiple-choice question as delivered by the question supplier.
///
/// Immutable once fetched. The option list is ordered; selections are
/// zero-based indices into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    id: QuestionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    level: Option<String>,
    text: String,
    #[serde(rename = "opcoes", alias = "options")]
    options: Vec<String>,
}

impl Question {
    /// Build a question, rejecting an empty option list.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::NoOptions` if `options` is empty.
    pub fn new(
        id: QuestionId,
        title: Option<String>,
        level: Option<String>,
        text: impl Into<String>,
        options: Vec<String>,
    ) -> Result<Self, QuestionError> {
        let question = Self {
            id,
            title,
            level,
            text: text.into(),
            options,
        };
        question.validate()?;
        Ok(question)
    }

    /// Check invariants on a question that came off the wire.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::NoOptions` if the option list is empty.
    pub fn validate(&self) -> Result<(), QuestionError> {
        if self.options.is_empty() {
            return Err(QuestionError::NoOptions { id: self.id });
        }
        Ok(())
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Title to show, falling back to a generic heading.
    #[must_use]
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("Questão")
    }

    #[must_use]
    pub fn level(&self) -> Option<&str> {
        self.level.as_deref()
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn option_count(&self) -> usize {
        self.options.len()
    }

    /// Returns true when `index` points at one of this question's options.
    #[must_use]
    pub fn accepts(&self, index: usize) -> bool {
        index < self.options.len()
    }
}

/// Letter label used when presenting an option (`0 -> 'A'`, `1 -> 'B'`, ...).
///
/// Returns `None` past `'Z'`.
#[must_use]
pub fn option_letter(index: usize) -> Option<char> {
    u8::try_from(index)
        .ok()
        .filter(|i| *i < 26)
        .map(|i| char::from(b'A' + i))
}

/// Inverse of [`option_letter`], case-insensitive.
#[must_use]
pub fn option_index(letter: char) -> Option<usize> {
    let upper = letter.to_ascii_uppercase();
    upper
        .is_ascii_uppercase()
        .then(|| usize::from(upper as u8 - b'A'))
}

//
// ─── SELECTION ─────────────────────────────────────────────────────────────────
//

/// The user's tentative choice for the active question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    None,
    Option(usize),
}

impl Selection {
    #[must_use]
    pub fn index(self) -> Option<usize> {
        match self {
            Selection::None => None,
            Selection::Option(i) => Some(i),
        }
    }

    #[must_use]
    pub fn is_none(self) -> bool {
        matches!(self, Selection::None)
    }
}
