//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{QuestionError, RegistrationError, SessionSummaryError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// The question set for a topic could not be obtained.
///
/// Fatal to session start; no session exists afterwards.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SupplyError {
    #[error("topic identifier cannot be empty")]
    EmptyTopic,
    #[error("no questions available for topic {topic}")]
    NoQuestions { topic: String },
    #[error("question supplier responded with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("question set could not be decoded: {0}")]
    Decode(String),
    #[error(transparent)]
    InvalidQuestion(#[from] QuestionError),
    #[error("question supplier unreachable: {0}")]
    Network(String),
}

/// An answer submission failed; the selection is kept so the user may retry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SubmitError {
    #[error("answer submission rejected with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("verdict could not be decoded: {0}")]
    Decode(String),
    #[error("question supplier unreachable: {0}")]
    Network(String),
}

/// An operation was attempted out of turn. The session state is left untouched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NotAnswerableError {
    #[error("no active question")]
    NoActiveQuestion,
    #[error("question already answered")]
    AlreadyAnswered,
    #[error("no option selected")]
    NothingSelected,
    #[error("question not answered yet")]
    NotAnswered,
    #[error("option {index} out of range for {options} options")]
    OptionOutOfRange { index: usize, options: usize },
}

/// The one recovery action a presentation layer should offer for an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Start over (reload the exercise page).
    Reload,
    /// Repeat the same operation; state was preserved.
    Retry,
    /// Nothing for the user to do; an integration bug.
    None,
}

/// Errors emitted by session services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error(transparent)]
    Supply(#[from] SupplyError),
    #[error(transparent)]
    Submit(#[from] SubmitError),
    #[error(transparent)]
    NotAnswerable(#[from] NotAnswerableError),
    #[error(transparent)]
    Summary(#[from] SessionSummaryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl SessionError {
    #[must_use]
    pub fn recovery(&self) -> Recovery {
        match self {
            SessionError::Supply(_) => Recovery::Reload,
            SessionError::Submit(_) | SessionError::Storage(_) => Recovery::Retry,
            SessionError::NotAnswerable(_) | SessionError::Summary(_) => Recovery::None,
        }
    }
}

/// Errors emitted by `DashboardClient`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DashboardError {
    #[error("dashboard request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("dashboard response could not be decoded: {0}")]
    Decode(String),
    #[error("dashboard unreachable: {0}")]
    Network(String),
}

/// Errors emitted by `IdentityService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IdentityError {
    #[error(transparent)]
    Registration(#[from] RegistrationError),
    #[error("e-mail already registered")]
    EmailTaken,
    #[error("wrong e-mail or password")]
    InvalidCredentials,
    #[error("you need to be signed in to access this page")]
    NotLoggedIn,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors raised while building configuration or HTTP clients.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("invalid base url {raw}: {reason}")]
    InvalidBaseUrl { raw: String, reason: String },
    #[error("invalid timeout value: {0}")]
    InvalidTimeout(String),
    #[error(transparent)]
    Client(#[from] reqwest::Error),
}

/// Errors raised while wiring `AppServices`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Storage(#[from] SqliteInitError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_error_kind_maps_to_one_recovery() {
        let supply: SessionError = SupplyError::HttpStatus(reqwest::StatusCode::INTERNAL_SERVER_ERROR).into();
        assert_eq!(supply.recovery(), Recovery::Reload);

        let submit: SessionError = SubmitError::Network("timeout".into()).into();
        assert_eq!(submit.recovery(), Recovery::Retry);

        let protocol: SessionError = NotAnswerableError::NotAnswered.into();
        assert_eq!(protocol.recovery(), Recovery::None);
    }

    #[test]
    fn messages_name_the_status() {
        let err = SupplyError::HttpStatus(reqwest::StatusCode::NOT_FOUND);
        assert!(err.to_string().contains("404"));
    }
}
