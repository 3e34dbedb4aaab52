use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::UserId;

/// Minimum accepted password length at registration.
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RegistrationError {
    #[error("all fields are required")]
    MissingField,
    #[error("passwords do not match")]
    PasswordMismatch,
    #[error("password must have at least {MIN_PASSWORD_LEN} characters")]
    PasswordTooShort,
    #[error("invalid e-mail address: {0}")]
    InvalidEmail(String),
}

/// Registration form as typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationDraft {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Registration form after validation; fields are trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRegistration {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl RegistrationDraft {
    /// Validate the form fields.
    ///
    /// # Errors
    ///
    /// Returns `RegistrationError` for missing fields, mismatched or short
    /// passwords, or an e-mail without `@`.
    pub fn validate(self) -> Result<ValidatedRegistration, RegistrationError> {
        let name = self.name.trim();
        let email = self.email.trim();
        let password = self.password.trim();
        let confirm = self.confirm_password.trim();

        if [name, email, password, confirm].iter().any(|f| f.is_empty()) {
            return Err(RegistrationError::MissingField);
        }
        if password != confirm {
            return Err(RegistrationError::PasswordMismatch);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(RegistrationError::PasswordTooShort);
        }
        if !email.contains('@') {
            return Err(RegistrationError::InvalidEmail(email.to_owned()));
        }

        Ok(ValidatedRegistration {
            name: name.to_owned(),
            email: email.to_owned(),
            password: password.to_owned(),
        })
    }
}

/// A registered user, without credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}
