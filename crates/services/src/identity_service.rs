use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{info, warn};

use quiz_core::model::{RegistrationDraft, User};
use storage::repository::{NewUserRecord, StorageError, UserRepository};

use crate::Clock;
use crate::error::IdentityError;

/// Who is signed in; exercise pages are gated on it.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// # Errors
    ///
    /// Returns `IdentityError::Storage` if the lookup fails.
    async fn current_user(&self) -> Result<Option<User>, IdentityError>;

    /// Page guard: the signed-in user, or `NotLoggedIn`.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::NotLoggedIn` when nobody is signed in.
    async fn require_user(&self) -> Result<User, IdentityError> {
        self.current_user().await?.ok_or(IdentityError::NotLoggedIn)
    }
}

/// Registration and sign-in against a `UserRepository`.
#[derive(Clone)]
pub struct IdentityService {
    clock: Clock,
    users: Arc<dyn UserRepository>,
}

/// Lowercase hex SHA-256 of the password.
fn password_digest(password: &str) -> String {
    format!("{:x}", Sha256::digest(password.as_bytes()))
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl IdentityService {
    #[must_use]
    pub fn new(clock: Clock, users: Arc<dyn UserRepository>) -> Self {
        Self { clock, users }
    }

    /// Create an account and sign it in.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Registration` for invalid form data and
    /// `IdentityError::EmailTaken` if the e-mail is already registered.
    pub async fn register(&self, draft: RegistrationDraft) -> Result<User, IdentityError> {
        let form = draft.validate()?;
        let record = NewUserRecord {
            name: form.name,
            email: normalize_email(&form.email),
            password_digest: password_digest(&form.password),
            created_at: self.clock.now(),
        };

        let user = match self.users.insert_user(record).await {
            Ok(user) => user,
            Err(StorageError::Conflict) => return Err(IdentityError::EmailTaken),
            Err(err) => return Err(err.into()),
        };
        self.users.set_current_user(Some(user.id)).await?;
        info!(user = %user.id, "user registered");
        Ok(user)
    }

    /// Sign in with e-mail and password.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::InvalidCredentials` if the e-mail is unknown or
    /// the password does not match.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, IdentityError> {
        let email = normalize_email(email);
        let Some(record) = self.users.find_by_email(&email).await? else {
            warn!("login with unknown e-mail");
            return Err(IdentityError::InvalidCredentials);
        };
        if record.password_digest != password_digest(password.trim()) {
            warn!(user = %record.user.id, "login with wrong password");
            return Err(IdentityError::InvalidCredentials);
        }

        self.users.set_current_user(Some(record.user.id)).await?;
        info!(user = %record.user.id, "user signed in");
        Ok(record.user)
    }

    /// Clear the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Storage` on repository failures.
    pub async fn logout(&self) -> Result<(), IdentityError> {
        self.users.set_current_user(None).await?;
        info!("user signed out");
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for IdentityService {
    async fn current_user(&self) -> Result<Option<User>, IdentityError> {
        Ok(self.users.current_user().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::RegistrationError;
    use quiz_core::time::fixed_clock;
    use storage::repository::InMemoryRepository;

    fn service() -> IdentityService {
        IdentityService::new(fixed_clock(), Arc::new(InMemoryRepository::new()))
    }

    fn draft(email: &str, password: &str, confirm: &str) -> RegistrationDraft {
        RegistrationDraft {
            name: "Ana".into(),
            email: email.into(),
            password: password.into(),
            confirm_password: confirm.into(),
        }
    }

    #[test]
    fn digest_is_hex_sha256() {
        assert_eq!(
            password_digest("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn register_signs_user_in() {
        let svc = service();
        let user = svc
            .register(draft("Ana@Example.com", "segredo", "segredo"))
            .await
            .unwrap();

        assert_eq!(user.email, "ana@example.com");
        assert_eq!(svc.require_user().await.unwrap(), user);
    }

    #[tokio::test]
    async fn register_rejects_invalid_forms() {
        let svc = service();
        let mismatch = svc
            .register(draft("ana@example.com", "segredo", "segredos"))
            .await
            .unwrap_err();
        assert!(matches!(
            mismatch,
            IdentityError::Registration(RegistrationError::PasswordMismatch)
        ));

        let short = svc
            .register(draft("ana@example.com", "12345", "12345"))
            .await
            .unwrap_err();
        assert!(matches!(
            short,
            IdentityError::Registration(RegistrationError::PasswordTooShort)
        ));
        assert!(svc.current_user().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_email_is_taken() {
        let svc = service();
        svc.register(draft("ana@example.com", "segredo", "segredo"))
            .await
            .unwrap();
        let err = svc
            .register(draft(" ANA@example.com ", "outrasenha", "outrasenha"))
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::EmailTaken));
    }

    #[tokio::test]
    async fn login_and_logout_round() {
        let svc = service();
        let user = svc
            .register(draft("ana@example.com", "segredo", "segredo"))
            .await
            .unwrap();
        svc.logout().await.unwrap();
        assert!(matches!(
            svc.require_user().await.unwrap_err(),
            IdentityError::NotLoggedIn
        ));

        assert!(matches!(
            svc.login("ana@example.com", "errada").await.unwrap_err(),
            IdentityError::InvalidCredentials
        ));
        assert!(matches!(
            svc.login("bia@example.com", "segredo").await.unwrap_err(),
            IdentityError::InvalidCredentials
        ));
        assert!(svc.current_user().await.unwrap().is_none());

        let signed_in = svc.login("ana@example.com", "segredo").await.unwrap();
        assert_eq!(signed_in, user);
        assert_eq!(svc.current_user().await.unwrap(), Some(user));
    }
}
