use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::auth::models::{AuthEvent, AuthSession, Principal, Role, UserProfile};
use crate::errors::{AppError, BackendError, ValidationError};

/// Minimum password length accepted at sign-up.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Capacity of the auth event channel; slow subscribers see `Lagged` past this.
pub const AUTH_EVENT_CAPACITY: usize = 64;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("an account with this email already exists")]
    EmailTaken,

    #[error("password must be at least {MIN_PASSWORD_LENGTH} characters")]
    WeakPassword,

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl From<sqlx::Error> for AuthError {
    fn from(e: sqlx::Error) -> Self {
        let unique_violation = e
            .as_database_error()
            .map(|d| d.is_unique_violation())
            .unwrap_or(false);
        if unique_violation {
            AuthError::EmailTaken
        } else {
            AuthError::Backend(e.into())
        }
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials => AppError::Unauthorized,
            AuthError::EmailTaken => AppError::Conflict(AuthError::EmailTaken.to_string()),
            AuthError::WeakPassword => AppError::BadRequest(AuthError::WeakPassword.to_string()),
            AuthError::Invalid(v) => AppError::Validation(v),
            AuthError::Backend(b) => b.into(),
        }
    }
}

/// The auth provider: identities, roles and bearer-token sessions.
///
/// Carried in `AppState` as `Arc<dyn AuthService>`.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Creates an employee account and signs it in.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<AuthSession, AuthError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;

    /// Signs in an identity already verified by an upstream identity provider.
    /// Accounts are matched by `subject` only. The first sign-in creates an
    /// employee profile, or fails with `EmailTaken` if another account holds the email.
    async fn sign_in_federated(
        &self,
        subject: &str,
        email: &str,
        display_name: &str,
    ) -> Result<AuthSession, AuthError>;

    /// Ends the session. Unknown tokens are a no-op.
    async fn sign_out(&self, token: Uuid) -> Result<(), AuthError>;

    /// Resolves a bearer token to its principal, if the session is live.
    async fn resolve(&self, token: Uuid) -> Result<Option<Principal>, AuthError>;

    async fn list_profiles(&self) -> Result<Vec<UserProfile>, AuthError>;

    async fn set_role(&self, user_id: Uuid, role: Role) -> Result<UserProfile, AuthError>;

    /// Subscribes to auth state changes. Dropping the receiver unsubscribes.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}

/// Sign-up input checks shared by every provider.
pub fn check_sign_up(email: &str, password: &str, display_name: &str) -> Result<(), AuthError> {
    if email.trim().is_empty() {
        return Err(ValidationError::MissingField("email").into());
    }
    if display_name.trim().is_empty() {
        return Err(ValidationError::MissingField("display_name").into());
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword);
    }
    Ok(())
}

/// Runs password hashing off the async executor.
pub async fn blocking<T, F>(f: F) -> Result<T, AuthError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AuthError::Backend(BackendError::Unknown(format!("hashing task failed: {e}"))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_sign_up() {
        assert!(check_sign_up("a@b.c", "secret1", "Ann").is_ok());
        assert!(matches!(
            check_sign_up("", "secret1", "Ann"),
            Err(AuthError::Invalid(ValidationError::MissingField("email")))
        ));
        assert!(matches!(
            check_sign_up("a@b.c", "secret1", "  "),
            Err(AuthError::Invalid(ValidationError::MissingField("display_name")))
        ));
        assert!(matches!(
            check_sign_up("a@b.c", "12345", "Ann"),
            Err(AuthError::WeakPassword)
        ));
    }

    #[test]
    fn test_auth_error_status_mapping() {
        assert!(matches!(AppError::from(AuthError::InvalidCredentials), AppError::Unauthorized));
        assert!(matches!(AppError::from(AuthError::EmailTaken), AppError::Conflict(_)));
    }
}
