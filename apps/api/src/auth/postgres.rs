use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::broadcast;
use tracing::info;
use uuid::Uuid;

use crate::auth::models::{normalize_email, AuthEvent, AuthSession, Principal, Role, UserProfile};
use crate::auth::password::PasswordHasher;
use crate::auth::provider::{
    blocking, check_sign_up, AuthError, AuthService, AUTH_EVENT_CAPACITY,
};
use crate::errors::BackendError;
use crate::models::user::UserRow;

/// Auth provider persisted in the `users` and `auth_sessions` tables.
pub struct PgAuthService {
    pool: PgPool,
    hasher: PasswordHasher,
    events: broadcast::Sender<AuthEvent>,
}

impl PgAuthService {
    pub fn new(pool: PgPool, hasher: PasswordHasher) -> Self {
        let (events, _) = broadcast::channel(AUTH_EVENT_CAPACITY);
        Self {
            pool,
            hasher,
            events,
        }
    }

    fn emit(&self, event: AuthEvent) {
        let _ = self.events.send(event);
    }

    async fn open_session(&self, row: UserRow) -> Result<AuthSession, AuthError> {
        let token = Uuid::new_v4();
        sqlx::query("INSERT INTO auth_sessions (token, user_id) VALUES ($1, $2)")
            .bind(token)
            .bind(row.id)
            .execute(&self.pool)
            .await?;

        let principal = UserProfile::from(row).principal;
        self.emit(AuthEvent::SignedIn(principal.clone()));
        Ok(AuthSession { token, principal })
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRow>, AuthError> {
        Ok(
            sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?,
        )
    }
}

#[async_trait]
impl AuthService for PgAuthService {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<AuthSession, AuthError> {
        check_sign_up(email, password, display_name)?;
        let email = normalize_email(email);
        if self.find_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let hasher = self.hasher;
        let password = password.to_string();
        let password_hash = blocking(move || hasher.hash(&password)).await?;

        // A concurrent sign-up with the same email surfaces as a unique violation.
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, email, display_name, role, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&email)
        .bind(display_name.trim())
        .bind(Role::Employee.as_str())
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?;

        info!("Signed up user {}", row.id);
        self.open_session(row).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let row = self
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        let hash = row
            .password_hash
            .clone()
            .ok_or(AuthError::InvalidCredentials)?;

        let password = password.to_string();
        if !blocking(move || PasswordHasher::verify(&password, &hash)).await? {
            return Err(AuthError::InvalidCredentials);
        }
        self.open_session(row).await
    }

    async fn sign_in_federated(
        &self,
        subject: &str,
        email: &str,
        display_name: &str,
    ) -> Result<AuthSession, AuthError> {
        let email = normalize_email(email);

        let existing =
            sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE federated_subject = $1")
                .bind(subject)
                .fetch_optional(&self.pool)
                .await?;

        let row = match existing {
            Some(row) => row,
            // An email already owned by another account surfaces as a unique violation.
            None => {
                let row = sqlx::query_as::<_, UserRow>(
                    r#"
                    INSERT INTO users (id, email, display_name, role, federated_subject)
                    VALUES ($1, $2, $3, $4, $5)
                    RETURNING *
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(&email)
                .bind(display_name.trim())
                .bind(Role::Employee.as_str())
                .bind(subject)
                .fetch_one(&self.pool)
                .await?;
                info!("Created profile for federated user {}", row.id);
                row
            }
        };

        self.open_session(row).await
    }

    async fn sign_out(&self, token: Uuid) -> Result<(), AuthError> {
        let user_id: Option<Uuid> =
            sqlx::query_scalar("DELETE FROM auth_sessions WHERE token = $1 RETURNING user_id")
                .bind(token)
                .fetch_optional(&self.pool)
                .await?;
        if let Some(user_id) = user_id {
            self.emit(AuthEvent::SignedOut { user_id, token });
        }
        Ok(())
    }

    async fn resolve(&self, token: Uuid) -> Result<Option<Principal>, AuthError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT u.* FROM users u
            JOIN auth_sessions s ON s.user_id = u.id
            WHERE s.token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| UserProfile::from(r).principal))
    }

    async fn list_profiles(&self) -> Result<Vec<UserProfile>, AuthError> {
        let rows = sqlx::query_as::<_, UserRow>("SELECT * FROM users ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(UserProfile::from).collect())
    }

    async fn set_role(&self, user_id: Uuid, role: Role) -> Result<UserProfile, AuthError> {
        let row = sqlx::query_as::<_, UserRow>("UPDATE users SET role = $2 WHERE id = $1 RETURNING *")
            .bind(user_id)
            .bind(role.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| BackendError::NotFound(format!("User {user_id} not found")))?;

        self.emit(AuthEvent::RoleChanged { user_id, role });
        Ok(row.into())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}
