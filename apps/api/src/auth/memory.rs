use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{broadcast, RwLock};
use tracing::info;
use uuid::Uuid;

use crate::auth::models::{normalize_email, AuthEvent, AuthSession, Principal, Role, UserProfile};
use crate::auth::password::PasswordHasher;
use crate::auth::provider::{
    blocking, check_sign_up, AuthError, AuthService, AUTH_EVENT_CAPACITY,
};
use crate::errors::BackendError;

struct StoredUser {
    profile: UserProfile,
    password_hash: Option<String>,
    federated_subject: Option<String>,
}

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, StoredUser>,
    sessions: HashMap<Uuid, Uuid>,
}

impl Inner {
    fn find_by_email(&self, email: &str) -> Option<&StoredUser> {
        self.users.values().find(|u| u.profile.principal.email == email)
    }

    fn open_session(&mut self, principal: Principal) -> AuthSession {
        let token = Uuid::new_v4();
        self.sessions.insert(token, principal.user_id);
        AuthSession { token, principal }
    }
}

/// Auth provider kept entirely in process memory.
pub struct MemoryAuthService {
    hasher: PasswordHasher,
    inner: RwLock<Inner>,
    events: broadcast::Sender<AuthEvent>,
}

impl MemoryAuthService {
    pub fn new(hasher: PasswordHasher) -> Self {
        let (events, _) = broadcast::channel(AUTH_EVENT_CAPACITY);
        Self {
            hasher,
            inner: RwLock::new(Inner::default()),
            events,
        }
    }

    fn emit(&self, event: AuthEvent) {
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }

    fn new_profile(email: String, display_name: &str) -> UserProfile {
        UserProfile {
            principal: Principal {
                user_id: Uuid::new_v4(),
                email,
                display_name: display_name.trim().to_string(),
                role: Role::Employee,
            },
            created_at: Utc::now(),
        }
    }
}

#[async_trait]
impl AuthService for MemoryAuthService {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<AuthSession, AuthError> {
        check_sign_up(email, password, display_name)?;
        let email = normalize_email(email);
        let hasher = self.hasher;
        let password = password.to_string();
        let password_hash = blocking(move || hasher.hash(&password)).await?;

        let mut inner = self.inner.write().await;
        if inner.find_by_email(&email).is_some() {
            return Err(AuthError::EmailTaken);
        }
        let profile = Self::new_profile(email, display_name);
        let principal = profile.principal.clone();
        inner.users.insert(
            principal.user_id,
            StoredUser {
                profile,
                password_hash: Some(password_hash),
                federated_subject: None,
            },
        );
        let session = inner.open_session(principal.clone());
        drop(inner);

        info!("Signed up user {}", principal.user_id);
        self.emit(AuthEvent::SignedIn(principal));
        Ok(session)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let email = normalize_email(email);
        let (principal, hash) = {
            let inner = self.inner.read().await;
            let user = inner
                .find_by_email(&email)
                .ok_or(AuthError::InvalidCredentials)?;
            let hash = user
                .password_hash
                .clone()
                .ok_or(AuthError::InvalidCredentials)?;
            (user.profile.principal.clone(), hash)
        };

        let password = password.to_string();
        let verified = blocking(move || PasswordHasher::verify(&password, &hash)).await?;
        if !verified {
            return Err(AuthError::InvalidCredentials);
        }

        let session = self.inner.write().await.open_session(principal.clone());
        self.emit(AuthEvent::SignedIn(principal));
        Ok(session)
    }

    async fn sign_in_federated(
        &self,
        subject: &str,
        email: &str,
        display_name: &str,
    ) -> Result<AuthSession, AuthError> {
        let email = normalize_email(email);
        let mut inner = self.inner.write().await;

        let existing = inner
            .users
            .values()
            .find(|u| u.federated_subject.as_deref() == Some(subject))
            .map(|u| u.profile.principal.clone());

        let principal = match existing {
            Some(p) => p,
            None => {
                if inner.find_by_email(&email).is_some() {
                    return Err(AuthError::EmailTaken);
                }
                let profile = Self::new_profile(email, display_name);
                let principal = profile.principal.clone();
                inner.users.insert(
                    principal.user_id,
                    StoredUser {
                        profile,
                        password_hash: None,
                        federated_subject: Some(subject.to_string()),
                    },
                );
                info!("Created profile for federated user {}", principal.user_id);
                principal
            }
        };

        let session = inner.open_session(principal.clone());
        drop(inner);
        self.emit(AuthEvent::SignedIn(principal));
        Ok(session)
    }

    async fn sign_out(&self, token: Uuid) -> Result<(), AuthError> {
        let removed = self.inner.write().await.sessions.remove(&token);
        if let Some(user_id) = removed {
            self.emit(AuthEvent::SignedOut { user_id, token });
        }
        Ok(())
    }

    async fn resolve(&self, token: Uuid) -> Result<Option<Principal>, AuthError> {
        let inner = self.inner.read().await;
        Ok(inner
            .sessions
            .get(&token)
            .and_then(|user_id| inner.users.get(user_id))
            .map(|u| u.profile.principal.clone()))
    }

    async fn list_profiles(&self) -> Result<Vec<UserProfile>, AuthError> {
        let inner = self.inner.read().await;
        let mut profiles: Vec<UserProfile> =
            inner.users.values().map(|u| u.profile.clone()).collect();
        profiles.sort_by_key(|p| p.created_at);
        Ok(profiles)
    }

    async fn set_role(&self, user_id: Uuid, role: Role) -> Result<UserProfile, AuthError> {
        let profile = {
            let mut inner = self.inner.write().await;
            let user = inner
                .users
                .get_mut(&user_id)
                .ok_or_else(|| BackendError::NotFound(format!("User {user_id} not found")))?;
            user.profile.principal.role = role;
            user.profile.clone()
        };
        self.emit(AuthEvent::RoleChanged { user_id, role });
        Ok(profile)
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}
