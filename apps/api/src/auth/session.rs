//! Per-request session context.
//!
//! Handlers never read a global "current user": the bearer token is resolved
//! against the auth provider for every request and the resulting principal is
//! passed down explicitly through these extractors.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::models::{AuthEvent, Principal, Role};
use crate::auth::provider::AuthService;
use crate::errors::AppError;
use crate::faq::chat::ChatStore;
use crate::state::AppState;

/// Extracts the token from `Authorization: Bearer <uuid>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<Uuid> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Uuid::parse_str(token.trim()).ok()
}

/// The signed-in caller. Rejects with 401 when the token is missing or stale.
#[derive(Debug, Clone)]
pub struct CurrentPrincipal {
    pub token: Uuid,
    pub principal: Principal,
}

impl CurrentPrincipal {
    pub fn require_role(&self, role: Role) -> Result<(), AppError> {
        if self.principal.role == role {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    /// HR may act on anyone; employees only on themselves.
    pub fn require_self_or_hr(&self, user_id: Uuid) -> Result<(), AppError> {
        if self.principal.is_hr() || self.principal.user_id == user_id {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentPrincipal {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(AppError::Unauthorized)?;
        let principal = state
            .auth
            .resolve(token)
            .await?
            .ok_or(AppError::Unauthorized)?;
        Ok(CurrentPrincipal { token, principal })
    }
}

/// Like `CurrentPrincipal` but yields `None` instead of rejecting.
#[derive(Debug, Clone)]
pub struct OptionalPrincipal(pub Option<CurrentPrincipal>);

#[async_trait]
impl FromRequestParts<AppState> for OptionalPrincipal {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match CurrentPrincipal::from_request_parts(parts, state).await {
            Ok(p) => Ok(OptionalPrincipal(Some(p))),
            Err(AppError::Unauthorized) => Ok(OptionalPrincipal(None)),
            Err(e) => Err(e),
        }
    }
}

/// Listens to auth events for the life of the process and tears down
/// per-user state (open chat sessions) when a user signs out.
pub fn spawn_session_watcher(auth: Arc<dyn AuthService>, chats: Arc<ChatStore>) -> JoinHandle<()> {
    let mut events = auth.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(AuthEvent::SignedIn(principal)) => {
                    debug!("User {} signed in as {}", principal.user_id, principal.role);
                }
                Ok(AuthEvent::SignedOut { user_id, .. }) => {
                    let closed = chats.close_all_for(user_id).await;
                    info!("User {user_id} signed out, closed {closed} chat session(s)");
                }
                Ok(AuthEvent::RoleChanged { user_id, role }) => {
                    info!("User {user_id} role changed to {role}");
                }
                Err(RecvError::Lagged(n)) => {
                    warn!("Session watcher lagged by {n} auth events");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
