use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::models::{AuthSession, Principal, Role, UserProfile};
use crate::auth::navigation::{follow, Resolution, Route, SessionState};
use crate::auth::session::{CurrentPrincipal, OptionalPrincipal};
use crate::config::Config;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// Identity asserted by the upstream identity provider.
#[derive(Debug, Deserialize)]
pub struct FederatedSignInRequest {
    pub subject: String,
    pub email: String,
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
pub struct RoleUpdate {
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct NavigateQuery {
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct NavigateResponse {
    pub state: SessionState,
    pub requested: Route,
    #[serde(flatten)]
    pub resolution: Resolution,
}

/// Header carrying the shared secret of the identity provider's relay.
pub const FEDERATION_SECRET_HEADER: &str = "x-federation-secret";

/// POST /api/v1/auth/signup
///
/// Accounts listed in `HR_BOOTSTRAP_EMAILS` start out as HR.
pub async fn handle_sign_up(
    State(state): State<AppState>,
    Json(req): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<AuthSession>), AppError> {
    let mut session = state
        .auth
        .sign_up(&req.email, &req.password, &req.display_name)
        .await?;
    if state.config.is_bootstrap_hr(&session.principal.email) {
        let profile = state.auth.set_role(session.principal.user_id, Role::Hr).await?;
        info!("Granted HR role to bootstrap account {}", profile.principal.user_id);
        session.principal = profile.principal;
    }
    Ok((StatusCode::CREATED, Json(session)))
}

/// Federated sign-in is off unless a secret is configured, and then only the
/// caller presenting that secret may assert identities.
fn check_federation_secret(config: &Config, headers: &HeaderMap) -> Result<(), AppError> {
    let Some(expected) = config.federation_secret.as_deref() else {
        return Err(AppError::NotFound(
            "Federated sign-in is not enabled".to_string(),
        ));
    };
    let presented = headers
        .get(FEDERATION_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if bool::from(presented.as_bytes().ct_eq(expected.as_bytes())) {
        Ok(())
    } else {
        warn!("Rejected federated sign-in without a valid relay secret");
        Err(AppError::Unauthorized)
    }
}

/// POST /api/v1/auth/login
pub async fn handle_sign_in(
    State(state): State<AppState>,
    Json(req): Json<SignInRequest>,
) -> Result<Json<AuthSession>, AppError> {
    Ok(Json(state.auth.sign_in(&req.email, &req.password).await?))
}

/// POST /api/v1/auth/federated
pub async fn handle_federated_sign_in(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<FederatedSignInRequest>,
) -> Result<Json<AuthSession>, AppError> {
    check_federation_secret(&state.config, &headers)?;
    if req.subject.trim().is_empty() {
        return Err(AppError::BadRequest("subject cannot be empty".to_string()));
    }
    Ok(Json(
        state
            .auth
            .sign_in_federated(&req.subject, &req.email, &req.display_name)
            .await?,
    ))
}

/// POST /api/v1/auth/logout
pub async fn handle_sign_out(
    State(state): State<AppState>,
    caller: CurrentPrincipal,
) -> Result<StatusCode, AppError> {
    state.auth.sign_out(caller.token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/auth/me
pub async fn handle_me(caller: CurrentPrincipal) -> Json<Principal> {
    Json(caller.principal)
}

/// PATCH /api/v1/users/:id/role
pub async fn handle_set_role(
    State(state): State<AppState>,
    caller: CurrentPrincipal,
    Path(user_id): Path<Uuid>,
    Json(req): Json<RoleUpdate>,
) -> Result<Json<UserProfile>, AppError> {
    caller.require_role(Role::Hr)?;
    Ok(Json(state.auth.set_role(user_id, req.role).await?))
}

/// GET /api/v1/navigate?path=
pub async fn handle_navigate(
    OptionalPrincipal(caller): OptionalPrincipal,
    Query(params): Query<NavigateQuery>,
) -> Result<Json<NavigateResponse>, AppError> {
    let requested = Route::from_path(&params.path)
        .ok_or_else(|| AppError::NotFound(format!("Unknown route {}", params.path)))?;
    let session_state = SessionState::from_principal(caller.as_ref().map(|c| &c.principal));
    let resolution = follow(requested, session_state).map_err(|e| AppError::Internal(e.into()))?;
    Ok(Json(NavigateResponse {
        state: session_state,
        requested,
        resolution,
    }))
}
