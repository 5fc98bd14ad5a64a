use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::models::Role;
use crate::auth::session::CurrentPrincipal;
use crate::compliance::aggregator::{
    employee_overview, organization_stats, summarize, ComplianceSummary, EmployeeCompliance,
    OrganizationStats,
};
use crate::documents::store::DocumentQuery;
use crate::errors::AppError;
use crate::models::document::REQUIRED_CATEGORIES;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct OverviewQuery {
    #[serde(default)]
    pub search: String,
}

#[derive(Debug, Serialize)]
pub struct OverviewResponse {
    pub stats: OrganizationStats,
    pub employees: Vec<EmployeeCompliance>,
}

async fn summary_for(state: &AppState, user_id: Uuid) -> Result<ComplianceSummary, AppError> {
    let records = state.documents.query(DocumentQuery::owned_by(user_id)).await?;
    Ok(summarize(&records, &REQUIRED_CATEGORIES))
}

/// GET /api/v1/compliance
pub async fn handle_my_compliance(
    State(state): State<AppState>,
    caller: CurrentPrincipal,
) -> Result<Json<ComplianceSummary>, AppError> {
    Ok(Json(summary_for(&state, caller.principal.user_id).await?))
}

/// GET /api/v1/compliance/:user_id
pub async fn handle_user_compliance(
    State(state): State<AppState>,
    caller: CurrentPrincipal,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ComplianceSummary>, AppError> {
    caller.require_self_or_hr(user_id)?;
    Ok(Json(summary_for(&state, user_id).await?))
}

/// GET /api/v1/hr/overview
pub async fn handle_hr_overview(
    State(state): State<AppState>,
    caller: CurrentPrincipal,
    Query(params): Query<OverviewQuery>,
) -> Result<Json<OverviewResponse>, AppError> {
    caller.require_role(Role::Hr)?;

    let profiles = state.auth.list_profiles().await?;
    let records = state.documents.query(DocumentQuery::all()).await?;

    Ok(Json(OverviewResponse {
        stats: organization_stats(profiles.len(), &records),
        employees: employee_overview(&profiles, &records, &REQUIRED_CATEGORIES, &params.search),
    }))
}
