use crate::actor::{AdminCaller, VolunteerCaller};
use crate::{ApiError, ServiceState};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use quantrack_core::store::{MembershipId, MembershipRecord};
use quantrack_core::PendingMember;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JoinCodeRequest {
    pub join_code: String,
}

pub async fn join(
    State(state): State<ServiceState>,
    VolunteerCaller(volunteer): VolunteerCaller,
    Json(request): Json<JoinCodeRequest>,
) -> Result<(StatusCode, Json<MembershipRecord>), ApiError> {
    let membership = state
        .engine
        .memberships()
        .join(&volunteer, &request.join_code)
        .await?;
    Ok((StatusCode::CREATED, Json(membership)))
}

pub async fn quit(
    State(state): State<ServiceState>,
    VolunteerCaller(volunteer): VolunteerCaller,
    Json(request): Json<JoinCodeRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .engine
        .memberships()
        .quit(&volunteer, &request.join_code)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn mine(
    State(state): State<ServiceState>,
    VolunteerCaller(volunteer): VolunteerCaller,
) -> Result<Json<Vec<MembershipRecord>>, ApiError> {
    Ok(Json(state.engine.memberships().memberships_of(&volunteer).await?))
}

pub async fn pending(
    State(state): State<ServiceState>,
    AdminCaller(admin): AdminCaller,
) -> Result<Json<Vec<PendingMember>>, ApiError> {
    Ok(Json(state.engine.memberships().list_pending(&admin).await?))
}

pub async fn approve(
    State(state): State<ServiceState>,
    AdminCaller(admin): AdminCaller,
    Path(id): Path<MembershipId>,
) -> Result<Json<MembershipRecord>, ApiError> {
    Ok(Json(state.engine.memberships().approve(&admin, &id).await?))
}

pub async fn reject(
    State(state): State<ServiceState>,
    AdminCaller(admin): AdminCaller,
    Path(id): Path<MembershipId>,
) -> Result<StatusCode, ApiError> {
    state.engine.memberships().reject(&admin, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn deactivate(
    State(state): State<ServiceState>,
    AdminCaller(admin): AdminCaller,
    Path(id): Path<MembershipId>,
) -> Result<Json<MembershipRecord>, ApiError> {
    Ok(Json(state.engine.memberships().deactivate(&admin, &id).await?))
}
