use crate::actor::AdminCaller;
use crate::{ApiError, ServiceState};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use quantrack_core::store::{
    AdminId, AdminRecord, EventId, EventRecord, OrganizationId, OrganizationRecord, VolunteerId,
    VolunteerRecord,
};
use quantrack_core::{NewAdmin, NewEvent, NewOrganization, NewVolunteer};

type Created<T> = (StatusCode, Json<T>);

pub async fn create_volunteer(
    State(state): State<ServiceState>,
    Json(input): Json<NewVolunteer>,
) -> Result<Created<VolunteerRecord>, ApiError> {
    let record = state.engine.registry().register_volunteer(input).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn get_volunteer(
    State(state): State<ServiceState>,
    Path(id): Path<VolunteerId>,
) -> Result<Json<VolunteerRecord>, ApiError> {
    Ok(Json(state.engine.registry().volunteer(&id).await?))
}

pub async fn create_organization(
    State(state): State<ServiceState>,
    Json(input): Json<NewOrganization>,
) -> Result<Created<OrganizationRecord>, ApiError> {
    let record = state.engine.registry().register_organization(input).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn get_organization(
    State(state): State<ServiceState>,
    Path(id): Path<OrganizationId>,
) -> Result<Json<OrganizationRecord>, ApiError> {
    Ok(Json(state.engine.registry().organization(&id).await?))
}

pub async fn list_organization_events(
    State(state): State<ServiceState>,
    Path(id): Path<OrganizationId>,
) -> Result<Json<Vec<EventRecord>>, ApiError> {
    Ok(Json(state.engine.registry().list_events(&id).await?))
}

pub async fn create_admin(
    State(state): State<ServiceState>,
    Json(input): Json<NewAdmin>,
) -> Result<Created<AdminRecord>, ApiError> {
    let record = state.engine.registry().register_admin(input).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn get_admin(
    State(state): State<ServiceState>,
    Path(id): Path<AdminId>,
) -> Result<Json<AdminRecord>, ApiError> {
    Ok(Json(state.engine.registry().admin(&id).await?))
}

pub async fn create_event(
    State(state): State<ServiceState>,
    AdminCaller(admin): AdminCaller,
    Json(input): Json<NewEvent>,
) -> Result<Created<EventRecord>, ApiError> {
    let record = state.engine.registry().create_event(&admin, input).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn get_event(
    State(state): State<ServiceState>,
    Path(id): Path<EventId>,
) -> Result<Json<EventRecord>, ApiError> {
    Ok(Json(state.engine.registry().event(&id).await?))
}

pub async fn delete_event(
    State(state): State<ServiceState>,
    AdminCaller(admin): AdminCaller,
    Path(id): Path<EventId>,
) -> Result<StatusCode, ApiError> {
    state.engine.registry().delete_event(&admin, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
