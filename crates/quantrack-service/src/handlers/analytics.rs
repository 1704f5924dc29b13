use crate::actor::{AdminCaller, VolunteerCaller};
use crate::{ApiError, ServiceState};
use axum::extract::State;
use axum::Json;
use chrono::Utc;
use quantrack_core::{
    AdminDashboardStats, EventParticipationStats, OrganizationStats, VolunteerStats,
    VolunteerSummary,
};

pub async fn volunteer_stats(
    State(state): State<ServiceState>,
    AdminCaller(admin): AdminCaller,
) -> Result<Json<VolunteerStats>, ApiError> {
    Ok(Json(state.engine.analytics().volunteer_stats(&admin).await?))
}

pub async fn event_participation_stats(
    State(state): State<ServiceState>,
    AdminCaller(admin): AdminCaller,
) -> Result<Json<EventParticipationStats>, ApiError> {
    let today = Utc::now().date_naive();
    Ok(Json(
        state
            .engine
            .analytics()
            .event_participation_stats(&admin, today)
            .await?,
    ))
}

pub async fn organization_stats(
    State(state): State<ServiceState>,
    AdminCaller(admin): AdminCaller,
) -> Result<Json<OrganizationStats>, ApiError> {
    let today = Utc::now().date_naive();
    Ok(Json(
        state
            .engine
            .analytics()
            .organization_stats(&admin, today)
            .await?,
    ))
}

pub async fn admin_stats(
    State(state): State<ServiceState>,
    AdminCaller(admin): AdminCaller,
) -> Result<Json<AdminDashboardStats>, ApiError> {
    Ok(Json(
        state.engine.analytics().admin_dashboard_stats(&admin).await?,
    ))
}

pub async fn me(
    State(state): State<ServiceState>,
    VolunteerCaller(volunteer): VolunteerCaller,
) -> Result<Json<VolunteerSummary>, ApiError> {
    Ok(Json(
        state.engine.analytics().volunteer_summary(&volunteer).await?,
    ))
}
