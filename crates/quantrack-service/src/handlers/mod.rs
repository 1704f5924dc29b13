//! Route handlers, grouped by engine component.

pub mod analytics;
pub mod membership;
pub mod participation;
pub mod registry;

use crate::ServiceState;
use axum::extract::State;
use axum::Json;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    service: &'static str,
    storage_backend: &'static str,
}

pub async fn health(State(state): State<ServiceState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "quantrack-service",
        storage_backend: state.engine.backend_label(),
    })
}
