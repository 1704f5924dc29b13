//! Quantrack REST surface.
//!
//! Thin axum layer over `QuantrackEngine`: decode the request, resolve the
//! caller, invoke one engine operation and map its error onto a status code.

#![deny(unsafe_code)]

pub mod actor;
pub mod config;
mod handlers;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use crate::config::ServiceConfig;
use quantrack_core::{EngineConfig, QuantrackEngine, QuantrackError};
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct ServiceState {
    pub engine: Arc<QuantrackEngine>,
    pub enable_cors: bool,
}

impl ServiceState {
    pub async fn bootstrap(config: &ServiceConfig) -> Result<Self, ServiceError> {
        let engine = QuantrackEngine::bootstrap(EngineConfig {
            storage: config.storage.to_core(),
            verification_base: config.certificates.verification_base.clone(),
        })
        .await?;
        Ok(Self {
            engine: Arc::new(engine),
            enable_cors: config.server.enable_cors,
        })
    }
}

pub fn build_router(state: ServiceState) -> Router {
    let enable_cors = state.enable_cors;
    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        // Registry
        .route("/volunteers", post(handlers::registry::create_volunteer))
        .route("/volunteers/:id", get(handlers::registry::get_volunteer))
        .route("/organizations", post(handlers::registry::create_organization))
        .route("/organizations/:id", get(handlers::registry::get_organization))
        .route(
            "/organizations/:id/events",
            get(handlers::registry::list_organization_events),
        )
        .route("/admins", post(handlers::registry::create_admin))
        .route("/admins/:id", get(handlers::registry::get_admin))
        .route("/events", post(handlers::registry::create_event))
        .route(
            "/events/:id",
            get(handlers::registry::get_event).delete(handlers::registry::delete_event),
        )
        // Memberships
        .route("/organizations/join", post(handlers::membership::join))
        .route("/organizations/quit", post(handlers::membership::quit))
        .route("/memberships/mine", get(handlers::membership::mine))
        .route("/memberships/pending", get(handlers::membership::pending))
        .route("/memberships/:id/approve", post(handlers::membership::approve))
        .route("/memberships/:id/reject", post(handlers::membership::reject))
        .route(
            "/memberships/:id/deactivate",
            post(handlers::membership::deactivate),
        )
        // Participations and certificates
        .route("/events/:id/join", post(handlers::participation::join_event))
        .route("/events/:id/cancel", post(handlers::participation::cancel))
        .route(
            "/events/:id/participations",
            get(handlers::participation::for_event),
        )
        .route("/participations/mine", get(handlers::participation::mine))
        .route(
            "/participations/:id/complete",
            post(handlers::participation::complete),
        )
        .route(
            "/participations/:id/certificate",
            get(handlers::participation::certificate),
        )
        .route(
            "/certificates/:code/verify",
            get(handlers::participation::verify_certificate),
        )
        // Analytics
        .route(
            "/analytics/volunteer-stats",
            get(handlers::analytics::volunteer_stats),
        )
        .route(
            "/analytics/event-participation-stats",
            get(handlers::analytics::event_participation_stats),
        )
        .route(
            "/analytics/my-organization-stats",
            get(handlers::analytics::organization_stats),
        )
        .route(
            "/analytics/my-admin-stats",
            get(handlers::analytics::admin_stats),
        )
        .route("/analytics/me", get(handlers::analytics::me));

    let router = Router::new()
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http());
    let router = if enable_cors {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    };
    router.with_state(state)
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("core engine error: {0}")]
    Core(#[from] QuantrackError),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    Http { status: StatusCode, message: String },
    #[error(transparent)]
    Core(#[from] QuantrackError),
}

impl ApiError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Http {
            status: StatusCode::UNAUTHORIZED,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::Http {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Http {
            status: StatusCode::FORBIDDEN,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Http { status, .. } => *status,
            ApiError::Core(err) => match err {
                QuantrackError::NotFound(_) => StatusCode::NOT_FOUND,
                QuantrackError::Conflict(_) | QuantrackError::Validation(_) => {
                    StatusCode::BAD_REQUEST
                }
                QuantrackError::Forbidden(_) => StatusCode::FORBIDDEN,
                QuantrackError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
