//! Caller identity extraction.
//!
//! Authentication happens upstream; the gateway forwards the verified role
//! and id in `x-quantrack-actor` / `x-quantrack-actor-id`.

use crate::ApiError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use quantrack_core::store::{AdminId, VolunteerId};
use quantrack_core::Actor;

pub const ACTOR_HEADER: &str = "x-quantrack-actor";
pub const ACTOR_ID_HEADER: &str = "x-quantrack-actor-id";

/// Any authenticated caller.
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub Actor);

/// A caller that must be a volunteer.
#[derive(Debug, Clone, Copy)]
pub struct VolunteerCaller(pub VolunteerId);

/// A caller that must be an organization admin.
#[derive(Debug, Clone, Copy)]
pub struct AdminCaller(pub AdminId);

fn header<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, ApiError> {
    parts
        .headers
        .get(name)
        .ok_or_else(|| ApiError::unauthorized(format!("missing `{name}` header")))?
        .to_str()
        .map(str::trim)
        .map_err(|_| ApiError::unauthorized(format!("`{name}` header is not valid text")))
}

pub fn actor_from_parts(parts: &Parts) -> Result<Actor, ApiError> {
    let role = header(parts, ACTOR_HEADER)?;
    let id = header(parts, ACTOR_ID_HEADER)?;
    let invalid_id = |_| ApiError::unauthorized(format!("`{ACTOR_ID_HEADER}` is not a UUID"));
    match role.to_ascii_lowercase().as_str() {
        "volunteer" => Ok(Actor::Volunteer(id.parse().map_err(invalid_id)?)),
        "admin" => Ok(Actor::Admin(id.parse().map_err(invalid_id)?)),
        other => Err(ApiError::unauthorized(format!(
            "unknown actor role `{other}`; expected volunteer or admin"
        ))),
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        actor_from_parts(parts).map(Caller)
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for VolunteerCaller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match actor_from_parts(parts)? {
            Actor::Volunteer(id) => Ok(VolunteerCaller(id)),
            Actor::Admin(_) => Err(ApiError::forbidden("volunteer role required")),
        }
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AdminCaller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match actor_from_parts(parts)? {
            Actor::Admin(id) => Ok(AdminCaller(id)),
            Actor::Volunteer(_) => Err(ApiError::forbidden("admin role required")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(role: Option<&str>, id: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(role) = role {
            builder = builder.header(ACTOR_HEADER, role);
        }
        if let Some(id) = id {
            builder = builder.header(ACTOR_ID_HEADER, id);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn parses_volunteer_and_admin() {
        let id = uuid::Uuid::new_v4().to_string();
        assert!(matches!(
            actor_from_parts(&parts(Some("volunteer"), Some(&id))),
            Ok(Actor::Volunteer(_))
        ));
        assert!(matches!(
            actor_from_parts(&parts(Some("Admin"), Some(&id))),
            Ok(Actor::Admin(_))
        ));
    }

    #[test]
    fn missing_or_malformed_headers_are_unauthorized() {
        for p in [
            parts(None, None),
            parts(Some("volunteer"), None),
            parts(Some("volunteer"), Some("not-a-uuid")),
            parts(Some("owner"), Some(&uuid::Uuid::new_v4().to_string())),
        ] {
            let err = actor_from_parts(&p).unwrap_err();
            assert_eq!(err.status(), axum::http::StatusCode::UNAUTHORIZED);
        }
    }
}
