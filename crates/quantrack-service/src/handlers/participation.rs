use crate::actor::{AdminCaller, Caller, VolunteerCaller};
use crate::{ApiError, ServiceState};
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use quantrack_core::store::{EventId, Hours, ParticipationId, ParticipationRecord};
use quantrack_core::Certificate;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompleteRequest {
    /// Overrides the event's service hours when present.
    #[serde(default)]
    pub hours: Option<Hours>,
}

pub async fn join_event(
    State(state): State<ServiceState>,
    VolunteerCaller(volunteer): VolunteerCaller,
    Path(event_id): Path<EventId>,
) -> Result<(StatusCode, Json<ParticipationRecord>), ApiError> {
    let participation = state
        .engine
        .participations()
        .join_event(&volunteer, &event_id)
        .await?;
    Ok((StatusCode::CREATED, Json(participation)))
}

pub async fn cancel(
    State(state): State<ServiceState>,
    VolunteerCaller(volunteer): VolunteerCaller,
    Path(event_id): Path<EventId>,
) -> Result<Json<ParticipationRecord>, ApiError> {
    Ok(Json(
        state
            .engine
            .participations()
            .cancel(&volunteer, &event_id)
            .await?,
    ))
}

pub async fn for_event(
    State(state): State<ServiceState>,
    AdminCaller(admin): AdminCaller,
    Path(event_id): Path<EventId>,
) -> Result<Json<Vec<ParticipationRecord>>, ApiError> {
    Ok(Json(
        state
            .engine
            .participations()
            .participations_for_event(&admin, &event_id)
            .await?,
    ))
}

pub async fn mine(
    State(state): State<ServiceState>,
    VolunteerCaller(volunteer): VolunteerCaller,
) -> Result<Json<Vec<ParticipationRecord>>, ApiError> {
    Ok(Json(
        state
            .engine
            .participations()
            .participations_of(&volunteer)
            .await?,
    ))
}

/// An empty body completes with the event's hours. A body that does not
/// decode is rejected before anything is written.
pub async fn complete(
    State(state): State<ServiceState>,
    AdminCaller(admin): AdminCaller,
    Path(id): Path<ParticipationId>,
    body: Bytes,
) -> Result<Json<ParticipationRecord>, ApiError> {
    let request = decode_complete_request(&body)?;
    Ok(Json(
        state
            .engine
            .participations()
            .complete(&admin, &id, request.hours)
            .await?,
    ))
}

fn decode_complete_request(body: &[u8]) -> Result<CompleteRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(CompleteRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|err| ApiError::bad_request(format!("invalid completion request: {err}")))
}

pub async fn certificate(
    State(state): State<ServiceState>,
    Caller(actor): Caller,
    Path(id): Path<ParticipationId>,
) -> Result<Json<Certificate>, ApiError> {
    Ok(Json(state.engine.certificates().issue(&actor, &id).await?))
}

pub async fn verify_certificate(
    State(state): State<ServiceState>,
    Path(code): Path<String>,
) -> Result<Json<Certificate>, ApiError> {
    Ok(Json(state.engine.certificates().verify(&code).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_body_uses_event_hours() {
        assert!(decode_complete_request(b"").unwrap().hours.is_none());
        assert!(decode_complete_request(b"  \n").unwrap().hours.is_none());
        assert!(decode_complete_request(b"{}").unwrap().hours.is_none());
    }

    #[test]
    fn explicit_hours_are_decoded() {
        let request = decode_complete_request(br#"{"hours": 2.25}"#).unwrap();
        assert_eq!(request.hours, Some(Hours::from_hundredths(225)));
    }

    #[test]
    fn undecodable_body_is_bad_request() {
        let bodies: [&[u8]; 3] = [br#"{"hours": -1}"#, b"{not json", br#"{"hours": "many"}"#];
        for body in bodies {
            let err = decode_complete_request(body).unwrap_err();
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        }
    }
}
