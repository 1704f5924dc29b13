//! Completion certificates.
//!
//! A certificate is derived on demand from a completed participation; nothing
//! beyond the participation's `certificate_code` is stored. The fingerprint is
//! a BLAKE3 digest over the certificate fields, so any holder can detect a
//! tampered copy by re-deriving it through `verify`.

use crate::actor::Actor;
use crate::error::{QuantrackError, QuantrackResult};
use chrono::{DateTime, NaiveDate, Utc};
use quantrack_store::{
    EventId, Hours, OrganizationId, ParticipationId, ParticipationRecord, ParticipationStatus,
    QuantrackStorage, VolunteerId,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

pub const CERTIFICATE_CODE_PREFIX: &str = "QT-";
const CERTIFICATE_CODE_HEX_LEN: usize = 12;

/// Public verification base used when none is configured.
pub const DEFAULT_VERIFICATION_BASE: &str = "https://quantrack.com";

/// `QT-` followed by twelve upper-case hex characters.
pub fn generate_certificate_code() -> String {
    let raw = Uuid::new_v4().simple().to_string();
    format!(
        "{CERTIFICATE_CODE_PREFIX}{}",
        raw[..CERTIFICATE_CODE_HEX_LEN].to_ascii_uppercase()
    )
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Certificate {
    pub certificate_code: String,
    pub participation_id: ParticipationId,
    pub volunteer_id: VolunteerId,
    pub recipient_name: String,
    pub event_id: EventId,
    pub event_name: String,
    pub event_date: NaiveDate,
    pub organization_id: OrganizationId,
    pub organization_name: String,
    pub hours: Hours,
    pub completed_at: DateTime<Utc>,
    pub verification_url: String,
    pub fingerprint: String,
}

impl Certificate {
    /// Recompute the fingerprint over the current field values.
    pub fn compute_fingerprint(&self) -> String {
        let material = serde_json::json!({
            "certificate_code": self.certificate_code,
            "participation_id": self.participation_id,
            "volunteer_id": self.volunteer_id,
            "recipient_name": self.recipient_name,
            "event_id": self.event_id,
            "event_name": self.event_name,
            "event_date": self.event_date,
            "organization_id": self.organization_id,
            "organization_name": self.organization_name,
            "hours_hundredths": self.hours.hundredths(),
            "completed_at": self.completed_at,
            "verification_url": self.verification_url,
        });
        blake3::hash(material.to_string().as_bytes())
            .to_hex()
            .to_string()
    }

    pub fn verify_fingerprint(&self) -> bool {
        self.fingerprint == self.compute_fingerprint()
    }
}

/// Builds certificates for completed participations.
#[derive(Clone)]
pub struct CertificateIssuer {
    store: Arc<dyn QuantrackStorage>,
    verification_base: String,
}

impl CertificateIssuer {
    pub fn new(store: Arc<dyn QuantrackStorage>, verification_base: impl Into<String>) -> Self {
        let base: String = verification_base.into();
        Self {
            store,
            verification_base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn verification_url(&self, code: &str) -> String {
        format!("{}/verify/{code}", self.verification_base)
    }

    /// Certificate for the participating volunteer or an admin of the event's organization.
    pub async fn issue(
        &self,
        actor: &Actor,
        participation_id: &ParticipationId,
    ) -> QuantrackResult<Certificate> {
        let participation = self
            .store
            .get_participation(participation_id)
            .await?
            .ok_or_else(|| QuantrackError::not_found("participation", participation_id))?;

        let certificate = self.build(&participation).await?;
        let allowed = match actor {
            Actor::Volunteer(id) => *id == participation.volunteer_id,
            Actor::Admin(id) => self
                .store
                .get_admin(id)
                .await?
                .is_some_and(|admin| admin.organization_id == certificate.organization_id),
        };
        if !allowed {
            warn!(
                participation_id = %participation_id,
                actor = %actor,
                "certificate request rejected"
            );
            return Err(QuantrackError::forbidden(
                "certificate belongs to another volunteer or organization",
            ));
        }
        info!(
            participation_id = %participation_id,
            certificate_code = %certificate.certificate_code,
            actor = %actor,
            "certificate issued"
        );
        Ok(certificate)
    }

    /// Public lookup by certificate code.
    pub async fn verify(&self, code: &str) -> QuantrackResult<Certificate> {
        let code = code.trim().to_ascii_uppercase();
        let participation = self
            .store
            .find_participation_by_certificate(&code)
            .await?
            .ok_or_else(|| QuantrackError::NotFound(format!("certificate {code} not found")))?;
        self.build(&participation).await
    }

    async fn build(&self, participation: &ParticipationRecord) -> QuantrackResult<Certificate> {
        if participation.status != ParticipationStatus::Completed {
            return Err(QuantrackError::Conflict(format!(
                "participation is {}, certificates require completion",
                participation.status.as_str()
            )));
        }
        let completed_at = participation.completed_at.ok_or_else(|| {
            QuantrackError::Conflict("completed participation has no completion time".to_string())
        })?;
        let volunteer = self
            .store
            .get_volunteer(&participation.volunteer_id)
            .await?
            .ok_or_else(|| QuantrackError::not_found("volunteer", participation.volunteer_id))?;
        let event = self
            .store
            .get_event(&participation.event_id)
            .await?
            .ok_or_else(|| QuantrackError::not_found("event", participation.event_id))?;
        let organization = self
            .store
            .get_organization(&event.organization_id)
            .await?
            .ok_or_else(|| QuantrackError::not_found("organization", event.organization_id))?;

        let mut certificate = Certificate {
            certificate_code: participation.certificate_code.clone(),
            participation_id: participation.id,
            volunteer_id: volunteer.id,
            recipient_name: volunteer.username,
            event_id: event.id,
            event_name: event.name,
            event_date: event.date,
            organization_id: organization.id,
            organization_name: organization.name,
            hours: participation.hours_completed,
            completed_at,
            verification_url: self.verification_url(&participation.certificate_code),
            fingerprint: String::new(),
        };
        certificate.fingerprint = certificate.compute_fingerprint();
        Ok(certificate)
    }
}
