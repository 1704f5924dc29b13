//! Participation lifecycle for (volunteer, event) pairs.
//!
//! `joined` is the only non-terminal state. `completed` and `cancelled` never
//! re-open, and every status change goes through the store's guarded
//! transition so a concurrent writer surfaces as `Conflict`.

use crate::certificate::generate_certificate_code;
use crate::error::{QuantrackError, QuantrackResult};
use crate::registry::require_admin;
use chrono::Utc;
use quantrack_store::{
    AdminId, EventId, EventRecord, Hours, MembershipStatus, ParticipationId,
    ParticipationRecord, ParticipationScope, ParticipationStatus, ParticipationUpdate,
    QuantrackStorage, StorageError, VolunteerId,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

const CERTIFICATE_CODE_ATTEMPTS: usize = 3;

#[derive(Clone)]
pub struct ParticipationManager {
    store: Arc<dyn QuantrackStorage>,
}

impl ParticipationManager {
    pub fn new(store: Arc<dyn QuantrackStorage>) -> Self {
        Self { store }
    }

    pub async fn join_event(
        &self,
        volunteer_id: &VolunteerId,
        event_id: &EventId,
    ) -> QuantrackResult<ParticipationRecord> {
        if self.store.get_volunteer(volunteer_id).await?.is_none() {
            return Err(QuantrackError::not_found("volunteer", volunteer_id));
        }
        let event = self.event(event_id).await?;

        if !event.is_public {
            let active = self
                .store
                .find_membership(volunteer_id, &event.organization_id)
                .await?
                .is_some_and(|m| m.status == MembershipStatus::Active);
            if !active {
                warn!(
                    volunteer_id = %volunteer_id,
                    event_id = %event_id,
                    "join rejected: private event requires active membership"
                );
                return Err(QuantrackError::forbidden(
                    "event is restricted to active members of its organization",
                ));
            }
        }

        if self
            .store
            .find_participation(volunteer_id, event_id)
            .await?
            .is_some()
        {
            warn!(
                volunteer_id = %volunteer_id,
                event_id = %event_id,
                "join rejected: already participating"
            );
            return Err(already_joined());
        }

        for attempt in 1..=CERTIFICATE_CODE_ATTEMPTS {
            let now = Utc::now();
            let participation = ParticipationRecord {
                id: ParticipationId::generate(),
                volunteer_id: *volunteer_id,
                event_id: *event_id,
                status: ParticipationStatus::Joined,
                hours_completed: Hours::ZERO,
                certificate_code: generate_certificate_code(),
                joined_at: now,
                completed_at: None,
                updated_at: now,
            };
            match self.store.insert_participation(participation.clone()).await {
                Ok(()) => {
                    info!(
                        participation_id = %participation.id,
                        volunteer_id = %volunteer_id,
                        event_id = %event_id,
                        "participation joined"
                    );
                    return Ok(participation);
                }
                Err(StorageError::Conflict(msg)) => {
                    // Either a concurrent join of the same pair or a code collision.
                    if self
                        .store
                        .find_participation(volunteer_id, event_id)
                        .await?
                        .is_some()
                    {
                        return Err(already_joined());
                    }
                    debug!(attempt, %msg, "certificate code collision, regenerating");
                }
                Err(other) => return Err(other.into()),
            }
        }
        Err(QuantrackError::Conflict(
            "could not allocate a unique certificate code".to_string(),
        ))
    }

    pub async fn cancel(
        &self,
        volunteer_id: &VolunteerId,
        event_id: &EventId,
    ) -> QuantrackResult<ParticipationRecord> {
        let participation = self
            .store
            .find_participation(volunteer_id, event_id)
            .await?
            .ok_or_else(|| {
                QuantrackError::NotFound("not participating in this event".to_string())
            })?;
        expect_joined(&participation, "cancel")?;

        let now = Utc::now();
        let updated = self
            .store
            .transition_participation(
                &participation.id,
                ParticipationStatus::Joined,
                ParticipationUpdate {
                    status: ParticipationStatus::Cancelled,
                    hours_completed: participation.hours_completed,
                    completed_at: None,
                    updated_at: now,
                },
            )
            .await?;
        info!(
            participation_id = %updated.id,
            volunteer_id = %volunteer_id,
            event_id = %event_id,
            "participation cancelled"
        );
        Ok(updated)
    }

    /// Mark a participation completed. Hours default to the event's service hours.
    pub async fn complete(
        &self,
        admin_id: &AdminId,
        participation_id: &ParticipationId,
        hours: Option<Hours>,
    ) -> QuantrackResult<ParticipationRecord> {
        let admin = require_admin(self.store.as_ref(), admin_id).await?;
        let participation = self
            .store
            .get_participation(participation_id)
            .await?
            .ok_or_else(|| QuantrackError::not_found("participation", participation_id))?;
        let event = self.event(&participation.event_id).await?;
        if event.organization_id != admin.organization_id {
            warn!(
                participation_id = %participation_id,
                admin_id = %admin_id,
                "completion rejected: event belongs to a different organization"
            );
            return Err(QuantrackError::forbidden(
                "event belongs to a different organization",
            ));
        }
        expect_joined(&participation, "complete")?;

        let hours = hours.unwrap_or(event.service_hours);
        let now = Utc::now();
        let updated = self
            .store
            .transition_participation(
                &participation.id,
                ParticipationStatus::Joined,
                ParticipationUpdate {
                    status: ParticipationStatus::Completed,
                    hours_completed: hours,
                    completed_at: Some(now),
                    updated_at: now,
                },
            )
            .await?;
        info!(
            participation_id = %updated.id,
            admin_id = %admin_id,
            hours = %hours,
            "participation completed"
        );
        Ok(updated)
    }

    pub async fn participations_for_event(
        &self,
        admin_id: &AdminId,
        event_id: &EventId,
    ) -> QuantrackResult<Vec<ParticipationRecord>> {
        let admin = require_admin(self.store.as_ref(), admin_id).await?;
        let event = self.event(event_id).await?;
        if event.organization_id != admin.organization_id {
            return Err(QuantrackError::forbidden(
                "event belongs to a different organization",
            ));
        }
        Ok(self
            .store
            .list_participations(ParticipationScope::Event(*event_id))
            .await?)
    }

    pub async fn participations_of(
        &self,
        volunteer_id: &VolunteerId,
    ) -> QuantrackResult<Vec<ParticipationRecord>> {
        if self.store.get_volunteer(volunteer_id).await?.is_none() {
            return Err(QuantrackError::not_found("volunteer", volunteer_id));
        }
        Ok(self
            .store
            .list_participations(ParticipationScope::Volunteer(*volunteer_id))
            .await?)
    }

    async fn event(&self, id: &EventId) -> QuantrackResult<EventRecord> {
        self.store
            .get_event(id)
            .await?
            .ok_or_else(|| QuantrackError::not_found("event", id))
    }
}

fn already_joined() -> QuantrackError {
    QuantrackError::Conflict("already joined this event".to_string())
}

fn expect_joined(participation: &ParticipationRecord, action: &str) -> QuantrackResult<()> {
    if participation.status.is_terminal() {
        warn!(
            participation_id = %participation.id,
            status = participation.status.as_str(),
            action,
            "participation transition rejected"
        );
        return Err(QuantrackError::Conflict(format!(
            "cannot {action} a participation that is {}",
            participation.status.as_str()
        )));
    }
    Ok(())
}
