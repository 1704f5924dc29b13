use crate::model::{
    AdminId, AdminRecord, EventId, EventRecord, MembershipId, MembershipRecord, MembershipStatus,
    OrganizationId, OrganizationRecord, ParticipationId, ParticipationRecord, ParticipationStatus,
    ParticipationUpdate, VolunteerId, VolunteerRecord,
};
use crate::StorageResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Filter for membership listings. Unset fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MembershipFilter {
    pub volunteer_id: Option<VolunteerId>,
    pub organization_id: Option<OrganizationId>,
    pub status: Option<MembershipStatus>,
}

impl MembershipFilter {
    pub fn for_volunteer(volunteer_id: VolunteerId) -> Self {
        Self {
            volunteer_id: Some(volunteer_id),
            ..Self::default()
        }
    }

    pub fn for_organization(organization_id: OrganizationId) -> Self {
        Self {
            organization_id: Some(organization_id),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: MembershipStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn matches(&self, record: &MembershipRecord) -> bool {
        self.volunteer_id.map_or(true, |id| record.volunteer_id == id)
            && self
                .organization_id
                .map_or(true, |id| record.organization_id == id)
            && self.status.map_or(true, |status| record.status == status)
    }
}

/// Which participation rows an aggregate or listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipationScope {
    All,
    Volunteer(VolunteerId),
    Event(EventId),
    /// Every participation on any event owned by the organization.
    Organization(OrganizationId),
}

/// Storage interface for volunteer profiles.
#[async_trait]
pub trait VolunteerStore: Send + Sync {
    /// Insert a volunteer. Emails are unique.
    async fn insert_volunteer(&self, volunteer: VolunteerRecord) -> StorageResult<()>;

    async fn get_volunteer(&self, id: &VolunteerId) -> StorageResult<Option<VolunteerRecord>>;

    /// Delete a volunteer together with its memberships and participations.
    async fn delete_volunteer(&self, id: &VolunteerId) -> StorageResult<()>;
}

/// Storage interface for organizations and their admins.
#[async_trait]
pub trait OrganizationStore: Send + Sync {
    /// Insert an organization. Join codes and registration numbers are unique.
    async fn insert_organization(&self, organization: OrganizationRecord) -> StorageResult<()>;

    async fn get_organization(
        &self,
        id: &OrganizationId,
    ) -> StorageResult<Option<OrganizationRecord>>;

    async fn find_organization_by_join_code(
        &self,
        join_code: &str,
    ) -> StorageResult<Option<OrganizationRecord>>;

    /// Delete an organization and cascade to admins, events, memberships and participations.
    async fn delete_organization(&self, id: &OrganizationId) -> StorageResult<()>;

    /// Insert an admin for an existing organization. Emails are unique.
    async fn insert_admin(&self, admin: AdminRecord) -> StorageResult<()>;

    async fn get_admin(&self, id: &AdminId) -> StorageResult<Option<AdminRecord>>;
}

/// Storage interface for events.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Insert an event for an existing organization.
    async fn insert_event(&self, event: EventRecord) -> StorageResult<()>;

    async fn get_event(&self, id: &EventId) -> StorageResult<Option<EventRecord>>;

    /// Events of one organization ordered by date, then creation time.
    async fn list_events(&self, organization_id: &OrganizationId)
        -> StorageResult<Vec<EventRecord>>;

    /// Delete an event together with its participations.
    async fn delete_event(&self, id: &EventId) -> StorageResult<()>;
}

/// Storage interface for (volunteer, organization) memberships.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Insert a membership. A second row for the same pair is a `Conflict`.
    async fn insert_membership(&self, membership: MembershipRecord) -> StorageResult<()>;

    async fn get_membership(&self, id: &MembershipId) -> StorageResult<Option<MembershipRecord>>;

    async fn find_membership(
        &self,
        volunteer_id: &VolunteerId,
        organization_id: &OrganizationId,
    ) -> StorageResult<Option<MembershipRecord>>;

    /// Matching memberships, oldest first.
    async fn list_memberships(&self, filter: MembershipFilter)
        -> StorageResult<Vec<MembershipRecord>>;

    /// Move a membership from `expected_from` to `to`.
    ///
    /// Fails with `InvariantViolation` when the stored status differs from `expected_from`.
    async fn transition_membership(
        &self,
        id: &MembershipId,
        expected_from: MembershipStatus,
        to: MembershipStatus,
        updated_at: DateTime<Utc>,
    ) -> StorageResult<MembershipRecord>;

    async fn delete_membership(&self, id: &MembershipId) -> StorageResult<()>;
}

/// Storage interface for (volunteer, event) participations.
#[async_trait]
pub trait ParticipationStore: Send + Sync {
    /// Insert a participation. Duplicate pairs and duplicate certificate codes are `Conflict`s.
    async fn insert_participation(&self, participation: ParticipationRecord) -> StorageResult<()>;

    async fn get_participation(
        &self,
        id: &ParticipationId,
    ) -> StorageResult<Option<ParticipationRecord>>;

    async fn find_participation(
        &self,
        volunteer_id: &VolunteerId,
        event_id: &EventId,
    ) -> StorageResult<Option<ParticipationRecord>>;

    async fn find_participation_by_certificate(
        &self,
        certificate_code: &str,
    ) -> StorageResult<Option<ParticipationRecord>>;

    /// Apply `update` if the stored status still equals `expected_from`.
    async fn transition_participation(
        &self,
        id: &ParticipationId,
        expected_from: ParticipationStatus,
        update: ParticipationUpdate,
    ) -> StorageResult<ParticipationRecord>;

    /// Participations inside `scope`, oldest first.
    async fn list_participations(
        &self,
        scope: ParticipationScope,
    ) -> StorageResult<Vec<ParticipationRecord>>;
}

/// Unified storage bundle used by the core managers.
pub trait QuantrackStorage:
    VolunteerStore
    + OrganizationStore
    + EventStore
    + MembershipStore
    + ParticipationStore
    + Send
    + Sync
{
    /// Backend label for health reporting.
    fn backend_label(&self) -> &'static str;
}
