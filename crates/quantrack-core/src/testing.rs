//! Shared fixture for the in-crate tests.

use crate::membership::MembershipManager;
use crate::participation::ParticipationManager;
use crate::registry::{NewAdmin, NewEvent, NewOrganization, NewVolunteer, Registry};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use quantrack_store::{
    AdminId, AdminRecord, EventId, EventRecord, EventStore, Hours, InMemoryQuantrackStorage,
    MembershipFilter, MembershipId, MembershipRecord, MembershipStatus, MembershipStore,
    OrganizationId, OrganizationRecord, OrganizationStore, ParticipationId, ParticipationRecord,
    ParticipationScope, ParticipationStatus, ParticipationStore, ParticipationUpdate,
    QuantrackStorage, StorageError, StorageResult, VolunteerId, VolunteerRecord, VolunteerStore,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub(crate) struct Fixture {
    pub store: Arc<dyn QuantrackStorage>,
    pub registry: Registry,
    pub memberships: MembershipManager,
    pub participations: ParticipationManager,
    pub org: OrganizationRecord,
    pub admin: AdminRecord,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with_store(Arc::new(InMemoryQuantrackStorage::new())).await
    }

    /// Fixture over a [`RacingStore`], returned alongside for steering.
    pub async fn racing() -> (Self, Arc<RacingStore>) {
        let racing = Arc::new(RacingStore::default());
        (Self::with_store(racing.clone()).await, racing)
    }

    pub async fn with_store(store: Arc<dyn QuantrackStorage>) -> Self {
        let registry = Registry::new(store.clone());
        let (org, admin) = organization_with_admin(&registry, "harbor").await;
        Self {
            memberships: MembershipManager::new(store.clone()),
            participations: ParticipationManager::new(store.clone()),
            store,
            registry,
            org,
            admin,
        }
    }

    pub async fn volunteer(&self, name: &str) -> VolunteerRecord {
        self.registry
            .register_volunteer(NewVolunteer {
                username: name.to_string(),
                email: format!("{name}@example.org"),
                date_of_birth: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
                school_or_organization: String::new(),
            })
            .await
            .unwrap()
    }

    pub async fn event(&self, is_public: bool, hours_hundredths: u64) -> EventRecord {
        self.registry
            .create_event(
                &self.admin.id,
                NewEvent {
                    name: "Beach sweep".to_string(),
                    description: "Litter pick on the north shore".to_string(),
                    date: NaiveDate::from_ymd_opt(2030, 7, 1).unwrap(),
                    time: None,
                    location: "North beach".to_string(),
                    is_public,
                    service_hours: Hours::from_hundredths(hours_hundredths),
                },
            )
            .await
            .unwrap()
    }

    pub async fn other_organization(&self) -> (OrganizationRecord, AdminRecord) {
        organization_with_admin(&self.registry, "valley").await
    }
}

async fn organization_with_admin(
    registry: &Registry,
    slug: &str,
) -> (OrganizationRecord, AdminRecord) {
    let org = registry
        .register_organization(NewOrganization {
            name: format!("{slug} volunteers"),
            date_of_establishment: NaiveDate::from_ymd_opt(2010, 5, 1).unwrap(),
            registration_number: None,
            organization_type: "nonprofit".to_string(),
            website: None,
            description: None,
            address: "1 Main St".to_string(),
            city: "Springfield".to_string(),
            country: "USA".to_string(),
        })
        .await
        .unwrap();
    let admin = registry
        .register_admin(NewAdmin {
            username: format!("{slug}-admin"),
            email: format!("admin@{slug}.example.org"),
            organization_id: org.id,
            job_title: "Coordinator".to_string(),
            phone_number: String::new(),
        })
        .await
        .unwrap();
    (org, admin)
}

/// In-memory store that replays lost races on demand.
///
/// Hidden lookups make `find_membership`/`find_participation` report nothing,
/// as if a concurrent writer had not committed yet, so the following insert
/// meets the unique index. Forced collisions fail participation inserts the
/// way a duplicate certificate code does.
#[derive(Default)]
pub(crate) struct RacingStore {
    inner: InMemoryQuantrackStorage,
    hidden_lookups: AtomicUsize,
    forced_code_collisions: AtomicUsize,
    participation_inserts: AtomicUsize,
}

impl RacingStore {
    pub fn hide_next_lookups(&self, count: usize) {
        self.hidden_lookups.store(count, Ordering::SeqCst);
    }

    pub fn force_code_collisions(&self, count: usize) {
        self.forced_code_collisions.store(count, Ordering::SeqCst);
    }

    /// Every `insert_participation` call seen, forced collisions included.
    pub fn participation_inserts(&self) -> usize {
        self.participation_inserts.load(Ordering::SeqCst)
    }

    fn take(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl QuantrackStorage for RacingStore {
    fn backend_label(&self) -> &'static str {
        "racing"
    }
}

#[async_trait]
impl VolunteerStore for RacingStore {
    async fn insert_volunteer(&self, volunteer: VolunteerRecord) -> StorageResult<()> {
        self.inner.insert_volunteer(volunteer).await
    }

    async fn get_volunteer(&self, id: &VolunteerId) -> StorageResult<Option<VolunteerRecord>> {
        self.inner.get_volunteer(id).await
    }

    async fn delete_volunteer(&self, id: &VolunteerId) -> StorageResult<()> {
        self.inner.delete_volunteer(id).await
    }
}

#[async_trait]
impl OrganizationStore for RacingStore {
    async fn insert_organization(&self, organization: OrganizationRecord) -> StorageResult<()> {
        self.inner.insert_organization(organization).await
    }

    async fn get_organization(
        &self,
        id: &OrganizationId,
    ) -> StorageResult<Option<OrganizationRecord>> {
        self.inner.get_organization(id).await
    }

    async fn find_organization_by_join_code(
        &self,
        join_code: &str,
    ) -> StorageResult<Option<OrganizationRecord>> {
        self.inner.find_organization_by_join_code(join_code).await
    }

    async fn delete_organization(&self, id: &OrganizationId) -> StorageResult<()> {
        self.inner.delete_organization(id).await
    }

    async fn insert_admin(&self, admin: AdminRecord) -> StorageResult<()> {
        self.inner.insert_admin(admin).await
    }

    async fn get_admin(&self, id: &AdminId) -> StorageResult<Option<AdminRecord>> {
        self.inner.get_admin(id).await
    }
}

#[async_trait]
impl EventStore for RacingStore {
    async fn insert_event(&self, event: EventRecord) -> StorageResult<()> {
        self.inner.insert_event(event).await
    }

    async fn get_event(&self, id: &EventId) -> StorageResult<Option<EventRecord>> {
        self.inner.get_event(id).await
    }

    async fn list_events(
        &self,
        organization_id: &OrganizationId,
    ) -> StorageResult<Vec<EventRecord>> {
        self.inner.list_events(organization_id).await
    }

    async fn delete_event(&self, id: &EventId) -> StorageResult<()> {
        self.inner.delete_event(id).await
    }
}

#[async_trait]
impl MembershipStore for RacingStore {
    async fn insert_membership(&self, membership: MembershipRecord) -> StorageResult<()> {
        self.inner.insert_membership(membership).await
    }

    async fn get_membership(&self, id: &MembershipId) -> StorageResult<Option<MembershipRecord>> {
        self.inner.get_membership(id).await
    }

    async fn find_membership(
        &self,
        volunteer_id: &VolunteerId,
        organization_id: &OrganizationId,
    ) -> StorageResult<Option<MembershipRecord>> {
        if Self::take(&self.hidden_lookups) {
            return Ok(None);
        }
        self.inner.find_membership(volunteer_id, organization_id).await
    }

    async fn list_memberships(
        &self,
        filter: MembershipFilter,
    ) -> StorageResult<Vec<MembershipRecord>> {
        self.inner.list_memberships(filter).await
    }

    async fn transition_membership(
        &self,
        id: &MembershipId,
        expected_from: MembershipStatus,
        to: MembershipStatus,
        updated_at: DateTime<Utc>,
    ) -> StorageResult<MembershipRecord> {
        self.inner
            .transition_membership(id, expected_from, to, updated_at)
            .await
    }

    async fn delete_membership(&self, id: &MembershipId) -> StorageResult<()> {
        self.inner.delete_membership(id).await
    }
}

#[async_trait]
impl ParticipationStore for RacingStore {
    async fn insert_participation(&self, participation: ParticipationRecord) -> StorageResult<()> {
        self.participation_inserts.fetch_add(1, Ordering::SeqCst);
        if Self::take(&self.forced_code_collisions) {
            return Err(StorageError::Conflict(format!(
                "certificate code {} already issued",
                participation.certificate_code
            )));
        }
        self.inner.insert_participation(participation).await
    }

    async fn get_participation(
        &self,
        id: &ParticipationId,
    ) -> StorageResult<Option<ParticipationRecord>> {
        self.inner.get_participation(id).await
    }

    async fn find_participation(
        &self,
        volunteer_id: &VolunteerId,
        event_id: &EventId,
    ) -> StorageResult<Option<ParticipationRecord>> {
        if Self::take(&self.hidden_lookups) {
            return Ok(None);
        }
        self.inner.find_participation(volunteer_id, event_id).await
    }

    async fn find_participation_by_certificate(
        &self,
        certificate_code: &str,
    ) -> StorageResult<Option<ParticipationRecord>> {
        self.inner
            .find_participation_by_certificate(certificate_code)
            .await
    }

    async fn transition_participation(
        &self,
        id: &ParticipationId,
        expected_from: ParticipationStatus,
        update: ParticipationUpdate,
    ) -> StorageResult<ParticipationRecord> {
        self.inner
            .transition_participation(id, expected_from, update)
            .await
    }

    async fn list_participations(
        &self,
        scope: ParticipationScope,
    ) -> StorageResult<Vec<ParticipationRecord>> {
        self.inner.list_participations(scope).await
    }
}
