//! In-memory reference implementation of the storage traits.
//!
//! All tables live behind one lock so unique-index checks and cascades happen
//! atomically with the write that triggers them. Production deployments should
//! use the PostgreSQL adapter.

use crate::model::{
    AdminId, AdminRecord, EventId, EventRecord, MembershipId, MembershipRecord, MembershipStatus,
    OrganizationId, OrganizationRecord, ParticipationId, ParticipationRecord, ParticipationStatus,
    ParticipationUpdate, VolunteerId, VolunteerRecord,
};
use crate::traits::{
    EventStore, MembershipFilter, MembershipStore, OrganizationStore, ParticipationScope,
    ParticipationStore, QuantrackStorage, VolunteerStore,
};
use crate::{StorageError, StorageResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct Tables {
    volunteers: HashMap<VolunteerId, VolunteerRecord>,
    organizations: HashMap<OrganizationId, OrganizationRecord>,
    admins: HashMap<AdminId, AdminRecord>,
    events: HashMap<EventId, EventRecord>,
    memberships: HashMap<MembershipId, MembershipRecord>,
    participations: HashMap<ParticipationId, ParticipationRecord>,

    // unique indexes
    join_codes: HashMap<String, OrganizationId>,
    membership_pairs: HashMap<(VolunteerId, OrganizationId), MembershipId>,
    participation_pairs: HashMap<(VolunteerId, EventId), ParticipationId>,
    certificate_codes: HashMap<String, ParticipationId>,
}

impl Tables {
    fn email_taken(&self, email: &str) -> bool {
        let email = email.to_ascii_lowercase();
        self.volunteers
            .values()
            .any(|v| v.email.to_ascii_lowercase() == email)
            || self
                .admins
                .values()
                .any(|a| a.email.to_ascii_lowercase() == email)
    }

    fn remove_membership(&mut self, id: &MembershipId) -> Option<MembershipRecord> {
        let removed = self.memberships.remove(id)?;
        self.membership_pairs
            .remove(&(removed.volunteer_id, removed.organization_id));
        Some(removed)
    }

    fn remove_participation(&mut self, id: &ParticipationId) -> Option<ParticipationRecord> {
        let removed = self.participations.remove(id)?;
        self.participation_pairs
            .remove(&(removed.volunteer_id, removed.event_id));
        self.certificate_codes.remove(&removed.certificate_code);
        Some(removed)
    }

    fn remove_event(&mut self, id: &EventId) -> Option<EventRecord> {
        let removed = self.events.remove(id)?;
        let doomed = self
            .participations
            .values()
            .filter(|p| p.event_id == removed.id)
            .map(|p| p.id)
            .collect::<Vec<_>>();
        for participation_id in doomed {
            self.remove_participation(&participation_id);
        }
        Some(removed)
    }
}

/// In-memory storage adapter.
#[derive(Default)]
pub struct InMemoryQuantrackStorage {
    tables: RwLock<Tables>,
}

impl InMemoryQuantrackStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StorageResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StorageError::Backend("storage lock poisoned".to_string()))
    }

    fn write(&self) -> StorageResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StorageError::Backend("storage lock poisoned".to_string()))
    }
}

impl QuantrackStorage for InMemoryQuantrackStorage {
    fn backend_label(&self) -> &'static str {
        "memory"
    }
}

#[async_trait]
impl VolunteerStore for InMemoryQuantrackStorage {
    async fn insert_volunteer(&self, volunteer: VolunteerRecord) -> StorageResult<()> {
        let mut guard = self.write()?;
        if guard.volunteers.contains_key(&volunteer.id) {
            return Err(StorageError::Conflict(format!(
                "volunteer {} already exists",
                volunteer.id
            )));
        }
        if guard.email_taken(&volunteer.email) {
            return Err(StorageError::Conflict(format!(
                "email {} is already registered",
                volunteer.email
            )));
        }
        guard.volunteers.insert(volunteer.id, volunteer);
        Ok(())
    }

    async fn get_volunteer(&self, id: &VolunteerId) -> StorageResult<Option<VolunteerRecord>> {
        Ok(self.read()?.volunteers.get(id).cloned())
    }

    async fn delete_volunteer(&self, id: &VolunteerId) -> StorageResult<()> {
        let mut guard = self.write()?;
        if guard.volunteers.remove(id).is_none() {
            return Err(StorageError::NotFound(format!("volunteer {id} not found")));
        }
        let memberships = guard
            .memberships
            .values()
            .filter(|m| m.volunteer_id == *id)
            .map(|m| m.id)
            .collect::<Vec<_>>();
        for membership_id in memberships {
            guard.remove_membership(&membership_id);
        }
        let participations = guard
            .participations
            .values()
            .filter(|p| p.volunteer_id == *id)
            .map(|p| p.id)
            .collect::<Vec<_>>();
        for participation_id in participations {
            guard.remove_participation(&participation_id);
        }
        Ok(())
    }
}

#[async_trait]
impl OrganizationStore for InMemoryQuantrackStorage {
    async fn insert_organization(&self, organization: OrganizationRecord) -> StorageResult<()> {
        let mut guard = self.write()?;
        if guard.organizations.contains_key(&organization.id) {
            return Err(StorageError::Conflict(format!(
                "organization {} already exists",
                organization.id
            )));
        }
        if guard.join_codes.contains_key(&organization.join_code) {
            return Err(StorageError::Conflict(format!(
                "join code {} is already in use",
                organization.join_code
            )));
        }
        if let Some(number) = organization.registration_number.as_deref() {
            let taken = guard
                .organizations
                .values()
                .any(|o| o.registration_number.as_deref() == Some(number));
            if taken {
                return Err(StorageError::Conflict(format!(
                    "registration number {number} is already in use"
                )));
            }
        }
        guard
            .join_codes
            .insert(organization.join_code.clone(), organization.id);
        guard.organizations.insert(organization.id, organization);
        Ok(())
    }

    async fn get_organization(
        &self,
        id: &OrganizationId,
    ) -> StorageResult<Option<OrganizationRecord>> {
        Ok(self.read()?.organizations.get(id).cloned())
    }

    async fn find_organization_by_join_code(
        &self,
        join_code: &str,
    ) -> StorageResult<Option<OrganizationRecord>> {
        let guard = self.read()?;
        Ok(guard
            .join_codes
            .get(join_code)
            .and_then(|id| guard.organizations.get(id))
            .cloned())
    }

    async fn delete_organization(&self, id: &OrganizationId) -> StorageResult<()> {
        let mut guard = self.write()?;
        let removed = guard
            .organizations
            .remove(id)
            .ok_or_else(|| StorageError::NotFound(format!("organization {id} not found")))?;
        guard.join_codes.remove(&removed.join_code);
        guard.admins.retain(|_, admin| admin.organization_id != *id);

        let memberships = guard
            .memberships
            .values()
            .filter(|m| m.organization_id == *id)
            .map(|m| m.id)
            .collect::<Vec<_>>();
        for membership_id in memberships {
            guard.remove_membership(&membership_id);
        }
        let events = guard
            .events
            .values()
            .filter(|e| e.organization_id == *id)
            .map(|e| e.id)
            .collect::<Vec<_>>();
        for event_id in events {
            guard.remove_event(&event_id);
        }
        Ok(())
    }

    async fn insert_admin(&self, admin: AdminRecord) -> StorageResult<()> {
        let mut guard = self.write()?;
        if !guard.organizations.contains_key(&admin.organization_id) {
            return Err(StorageError::NotFound(format!(
                "organization {} not found",
                admin.organization_id
            )));
        }
        if guard.admins.contains_key(&admin.id) {
            return Err(StorageError::Conflict(format!(
                "admin {} already exists",
                admin.id
            )));
        }
        if guard.email_taken(&admin.email) {
            return Err(StorageError::Conflict(format!(
                "email {} is already registered",
                admin.email
            )));
        }
        guard.admins.insert(admin.id, admin);
        Ok(())
    }

    async fn get_admin(&self, id: &AdminId) -> StorageResult<Option<AdminRecord>> {
        Ok(self.read()?.admins.get(id).cloned())
    }
}

#[async_trait]
impl EventStore for InMemoryQuantrackStorage {
    async fn insert_event(&self, event: EventRecord) -> StorageResult<()> {
        let mut guard = self.write()?;
        if !guard.organizations.contains_key(&event.organization_id) {
            return Err(StorageError::NotFound(format!(
                "organization {} not found",
                event.organization_id
            )));
        }
        if guard.events.contains_key(&event.id) {
            return Err(StorageError::Conflict(format!(
                "event {} already exists",
                event.id
            )));
        }
        guard.events.insert(event.id, event);
        Ok(())
    }

    async fn get_event(&self, id: &EventId) -> StorageResult<Option<EventRecord>> {
        Ok(self.read()?.events.get(id).cloned())
    }

    async fn list_events(
        &self,
        organization_id: &OrganizationId,
    ) -> StorageResult<Vec<EventRecord>> {
        let guard = self.read()?;
        let mut values = guard
            .events
            .values()
            .filter(|e| e.organization_id == *organization_id)
            .cloned()
            .collect::<Vec<_>>();
        values.sort_by(|a, b| (a.date, a.created_at).cmp(&(b.date, b.created_at)));
        Ok(values)
    }

    async fn delete_event(&self, id: &EventId) -> StorageResult<()> {
        let mut guard = self.write()?;
        guard
            .remove_event(id)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(format!("event {id} not found")))
    }
}

#[async_trait]
impl MembershipStore for InMemoryQuantrackStorage {
    async fn insert_membership(&self, membership: MembershipRecord) -> StorageResult<()> {
        let mut guard = self.write()?;
        if !guard.volunteers.contains_key(&membership.volunteer_id) {
            return Err(StorageError::NotFound(format!(
                "volunteer {} not found",
                membership.volunteer_id
            )));
        }
        if !guard.organizations.contains_key(&membership.organization_id) {
            return Err(StorageError::NotFound(format!(
                "organization {} not found",
                membership.organization_id
            )));
        }
        let pair = (membership.volunteer_id, membership.organization_id);
        if guard.membership_pairs.contains_key(&pair)
            || guard.memberships.contains_key(&membership.id)
        {
            return Err(StorageError::Conflict(format!(
                "volunteer {} is already a member of organization {}",
                membership.volunteer_id, membership.organization_id
            )));
        }
        guard.membership_pairs.insert(pair, membership.id);
        guard.memberships.insert(membership.id, membership);
        Ok(())
    }

    async fn get_membership(&self, id: &MembershipId) -> StorageResult<Option<MembershipRecord>> {
        Ok(self.read()?.memberships.get(id).cloned())
    }

    async fn find_membership(
        &self,
        volunteer_id: &VolunteerId,
        organization_id: &OrganizationId,
    ) -> StorageResult<Option<MembershipRecord>> {
        let guard = self.read()?;
        Ok(guard
            .membership_pairs
            .get(&(*volunteer_id, *organization_id))
            .and_then(|id| guard.memberships.get(id))
            .cloned())
    }

    async fn list_memberships(
        &self,
        filter: MembershipFilter,
    ) -> StorageResult<Vec<MembershipRecord>> {
        let guard = self.read()?;
        let mut values = guard
            .memberships
            .values()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect::<Vec<_>>();
        values.sort_by(|a, b| a.joined_at.cmp(&b.joined_at));
        Ok(values)
    }

    async fn transition_membership(
        &self,
        id: &MembershipId,
        expected_from: MembershipStatus,
        to: MembershipStatus,
        updated_at: DateTime<Utc>,
    ) -> StorageResult<MembershipRecord> {
        let mut guard = self.write()?;
        let record = guard
            .memberships
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(format!("membership {id} not found")))?;

        if record.status != expected_from {
            return Err(StorageError::InvariantViolation(format!(
                "invalid membership transition: expected {}, found {}",
                expected_from.as_str(),
                record.status.as_str()
            )));
        }

        record.status = to;
        record.updated_at = updated_at;
        Ok(record.clone())
    }

    async fn delete_membership(&self, id: &MembershipId) -> StorageResult<()> {
        let mut guard = self.write()?;
        guard
            .remove_membership(id)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(format!("membership {id} not found")))
    }
}

#[async_trait]
impl ParticipationStore for InMemoryQuantrackStorage {
    async fn insert_participation(&self, participation: ParticipationRecord) -> StorageResult<()> {
        let mut guard = self.write()?;
        if !guard.volunteers.contains_key(&participation.volunteer_id) {
            return Err(StorageError::NotFound(format!(
                "volunteer {} not found",
                participation.volunteer_id
            )));
        }
        if !guard.events.contains_key(&participation.event_id) {
            return Err(StorageError::NotFound(format!(
                "event {} not found",
                participation.event_id
            )));
        }
        let pair = (participation.volunteer_id, participation.event_id);
        if guard.participation_pairs.contains_key(&pair)
            || guard.participations.contains_key(&participation.id)
        {
            return Err(StorageError::Conflict(format!(
                "volunteer {} already participates in event {}",
                participation.volunteer_id, participation.event_id
            )));
        }
        if guard
            .certificate_codes
            .contains_key(&participation.certificate_code)
        {
            return Err(StorageError::Conflict(format!(
                "certificate code {} is already assigned",
                participation.certificate_code
            )));
        }
        guard.participation_pairs.insert(pair, participation.id);
        guard
            .certificate_codes
            .insert(participation.certificate_code.clone(), participation.id);
        guard.participations.insert(participation.id, participation);
        Ok(())
    }

    async fn get_participation(
        &self,
        id: &ParticipationId,
    ) -> StorageResult<Option<ParticipationRecord>> {
        Ok(self.read()?.participations.get(id).cloned())
    }

    async fn find_participation(
        &self,
        volunteer_id: &VolunteerId,
        event_id: &EventId,
    ) -> StorageResult<Option<ParticipationRecord>> {
        let guard = self.read()?;
        Ok(guard
            .participation_pairs
            .get(&(*volunteer_id, *event_id))
            .and_then(|id| guard.participations.get(id))
            .cloned())
    }

    async fn find_participation_by_certificate(
        &self,
        certificate_code: &str,
    ) -> StorageResult<Option<ParticipationRecord>> {
        let guard = self.read()?;
        Ok(guard
            .certificate_codes
            .get(certificate_code)
            .and_then(|id| guard.participations.get(id))
            .cloned())
    }

    async fn transition_participation(
        &self,
        id: &ParticipationId,
        expected_from: ParticipationStatus,
        update: ParticipationUpdate,
    ) -> StorageResult<ParticipationRecord> {
        let mut guard = self.write()?;
        let record = guard
            .participations
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(format!("participation {id} not found")))?;

        if record.status != expected_from {
            return Err(StorageError::InvariantViolation(format!(
                "invalid participation transition: expected {}, found {}",
                expected_from.as_str(),
                record.status.as_str()
            )));
        }

        record.status = update.status;
        record.hours_completed = update.hours_completed;
        record.completed_at = update.completed_at;
        record.updated_at = update.updated_at;
        Ok(record.clone())
    }

    async fn list_participations(
        &self,
        scope: ParticipationScope,
    ) -> StorageResult<Vec<ParticipationRecord>> {
        let guard = self.read()?;
        let org_events: HashSet<EventId> = match scope {
            ParticipationScope::Organization(organization_id) => guard
                .events
                .values()
                .filter(|e| e.organization_id == organization_id)
                .map(|e| e.id)
                .collect(),
            _ => HashSet::new(),
        };

        let mut values = guard
            .participations
            .values()
            .filter(|p| match scope {
                ParticipationScope::All => true,
                ParticipationScope::Volunteer(id) => p.volunteer_id == id,
                ParticipationScope::Event(id) => p.event_id == id,
                ParticipationScope::Organization(_) => org_events.contains(&p.event_id),
            })
            .cloned()
            .collect::<Vec<_>>();
        values.sort_by(|a, b| a.joined_at.cmp(&b.joined_at));
        Ok(values)
    }
}
