//! Creation and lookup of volunteers, organizations, admins and events.
//!
//! Only what the membership and participation lifecycle needs; profile
//! updates live outside this crate.

use crate::error::{QuantrackError, QuantrackResult};
use chrono::{Datelike, NaiveDate, NaiveTime, Utc};
use quantrack_store::{
    AdminId, AdminRecord, EventId, EventRecord, Hours, OrganizationId, OrganizationRecord,
    QuantrackStorage, VolunteerId, VolunteerRecord,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Minimum volunteer age in whole years.
pub const MIN_VOLUNTEER_AGE: u32 = 13;

/// Largest per-event service hours (five digits, two of them decimals).
pub const MAX_EVENT_SERVICE_HOURS: Hours = Hours::from_hundredths(99_999);

const JOIN_CODE_LEN: usize = 10;
const JOIN_CODE_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewVolunteer {
    pub username: String,
    pub email: String,
    pub date_of_birth: NaiveDate,
    #[serde(default)]
    pub school_or_organization: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrganization {
    pub name: String,
    pub date_of_establishment: NaiveDate,
    #[serde(default)]
    pub registration_number: Option<String>,
    pub organization_type: String,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub address: String,
    pub city: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAdmin {
    pub username: String,
    pub email: String,
    pub organization_id: OrganizationId,
    #[serde(default)]
    pub job_title: String,
    #[serde(default)]
    pub phone_number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub time: Option<NaiveTime>,
    pub location: String,
    #[serde(default = "default_is_public")]
    pub is_public: bool,
    pub service_hours: Hours,
}

fn default_is_public() -> bool {
    true
}

/// Registry over the shared store.
#[derive(Clone)]
pub struct Registry {
    store: Arc<dyn QuantrackStorage>,
}

impl Registry {
    pub fn new(store: Arc<dyn QuantrackStorage>) -> Self {
        Self { store }
    }

    pub async fn register_volunteer(
        &self,
        input: NewVolunteer,
    ) -> QuantrackResult<VolunteerRecord> {
        validate_volunteer(&input, Utc::now().date_naive())?;
        let record = VolunteerRecord {
            id: VolunteerId::generate(),
            username: input.username.trim().to_string(),
            email: input.email.trim().to_string(),
            date_of_birth: input.date_of_birth,
            school_or_organization: input.school_or_organization.trim().to_string(),
            created_at: Utc::now(),
        };
        self.store.insert_volunteer(record.clone()).await?;
        info!(volunteer_id = %record.id, "volunteer registered");
        Ok(record)
    }

    pub async fn register_organization(
        &self,
        input: NewOrganization,
    ) -> QuantrackResult<OrganizationRecord> {
        validate_organization(&input, Utc::now().date_naive())?;
        let join_code = self.fresh_join_code().await?;
        let record = OrganizationRecord {
            id: OrganizationId::generate(),
            name: input.name.trim().to_string(),
            date_of_establishment: input.date_of_establishment,
            registration_number: non_blank(input.registration_number),
            organization_type: input.organization_type.trim().to_string(),
            website: non_blank(input.website),
            description: non_blank(input.description),
            address: input.address.trim().to_string(),
            city: input.city.trim().to_string(),
            country: input.country.trim().to_string(),
            join_code,
            created_at: Utc::now(),
        };
        self.store.insert_organization(record.clone()).await?;
        info!(
            organization_id = %record.id,
            join_code = %record.join_code,
            "organization registered"
        );
        Ok(record)
    }

    pub async fn register_admin(&self, input: NewAdmin) -> QuantrackResult<AdminRecord> {
        require_text("username", &input.username)?;
        require_email(&input.email)?;
        let record = AdminRecord {
            id: AdminId::generate(),
            username: input.username.trim().to_string(),
            email: input.email.trim().to_string(),
            organization_id: input.organization_id,
            job_title: input.job_title.trim().to_string(),
            phone_number: input.phone_number.trim().to_string(),
            created_at: Utc::now(),
        };
        self.store.insert_admin(record.clone()).await?;
        info!(
            admin_id = %record.id,
            organization_id = %record.organization_id,
            "admin registered"
        );
        Ok(record)
    }

    /// Create an event owned by the admin's organization.
    pub async fn create_event(
        &self,
        admin: &AdminId,
        input: NewEvent,
    ) -> QuantrackResult<EventRecord> {
        let admin = require_admin(self.store.as_ref(), admin).await?;
        validate_event(&input)?;
        let record = EventRecord {
            id: EventId::generate(),
            organization_id: admin.organization_id,
            name: input.name.trim().to_string(),
            description: input.description,
            date: input.date,
            time: input.time,
            location: input.location.trim().to_string(),
            is_public: input.is_public,
            service_hours: input.service_hours,
            created_at: Utc::now(),
        };
        self.store.insert_event(record.clone()).await?;
        info!(
            event_id = %record.id,
            organization_id = %record.organization_id,
            is_public = record.is_public,
            "event created"
        );
        Ok(record)
    }

    /// Delete an event and, through the store cascade, its participations.
    pub async fn delete_event(&self, admin: &AdminId, event_id: &EventId) -> QuantrackResult<()> {
        let admin = require_admin(self.store.as_ref(), admin).await?;
        let event = self.event(event_id).await?;
        if event.organization_id != admin.organization_id {
            return Err(QuantrackError::forbidden(
                "event belongs to a different organization",
            ));
        }
        self.store.delete_event(event_id).await?;
        info!(event_id = %event_id, admin_id = %admin.id, "event deleted");
        Ok(())
    }

    pub async fn list_events(
        &self,
        organization_id: &OrganizationId,
    ) -> QuantrackResult<Vec<EventRecord>> {
        self.organization(organization_id).await?;
        Ok(self.store.list_events(organization_id).await?)
    }

    pub async fn volunteer(&self, id: &VolunteerId) -> QuantrackResult<VolunteerRecord> {
        self.store
            .get_volunteer(id)
            .await?
            .ok_or_else(|| QuantrackError::not_found("volunteer", id))
    }

    pub async fn organization(&self, id: &OrganizationId) -> QuantrackResult<OrganizationRecord> {
        self.store
            .get_organization(id)
            .await?
            .ok_or_else(|| QuantrackError::not_found("organization", id))
    }

    pub async fn admin(&self, id: &AdminId) -> QuantrackResult<AdminRecord> {
        self.store
            .get_admin(id)
            .await?
            .ok_or_else(|| QuantrackError::not_found("admin", id))
    }

    pub async fn event(&self, id: &EventId) -> QuantrackResult<EventRecord> {
        self.store
            .get_event(id)
            .await?
            .ok_or_else(|| QuantrackError::not_found("event", id))
    }

    async fn fresh_join_code(&self) -> QuantrackResult<String> {
        for _ in 0..JOIN_CODE_ATTEMPTS {
            let code = generate_join_code();
            if self
                .store
                .find_organization_by_join_code(&code)
                .await?
                .is_none()
            {
                return Ok(code);
            }
        }
        Err(QuantrackError::Conflict(
            "could not allocate a unique join code".to_string(),
        ))
    }
}

/// Resolve an acting admin. Unknown admins are treated as unauthorized callers.
pub(crate) async fn require_admin(
    store: &dyn QuantrackStorage,
    admin_id: &AdminId,
) -> QuantrackResult<AdminRecord> {
    store
        .get_admin(admin_id)
        .await?
        .ok_or_else(|| QuantrackError::forbidden(format!("admin {admin_id} is not registered")))
}

/// Ten upper-case hex characters.
pub fn generate_join_code() -> String {
    let raw = Uuid::new_v4().simple().to_string();
    raw[..JOIN_CODE_LEN].to_ascii_uppercase()
}

/// Whole years between `born` and `today`.
pub fn age_on(born: NaiveDate, today: NaiveDate) -> u32 {
    let mut years = today.year() - born.year();
    if (today.month(), today.day()) < (born.month(), born.day()) {
        years -= 1;
    }
    years.max(0) as u32
}

pub fn validate_volunteer(input: &NewVolunteer, today: NaiveDate) -> QuantrackResult<()> {
    require_text("username", &input.username)?;
    require_email(&input.email)?;
    if input.date_of_birth > today {
        return Err(QuantrackError::validation(
            "date of birth cannot be in the future",
        ));
    }
    if age_on(input.date_of_birth, today) < MIN_VOLUNTEER_AGE {
        return Err(QuantrackError::validation(format!(
            "volunteer must be at least {MIN_VOLUNTEER_AGE} years old"
        )));
    }
    Ok(())
}

pub fn validate_organization(input: &NewOrganization, today: NaiveDate) -> QuantrackResult<()> {
    require_text("name", &input.name)?;
    require_text("organization_type", &input.organization_type)?;
    require_text("address", &input.address)?;
    require_text("city", &input.city)?;
    require_text("country", &input.country)?;
    if input.date_of_establishment > today {
        return Err(QuantrackError::validation(
            "date of establishment cannot be in the future",
        ));
    }
    Ok(())
}

pub fn validate_event(input: &NewEvent) -> QuantrackResult<()> {
    require_text("name", &input.name)?;
    require_text("location", &input.location)?;
    if input.service_hours > MAX_EVENT_SERVICE_HOURS {
        return Err(QuantrackError::validation(format!(
            "service hours must not exceed {MAX_EVENT_SERVICE_HOURS}"
        )));
    }
    Ok(())
}

fn require_text(field: &str, value: &str) -> QuantrackResult<()> {
    if value.trim().is_empty() {
        return Err(QuantrackError::validation(format!("{field} is required")));
    }
    Ok(())
}

fn require_email(value: &str) -> QuantrackResult<()> {
    let value = value.trim();
    match value.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(QuantrackError::validation(format!(
            "`{value}` is not a valid email address"
        ))),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quantrack_store::InMemoryQuantrackStorage;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn volunteer_input(dob: NaiveDate) -> NewVolunteer {
        NewVolunteer {
            username: "ava".into(),
            email: "ava@example.org".into(),
            date_of_birth: dob,
            school_or_organization: "Central High".into(),
        }
    }

    fn organization_input() -> NewOrganization {
        NewOrganization {
            name: "Harbor Cleanup".into(),
            date_of_establishment: date(2015, 3, 1),
            registration_number: Some("  ".into()),
            organization_type: "nonprofit".into(),
            website: None,
            description: None,
            address: "1 Pier Rd".into(),
            city: "Halifax".into(),
            country: "Canada".into(),
        }
    }

    #[test]
    fn join_codes_are_ten_upper_hex() {
        let code = generate_join_code();
        assert_eq!(code.len(), 10);
        assert!(code
            .chars()
            .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
    }

    #[test]
    fn volunteer_age_is_checked_against_birthday() {
        let today = date(2024, 6, 15);
        assert_eq!(age_on(date(2011, 6, 15), today), 13);
        assert_eq!(age_on(date(2011, 6, 16), today), 12);

        assert!(validate_volunteer(&volunteer_input(date(2011, 6, 15)), today).is_ok());
        assert!(matches!(
            validate_volunteer(&volunteer_input(date(2011, 6, 16)), today),
            Err(QuantrackError::Validation(_))
        ));
        assert!(matches!(
            validate_volunteer(&volunteer_input(date(2030, 1, 1)), today),
            Err(QuantrackError::Validation(_))
        ));
    }

    #[test]
    fn establishment_date_cannot_be_in_future() {
        let mut input = organization_input();
        input.date_of_establishment = date(2099, 1, 1);
        assert!(matches!(
            validate_organization(&input, date(2024, 1, 1)),
            Err(QuantrackError::Validation(_))
        ));
    }

    #[test]
    fn event_hours_are_capped() {
        let input = NewEvent {
            name: "Beach sweep".into(),
            description: String::new(),
            date: date(2024, 7, 1),
            time: None,
            location: "North beach".into(),
            is_public: true,
            service_hours: Hours::from_hundredths(100_000),
        };
        assert!(matches!(
            validate_event(&input),
            Err(QuantrackError::Validation(_))
        ));
    }

    #[test]
    fn new_event_defaults_to_public() {
        let input: NewEvent = serde_json::from_value(serde_json::json!({
            "name": "Food drive",
            "date": "2024-09-01",
            "location": "Hall",
            "service_hours": 2.5
        }))
        .unwrap();
        assert!(input.is_public);
        assert_eq!(input.service_hours, Hours::from_hundredths(250));
    }

    #[tokio::test]
    async fn organization_gets_join_code_and_blank_fields_drop() {
        let registry = Registry::new(Arc::new(InMemoryQuantrackStorage::new()));
        let org = registry
            .register_organization(organization_input())
            .await
            .unwrap();
        assert_eq!(org.join_code.len(), 10);
        assert_eq!(org.registration_number, None);
        assert_eq!(registry.organization(&org.id).await.unwrap(), org);
    }

    #[tokio::test]
    async fn admin_for_missing_organization_is_not_found() {
        let registry = Registry::new(Arc::new(InMemoryQuantrackStorage::new()));
        let err = registry
            .register_admin(NewAdmin {
                username: "lee".into(),
                email: "lee@example.org".into(),
                organization_id: OrganizationId::generate(),
                job_title: "Coordinator".into(),
                phone_number: String::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, QuantrackError::NotFound(_)));
    }

    #[tokio::test]
    async fn events_are_scoped_to_the_admin_organization() {
        let registry = Registry::new(Arc::new(InMemoryQuantrackStorage::new()));
        let org_a = registry
            .register_organization(organization_input())
            .await
            .unwrap();
        let org_b = registry
            .register_organization(organization_input())
            .await
            .unwrap();
        let admin_a = registry
            .register_admin(NewAdmin {
                username: "a".into(),
                email: "a@example.org".into(),
                organization_id: org_a.id,
                job_title: String::new(),
                phone_number: String::new(),
            })
            .await
            .unwrap();
        let admin_b = registry
            .register_admin(NewAdmin {
                username: "b".into(),
                email: "b@example.org".into(),
                organization_id: org_b.id,
                job_title: String::new(),
                phone_number: String::new(),
            })
            .await
            .unwrap();

        let event = registry
            .create_event(
                &admin_a.id,
                NewEvent {
                    name: "Beach sweep".into(),
                    description: String::new(),
                    date: date(2024, 7, 1),
                    time: None,
                    location: "North beach".into(),
                    is_public: true,
                    service_hours: Hours::from_hundredths(300),
                },
            )
            .await
            .unwrap();
        assert_eq!(event.organization_id, org_a.id);

        let err = registry
            .delete_event(&admin_b.id, &event.id)
            .await
            .unwrap_err();
        assert!(matches!(err, QuantrackError::Forbidden(_)));

        registry.delete_event(&admin_a.id, &event.id).await.unwrap();
        assert!(registry.list_events(&org_a.id).await.unwrap().is_empty());
    }
}
