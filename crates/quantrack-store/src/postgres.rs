//! PostgreSQL adapter for Quantrack storage.
//!
//! This adapter is the transactional source of truth. Pair uniqueness,
//! certificate-code uniqueness and delete cascades are expressed as table
//! constraints, so concurrent duplicate writes lose at the database.

use crate::model::{
    AdminId, AdminRecord, EventId, EventRecord, Hours, MembershipId, MembershipRecord,
    MembershipRole, MembershipStatus, OrganizationId, OrganizationRecord, ParticipationId,
    ParticipationRecord, ParticipationStatus, ParticipationUpdate, VolunteerId, VolunteerRecord,
};
use crate::traits::{
    EventStore, MembershipFilter, MembershipStore, OrganizationStore, ParticipationScope,
    ParticipationStore, QuantrackStorage, VolunteerStore,
};
use crate::{StorageError, StorageResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, Row};
use uuid::Uuid;

const PARTICIPATION_COLUMNS: &str = "p.id, p.volunteer_id, p.event_id, p.status, \
     p.hours_completed_centi, p.certificate_code, p.joined_at, p.completed_at, p.updated_at";

/// PostgreSQL-backed storage adapter.
#[derive(Clone)]
pub struct PostgresQuantrackStorage {
    pool: PgPool,
}

impl PostgresQuantrackStorage {
    /// Connect to PostgreSQL and initialize required schema.
    pub async fn connect(database_url: &str) -> StorageResult<Self> {
        Self::connect_with_options(database_url, 10, 5).await
    }

    /// Connect with explicit pool parameters.
    pub async fn connect_with_options(
        database_url: &str,
        max_connections: u32,
        connect_timeout_secs: u64,
    ) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(std::time::Duration::from_secs(connect_timeout_secs))
            .connect(database_url)
            .await
            .map_err(|e| StorageError::Backend(format!("failed to connect postgres: {e}")))?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Create adapter from an existing pool.
    pub async fn from_pool(pool: PgPool) -> StorageResult<Self> {
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn init_schema(&self) -> StorageResult<()> {
        let ddl = [
            r#"
            CREATE TABLE IF NOT EXISTS quantrack_volunteers (
                id UUID PRIMARY KEY,
                username TEXT NOT NULL,
                email TEXT NOT NULL,
                date_of_birth DATE NOT NULL,
                school_or_organization TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            )
            "#,
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_quantrack_volunteers_email
                ON quantrack_volunteers (LOWER(email))
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS quantrack_organizations (
                id UUID PRIMARY KEY,
                name TEXT NOT NULL,
                date_of_establishment DATE NOT NULL,
                registration_number TEXT UNIQUE,
                organization_type TEXT NOT NULL,
                website TEXT,
                description TEXT,
                address TEXT NOT NULL,
                city TEXT NOT NULL,
                country TEXT NOT NULL,
                join_code TEXT NOT NULL UNIQUE,
                created_at TIMESTAMPTZ NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS quantrack_admins (
                id UUID PRIMARY KEY,
                username TEXT NOT NULL,
                email TEXT NOT NULL,
                organization_id UUID NOT NULL
                    REFERENCES quantrack_organizations (id) ON DELETE CASCADE,
                job_title TEXT NOT NULL,
                phone_number TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            )
            "#,
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_quantrack_admins_email
                ON quantrack_admins (LOWER(email))
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS quantrack_events (
                id UUID PRIMARY KEY,
                organization_id UUID NOT NULL
                    REFERENCES quantrack_organizations (id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                date DATE NOT NULL,
                time TIME,
                location TEXT NOT NULL,
                is_public BOOLEAN NOT NULL,
                service_hours_centi BIGINT NOT NULL CHECK (service_hours_centi >= 0),
                created_at TIMESTAMPTZ NOT NULL
            )
            "#,
            r#"
            CREATE INDEX IF NOT EXISTS idx_quantrack_events_org
                ON quantrack_events (organization_id)
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS quantrack_memberships (
                id UUID PRIMARY KEY,
                volunteer_id UUID NOT NULL
                    REFERENCES quantrack_volunteers (id) ON DELETE CASCADE,
                organization_id UUID NOT NULL
                    REFERENCES quantrack_organizations (id) ON DELETE CASCADE,
                role TEXT NOT NULL,
                status TEXT NOT NULL,
                joined_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL,
                UNIQUE (volunteer_id, organization_id)
            )
            "#,
            r#"
            CREATE INDEX IF NOT EXISTS idx_quantrack_memberships_org
                ON quantrack_memberships (organization_id)
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS quantrack_participations (
                id UUID PRIMARY KEY,
                volunteer_id UUID NOT NULL
                    REFERENCES quantrack_volunteers (id) ON DELETE CASCADE,
                event_id UUID NOT NULL
                    REFERENCES quantrack_events (id) ON DELETE CASCADE,
                status TEXT NOT NULL,
                hours_completed_centi BIGINT NOT NULL CHECK (hours_completed_centi >= 0),
                certificate_code TEXT NOT NULL UNIQUE,
                joined_at TIMESTAMPTZ NOT NULL,
                completed_at TIMESTAMPTZ,
                updated_at TIMESTAMPTZ NOT NULL,
                UNIQUE (volunteer_id, event_id)
            )
            "#,
            r#"
            CREATE INDEX IF NOT EXISTS idx_quantrack_participations_event
                ON quantrack_participations (event_id)
            "#,
        ];

        for stmt in ddl {
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::Backend(format!("schema init failed: {e}")))?;
        }
        Ok(())
    }

    /// Emails are unique across volunteers and admins.
    async fn ensure_email_free(&self, email: &str) -> StorageResult<()> {
        let taken: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (SELECT 1 FROM quantrack_volunteers WHERE LOWER(email) = LOWER($1))
                OR EXISTS (SELECT 1 FROM quantrack_admins WHERE LOWER(email) = LOWER($1))
            "#,
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;
        if taken {
            return Err(StorageError::Conflict(format!(
                "email {email} is already registered"
            )));
        }
        Ok(())
    }
}

impl QuantrackStorage for PostgresQuantrackStorage {
    fn backend_label(&self) -> &'static str {
        "postgres"
    }
}

#[async_trait]
impl VolunteerStore for PostgresQuantrackStorage {
    async fn insert_volunteer(&self, volunteer: VolunteerRecord) -> StorageResult<()> {
        self.ensure_email_free(&volunteer.email).await?;
        sqlx::query(
            r#"
            INSERT INTO quantrack_volunteers
                (id, username, email, date_of_birth, school_or_organization, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(volunteer.id.0)
        .bind(&volunteer.username)
        .bind(&volunteer.email)
        .bind(volunteer.date_of_birth)
        .bind(&volunteer.school_or_organization)
        .bind(volunteer.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn get_volunteer(&self, id: &VolunteerId) -> StorageResult<Option<VolunteerRecord>> {
        let row = sqlx::query("SELECT * FROM quantrack_volunteers WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        row.map(volunteer_row_to_record).transpose()
    }

    async fn delete_volunteer(&self, id: &VolunteerId) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM quantrack_volunteers WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("volunteer {id} not found")));
        }
        Ok(())
    }
}

#[async_trait]
impl OrganizationStore for PostgresQuantrackStorage {
    async fn insert_organization(&self, organization: OrganizationRecord) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO quantrack_organizations
                (id, name, date_of_establishment, registration_number, organization_type,
                 website, description, address, city, country, join_code, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(organization.id.0)
        .bind(&organization.name)
        .bind(organization.date_of_establishment)
        .bind(&organization.registration_number)
        .bind(&organization.organization_type)
        .bind(&organization.website)
        .bind(&organization.description)
        .bind(&organization.address)
        .bind(&organization.city)
        .bind(&organization.country)
        .bind(&organization.join_code)
        .bind(organization.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn get_organization(
        &self,
        id: &OrganizationId,
    ) -> StorageResult<Option<OrganizationRecord>> {
        let row = sqlx::query("SELECT * FROM quantrack_organizations WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        row.map(organization_row_to_record).transpose()
    }

    async fn find_organization_by_join_code(
        &self,
        join_code: &str,
    ) -> StorageResult<Option<OrganizationRecord>> {
        let row = sqlx::query("SELECT * FROM quantrack_organizations WHERE join_code = $1")
            .bind(join_code)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        row.map(organization_row_to_record).transpose()
    }

    async fn delete_organization(&self, id: &OrganizationId) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM quantrack_organizations WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!(
                "organization {id} not found"
            )));
        }
        Ok(())
    }

    async fn insert_admin(&self, admin: AdminRecord) -> StorageResult<()> {
        self.ensure_email_free(&admin.email).await?;
        sqlx::query(
            r#"
            INSERT INTO quantrack_admins
                (id, username, email, organization_id, job_title, phone_number, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(admin.id.0)
        .bind(&admin.username)
        .bind(&admin.email)
        .bind(admin.organization_id.0)
        .bind(&admin.job_title)
        .bind(&admin.phone_number)
        .bind(admin.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn get_admin(&self, id: &AdminId) -> StorageResult<Option<AdminRecord>> {
        let row = sqlx::query("SELECT * FROM quantrack_admins WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        row.map(admin_row_to_record).transpose()
    }
}

#[async_trait]
impl EventStore for PostgresQuantrackStorage {
    async fn insert_event(&self, event: EventRecord) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO quantrack_events
                (id, organization_id, name, description, date, time, location, is_public,
                 service_hours_centi, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(event.id.0)
        .bind(event.organization_id.0)
        .bind(&event.name)
        .bind(&event.description)
        .bind(event.date)
        .bind(event.time)
        .bind(&event.location)
        .bind(event.is_public)
        .bind(hours_to_i64(event.service_hours)?)
        .bind(event.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn get_event(&self, id: &EventId) -> StorageResult<Option<EventRecord>> {
        let row = sqlx::query("SELECT * FROM quantrack_events WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        row.map(event_row_to_record).transpose()
    }

    async fn list_events(
        &self,
        organization_id: &OrganizationId,
    ) -> StorageResult<Vec<EventRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM quantrack_events
             WHERE organization_id = $1
             ORDER BY date ASC, created_at ASC
            "#,
        )
        .bind(organization_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        rows.into_iter().map(event_row_to_record).collect()
    }

    async fn delete_event(&self, id: &EventId) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM quantrack_events WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("event {id} not found")));
        }
        Ok(())
    }
}

#[async_trait]
impl MembershipStore for PostgresQuantrackStorage {
    async fn insert_membership(&self, membership: MembershipRecord) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO quantrack_memberships
                (id, volunteer_id, organization_id, role, status, joined_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(membership.id.0)
        .bind(membership.volunteer_id.0)
        .bind(membership.organization_id.0)
        .bind(membership.role.as_str())
        .bind(membership.status.as_str())
        .bind(membership.joined_at)
        .bind(membership.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn get_membership(&self, id: &MembershipId) -> StorageResult<Option<MembershipRecord>> {
        let row = sqlx::query("SELECT * FROM quantrack_memberships WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        row.map(membership_row_to_record).transpose()
    }

    async fn find_membership(
        &self,
        volunteer_id: &VolunteerId,
        organization_id: &OrganizationId,
    ) -> StorageResult<Option<MembershipRecord>> {
        let row = sqlx::query(
            "SELECT * FROM quantrack_memberships WHERE volunteer_id = $1 AND organization_id = $2",
        )
        .bind(volunteer_id.0)
        .bind(organization_id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        row.map(membership_row_to_record).transpose()
    }

    async fn list_memberships(
        &self,
        filter: MembershipFilter,
    ) -> StorageResult<Vec<MembershipRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM quantrack_memberships
             WHERE ($1::UUID IS NULL OR volunteer_id = $1)
               AND ($2::UUID IS NULL OR organization_id = $2)
               AND ($3::TEXT IS NULL OR status = $3)
             ORDER BY joined_at ASC
            "#,
        )
        .bind(filter.volunteer_id.map(|id| id.0))
        .bind(filter.organization_id.map(|id| id.0))
        .bind(filter.status.map(MembershipStatus::as_str))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        rows.into_iter().map(membership_row_to_record).collect()
    }

    async fn transition_membership(
        &self,
        id: &MembershipId,
        expected_from: MembershipStatus,
        to: MembershipStatus,
        updated_at: DateTime<Utc>,
    ) -> StorageResult<MembershipRecord> {
        let row = sqlx::query(
            r#"
            UPDATE quantrack_memberships
               SET status = $1, updated_at = $2
             WHERE id = $3 AND status = $4
            RETURNING *
            "#,
        )
        .bind(to.as_str())
        .bind(updated_at)
        .bind(id.0)
        .bind(expected_from.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        match row {
            Some(row) => membership_row_to_record(row),
            None => match self.get_membership(id).await? {
                None => Err(StorageError::NotFound(format!("membership {id} not found"))),
                Some(current) => Err(StorageError::InvariantViolation(format!(
                    "invalid membership transition: expected {}, found {}",
                    expected_from.as_str(),
                    current.status.as_str()
                ))),
            },
        }
    }

    async fn delete_membership(&self, id: &MembershipId) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM quantrack_memberships WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("membership {id} not found")));
        }
        Ok(())
    }
}

#[async_trait]
impl ParticipationStore for PostgresQuantrackStorage {
    async fn insert_participation(&self, participation: ParticipationRecord) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO quantrack_participations
                (id, volunteer_id, event_id, status, hours_completed_centi, certificate_code,
                 joined_at, completed_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(participation.id.0)
        .bind(participation.volunteer_id.0)
        .bind(participation.event_id.0)
        .bind(participation.status.as_str())
        .bind(hours_to_i64(participation.hours_completed)?)
        .bind(&participation.certificate_code)
        .bind(participation.joined_at)
        .bind(participation.completed_at)
        .bind(participation.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn get_participation(
        &self,
        id: &ParticipationId,
    ) -> StorageResult<Option<ParticipationRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {PARTICIPATION_COLUMNS} FROM quantrack_participations p WHERE p.id = $1"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        row.map(participation_row_to_record).transpose()
    }

    async fn find_participation(
        &self,
        volunteer_id: &VolunteerId,
        event_id: &EventId,
    ) -> StorageResult<Option<ParticipationRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {PARTICIPATION_COLUMNS} FROM quantrack_participations p \
             WHERE p.volunteer_id = $1 AND p.event_id = $2"
        ))
        .bind(volunteer_id.0)
        .bind(event_id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        row.map(participation_row_to_record).transpose()
    }

    async fn find_participation_by_certificate(
        &self,
        certificate_code: &str,
    ) -> StorageResult<Option<ParticipationRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {PARTICIPATION_COLUMNS} FROM quantrack_participations p \
             WHERE p.certificate_code = $1"
        ))
        .bind(certificate_code)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        row.map(participation_row_to_record).transpose()
    }

    async fn transition_participation(
        &self,
        id: &ParticipationId,
        expected_from: ParticipationStatus,
        update: ParticipationUpdate,
    ) -> StorageResult<ParticipationRecord> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE quantrack_participations p
               SET status = $1,
                   hours_completed_centi = $2,
                   completed_at = $3,
                   updated_at = $4
             WHERE p.id = $5 AND p.status = $6
            RETURNING {PARTICIPATION_COLUMNS}
            "#
        ))
        .bind(update.status.as_str())
        .bind(hours_to_i64(update.hours_completed)?)
        .bind(update.completed_at)
        .bind(update.updated_at)
        .bind(id.0)
        .bind(expected_from.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        match row {
            Some(row) => participation_row_to_record(row),
            None => match self.get_participation(id).await? {
                None => Err(StorageError::NotFound(format!(
                    "participation {id} not found"
                ))),
                Some(current) => Err(StorageError::InvariantViolation(format!(
                    "invalid participation transition: expected {}, found {}",
                    expected_from.as_str(),
                    current.status.as_str()
                ))),
            },
        }
    }

    async fn list_participations(
        &self,
        scope: ParticipationScope,
    ) -> StorageResult<Vec<ParticipationRecord>> {
        let (clause, key): (&str, Option<Uuid>) = match scope {
            ParticipationScope::All => ("TRUE", None),
            ParticipationScope::Volunteer(id) => ("p.volunteer_id = $1", Some(id.0)),
            ParticipationScope::Event(id) => ("p.event_id = $1", Some(id.0)),
            ParticipationScope::Organization(id) => ("e.organization_id = $1", Some(id.0)),
        };
        let sql = format!(
            "SELECT {PARTICIPATION_COLUMNS} FROM quantrack_participations p \
             JOIN quantrack_events e ON e.id = p.event_id \
             WHERE {clause} ORDER BY p.joined_at ASC"
        );
        let mut query = sqlx::query(&sql);
        if let Some(key) = key {
            query = query.bind(key);
        }
        let rows = query.fetch_all(&self.pool).await.map_err(map_sqlx_error)?;
        rows.into_iter().map(participation_row_to_record).collect()
    }
}

fn col<'r, T>(row: &'r PgRow, name: &str) -> StorageResult<T>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name)
        .map_err(|e| StorageError::Backend(format!("decode `{name}` failed: {e}")))
}

fn volunteer_row_to_record(row: PgRow) -> StorageResult<VolunteerRecord> {
    Ok(VolunteerRecord {
        id: VolunteerId(col(&row, "id")?),
        username: col(&row, "username")?,
        email: col(&row, "email")?,
        date_of_birth: col(&row, "date_of_birth")?,
        school_or_organization: col(&row, "school_or_organization")?,
        created_at: col(&row, "created_at")?,
    })
}

fn organization_row_to_record(row: PgRow) -> StorageResult<OrganizationRecord> {
    Ok(OrganizationRecord {
        id: OrganizationId(col(&row, "id")?),
        name: col(&row, "name")?,
        date_of_establishment: col(&row, "date_of_establishment")?,
        registration_number: col(&row, "registration_number")?,
        organization_type: col(&row, "organization_type")?,
        website: col(&row, "website")?,
        description: col(&row, "description")?,
        address: col(&row, "address")?,
        city: col(&row, "city")?,
        country: col(&row, "country")?,
        join_code: col(&row, "join_code")?,
        created_at: col(&row, "created_at")?,
    })
}

fn admin_row_to_record(row: PgRow) -> StorageResult<AdminRecord> {
    Ok(AdminRecord {
        id: AdminId(col(&row, "id")?),
        username: col(&row, "username")?,
        email: col(&row, "email")?,
        organization_id: OrganizationId(col(&row, "organization_id")?),
        job_title: col(&row, "job_title")?,
        phone_number: col(&row, "phone_number")?,
        created_at: col(&row, "created_at")?,
    })
}

fn event_row_to_record(row: PgRow) -> StorageResult<EventRecord> {
    Ok(EventRecord {
        id: EventId(col(&row, "id")?),
        organization_id: OrganizationId(col(&row, "organization_id")?),
        name: col(&row, "name")?,
        description: col(&row, "description")?,
        date: col(&row, "date")?,
        time: col(&row, "time")?,
        location: col(&row, "location")?,
        is_public: col(&row, "is_public")?,
        service_hours: hours_from_i64(col(&row, "service_hours_centi")?)?,
        created_at: col(&row, "created_at")?,
    })
}

fn membership_row_to_record(row: PgRow) -> StorageResult<MembershipRecord> {
    let role: String = col(&row, "role")?;
    let status: String = col(&row, "status")?;
    Ok(MembershipRecord {
        id: MembershipId(col(&row, "id")?),
        volunteer_id: VolunteerId(col(&row, "volunteer_id")?),
        organization_id: OrganizationId(col(&row, "organization_id")?),
        role: MembershipRole::parse(&role)?,
        status: MembershipStatus::parse(&status)?,
        joined_at: col(&row, "joined_at")?,
        updated_at: col(&row, "updated_at")?,
    })
}

fn participation_row_to_record(row: PgRow) -> StorageResult<ParticipationRecord> {
    let status: String = col(&row, "status")?;
    Ok(ParticipationRecord {
        id: ParticipationId(col(&row, "id")?),
        volunteer_id: VolunteerId(col(&row, "volunteer_id")?),
        event_id: EventId(col(&row, "event_id")?),
        status: ParticipationStatus::parse(&status)?,
        hours_completed: hours_from_i64(col(&row, "hours_completed_centi")?)?,
        certificate_code: col(&row, "certificate_code")?,
        joined_at: col(&row, "joined_at")?,
        completed_at: col(&row, "completed_at")?,
        updated_at: col(&row, "updated_at")?,
    })
}

fn hours_to_i64(hours: Hours) -> StorageResult<i64> {
    i64::try_from(hours.hundredths())
        .map_err(|_| StorageError::InvalidInput("hours exceed BIGINT range".to_string()))
}

fn hours_from_i64(raw: i64) -> StorageResult<Hours> {
    u64::try_from(raw)
        .map(Hours::from_hundredths)
        .map_err(|_| StorageError::Serialization(format!("negative hours `{raw}` in storage")))
}

/// Unique violations become `Conflict`; dangling foreign keys become `NotFound`.
fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db_err) = &err {
        match db_err.code().as_deref() {
            Some("23505") => return StorageError::Conflict(db_err.message().to_string()),
            Some("23503") => return StorageError::NotFound(db_err.message().to_string()),
            _ => {}
        }
    }
    StorageError::Backend(err.to_string())
}
