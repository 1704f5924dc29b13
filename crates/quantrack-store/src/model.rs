use crate::{StorageError, StorageResult};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

uuid_id!(
    /// Volunteer profile identifier.
    VolunteerId
);
uuid_id!(
    /// Organization identifier.
    OrganizationId
);
uuid_id!(
    /// Organization admin identifier.
    AdminId
);
uuid_id!(
    /// Event identifier.
    EventId
);
uuid_id!(
    /// Membership row identifier.
    MembershipId
);
uuid_id!(
    /// Participation row identifier.
    ParticipationId
);

/// Fixed-point service hours, kept in hundredths of an hour.
///
/// Serialized as a JSON number with at most two decimals, e.g. `3.5`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hours(u64);

impl Hours {
    pub const ZERO: Hours = Hours(0);

    /// Largest accepted raw input; anything above is treated as garbage.
    const MAX_INPUT: f64 = 1.0e12;

    pub const fn from_hundredths(hundredths: u64) -> Self {
        Self(hundredths)
    }

    pub const fn hundredths(self) -> u64 {
        self.0
    }

    pub fn from_f64(value: f64) -> StorageResult<Self> {
        if !value.is_finite() {
            return Err(StorageError::InvalidInput(format!(
                "hours must be a finite number, got {value}"
            )));
        }
        if value < 0.0 {
            return Err(StorageError::InvalidInput(format!(
                "hours must not be negative, got {value}"
            )));
        }
        if value > Self::MAX_INPUT {
            return Err(StorageError::InvalidInput(format!(
                "hours value {value} is out of range"
            )));
        }
        Ok(Self((value * 100.0).round() as u64))
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn saturating_add(self, other: Hours) -> Hours {
        Hours(self.0.saturating_add(other.0))
    }

    /// Average over `count` items, rounded half-up to the nearest hundredth.
    /// Returns zero when `count` is zero.
    pub fn average(self, count: u64) -> Hours {
        if count == 0 {
            return Hours::ZERO;
        }
        let rounded = (u128::from(self.0) + u128::from(count / 2)) / u128::from(count);
        Hours(rounded as u64)
    }
}

impl fmt::Display for Hours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl std::iter::Sum for Hours {
    fn sum<I: Iterator<Item = Hours>>(iter: I) -> Self {
        iter.fold(Hours::ZERO, Hours::saturating_add)
    }
}

impl Serialize for Hours {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for Hours {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Hours::from_f64(value).map_err(serde::de::Error::custom)
    }
}

/// Role a volunteer holds inside an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipRole {
    Volunteer,
    Executive,
    Admin,
}

impl MembershipRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Volunteer => "volunteer",
            Self::Executive => "executive",
            Self::Admin => "admin",
        }
    }

    pub fn parse(raw: &str) -> StorageResult<Self> {
        match raw {
            "volunteer" => Ok(Self::Volunteer),
            "executive" => Ok(Self::Executive),
            "admin" => Ok(Self::Admin),
            other => Err(StorageError::Serialization(format!(
                "unknown membership role `{other}`"
            ))),
        }
    }
}

/// Membership lifecycle: pending -> active -> inactive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    Pending,
    Active,
    Inactive,
}

impl MembershipStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }

    pub fn parse(raw: &str) -> StorageResult<Self> {
        match raw {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            other => Err(StorageError::Serialization(format!(
                "unknown membership status `{other}`"
            ))),
        }
    }
}

/// Participation lifecycle: joined -> completed | cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipationStatus {
    Joined,
    Completed,
    Cancelled,
}

impl ParticipationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Joined => "joined",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(raw: &str) -> StorageResult<Self> {
        match raw {
            "joined" => Ok(Self::Joined),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(StorageError::Serialization(format!(
                "unknown participation status `{other}`"
            ))),
        }
    }

    /// Completed and cancelled rows never re-open.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolunteerRecord {
    pub id: VolunteerId,
    pub username: String,
    pub email: String,
    pub date_of_birth: NaiveDate,
    pub school_or_organization: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationRecord {
    pub id: OrganizationId,
    pub name: String,
    pub date_of_establishment: NaiveDate,
    pub registration_number: Option<String>,
    pub organization_type: String,
    pub website: Option<String>,
    pub description: Option<String>,
    pub address: String,
    pub city: String,
    pub country: String,
    /// Unique redemption code handed out to volunteers.
    pub join_code: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminRecord {
    pub id: AdminId,
    pub username: String,
    pub email: String,
    pub organization_id: OrganizationId,
    pub job_title: String,
    pub phone_number: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: EventId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub description: String,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub location: String,
    pub is_public: bool,
    pub service_hours: Hours,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MembershipRecord {
    pub id: MembershipId,
    pub volunteer_id: VolunteerId,
    pub organization_id: OrganizationId,
    pub role: MembershipRole,
    pub status: MembershipStatus,
    pub joined_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipationRecord {
    pub id: ParticipationId,
    pub volunteer_id: VolunteerId,
    pub event_id: EventId,
    pub status: ParticipationStatus,
    pub hours_completed: Hours,
    pub certificate_code: String,
    pub joined_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Field set written by a guarded participation transition.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticipationUpdate {
    pub status: ParticipationStatus,
    pub hours_completed: Hours,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}
