//! Quantrack core: the membership and participation lifecycle over a
//! pluggable store, plus the aggregation layer and certificates built on it.
//!
//! Managers hold no state of their own. Uniqueness of (volunteer, organization)
//! memberships, (volunteer, event) participations and certificate codes is the
//! store's job; a lost race comes back as `QuantrackError::Conflict`.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

pub mod actor;
pub mod aggregation;
pub mod certificate;
pub mod engine;
pub mod error;
pub mod membership;
pub mod participation;
pub mod registry;
pub mod storage;

#[cfg(test)]
mod testing;

pub use actor::Actor;
pub use aggregation::{
    AdminDashboardStats, Analytics, EventParticipationStats, OrganizationStats,
    ParticipationTally, TopEvent, TopVolunteer, VolunteerStats, VolunteerSummary,
};
pub use certificate::{Certificate, CertificateIssuer};
pub use engine::{EngineConfig, QuantrackEngine};
pub use error::{QuantrackError, QuantrackResult};
pub use membership::{MembershipManager, PendingMember};
pub use participation::ParticipationManager;
pub use registry::{NewAdmin, NewEvent, NewOrganization, NewVolunteer, Registry};
pub use storage::StorageConfig;

pub use quantrack_store as store;
