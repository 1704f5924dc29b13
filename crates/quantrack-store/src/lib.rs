//! Quantrack storage abstractions.
//!
//! This crate defines the storage contract for the volunteer backend:
//! - registry records (volunteers, organizations, admins, events)
//! - memberships keyed by (volunteer, organization)
//! - participations keyed by (volunteer, event) with globally unique certificate codes
//!
//! Design stance:
//! - Uniqueness is enforced by the store (unique indexes), never by callers.
//! - Foreign keys are explicit id fields; deletes cascade inside the store.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

mod error;
pub mod memory;
mod model;
#[cfg(feature = "postgres")]
pub mod postgres;
mod traits;

pub use error::{StorageError, StorageResult};
pub use memory::InMemoryQuantrackStorage;
pub use model::{
    AdminId, AdminRecord, EventId, EventRecord, Hours, MembershipId, MembershipRecord,
    MembershipRole, MembershipStatus, OrganizationId, OrganizationRecord, ParticipationId,
    ParticipationRecord, ParticipationStatus, ParticipationUpdate, VolunteerId, VolunteerRecord,
};
pub use traits::{
    EventStore, MembershipFilter, MembershipStore, OrganizationStore, ParticipationScope,
    ParticipationStore, QuantrackStorage, VolunteerStore,
};
