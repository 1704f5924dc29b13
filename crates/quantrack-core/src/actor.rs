use quantrack_store::{AdminId, VolunteerId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Authenticated caller, as asserted by the upstream auth layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "role", content = "id", rename_all = "snake_case")]
pub enum Actor {
    Volunteer(VolunteerId),
    Admin(AdminId),
}

impl Actor {
    pub fn role(&self) -> &'static str {
        match self {
            Self::Volunteer(_) => "volunteer",
            Self::Admin(_) => "admin",
        }
    }

    pub fn volunteer(&self) -> Option<VolunteerId> {
        match self {
            Self::Volunteer(id) => Some(*id),
            Self::Admin(_) => None,
        }
    }

    pub fn admin(&self) -> Option<AdminId> {
        match self {
            Self::Admin(id) => Some(*id),
            Self::Volunteer(_) => None,
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Volunteer(id) => write!(f, "volunteer:{id}"),
            Self::Admin(id) => write!(f, "admin:{id}"),
        }
    }
}
