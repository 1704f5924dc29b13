//! Membership lifecycle for (volunteer, organization) pairs.
//!
//! ```text
//! (none) --join--> pending --approve--> active --deactivate--> inactive
//!                     |
//!                     +--reject--> (removed)
//! any --quit--> (removed)
//! ```

use crate::error::{QuantrackError, QuantrackResult};
use crate::registry::require_admin;
use chrono::{DateTime, Utc};
use quantrack_store::{
    AdminId, AdminRecord, MembershipFilter, MembershipId, MembershipRecord, MembershipRole,
    MembershipStatus, OrganizationId, OrganizationRecord, QuantrackStorage, VolunteerId,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Pending membership joined with the requesting volunteer's contact details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingMember {
    pub membership_id: MembershipId,
    pub volunteer_id: VolunteerId,
    pub volunteer_name: String,
    pub email: String,
    pub join_date: DateTime<Utc>,
}

#[derive(Clone)]
pub struct MembershipManager {
    store: Arc<dyn QuantrackStorage>,
}

impl MembershipManager {
    pub fn new(store: Arc<dyn QuantrackStorage>) -> Self {
        Self { store }
    }

    /// Redeem a join code. Creates a pending membership.
    pub async fn join(
        &self,
        volunteer_id: &VolunteerId,
        join_code: &str,
    ) -> QuantrackResult<MembershipRecord> {
        let organization = self.organization_by_code(join_code).await?;
        if self.store.get_volunteer(volunteer_id).await?.is_none() {
            return Err(QuantrackError::not_found("volunteer", volunteer_id));
        }
        if self
            .store
            .find_membership(volunteer_id, &organization.id)
            .await?
            .is_some()
        {
            warn!(
                volunteer_id = %volunteer_id,
                organization_id = %organization.id,
                "join rejected: membership already exists"
            );
            return Err(QuantrackError::Conflict(
                "already a member of this organization".to_string(),
            ));
        }

        let now = Utc::now();
        let membership = MembershipRecord {
            id: MembershipId::generate(),
            volunteer_id: *volunteer_id,
            organization_id: organization.id,
            role: MembershipRole::Volunteer,
            status: MembershipStatus::Pending,
            joined_at: now,
            updated_at: now,
        };
        self.store.insert_membership(membership.clone()).await?;
        info!(
            membership_id = %membership.id,
            volunteer_id = %volunteer_id,
            organization_id = %organization.id,
            "membership requested"
        );
        Ok(membership)
    }

    /// Leave an organization, whatever the membership status.
    pub async fn quit(&self, volunteer_id: &VolunteerId, join_code: &str) -> QuantrackResult<()> {
        let organization = self.organization_by_code(join_code).await?;
        let membership = self
            .store
            .find_membership(volunteer_id, &organization.id)
            .await?
            .ok_or_else(|| {
                QuantrackError::NotFound("not a member of this organization".to_string())
            })?;
        self.store.delete_membership(&membership.id).await?;
        info!(
            membership_id = %membership.id,
            volunteer_id = %volunteer_id,
            organization_id = %organization.id,
            from = membership.status.as_str(),
            "membership removed by volunteer"
        );
        Ok(())
    }

    pub async fn approve(
        &self,
        admin_id: &AdminId,
        membership_id: &MembershipId,
    ) -> QuantrackResult<MembershipRecord> {
        let (admin, membership) = self.guarded(admin_id, membership_id).await?;
        expect_status(&membership, MembershipStatus::Pending, "approve")?;
        let updated = self
            .store
            .transition_membership(
                &membership.id,
                MembershipStatus::Pending,
                MembershipStatus::Active,
                Utc::now(),
            )
            .await?;
        info!(
            membership_id = %updated.id,
            admin_id = %admin.id,
            "membership approved"
        );
        Ok(updated)
    }

    /// Turn down a pending request. The membership row is removed.
    pub async fn reject(
        &self,
        admin_id: &AdminId,
        membership_id: &MembershipId,
    ) -> QuantrackResult<()> {
        let (admin, membership) = self.guarded(admin_id, membership_id).await?;
        expect_status(&membership, MembershipStatus::Pending, "reject")?;
        self.store.delete_membership(&membership.id).await?;
        info!(
            membership_id = %membership.id,
            admin_id = %admin.id,
            "membership rejected"
        );
        Ok(())
    }

    pub async fn deactivate(
        &self,
        admin_id: &AdminId,
        membership_id: &MembershipId,
    ) -> QuantrackResult<MembershipRecord> {
        let (admin, membership) = self.guarded(admin_id, membership_id).await?;
        expect_status(&membership, MembershipStatus::Active, "deactivate")?;
        let updated = self
            .store
            .transition_membership(
                &membership.id,
                MembershipStatus::Active,
                MembershipStatus::Inactive,
                Utc::now(),
            )
            .await?;
        info!(
            membership_id = %updated.id,
            admin_id = %admin.id,
            "membership deactivated"
        );
        Ok(updated)
    }

    /// Pending requests for the admin's organization, oldest first.
    pub async fn list_pending(&self, admin_id: &AdminId) -> QuantrackResult<Vec<PendingMember>> {
        let admin = require_admin(self.store.as_ref(), admin_id).await?;
        let pending = self
            .store
            .list_memberships(
                MembershipFilter::for_organization(admin.organization_id)
                    .with_status(MembershipStatus::Pending),
            )
            .await?;

        let mut out = Vec::with_capacity(pending.len());
        for membership in pending {
            // Volunteer rows cascade away with their memberships; skip any stragglers.
            let Some(volunteer) = self.store.get_volunteer(&membership.volunteer_id).await? else {
                continue;
            };
            out.push(PendingMember {
                membership_id: membership.id,
                volunteer_id: volunteer.id,
                volunteer_name: volunteer.username,
                email: volunteer.email,
                join_date: membership.joined_at,
            });
        }
        Ok(out)
    }

    pub async fn memberships_of(
        &self,
        volunteer_id: &VolunteerId,
    ) -> QuantrackResult<Vec<MembershipRecord>> {
        if self.store.get_volunteer(volunteer_id).await?.is_none() {
            return Err(QuantrackError::not_found("volunteer", volunteer_id));
        }
        Ok(self
            .store
            .list_memberships(MembershipFilter::for_volunteer(*volunteer_id))
            .await?)
    }

    /// Members of one organization, any status.
    pub async fn members_of(
        &self,
        organization_id: &OrganizationId,
    ) -> QuantrackResult<Vec<MembershipRecord>> {
        Ok(self
            .store
            .list_memberships(MembershipFilter::for_organization(*organization_id))
            .await?)
    }

    async fn organization_by_code(&self, join_code: &str) -> QuantrackResult<OrganizationRecord> {
        let code = normalize_join_code(join_code);
        self.store
            .find_organization_by_join_code(&code)
            .await?
            .ok_or_else(|| QuantrackError::NotFound(format!("invalid join code `{code}`")))
    }

    async fn guarded(
        &self,
        admin_id: &AdminId,
        membership_id: &MembershipId,
    ) -> QuantrackResult<(AdminRecord, MembershipRecord)> {
        let admin = require_admin(self.store.as_ref(), admin_id).await?;
        let membership = self
            .store
            .get_membership(membership_id)
            .await?
            .ok_or_else(|| QuantrackError::not_found("membership", membership_id))?;
        if membership.organization_id != admin.organization_id {
            warn!(
                membership_id = %membership_id,
                admin_id = %admin_id,
                "membership action rejected: different organization"
            );
            return Err(QuantrackError::forbidden(
                "membership belongs to a different organization",
            ));
        }
        Ok((admin, membership))
    }
}

fn expect_status(
    membership: &MembershipRecord,
    expected: MembershipStatus,
    action: &str,
) -> QuantrackResult<()> {
    if membership.status != expected {
        warn!(
            membership_id = %membership.id,
            status = membership.status.as_str(),
            action,
            "membership transition rejected"
        );
        return Err(QuantrackError::Conflict(format!(
            "cannot {action} a membership that is {}",
            membership.status.as_str()
        )));
    }
    Ok(())
}

/// Join codes are stored upper-case; accept any casing and stray whitespace.
pub fn normalize_join_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;

    #[tokio::test]
    async fn join_creates_pending_volunteer_membership() {
        let fx = Fixture::new().await;
        let volunteer = fx.volunteer("ava").await;

        let membership = fx
            .memberships
            .join(&volunteer.id, &fx.org.join_code.to_lowercase())
            .await
            .unwrap();
        assert_eq!(membership.status, MembershipStatus::Pending);
        assert_eq!(membership.role, MembershipRole::Volunteer);
        assert_eq!(membership.organization_id, fx.org.id);
    }

    #[tokio::test]
    async fn joining_twice_is_conflict() {
        let fx = Fixture::new().await;
        let volunteer = fx.volunteer("ava").await;
        fx.memberships
            .join(&volunteer.id, &fx.org.join_code)
            .await
            .unwrap();

        let err = fx
            .memberships
            .join(&volunteer.id, &fx.org.join_code)
            .await
            .unwrap_err();
        assert!(matches!(err, QuantrackError::Conflict(_)));
    }

    #[tokio::test]
    async fn lost_join_race_is_stopped_by_unique_pair() {
        let (fx, racing) = Fixture::racing().await;
        let volunteer = fx.volunteer("ava").await;
        fx.memberships
            .join(&volunteer.id, &fx.org.join_code)
            .await
            .unwrap();

        // The pre-check misses the committed row, so the insert reaches the index.
        racing.hide_next_lookups(1);
        let err = fx
            .memberships
            .join(&volunteer.id, &fx.org.join_code)
            .await
            .unwrap_err();
        assert!(matches!(err, QuantrackError::Conflict(_)));
        assert_eq!(
            fx.memberships
                .memberships_of(&volunteer.id)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn unknown_code_and_missing_membership_are_not_found() {
        let fx = Fixture::new().await;
        let volunteer = fx.volunteer("ava").await;

        let err = fx
            .memberships
            .join(&volunteer.id, "ZZZZZZZZZZ")
            .await
            .unwrap_err();
        assert!(matches!(err, QuantrackError::NotFound(_)));

        let err = fx
            .memberships
            .quit(&volunteer.id, &fx.org.join_code)
            .await
            .unwrap_err();
        assert!(matches!(err, QuantrackError::NotFound(_)));
    }

    #[tokio::test]
    async fn approve_then_deactivate() {
        let fx = Fixture::new().await;
        let volunteer = fx.volunteer("ava").await;
        let membership = fx
            .memberships
            .join(&volunteer.id, &fx.org.join_code)
            .await
            .unwrap();

        let active = fx
            .memberships
            .approve(&fx.admin.id, &membership.id)
            .await
            .unwrap();
        assert_eq!(active.status, MembershipStatus::Active);

        let err = fx
            .memberships
            .approve(&fx.admin.id, &membership.id)
            .await
            .unwrap_err();
        assert!(matches!(err, QuantrackError::Conflict(_)));

        let inactive = fx
            .memberships
            .deactivate(&fx.admin.id, &membership.id)
            .await
            .unwrap();
        assert_eq!(inactive.status, MembershipStatus::Inactive);
    }

    #[tokio::test]
    async fn reject_removes_pending_and_allows_rejoin() {
        let fx = Fixture::new().await;
        let volunteer = fx.volunteer("ava").await;
        let membership = fx
            .memberships
            .join(&volunteer.id, &fx.org.join_code)
            .await
            .unwrap();

        fx.memberships
            .reject(&fx.admin.id, &membership.id)
            .await
            .unwrap();
        assert!(fx
            .memberships
            .memberships_of(&volunteer.id)
            .await
            .unwrap()
            .is_empty());

        fx.memberships
            .join(&volunteer.id, &fx.org.join_code)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn other_organization_admin_is_forbidden() {
        let fx = Fixture::new().await;
        let (_, outsider) = fx.other_organization().await;
        let volunteer = fx.volunteer("ava").await;
        let membership = fx
            .memberships
            .join(&volunteer.id, &fx.org.join_code)
            .await
            .unwrap();

        let err = fx
            .memberships
            .approve(&outsider.id, &membership.id)
            .await
            .unwrap_err();
        assert!(matches!(err, QuantrackError::Forbidden(_)));

        let err = fx
            .memberships
            .approve(&AdminId::generate(), &membership.id)
            .await
            .unwrap_err();
        assert!(matches!(err, QuantrackError::Forbidden(_)));
    }

    #[tokio::test]
    async fn pending_list_carries_volunteer_details() {
        let fx = Fixture::new().await;
        let ava = fx.volunteer("ava").await;
        let ben = fx.volunteer("ben").await;
        fx.memberships
            .join(&ava.id, &fx.org.join_code)
            .await
            .unwrap();
        let ben_membership = fx
            .memberships
            .join(&ben.id, &fx.org.join_code)
            .await
            .unwrap();
        fx.memberships
            .approve(&fx.admin.id, &ben_membership.id)
            .await
            .unwrap();

        let pending = fx.memberships.list_pending(&fx.admin.id).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].volunteer_name, "ava");
        assert_eq!(pending[0].email, "ava@example.org");
    }

    #[tokio::test]
    async fn quit_removes_active_membership() {
        let fx = Fixture::new().await;
        let volunteer = fx.volunteer("ava").await;
        let membership = fx
            .memberships
            .join(&volunteer.id, &fx.org.join_code)
            .await
            .unwrap();
        fx.memberships
            .approve(&fx.admin.id, &membership.id)
            .await
            .unwrap();

        fx.memberships
            .quit(&volunteer.id, &fx.org.join_code)
            .await
            .unwrap();
        assert!(fx
            .memberships
            .members_of(&fx.org.id)
            .await
            .unwrap()
            .is_empty());
    }
}
