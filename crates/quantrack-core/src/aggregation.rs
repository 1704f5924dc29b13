//! Read-only aggregates over participation rows.
//!
//! Every figure is recomputed from the rows on each call. Ratios are rounded
//! to two decimals and are zero whenever their denominator is zero.

use crate::error::{QuantrackError, QuantrackResult};
use crate::registry::require_admin;
use chrono::NaiveDate;
use quantrack_store::{
    AdminId, EventId, EventRecord, Hours, MembershipFilter, MembershipRecord, MembershipStatus,
    ParticipationRecord, ParticipationScope, ParticipationStatus, QuantrackStorage, VolunteerId,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

pub const TOP_VOLUNTEERS_LIMIT: usize = 10;
pub const TOP_EVENTS_LIMIT: usize = 5;

/// Status counts and hour sums for a set of participations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ParticipationTally {
    pub joined: u64,
    pub completed: u64,
    pub cancelled: u64,
    pub total: u64,
    /// Hours over completed rows only.
    pub hours_completed: Hours,
    /// Hours over every row, whatever its status.
    pub hours_logged: Hours,
    pub average_hours_per_completed: Hours,
    /// Percentage of rows that are completed.
    pub completion_rate: f64,
}

pub fn tally<'a>(rows: impl IntoIterator<Item = &'a ParticipationRecord>) -> ParticipationTally {
    let mut out = ParticipationTally::default();
    for row in rows {
        out.total += 1;
        out.hours_logged = out.hours_logged.saturating_add(row.hours_completed);
        match row.status {
            ParticipationStatus::Joined => out.joined += 1,
            ParticipationStatus::Cancelled => out.cancelled += 1,
            ParticipationStatus::Completed => {
                out.completed += 1;
                out.hours_completed = out.hours_completed.saturating_add(row.hours_completed);
            }
        }
    }
    out.average_hours_per_completed = out.hours_completed.average(out.completed);
    out.completion_rate = percentage(out.completed, out.total);
    out
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopVolunteer {
    pub volunteer_id: VolunteerId,
    pub name: String,
    pub events_count: u64,
    pub total_hours: Hours,
    pub certificates_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolunteerStats {
    pub total_service_hours: Hours,
    /// Distinct volunteers with at least one completed participation.
    pub active_volunteers: u64,
    pub avg_hours_per_volunteer: Hours,
    pub certificates_issued: u64,
    pub top_volunteers: Vec<TopVolunteer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopEvent {
    pub event_id: EventId,
    pub name: String,
    pub participants: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventParticipationStats {
    pub upcoming_events: u64,
    pub total_participations: u64,
    pub avg_participants_per_event: f64,
    pub completion_rate: f64,
    /// `YYYY-MM` of `joined_at` to participation count.
    pub participation_by_month: BTreeMap<String, u64>,
    pub top_events: Vec<TopEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationStats {
    pub total_members: u64,
    /// Memberships in the active state.
    pub active_volunteers: u64,
    pub total_events: u64,
    /// Events dated strictly before today.
    pub completed_events: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminDashboardStats {
    pub total_events_managed: u64,
    pub total_participations: u64,
    pub completed_participations: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolunteerSummary {
    pub volunteer_id: VolunteerId,
    pub tally: ParticipationTally,
    pub organizations: u64,
    pub active_organizations: u64,
    pub certificates: u64,
}

/// Organization-wide volunteer report. `names` resolves volunteer display names.
pub fn volunteer_stats(
    rows: &[ParticipationRecord],
    names: &HashMap<VolunteerId, String>,
) -> VolunteerStats {
    #[derive(Default)]
    struct Acc {
        events: HashSet<EventId>,
        hours: Hours,
        completed: u64,
    }

    let mut per_volunteer: HashMap<VolunteerId, Acc> = HashMap::new();
    for row in rows {
        let acc = per_volunteer.entry(row.volunteer_id).or_default();
        if row.status != ParticipationStatus::Cancelled {
            acc.events.insert(row.event_id);
        }
        if row.status == ParticipationStatus::Completed {
            acc.hours = acc.hours.saturating_add(row.hours_completed);
            acc.completed += 1;
        }
    }

    let total_service_hours: Hours = per_volunteer.values().map(|acc| acc.hours).sum();
    let certificates_issued: u64 = per_volunteer.values().map(|acc| acc.completed).sum();
    let active_volunteers = per_volunteer.values().filter(|acc| acc.completed > 0).count() as u64;

    let mut top_volunteers: Vec<TopVolunteer> = per_volunteer
        .into_iter()
        .filter(|(_, acc)| !acc.events.is_empty())
        .map(|(volunteer_id, acc)| TopVolunteer {
            volunteer_id,
            name: names
                .get(&volunteer_id)
                .cloned()
                .unwrap_or_else(|| volunteer_id.to_string()),
            events_count: acc.events.len() as u64,
            total_hours: acc.hours,
            certificates_count: acc.completed,
        })
        .collect();
    top_volunteers.sort_by(|a, b| {
        b.total_hours
            .cmp(&a.total_hours)
            .then(b.certificates_count.cmp(&a.certificates_count))
            .then_with(|| a.name.cmp(&b.name))
    });
    top_volunteers.truncate(TOP_VOLUNTEERS_LIMIT);

    VolunteerStats {
        total_service_hours,
        active_volunteers,
        avg_hours_per_volunteer: total_service_hours.average(active_volunteers),
        certificates_issued,
        top_volunteers,
    }
}

pub fn event_participation_stats(
    events: &[EventRecord],
    rows: &[ParticipationRecord],
    today: NaiveDate,
) -> EventParticipationStats {
    let upcoming_events = events.iter().filter(|e| e.date >= today).count() as u64;
    let counts = tally(rows);

    let mut participation_by_month = BTreeMap::new();
    let mut per_event: HashMap<EventId, u64> = HashMap::new();
    for row in rows {
        *participation_by_month
            .entry(row.joined_at.format("%Y-%m").to_string())
            .or_insert(0) += 1;
        if row.status != ParticipationStatus::Cancelled {
            *per_event.entry(row.event_id).or_insert(0) += 1;
        }
    }

    let mut top_events: Vec<TopEvent> = events
        .iter()
        .filter_map(|event| {
            per_event.get(&event.id).map(|participants| TopEvent {
                event_id: event.id,
                name: event.name.clone(),
                participants: *participants,
            })
        })
        .collect();
    top_events.sort_by(|a, b| {
        b.participants
            .cmp(&a.participants)
            .then_with(|| a.name.cmp(&b.name))
    });
    top_events.truncate(TOP_EVENTS_LIMIT);

    EventParticipationStats {
        upcoming_events,
        total_participations: counts.total,
        avg_participants_per_event: ratio(counts.total, events.len() as u64),
        completion_rate: counts.completion_rate,
        participation_by_month,
        top_events,
    }
}

pub fn organization_stats(
    memberships: &[MembershipRecord],
    events: &[EventRecord],
    today: NaiveDate,
) -> OrganizationStats {
    OrganizationStats {
        total_members: memberships.len() as u64,
        active_volunteers: memberships
            .iter()
            .filter(|m| m.status == MembershipStatus::Active)
            .count() as u64,
        total_events: events.len() as u64,
        completed_events: events.iter().filter(|e| e.date < today).count() as u64,
    }
}

pub fn admin_dashboard_stats(
    events: &[EventRecord],
    rows: &[ParticipationRecord],
) -> AdminDashboardStats {
    let counts = tally(rows);
    AdminDashboardStats {
        total_events_managed: events.len() as u64,
        total_participations: counts.total,
        completed_participations: counts.completed,
    }
}

pub fn volunteer_summary(
    volunteer_id: VolunteerId,
    rows: &[ParticipationRecord],
    memberships: &[MembershipRecord],
) -> VolunteerSummary {
    let counts = tally(rows);
    VolunteerSummary {
        volunteer_id,
        tally: counts,
        organizations: memberships.len() as u64,
        active_organizations: memberships
            .iter()
            .filter(|m| m.status == MembershipStatus::Active)
            .count() as u64,
        certificates: counts.completed,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    round2(numerator as f64 / denominator as f64)
}

fn percentage(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    round2(numerator as f64 * 100.0 / denominator as f64)
}

/// Fetches the rows behind each report and computes it fresh.
#[derive(Clone)]
pub struct Analytics {
    store: Arc<dyn QuantrackStorage>,
}

impl Analytics {
    pub fn new(store: Arc<dyn QuantrackStorage>) -> Self {
        Self { store }
    }

    pub async fn tally(&self, scope: ParticipationScope) -> QuantrackResult<ParticipationTally> {
        let rows = self.store.list_participations(scope).await?;
        Ok(tally(&rows))
    }

    pub async fn volunteer_stats(&self, admin_id: &AdminId) -> QuantrackResult<VolunteerStats> {
        let admin = require_admin(self.store.as_ref(), admin_id).await?;
        let rows = self
            .store
            .list_participations(ParticipationScope::Organization(admin.organization_id))
            .await?;

        let mut names = HashMap::new();
        for volunteer_id in rows.iter().map(|r| r.volunteer_id).collect::<HashSet<_>>() {
            if let Some(volunteer) = self.store.get_volunteer(&volunteer_id).await? {
                names.insert(volunteer_id, volunteer.username);
            }
        }
        Ok(volunteer_stats(&rows, &names))
    }

    pub async fn event_participation_stats(
        &self,
        admin_id: &AdminId,
        today: NaiveDate,
    ) -> QuantrackResult<EventParticipationStats> {
        let admin = require_admin(self.store.as_ref(), admin_id).await?;
        let events = self.store.list_events(&admin.organization_id).await?;
        let rows = self
            .store
            .list_participations(ParticipationScope::Organization(admin.organization_id))
            .await?;
        Ok(event_participation_stats(&events, &rows, today))
    }

    pub async fn organization_stats(
        &self,
        admin_id: &AdminId,
        today: NaiveDate,
    ) -> QuantrackResult<OrganizationStats> {
        let admin = require_admin(self.store.as_ref(), admin_id).await?;
        let memberships = self
            .store
            .list_memberships(MembershipFilter::for_organization(admin.organization_id))
            .await?;
        let events = self.store.list_events(&admin.organization_id).await?;
        Ok(organization_stats(&memberships, &events, today))
    }

    pub async fn admin_dashboard_stats(
        &self,
        admin_id: &AdminId,
    ) -> QuantrackResult<AdminDashboardStats> {
        let admin = require_admin(self.store.as_ref(), admin_id).await?;
        let events = self.store.list_events(&admin.organization_id).await?;
        let rows = self
            .store
            .list_participations(ParticipationScope::Organization(admin.organization_id))
            .await?;
        Ok(admin_dashboard_stats(&events, &rows))
    }

    pub async fn volunteer_summary(
        &self,
        volunteer_id: &VolunteerId,
    ) -> QuantrackResult<VolunteerSummary> {
        if self.store.get_volunteer(volunteer_id).await?.is_none() {
            return Err(QuantrackError::not_found("volunteer", volunteer_id));
        }
        let rows = self
            .store
            .list_participations(ParticipationScope::Volunteer(*volunteer_id))
            .await?;
        let memberships = self
            .store
            .list_memberships(MembershipFilter::for_volunteer(*volunteer_id))
            .await?;
        Ok(volunteer_summary(*volunteer_id, &rows, &memberships))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;
    use chrono::{TimeZone, Utc};
    use quantrack_store::{OrganizationId, ParticipationId};

    fn row(
        volunteer_id: VolunteerId,
        event_id: EventId,
        status: ParticipationStatus,
        hundredths: u64,
        month: u32,
    ) -> ParticipationRecord {
        let at = Utc.with_ymd_and_hms(2024, month, 10, 12, 0, 0).unwrap();
        ParticipationRecord {
            id: ParticipationId::generate(),
            volunteer_id,
            event_id,
            status,
            hours_completed: Hours::from_hundredths(hundredths),
            certificate_code: format!("QT-{}", ParticipationId::generate()),
            joined_at: at,
            completed_at: (status == ParticipationStatus::Completed).then_some(at),
            updated_at: at,
        }
    }

    fn event(name: &str, date: NaiveDate) -> EventRecord {
        EventRecord {
            id: EventId::generate(),
            organization_id: OrganizationId::generate(),
            name: name.to_string(),
            description: String::new(),
            date,
            time: None,
            location: "Hall".to_string(),
            is_public: true,
            service_hours: Hours::from_hundredths(200),
            created_at: Utc::now(),
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn empty_tally_never_divides_by_zero() {
        let t = tally(&Vec::<ParticipationRecord>::new());
        assert_eq!(t.total, 0);
        assert_eq!(t.average_hours_per_completed, Hours::ZERO);
        assert_eq!(t.completion_rate, 0.0);
    }

    #[test]
    fn average_is_zero_without_completions() {
        let v = VolunteerId::generate();
        let e = EventId::generate();
        let rows = vec![
            row(v, e, ParticipationStatus::Joined, 0, 1),
            row(v, EventId::generate(), ParticipationStatus::Cancelled, 0, 1),
        ];
        let t = tally(&rows);
        assert_eq!(t.completed, 0);
        assert_eq!(t.average_hours_per_completed, Hours::ZERO);
        assert_eq!(t.total, 2);
    }

    #[test]
    fn tally_splits_completed_and_logged_hours() {
        let v = VolunteerId::generate();
        let rows = vec![
            row(v, EventId::generate(), ParticipationStatus::Completed, 300, 1),
            row(v, EventId::generate(), ParticipationStatus::Completed, 150, 2),
            row(v, EventId::generate(), ParticipationStatus::Joined, 0, 2),
        ];
        let t = tally(&rows);
        assert_eq!(t.completed, 2);
        assert_eq!(t.joined, 1);
        assert_eq!(t.hours_completed, Hours::from_hundredths(450));
        assert_eq!(t.hours_logged, Hours::from_hundredths(450));
        assert_eq!(t.average_hours_per_completed, Hours::from_hundredths(225));
        assert_eq!(t.completion_rate, 66.67);
    }

    #[test]
    fn volunteer_stats_rank_by_hours() {
        let ava = VolunteerId::generate();
        let ben = VolunteerId::generate();
        let e1 = EventId::generate();
        let e2 = EventId::generate();
        let rows = vec![
            row(ava, e1, ParticipationStatus::Completed, 200, 1),
            row(ben, e1, ParticipationStatus::Completed, 300, 1),
            row(ben, e2, ParticipationStatus::Completed, 100, 2),
        ];
        let names = HashMap::from([(ava, "ava".to_string()), (ben, "ben".to_string())]);

        let stats = volunteer_stats(&rows, &names);
        assert_eq!(stats.total_service_hours, Hours::from_hundredths(600));
        assert_eq!(stats.active_volunteers, 2);
        assert_eq!(stats.avg_hours_per_volunteer, Hours::from_hundredths(300));
        assert_eq!(stats.certificates_issued, 3);
        assert_eq!(stats.top_volunteers[0].name, "ben");
        assert_eq!(stats.top_volunteers[0].events_count, 2);
        assert_eq!(stats.top_volunteers[1].certificates_count, 1);
    }

    #[test]
    fn event_stats_bucket_by_month_and_split_upcoming() {
        let today = day(2024, 6, 1);
        let past = event("Spring sweep", day(2024, 4, 1));
        let future = event("Summer sweep", day(2024, 7, 1));
        let v1 = VolunteerId::generate();
        let v2 = VolunteerId::generate();
        let rows = vec![
            row(v1, past.id, ParticipationStatus::Completed, 200, 3),
            row(v2, past.id, ParticipationStatus::Cancelled, 0, 3),
            row(v1, future.id, ParticipationStatus::Joined, 0, 5),
        ];

        let stats = event_participation_stats(&[past.clone(), future.clone()], &rows, today);
        assert_eq!(stats.upcoming_events, 1);
        assert_eq!(stats.total_participations, 3);
        assert_eq!(stats.avg_participants_per_event, 1.5);
        assert_eq!(stats.completion_rate, 33.33);
        assert_eq!(stats.participation_by_month.get("2024-03"), Some(&2));
        assert_eq!(stats.participation_by_month.get("2024-05"), Some(&1));
        assert_eq!(stats.top_events.len(), 2);
        assert!(stats.top_events.iter().all(|e| e.participants == 1));

        let empty = event_participation_stats(&[], &[], today);
        assert_eq!(empty.avg_participants_per_event, 0.0);
        assert_eq!(empty.completion_rate, 0.0);
    }

    #[tokio::test]
    async fn analytics_scope_reports_to_the_admin_organization() {
        let fx = Fixture::new().await;
        let (_, outsider) = fx.other_organization().await;
        let ava = fx.volunteer("ava").await;
        let event = fx.event(true, 300).await;

        let membership = fx
            .memberships
            .join(&ava.id, &fx.org.join_code)
            .await
            .unwrap();
        fx.memberships
            .approve(&fx.admin.id, &membership.id)
            .await
            .unwrap();
        let p = fx
            .participations
            .join_event(&ava.id, &event.id)
            .await
            .unwrap();
        fx.participations
            .complete(&fx.admin.id, &p.id, None)
            .await
            .unwrap();

        let analytics = Analytics::new(fx.store.clone());
        let org = analytics
            .organization_stats(&fx.admin.id, day(1999, 1, 1))
            .await
            .unwrap();
        assert_eq!(org.total_members, 1);
        assert_eq!(org.active_volunteers, 1);
        assert_eq!(org.total_events, 1);
        assert_eq!(org.completed_events, 0);

        let dash = analytics.admin_dashboard_stats(&fx.admin.id).await.unwrap();
        assert_eq!(dash.completed_participations, 1);

        let volunteers = analytics.volunteer_stats(&fx.admin.id).await.unwrap();
        assert_eq!(volunteers.top_volunteers[0].name, "ava");

        let outside = analytics.admin_dashboard_stats(&outsider.id).await.unwrap();
        assert_eq!(outside.total_participations, 0);

        let summary = analytics.volunteer_summary(&ava.id).await.unwrap();
        assert_eq!(summary.certificates, 1);
        assert_eq!(summary.active_organizations, 1);
        assert_eq!(summary.tally.hours_completed, Hours::from_hundredths(300));

        let by_event = analytics
            .tally(ParticipationScope::Event(event.id))
            .await
            .unwrap();
        assert_eq!(by_event.completed, 1);
    }
}
