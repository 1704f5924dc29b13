//! Property tests: certificate codes are unique and fingerprints detect tampering.

use chrono::{NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use quantrack_core::certificate::{generate_certificate_code, Certificate};
use quantrack_core::store::{EventId, Hours, OrganizationId, ParticipationId, VolunteerId};
use std::collections::HashSet;

fn arb_certificate() -> impl Strategy<Value = Certificate> {
    ("[A-Za-z ]{1,20}", "[A-Za-z ]{1,30}", 0u64..100_000, 1u32..29).prop_map(
        |(recipient, event, hundredths, day)| {
            let code = generate_certificate_code();
            let mut cert = Certificate {
                verification_url: format!("https://quantrack.com/verify/{code}"),
                certificate_code: code,
                participation_id: ParticipationId::generate(),
                volunteer_id: VolunteerId::generate(),
                recipient_name: recipient,
                event_id: EventId::generate(),
                event_name: event,
                event_date: NaiveDate::from_ymd_opt(2024, 2, day).unwrap(),
                organization_id: OrganizationId::generate(),
                organization_name: "Harbor volunteers".to_string(),
                hours: Hours::from_hundredths(hundredths),
                completed_at: Utc.with_ymd_and_hms(2024, 3, 1, 17, 0, 0).unwrap(),
                fingerprint: String::new(),
            };
            cert.fingerprint = cert.compute_fingerprint();
            cert
        },
    )
}

proptest! {
    /// Generated codes never repeat within a batch.
    #[test]
    fn generated_codes_are_unique(count in 1usize..500) {
        let codes: HashSet<String> = (0..count).map(|_| generate_certificate_code()).collect();
        prop_assert_eq!(codes.len(), count);
    }

    /// A freshly built certificate always verifies.
    #[test]
    fn fresh_certificate_verifies(cert in arb_certificate()) {
        prop_assert!(cert.verify_fingerprint());
    }

    /// Changing the recorded hours invalidates the fingerprint.
    #[test]
    fn tampered_hours_invalidate_fingerprint(cert in arb_certificate(), bump in 1u64..1_000) {
        let mut tampered = cert;
        tampered.hours = Hours::from_hundredths(tampered.hours.hundredths() + bump);
        prop_assert!(!tampered.verify_fingerprint());
    }

    /// Changing the recipient invalidates the fingerprint.
    #[test]
    fn tampered_recipient_invalidates_fingerprint(cert in arb_certificate()) {
        let mut tampered = cert;
        tampered.recipient_name.push('x');
        prop_assert!(!tampered.verify_fingerprint());
    }
}
