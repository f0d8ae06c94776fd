//! Dispatch rules: who hears about an emergency and what they are told.

use uuid::Uuid;

use crate::models::{Emergency, Finding, GeoPoint, NewNotification, NotificationKind};
use crate::services::geo::haversine_km;

/// Operators within this many kilometres of a new emergency are notified.
pub const DEFAULT_DISPATCH_RADIUS_KM: f64 = 3.0;

/// An operator with a known position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OperatorCandidate {
    pub user_id: Uuid,
    pub location: GeoPoint,
}

/// An operator selected for dispatch, with their distance to the emergency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearbyOperator {
    pub user_id: Uuid,
    pub distance_km: f64,
}

/// Selects operators within `radius_km` of `center`, nearest first.
///
/// The reporter is skipped even if they are an operator themselves.
pub fn select_nearby_operators<I>(
    center: GeoPoint,
    reporter_id: Uuid,
    candidates: I,
    radius_km: f64,
) -> Vec<NearbyOperator>
where
    I: IntoIterator<Item = OperatorCandidate>,
{
    let mut nearby: Vec<NearbyOperator> = candidates
        .into_iter()
        .filter(|c| c.user_id != reporter_id && c.location.is_valid())
        .map(|c| NearbyOperator {
            user_id: c.user_id,
            distance_km: haversine_km(center, c.location),
        })
        .filter(|n| n.distance_km <= radius_km)
        .collect();

    nearby.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    nearby
}

/// One "nearby emergency" notification per selected operator.
pub fn dispatch_notifications(
    emergency: &Emergency,
    nearby: &[NearbyOperator],
) -> Vec<NewNotification> {
    let place = emergency
        .address
        .as_deref()
        .map(|a| format!(" near {}", a))
        .unwrap_or_default();

    nearby
        .iter()
        .map(|op| NewNotification {
            recipient_id: op.user_id,
            emergency_id: Some(emergency.emergency_id),
            kind: NotificationKind::NearbyEmergency,
            title: format!("{} reported nearby", emergency.emergency_type.label()),
            message: format!(
                "{:.1} km away{}: {}",
                op.distance_km,
                place,
                summarize(&emergency.details)
            ),
        })
        .collect()
}

/// Tells the reporter that an operator took on their emergency.
pub fn accepted_notification(emergency: &Emergency, operator_name: &str) -> NewNotification {
    NewNotification {
        recipient_id: emergency.reporter_id,
        emergency_id: Some(emergency.emergency_id),
        kind: NotificationKind::EmergencyAccepted,
        title: "A drone operator is on the way".to_string(),
        message: format!(
            "{} accepted your {} report and is starting a search.",
            operator_name,
            emergency.emergency_type.label().to_lowercase()
        ),
    }
}

/// Tells the reporter about a new finding on their emergency.
pub fn finding_notification(emergency: &Emergency, finding: &Finding) -> NewNotification {
    let with_photo = if finding.image.is_some() {
        " (photo attached)"
    } else {
        ""
    };

    NewNotification {
        recipient_id: emergency.reporter_id,
        emergency_id: Some(emergency.emergency_id),
        kind: NotificationKind::FindingReported,
        title: "New finding reported".to_string(),
        message: format!("{}{}", summarize(&finding.description), with_photo),
    }
}

/// Tells the reporter the search is done and asks them to confirm.
pub fn completed_notification(emergency: &Emergency) -> NewNotification {
    NewNotification {
        recipient_id: emergency.reporter_id,
        emergency_id: Some(emergency.emergency_id),
        kind: NotificationKind::EmergencyCompleted,
        title: "Search completed".to_string(),
        message: "The operator finished the search. Please review the findings and resolve the emergency."
            .to_string(),
    }
}

/// Tells every operator who worked the emergency that the reporter closed it.
pub fn resolved_notifications(emergency: &Emergency, operator_ids: &[Uuid]) -> Vec<NewNotification> {
    operator_ids
        .iter()
        .filter(|id| **id != emergency.reporter_id)
        .map(|id| NewNotification {
            recipient_id: *id,
            emergency_id: Some(emergency.emergency_id),
            kind: NotificationKind::EmergencyResolved,
            title: "Emergency resolved".to_string(),
            message: format!(
                "The reporter marked the {} as resolved. Thank you for helping.",
                emergency.emergency_type.label().to_lowercase()
            ),
        })
        .collect()
}

/// First 120 characters of free text, on a char boundary.
fn summarize(text: &str) -> String {
    const MAX_CHARS: usize = 120;
    let trimmed = text.trim();
    if trimmed.chars().count() <= MAX_CHARS {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(MAX_CHARS).collect();
    format!("{}…", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EmergencyStatus, EmergencyType};
    use chrono::Utc;

    fn emergency_at(location: GeoPoint) -> Emergency {
        Emergency {
            id: 1,
            emergency_id: Uuid::new_v4(),
            reporter_id: Uuid::new_v4(),
            emergency_type: EmergencyType::MissingPerson,
            details: "Child missing near the lake shore".to_string(),
            location,
            address: Some("Seestrasse 1".to_string()),
            status: EmergencyStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            resolved_at: None,
        }
    }

    fn candidate(lat: f64, lon: f64) -> OperatorCandidate {
        OperatorCandidate {
            user_id: Uuid::new_v4(),
            location: GeoPoint::new(lat, lon),
        }
    }

    #[test]
    fn test_selects_only_operators_within_radius() {
        let center = GeoPoint::new(47.0, 8.0);
        let near = candidate(47.01, 8.0); // ~1.1 km
        let edge = candidate(47.025, 8.0); // ~2.8 km
        let far = candidate(47.05, 8.0); // ~5.6 km

        let selected = select_nearby_operators(
            center,
            Uuid::new_v4(),
            vec![far, edge, near],
            DEFAULT_DISPATCH_RADIUS_KM,
        );

        let ids: Vec<Uuid> = selected.iter().map(|n| n.user_id).collect();
        assert_eq!(ids, vec![near.user_id, edge.user_id]);
    }

    #[test]
    fn test_sorted_by_distance() {
        let center = GeoPoint::new(0.0, 0.0);
        let selected = select_nearby_operators(
            center,
            Uuid::new_v4(),
            vec![candidate(0.02, 0.0), candidate(0.0, 0.0), candidate(0.01, 0.0)],
            DEFAULT_DISPATCH_RADIUS_KM,
        );

        assert_eq!(selected.len(), 3);
        assert!(selected
            .windows(2)
            .all(|w| w[0].distance_km <= w[1].distance_km));
        // Co-located operator gets the floor distance, not zero.
        assert_eq!(selected[0].distance_km, 0.01);
    }

    #[test]
    fn test_reporter_is_excluded() {
        let center = GeoPoint::new(10.0, 10.0);
        let reporter = candidate(10.0, 10.0);

        let selected = select_nearby_operators(
            center,
            reporter.user_id,
            vec![reporter],
            DEFAULT_DISPATCH_RADIUS_KM,
        );
        assert!(selected.is_empty());
    }

    #[test]
    fn test_invalid_locations_are_skipped() {
        let selected = select_nearby_operators(
            GeoPoint::new(0.0, 0.0),
            Uuid::new_v4(),
            vec![candidate(f64::NAN, 0.0), candidate(120.0, 0.0)],
            DEFAULT_DISPATCH_RADIUS_KM,
        );
        assert!(selected.is_empty());
    }

    #[test]
    fn test_dispatch_notifications_one_per_operator() {
        let emergency = emergency_at(GeoPoint::new(47.0, 8.0));
        let nearby = vec![
            NearbyOperator {
                user_id: Uuid::new_v4(),
                distance_km: 0.4,
            },
            NearbyOperator {
                user_id: Uuid::new_v4(),
                distance_km: 2.25,
            },
        ];

        let notes = dispatch_notifications(&emergency, &nearby);
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].recipient_id, nearby[0].user_id);
        assert_eq!(notes[1].recipient_id, nearby[1].user_id);
        assert!(notes
            .iter()
            .all(|n| n.kind == NotificationKind::NearbyEmergency
                && n.emergency_id == Some(emergency.emergency_id)));
        assert_eq!(notes[0].title, "Missing person reported nearby");
        assert!(notes[1].message.starts_with("2.2 km away near Seestrasse 1:")
            || notes[1].message.starts_with("2.3 km away near Seestrasse 1:"));
    }

    #[test]
    fn test_accepted_notification_targets_reporter() {
        let emergency = emergency_at(GeoPoint::new(47.0, 8.0));
        let note = accepted_notification(&emergency, "Kim");
        assert_eq!(note.recipient_id, emergency.reporter_id);
        assert_eq!(note.kind, NotificationKind::EmergencyAccepted);
        assert!(note.message.starts_with("Kim accepted your missing person report"));
    }

    #[test]
    fn test_finding_notification_mentions_photo() {
        let emergency = emergency_at(GeoPoint::new(47.0, 8.0));
        let finding = Finding {
            id: 1,
            finding_id: Uuid::new_v4(),
            assignment_id: Uuid::new_v4(),
            emergency_id: emergency.emergency_id,
            operator_id: Uuid::new_v4(),
            description: "Backpack on the trail".to_string(),
            location: None,
            image: Some("aGVsbG8=".to_string()),
            created_at: Utc::now(),
        };

        let note = finding_notification(&emergency, &finding);
        assert_eq!(note.recipient_id, emergency.reporter_id);
        assert_eq!(note.message, "Backpack on the trail (photo attached)");
    }

    #[test]
    fn test_resolved_notifications_skip_reporter() {
        let emergency = emergency_at(GeoPoint::new(47.0, 8.0));
        let operator = Uuid::new_v4();
        let notes = resolved_notifications(&emergency, &[operator, emergency.reporter_id]);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].recipient_id, operator);
    }

    #[test]
    fn test_completed_notification_targets_reporter() {
        let emergency = emergency_at(GeoPoint::new(47.0, 8.0));
        let note = completed_notification(&emergency);
        assert_eq!(note.recipient_id, emergency.reporter_id);
        assert_eq!(note.kind, NotificationKind::EmergencyCompleted);
    }

    #[test]
    fn test_summarize_truncates_on_char_boundary() {
        let long = "ä".repeat(200);
        let summary = summarize(&long);
        assert_eq!(summary.chars().count(), 121);
        assert!(summary.ends_with('…'));
        assert_eq!(summarize("  short  "), "short");
    }
}
