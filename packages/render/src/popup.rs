//! Popup and summary text.

use safe_route_incident_models::Incident;
use safe_route_route_models::Route;

use crate::tier_for_score;

/// Detail text for an activated incident marker. Missing fields are
/// omitted.
#[must_use]
pub fn incident_detail(incident: &Incident) -> String {
    let mut lines = vec![incident.incident_type.clone()];
    if let Some(date) = &incident.date {
        lines.push(date.clone());
    }
    if let Some(value) = incident.severity.raw() {
        lines.push(format!("Severity: {value}/5"));
    }
    if let Some(description) = &incident.description {
        lines.push(description.clone());
    }
    lines.join("\n")
}

/// Popup text attached to a route overlay. `position` is zero-based.
#[must_use]
pub fn route_popup(position: usize, route: &Route) -> String {
    format!(
        "Route {} · Safety {} · Crimes {} · {} · {}",
        position + 1,
        route.safety_score,
        route.crime_count,
        route.distance,
        route.duration
    )
}

/// Summary line for a freshly drawn route set.
#[must_use]
pub fn best_route_summary(route: &Route) -> String {
    format!(
        "Best: {} • {} • Safety {}",
        route.distance, route.duration, route.safety_score
    )
}

/// Summary line for the currently selected route.
#[must_use]
pub fn selected_route_summary(position: usize, route: &Route) -> String {
    format!(
        "Route {}: {} ({}) • {} crimes • {} • {}",
        position + 1,
        route.safety_score,
        tier_for_score(route.safety_score).label(),
        route.crime_count,
        route.distance,
        route.duration
    )
}

#[cfg(test)]
mod tests {
    use safe_route_geography_models::GeoPoint;
    use safe_route_incident_models::Severity;

    use super::*;

    fn route() -> Route {
        Route {
            points: vec![
                GeoPoint { lat: 0.0, lng: 0.0 },
                GeoPoint { lat: 1.0, lng: 1.0 },
            ],
            safety_score: 82,
            distance: "4.2 km".to_string(),
            duration: "11 mins".to_string(),
            crime_count: 6,
        }
    }

    #[test]
    fn incident_detail_lists_present_fields() {
        let incident = Incident {
            id: Some(1),
            position: GeoPoint { lat: 0.0, lng: 0.0 },
            incident_type: "Robbery".to_string(),
            severity: Severity::new(4),
            description: Some("Phone snatched".to_string()),
            date: Some("2024-02-11".to_string()),
        };
        assert_eq!(
            incident_detail(&incident),
            "Robbery\n2024-02-11\nSeverity: 4/5\nPhone snatched"
        );

        let bare = Incident {
            description: None,
            date: None,
            severity: Severity::unknown(),
            ..incident
        };
        assert_eq!(incident_detail(&bare), "Robbery");
    }

    #[test]
    fn route_texts_come_from_structured_route() {
        let route = route();
        assert_eq!(
            route_popup(0, &route),
            "Route 1 · Safety 82 · Crimes 6 · 4.2 km · 11 mins"
        );
        assert_eq!(best_route_summary(&route), "Best: 4.2 km • 11 mins • Safety 82");
        assert_eq!(
            selected_route_summary(2, &route),
            "Route 3: 82 (Very Safe) • 6 crimes • 4.2 km • 11 mins"
        );
    }
}
