#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Incident types and the incident-feed payload contract.
//!
//! The incident feed has been observed in two envelopes (a bare JSON array
//! and `{"crimes": [...]}`) and with severities that are not always valid
//! integers. Both are accepted here: [`parse_incidents`] normalizes either
//! envelope, and [`Severity`] keeps whatever numeric value was sent while
//! [`Severity::level`] coerces it into the five defined levels.

use safe_route_geography_models::GeoPoint;
use serde::{Deserialize, Serialize};

/// Type label used when the feed omits one.
pub const DEFAULT_INCIDENT_TYPE: &str = "Incident";

/// Severity level of an incident, from 1 (minimal) to 5 (critical).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SeverityLevel {
    /// Level 1
    Minimal = 1,
    /// Level 2
    Low = 2,
    /// Level 3, also used for missing or unreadable severities
    Moderate = 3,
    /// Level 4
    High = 4,
    /// Level 5
    Critical = 5,
}

impl SeverityLevel {
    /// Returns the numeric value of this severity level.
    #[must_use]
    pub const fn value(self) -> u8 {
        self as u8
    }

    /// Maps any integer onto the nearest defined level.
    #[must_use]
    pub const fn clamped(value: i64) -> Self {
        match value {
            i64::MIN..=1 => Self::Minimal,
            2 => Self::Low,
            3 => Self::Moderate,
            4 => Self::High,
            _ => Self::Critical,
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Minimal,
            Self::Low,
            Self::Moderate,
            Self::High,
            Self::Critical,
        ]
    }
}

/// Severity exactly as received, before coercion.
///
/// Holds `None` when the feed sent nothing usable (missing, `null`,
/// non-numeric text, non-finite numbers). Fractional values are banded
/// against the level boundaries: at most 2 keeps its floor, at least 4
/// keeps its floor, anything strictly between is 3.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Severity(Option<i64>);

impl Severity {
    /// Level assumed when the received value is unusable.
    pub const FALLBACK: SeverityLevel = SeverityLevel::Moderate;

    /// Wraps a known numeric severity, in range or not.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(Some(value))
    }

    /// A severity that could not be read.
    #[must_use]
    pub const fn unknown() -> Self {
        Self(None)
    }

    /// The numeric value as received, if any.
    #[must_use]
    pub const fn raw(self) -> Option<i64> {
        self.0
    }

    /// The effective numeric value: the received number, or 3.
    #[must_use]
    pub const fn value(self) -> i64 {
        match self.0 {
            Some(v) => v,
            None => Self::FALLBACK.value() as i64,
        }
    }

    /// The received value coerced onto the five defined levels.
    #[must_use]
    pub const fn level(self) -> SeverityLevel {
        match self.0 {
            Some(v) => SeverityLevel::clamped(v),
            None => Self::FALLBACK,
        }
    }

    fn from_json(value: &serde_json::Value) -> Self {
        let number = match value {
            serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(band_fraction)),
            serde_json::Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(band_fraction))
            }
            _ => None,
        };
        Self(number)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn band_fraction(v: f64) -> Option<i64> {
    if !v.is_finite() {
        return None;
    }
    if v <= 2.0 || v >= 4.0 {
        Some(v.floor() as i64)
    } else {
        Some(3)
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(Self::from_json(&value))
    }
}

/// A reported incident resolved to a coordinate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Incident {
    /// Backend identifier, when present.
    pub id: Option<i64>,
    /// Where the incident happened.
    pub position: GeoPoint,
    /// Incident type label (e.g. `"Theft"`).
    pub incident_type: String,
    /// Severity as received.
    pub severity: Severity,
    /// Free-text description.
    pub description: Option<String>,
    /// Date text, not interpreted.
    pub date: Option<String>,
}

/// One incident as sent by the feed.
#[derive(Debug, Clone, Deserialize)]
pub struct IncidentPayload {
    /// Backend identifier.
    #[serde(default)]
    pub id: Option<i64>,
    /// Latitude.
    pub latitude: f64,
    /// Longitude.
    pub longitude: f64,
    /// Type label; sent as `crime_type` or `type`.
    #[serde(default, rename = "crime_type", alias = "type")]
    pub incident_type: Option<String>,
    /// Severity, leniently parsed.
    #[serde(default)]
    pub severity: Severity,
    /// Description text.
    #[serde(default)]
    pub description: Option<String>,
    /// Date text.
    #[serde(default)]
    pub date: Option<String>,
}

/// The two envelopes the incident feed is known to use.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IncidentEnvelope {
    /// A bare array of incidents.
    Bare(Vec<IncidentPayload>),
    /// An object with a `crimes` array.
    Wrapped {
        /// The incidents.
        #[serde(default)]
        crimes: Vec<IncidentPayload>,
    },
}

impl IncidentEnvelope {
    /// Unwraps the incident list regardless of envelope.
    #[must_use]
    pub fn into_payloads(self) -> Vec<IncidentPayload> {
        match self {
            Self::Bare(list) | Self::Wrapped { crimes: list } => list,
        }
    }
}

/// Normalizes an incident-feed body (either envelope) into incidents.
///
/// Entries whose coordinates are outside the WGS84 range cannot be placed
/// on a map and are skipped with a warning.
///
/// # Errors
///
/// Returns a [`serde_json::Error`] if the body matches neither envelope.
pub fn parse_incidents(body: serde_json::Value) -> Result<Vec<Incident>, serde_json::Error> {
    let envelope: IncidentEnvelope = serde_json::from_value(body)?;
    Ok(envelope
        .into_payloads()
        .into_iter()
        .filter_map(|payload| {
            let position = match GeoPoint::new(payload.latitude, payload.longitude) {
                Ok(p) => p,
                Err(e) => {
                    log::warn!("Skipping incident {:?} with unplaceable position: {e}", payload.id);
                    return None;
                }
            };
            Some(Incident {
                id: payload.id,
                position,
                incident_type: payload
                    .incident_type
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_INCIDENT_TYPE.to_string()),
                severity: payload.severity,
                description: payload.description.filter(|d| !d.trim().is_empty()),
                date: payload.date.filter(|d| !d.trim().is_empty()),
            })
        })
        .collect())
}

/// Counts incidents per coerced severity level; index 0 is level 1.
#[must_use]
pub fn severity_histogram(incidents: &[Incident]) -> [u64; 5] {
    let mut counts = [0u64; 5];
    for incident in incidents {
        counts[usize::from(incident.severity.level().value() - 1)] += 1;
    }
    counts
}
