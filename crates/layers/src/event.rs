use chrono::{DateTime, Utc};
use foundation::ids::EventId;
use foundation::math::LatLon;
use serde::{Deserialize, Serialize};

/// An incident event as delivered by the event source.
///
/// Events are read-only to the map: markers are created from them and never
/// write back. Coordinates are optional because upstream reports are often
/// incomplete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: EventId,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(rename = "time", alias = "timestamp", alias = "occurredAt")]
    pub occurred_at: DateTime<Utc>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub police_count: Option<u32>,
    #[serde(default)]
    pub arrested_count: Option<u32>,
}

/// Why an event did not get a marker.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SkipReason {
    MissingCoordinate,
    NonFiniteCoordinate,
    /// Another event earlier in the same update already claimed this id.
    DuplicateId,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::MissingCoordinate => write!(f, "missing coordinate"),
            SkipReason::NonFiniteCoordinate => write!(f, "non-finite coordinate"),
            SkipReason::DuplicateId => write!(f, "duplicate event id"),
        }
    }
}

impl Event {
    pub fn new(id: u64, occurred_at: DateTime<Utc>) -> Self {
        Self {
            id: EventId(id),
            latitude: None,
            longitude: None,
            occurred_at,
            notes: None,
            police_count: None,
            arrested_count: None,
        }
    }

    pub fn at(mut self, lat: f64, lon: f64) -> Self {
        self.latitude = Some(lat);
        self.longitude = Some(lon);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Position of a mappable event: both coordinates present and finite.
    pub fn position(&self) -> Result<LatLon, SkipReason> {
        let (Some(lat), Some(lon)) = (self.latitude, self.longitude) else {
            return Err(SkipReason::MissingCoordinate);
        };
        let p = LatLon::new(lat, lon);
        if !p.is_finite() {
            return Err(SkipReason::NonFiniteCoordinate);
        }
        Ok(p)
    }

    pub fn is_mappable(&self) -> bool {
        self.position().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::{Event, SkipReason};
    use chrono::{TimeZone, Utc};
    use foundation::ids::EventId;

    fn t0() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn position_requires_both_finite_coordinates() {
        assert!(Event::new(1, t0()).at(10.0, 20.0).is_mappable());
        assert_eq!(
            Event::new(2, t0()).position(),
            Err(SkipReason::MissingCoordinate)
        );

        let mut half = Event::new(3, t0());
        half.latitude = Some(1.0);
        assert_eq!(half.position(), Err(SkipReason::MissingCoordinate));

        assert_eq!(
            Event::new(4, t0()).at(f64::NAN, 1.0).position(),
            Err(SkipReason::NonFiniteCoordinate)
        );
    }

    #[test]
    fn zero_coordinates_are_mappable() {
        assert!(Event::new(1, t0()).at(0.0, 0.0).is_mappable());
    }

    #[test]
    fn decodes_source_wire_format() {
        let json = r#"{
            "id": 7,
            "time": "2024-03-01T12:00:00Z",
            "latitude": 50.45,
            "longitude": 30.52,
            "policeCount": 4,
            "arrestedCount": 1,
            "notes": "near the square",
            "carPlates": "ignored"
        }"#;
        let ev: Event = serde_json::from_str(json).unwrap();
        assert_eq!(ev.id, EventId(7));
        assert_eq!(ev.occurred_at, t0());
        assert_eq!(ev.police_count, Some(4));
        assert_eq!(ev.arrested_count, Some(1));
        assert!(ev.is_mappable());
    }

    #[test]
    fn accepts_timestamp_alias_and_null_coordinates() {
        let json = r#"{"id": 8, "timestamp": "2024-03-01T12:00:00Z", "latitude": null}"#;
        let ev: Event = serde_json::from_str(json).unwrap();
        assert_eq!(ev.latitude, None);
        assert_eq!(ev.position(), Err(SkipReason::MissingCoordinate));
    }
}
