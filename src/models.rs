//! Data models for the quake list feed and the persisted event.
//!
//! `RawRecord` mirrors one element of the provider's JSON array loosely; every
//! field is optional because the provider omits or blanks fields freely.
//! `Quake` is a record that passed normalization and `Event` is a quake with
//! its resolved place, ready for persistence.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Sentinel used when a place name cannot be resolved.
pub const UNKNOWN_PLACE: &str = "N/A";

/// One element of the quake list, as delivered.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawRecord {
    /// Provider event ID
    #[serde(deserialize_with = "lenient_string")]
    pub eid: Option<String>,

    /// Origin time, RFC 3339 with offset
    #[serde(deserialize_with = "lenient_string")]
    pub at: Option<String>,

    /// Epicenter name in the provider's default locale
    #[serde(deserialize_with = "lenient_string")]
    pub anm: Option<String>,

    /// Epicenter name in English
    #[serde(deserialize_with = "lenient_string")]
    pub en_anm: Option<String>,

    /// Magnitude, usually delivered as a string
    #[serde(deserialize_with = "lenient_string")]
    pub mag: Option<String>,

    /// Packed hypocenter coordinates
    #[serde(deserialize_with = "lenient_string")]
    pub cod: Option<String>,
}

impl RawRecord {
    /// Build a raw record from an arbitrary JSON value.
    ///
    /// Anything that is not an object yields an empty record, which
    /// normalization then rejects.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        if value.is_object() {
            serde_json::from_value(value).unwrap_or_default()
        } else {
            Self::default()
        }
    }
}

/// Accept strings and numbers; treat everything else as absent.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// A record that passed normalization, not yet geocoded.
#[derive(Debug, Clone, PartialEq)]
pub struct Quake {
    pub event_id: String,
    pub occurred_at: DateTime<FixedOffset>,
    pub epicenter_name: String,
    pub magnitude: f64,
    pub latitude: f64,
    pub longitude: f64,
}

/// Reverse-geocoded place names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Place {
    pub city: String,
    pub region: String,
}

impl Place {
    /// Both names set to the `"N/A"` sentinel.
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            city: UNKNOWN_PLACE.to_string(),
            region: UNKNOWN_PLACE.to_string(),
        }
    }
}

/// The canonical persisted record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub event_id: String,
    pub occurred_at: DateTime<FixedOffset>,
    pub epicenter_name: String,
    pub magnitude: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub city: String,
    pub region: String,
}

impl Event {
    /// Attach a resolved place to a normalized quake.
    #[must_use]
    pub fn locate(quake: Quake, place: Place) -> Self {
        Self {
            event_id: quake.event_id,
            occurred_at: quake.occurred_at,
            epicenter_name: quake.epicenter_name,
            magnitude: quake.magnitude,
            latitude: quake.latitude,
            longitude: quake.longitude,
            city: place.city,
            region: place.region,
        }
    }
}

/// A detected quake in the region of interest.
///
/// This is the payload handed to an alert sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub event_id: String,
    pub occurred_at: DateTime<FixedOffset>,
    pub epicenter_name: String,
    pub region: String,
    pub city: String,
    pub magnitude: f64,
    pub latitude: f64,
    pub longitude: f64,
}

impl From<Event> for Alert {
    fn from(e: Event) -> Self {
        Self {
            event_id: e.event_id,
            occurred_at: e.occurred_at,
            epicenter_name: e.epicenter_name,
            region: e.region,
            city: e.city,
            magnitude: e.magnitude,
            latitude: e.latitude,
            longitude: e.longitude,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_provider_record() {
        let value = json!({
            "ctt": "20240101161509",
            "eid": "20240101161010",
            "rdt": "2024-01-01T16:15:00+09:00",
            "ttl": "震源・震度情報",
            "ift": "発表",
            "ser": "1",
            "at": "2024-01-01T16:10:00+09:00",
            "anm": "石川県能登地方",
            "en_anm": "Noto, Ishikawa Prefecture",
            "acd": "390",
            "cod": "+37.5+137.2-10000/",
            "mag": "7.6",
            "maxi": "7",
            "int": []
        });

        let raw = RawRecord::from_value(value);
        assert_eq!(raw.eid.as_deref(), Some("20240101161010"));
        assert_eq!(raw.at.as_deref(), Some("2024-01-01T16:10:00+09:00"));
        assert_eq!(raw.en_anm.as_deref(), Some("Noto, Ishikawa Prefecture"));
        assert_eq!(raw.mag.as_deref(), Some("7.6"));
        assert_eq!(raw.cod.as_deref(), Some("+37.5+137.2-10000/"));
    }

    #[test]
    fn test_numeric_and_null_fields() {
        let raw = RawRecord::from_value(json!({"eid": 42, "mag": 5.1, "anm": null}));
        assert_eq!(raw.eid.as_deref(), Some("42"));
        assert_eq!(raw.mag.as_deref(), Some("5.1"));
        assert!(raw.anm.is_none());
        assert!(raw.at.is_none());
    }

    #[test]
    fn test_non_object_is_empty_record() {
        let raw = RawRecord::from_value(json!("not a record"));
        assert!(raw.eid.is_none());
        assert!(raw.mag.is_none());
    }

    #[test]
    fn test_unknown_place() {
        let place = Place::unknown();
        assert_eq!(place.city, "N/A");
        assert_eq!(place.region, "N/A");
    }
}
