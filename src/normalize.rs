//! Raw record normalization.
//!
//! Turns a loosely-typed [`RawRecord`] into a [`Quake`] or a single
//! [`RejectReason`]. Blank strings count as missing.

use chrono::DateTime;

use crate::codec;
use crate::errors::RejectReason;
use crate::models::{Quake, RawRecord};

/// Normalize one feed record.
///
/// The English epicenter name is preferred; the default-locale name is the
/// fallback.
///
/// # Errors
///
/// Returns the first [`RejectReason`] that applies, checked in the order
/// id, timestamp, name, magnitude, coordinates.
pub fn normalize(raw: &RawRecord) -> Result<Quake, RejectReason> {
    let event_id = present(raw.eid.as_deref()).ok_or(RejectReason::MissingId)?;

    let at = present(raw.at.as_deref()).ok_or(RejectReason::MissingTimestamp)?;
    let occurred_at =
        DateTime::parse_from_rfc3339(at).map_err(|_| RejectReason::MalformedTimestamp)?;

    let epicenter_name = present(raw.en_anm.as_deref())
        .or_else(|| present(raw.anm.as_deref()))
        .ok_or(RejectReason::MissingName)?;

    let magnitude = present(raw.mag.as_deref())
        .and_then(|m| m.parse::<f64>().ok())
        .filter(|m| m.is_finite())
        .ok_or(RejectReason::MissingMagnitude)?;

    let coords = codec::decode(raw.cod.as_deref().unwrap_or_default())?;

    Ok(Quake {
        event_id: event_id.to_string(),
        occurred_at,
        epicenter_name: epicenter_name.to_string(),
        magnitude,
        latitude: coords.latitude,
        longitude: coords.longitude,
    })
}

fn present(field: Option<&str>) -> Option<&str> {
    field.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> RawRecord {
        RawRecord {
            eid: Some("E1".into()),
            at: Some("2024-01-01T16:10:00+09:00".into()),
            anm: Some("東京湾".into()),
            en_anm: Some("Tokyo Bay".into()),
            mag: Some("6.1".into()),
            cod: Some("ABC+35.5+139.7-10".into()),
        }
    }

    #[test]
    fn test_complete_record() {
        let quake = normalize(&record()).unwrap();
        assert_eq!(quake.event_id, "E1");
        assert_eq!(quake.epicenter_name, "Tokyo Bay");
        assert!((quake.magnitude - 6.1).abs() < 1e-9);
        assert!((quake.latitude - 35.5).abs() < 1e-9);
        assert!((quake.longitude - 139.7).abs() < 1e-9);
        assert_eq!(quake.occurred_at.to_rfc3339(), "2024-01-01T16:10:00+09:00");
    }

    #[test]
    fn test_name_falls_back_to_native() {
        let mut raw = record();
        raw.en_anm = Some("  ".into());
        assert_eq!(normalize(&raw).unwrap().epicenter_name, "東京湾");

        raw.en_anm = None;
        assert_eq!(normalize(&raw).unwrap().epicenter_name, "東京湾");
    }

    #[test]
    fn test_reject_reasons() {
        let cases: [(fn(&mut RawRecord), RejectReason); 8] = [
            (|r| r.eid = None, RejectReason::MissingId),
            (|r| r.eid = Some(String::new()), RejectReason::MissingId),
            (|r| r.at = None, RejectReason::MissingTimestamp),
            (|r| r.at = Some("yesterday".into()), RejectReason::MalformedTimestamp),
            (
                |r| {
                    r.en_anm = None;
                    r.anm = None;
                },
                RejectReason::MissingName,
            ),
            (|r| r.mag = None, RejectReason::MissingMagnitude),
            (|r| r.mag = Some("M不明".into()), RejectReason::MissingMagnitude),
            (|r| r.cod = Some("35.5".into()), RejectReason::MalformedCoordinate),
        ];

        for (mutate, expected) in cases {
            let mut raw = record();
            mutate(&mut raw);
            assert_eq!(normalize(&raw), Err(expected));
        }
    }

    #[test]
    fn test_missing_coordinates_rejected() {
        let mut raw = record();
        raw.cod = None;
        assert_eq!(normalize(&raw), Err(RejectReason::MalformedCoordinate));
    }

    #[test]
    fn test_first_reason_wins() {
        let raw = RawRecord {
            eid: Some("E2".into()),
            ..RawRecord::default()
        };
        assert_eq!(normalize(&raw), Err(RejectReason::MissingTimestamp));
    }
}
