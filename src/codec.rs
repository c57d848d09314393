//! Packed coordinate decoding.
//!
//! The feed encodes the hypocenter as a single string such as
//! `+35.5+139.7-10000/`: a `+`-separated latitude and longitude followed by an
//! optional `-`-prefixed depth.

use thiserror::Error;

use crate::errors::RejectReason;

/// Decoded epicenter position in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// The packed string did not yield two floats.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed coordinate string {0:?}")]
pub struct MalformedCoordinate(pub String);

impl From<MalformedCoordinate> for RejectReason {
    fn from(_: MalformedCoordinate) -> Self {
        Self::MalformedCoordinate
    }
}

/// Decode a packed coordinate string.
///
/// # Errors
///
/// Returns [`MalformedCoordinate`] when fewer than three `+`-segments exist or
/// either extracted segment is not a float.
pub fn decode(packed: &str) -> Result<Coordinates, MalformedCoordinate> {
    let malformed = || MalformedCoordinate(packed.to_string());

    let mut segments = packed.split('+').skip(1);
    let lat = segments.next().ok_or_else(malformed)?;
    let lon_and_depth = segments.next().ok_or_else(malformed)?;

    // Depth and the ISO 6709 terminator trail the longitude.
    let lon = lon_and_depth
        .split('-')
        .next()
        .unwrap_or_default()
        .trim_end_matches('/');

    let latitude = lat.trim().parse::<f64>().map_err(|_| malformed())?;
    let longitude = lon.trim().parse::<f64>().map_err(|_| malformed())?;

    Ok(Coordinates {
        latitude,
        longitude,
    })
}
