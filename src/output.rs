//! Output formatters for stored events and alerts.
//!
//! Supports human-readable (with colors), JSON, and NDJSON formats.

use std::io::{self, Write};

use serde::Serialize;

use crate::models::{Alert, Event};

// ANSI color codes
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

// Magnitude-based colors
const RED: &str = "\x1b[91m"; // mag >= 7.0
const YELLOW: &str = "\x1b[93m"; // mag >= 6.0
const CYAN: &str = "\x1b[96m"; // mag >= 4.5
const GREEN: &str = "\x1b[92m"; // mag >= 3.0
const WHITE: &str = "\x1b[97m";

const ALERT_BANNER: &str = "\x1b[41;97m";

const ICON_QUAKE: &str = "🌍";
const ICON_ALERT: &str = "⚠️";

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Human-readable terminal output (default)
    #[default]
    Human,
    /// JSON array
    Json,
    /// Newline-delimited JSON (one object per line)
    Ndjson,
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            "ndjson" => Ok(Self::Ndjson),
            _ => Err(format!("unknown format: {s} (expected: human, json, ndjson)")),
        }
    }
}

fn magnitude_color(mag: f64) -> &'static str {
    match mag {
        m if m >= 7.0 => RED,
        m if m >= 6.0 => YELLOW,
        m if m >= 4.5 => CYAN,
        m if m >= 3.0 => GREEN,
        _ => WHITE,
    }
}

fn magnitude_label(mag: f64) -> &'static str {
    match mag {
        m if m >= 7.0 => "MAJOR",
        m if m >= 6.0 => "STRONG",
        m if m >= 4.5 => "MODERATE",
        m if m >= 3.0 => "LIGHT",
        m if m >= 2.0 => "MINOR",
        _ => "MICRO",
    }
}

/// Write events in human-readable format, colored by magnitude.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_human<W: Write>(writer: &mut W, events: &[Event]) -> io::Result<()> {
    for event in events {
        let color = magnitude_color(event.magnitude);
        let label = magnitude_label(event.magnitude);
        let time = event.occurred_at.format("%Y-%m-%d %H:%M:%S %:z");

        writeln!(
            writer,
            "{ICON_QUAKE} {color}{BOLD}M{mag:.1}{RESET} │ \
             {color}{label:8}{RESET} │ \
             {time} │ \
             {name} {DIM}({city}, {region}){RESET}",
            mag = event.magnitude,
            name = event.epicenter_name,
            city = event.city,
            region = event.region,
        )?;
    }
    Ok(())
}

/// Write events as a JSON array.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_json<W: Write, T: Serialize>(writer: &mut W, items: &[T]) -> io::Result<()> {
    let json = serde_json::to_string_pretty(items)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{json}")
}

/// Write items as newline-delimited JSON.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_ndjson<W: Write, T: Serialize>(writer: &mut W, items: &[T]) -> io::Result<()> {
    for item in items {
        let json = serde_json::to_string(item)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        writeln!(writer, "{json}")?;
    }
    Ok(())
}

/// Write events in the specified format.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_events<W: Write>(writer: &mut W, events: &[Event], format: Format) -> io::Result<()> {
    match format {
        Format::Human => write_human(writer, events),
        Format::Json => write_json(writer, events),
        Format::Ndjson => write_ndjson(writer, events),
    }
}

/// Write plain values one per line.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_lines<W: Write, T: std::fmt::Display>(writer: &mut W, items: &[T]) -> io::Result<()> {
    for item in items {
        writeln!(writer, "{item}")?;
    }
    Ok(())
}

/// Write one alert. Human format is a banner; machine formats emit one
/// NDJSON line so alerts can be piped.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_alert<W: Write>(writer: &mut W, alert: &Alert, format: Format) -> io::Result<()> {
    if format != Format::Human {
        return write_ndjson(writer, std::slice::from_ref(alert));
    }

    let color = magnitude_color(alert.magnitude);
    writeln!(writer)?;
    writeln!(writer, "{ALERT_BANNER} {ICON_ALERT} MAJOR EARTHQUAKE ALERT {RESET}")?;
    writeln!(writer, "  Time:      {}", alert.occurred_at.to_rfc3339())?;
    writeln!(
        writer,
        "  Location:  {}, {}",
        alert.epicenter_name, alert.region
    )?;
    writeln!(writer, "  Magnitude: {color}{BOLD}{:.1}{RESET}", alert.magnitude)?;
    writeln!(writer)?;
    Ok(())
}
