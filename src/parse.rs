//! Parsers for the text fragments the portal renders state into.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::error::{Error, Result};

/// Marker substring present in the class attribute of a "done" check icon.
/// The portal toggles classes like `"ch"` / `"ch on"`, so substring is the contract.
const CHECKED_MARKER: &str = "on";

static CLOCK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(?:(\d{1,2}):)?(\d{1,2}):(\d{2})$").unwrap());

/// True iff a class attribute carries the completion marker.
pub fn is_checked(class_attr: &str) -> bool {
	class_attr.contains(CHECKED_MARKER)
}

/// Parses a bare integer minute count, e.g. `"45"`.
pub fn parse_minutes(text: &str) -> Result<Duration> {
	let minutes: u64 = text.trim().parse().map_err(|_| Error::parse("minute count", text))?;
	Ok(Duration::from_secs(minutes * 60))
}

/// Parses a completion percentage as the portal prints it, e.g. `"66.67"`.
pub fn parse_percent(text: &str) -> Result<f32> {
	text.trim().parse().map_err(|_| Error::parse("completion percentage", text))
}

/// Parses a player clock display, `"HH:MM:SS"` or `"MM:SS"`.
///
/// The player blanks the clock once the video has finished, so an empty string
/// is the completion sentinel and maps to `None` rather than an error.
pub fn parse_clock(text: &str) -> Result<Option<Duration>> {
	let text = text.trim();
	if text.is_empty() {
		return Ok(None);
	}

	let caps = CLOCK_RE.captures(text).ok_or_else(|| Error::parse("clock duration", text))?;
	let hours: u64 = caps.get(1).map_or("0", |m| m.as_str()).parse().map_err(|_| Error::parse("clock duration", text))?;
	let minutes: u64 = caps[2].parse().map_err(|_| Error::parse("clock duration", text))?;
	let seconds: u64 = caps[3].parse().map_err(|_| Error::parse("clock duration", text))?;

	Ok(Some(Duration::from_secs(hours * 3600 + minutes * 60 + seconds)))
}

/// Renders a duration the way the player clock does: `MM:SS` under an hour,
/// `HH:MM:SS` from then on. Inverse of [`parse_clock`] for whole-second values.
pub fn format_clock(d: Duration) -> String {
	let total = d.as_secs();
	let (hours, minutes, seconds) = (total / 3600, total % 3600 / 60, total % 60);
	if hours > 0 { format!("{hours:02}:{minutes:02}:{seconds:02}") } else { format!("{minutes:02}:{seconds:02}") }
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_is_checked_marker() {
		assert!(is_checked("ch on"));
		assert!(!is_checked("ch"));
		assert!(!is_checked(""));
	}

	#[test]
	fn test_parse_minutes() {
		assert_eq!(parse_minutes("45").unwrap(), Duration::from_secs(45 * 60));
		assert_eq!(parse_minutes("0").unwrap(), Duration::ZERO);
		assert!(matches!(parse_minutes("abc").unwrap_err(), Error::Parse { .. }));
		assert!(matches!(parse_minutes("4.5").unwrap_err(), Error::Parse { .. }));
	}

	#[test]
	fn test_parse_percent() {
		assert_eq!(parse_percent("66.67").unwrap(), 66.67);
		assert_eq!(parse_percent("100").unwrap(), 100.0);
		assert!(matches!(parse_percent("n/a").unwrap_err(), Error::Parse { .. }));
	}

	#[test]
	fn test_parse_clock_formats() {
		assert_eq!(parse_clock("09:10").unwrap(), Some(Duration::from_secs(9 * 60 + 10)));
		assert_eq!(parse_clock("01:02:03").unwrap(), Some(Duration::from_secs(3723)));
		assert_eq!(parse_clock(" 10:00 ").unwrap(), Some(Duration::from_secs(600)));
	}

	#[test]
	fn test_parse_clock_empty_is_completion_sentinel() {
		assert_eq!(parse_clock("").unwrap(), None);
		assert_eq!(parse_clock("  ").unwrap(), None);
	}

	#[test]
	fn test_parse_clock_rejects_garbage() {
		assert!(matches!(parse_clock("soon").unwrap_err(), Error::Parse { .. }));
		assert!(matches!(parse_clock("1:2:3:4").unwrap_err(), Error::Parse { .. }));
		assert!(matches!(parse_clock("10:0a").unwrap_err(), Error::Parse { .. }));
	}

	#[test]
	fn test_clock_round_trip() {
		for secs in [0, 45, 59, 60, 61, 599, 600, 3599, 3600, 3723, 23 * 3600 + 59 * 60 + 59] {
			let d = Duration::from_secs(secs);
			assert_eq!(parse_clock(&format_clock(d)).unwrap(), Some(d), "round-trip failed for {secs}s");
		}
	}
}
