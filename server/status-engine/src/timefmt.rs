//! Timestamp parsing and Eastern display formatting.
//!
//! Vendors send ISO-8601 with `Z`, explicit offsets, 0-7 fractional digits,
//! or no offset at all (treated as UTC). Display is always US Eastern.

use chrono::offset::LocalResult;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serializer;

/// `2025-07-14 10:02:33 AM EDT`
pub const DISPLAY_FORMAT: &str = "%Y-%m-%d %I:%M:%S %p %Z";

const LOCAL_PART_FORMAT: &str = "%Y-%m-%d %I:%M:%S %p";

/// Zone used for every human-facing timestamp.
pub const DISPLAY_TZ: Tz = chrono_tz::US::Eastern;

/// Parse a vendor timestamp into a UTC instant.
pub fn parse_utc(s: &str) -> Option<DateTime<Utc>> {
  let s = s.trim();
  if s.is_empty() {
    return None;
  }
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Some(dt.with_timezone(&Utc));
  }
  // Offset-less timestamps; both separators are seen in the wild.
  ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    .map(|naive| naive.and_utc())
}

/// Render an instant in `tz` using [`DISPLAY_FORMAT`].
pub fn format_in(instant: &DateTime<Utc>, tz: Tz) -> String {
  instant.with_timezone(&tz).format(DISPLAY_FORMAT).to_string()
}

pub fn format_eastern(instant: &DateTime<Utc>) -> String {
  format_in(instant, DISPLAY_TZ)
}

/// Inverse of [`format_in`]. The trailing zone abbreviation picks the
/// earlier or later instant when the local time is repeated (DST fall-back).
pub fn parse_display(s: &str, tz: Tz) -> Option<DateTime<Utc>> {
  let (local, abbreviation) = s.trim().rsplit_once(' ')?;
  let naive = NaiveDateTime::parse_from_str(local, LOCAL_PART_FORMAT).ok()?;

  let resolved = match tz.from_local_datetime(&naive) {
    LocalResult::Single(dt) => dt,
    LocalResult::Ambiguous(earlier, later) => {
      if later.format("%Z").to_string() == abbreviation {
        later
      } else {
        earlier
      }
    }
    // Local time skipped by a DST transition; cannot come from format_in.
    LocalResult::None => return None,
  };
  Some(resolved.with_timezone(&Utc))
}

pub fn parse_eastern_display(s: &str) -> Option<DateTime<Utc>> {
  parse_display(s, DISPLAY_TZ)
}

/// Calendar date of `instant` as observed in `tz`.
pub fn local_date(instant: &DateTime<Utc>, tz: Tz) -> NaiveDate {
  instant.with_timezone(&tz).date_naive()
}

pub fn serialize_eastern<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
  s.serialize_str(&format_eastern(dt))
}

pub fn serialize_eastern_opt<S: Serializer>(
  dt: &Option<DateTime<Utc>>,
  s: S,
) -> Result<S::Ok, S::Error> {
  match dt {
    Some(dt) => s.serialize_str(&format_eastern(dt)),
    None => s.serialize_none(),
  }
}
