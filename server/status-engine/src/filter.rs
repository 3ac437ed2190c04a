//! Reporting-day filter for incident timelines.
//!
//! An entity counts for a run iff its calendar date, in the adapter's
//! reporting timezone, equals the calendar date of `now` in that same zone.
//! There is no trailing window: 23:59 yesterday does not count.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::timefmt;
use crate::types::IncidentUpdate;

/// The calendar day a run reports on, pinned to one timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportingDay {
  tz: Tz,
  date: NaiveDate,
}

impl ReportingDay {
  pub fn new(now: DateTime<Utc>, tz: Tz) -> Self {
    Self {
      tz,
      date: timefmt::local_date(&now, tz),
    }
  }

  pub fn date(&self) -> NaiveDate {
    self.date
  }

  pub fn tz(&self) -> Tz {
    self.tz
  }

  pub fn contains(&self, instant: &DateTime<Utc>) -> bool {
    timefmt::local_date(instant, self.tz) == self.date
  }

  /// Strictly before the reporting day.
  pub fn precedes(&self, instant: &DateTime<Utc>) -> bool {
    timefmt::local_date(instant, self.tz) < self.date
  }
}

/// Outcome of the two-level check for one incident.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineMatch {
  /// Same-day updates, oldest first.
  pub updates: Vec<IncidentUpdate>,
  /// The incident itself was opened before the reporting day.
  pub carried_over: bool,
}

/// Apply the reporting-day check at both the incident and update level.
///
/// Updates are kept individually; the incident is surfaced only when at
/// least one update survives, whatever day it was created on.
pub fn filter_timeline(
  created_at: &DateTime<Utc>,
  updates: Vec<IncidentUpdate>,
  day: &ReportingDay,
) -> Option<TimelineMatch> {
  let mut todays: Vec<IncidentUpdate> = updates
    .into_iter()
    .filter(|u| day.contains(&u.timestamp))
    .collect();
  if todays.is_empty() {
    return None;
  }
  todays.sort_by_key(|u| u.timestamp);

  Some(TimelineMatch {
    updates: todays,
    carried_over: day.precedes(created_at),
  })
}
