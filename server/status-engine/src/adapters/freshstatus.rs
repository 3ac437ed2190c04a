//! Freshstatus public-incidents adapter (Freshservice).
//!
//! The endpoint only returns incidents with an empty end time, so every
//! record is an open incident. Records carry no update log; each one becomes
//! a single-update timeline anchored at `start_time`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::StatusAdapter;
use crate::config::TimelineSource;
use crate::error::FetchError;
use crate::filter::{self, ReportingDay};
use crate::normalize::{self, sentinel};
use crate::timefmt;
use crate::transport::Transport;
use crate::types::{HealthStatus, Incident, IncidentList, IncidentParts, IncidentUpdate, ProviderId, ProviderResult};

/// Raw status recorded for records without a `status` field.
pub const OPEN_STATUS: &str = "open";

#[derive(Debug, Deserialize)]
struct ResultsPage {
  #[serde(default)]
  results: Vec<Map<String, Value>>,
}

pub struct FreshstatusAdapter {
  id: ProviderId,
  source: TimelineSource,
  transport: Arc<dyn Transport>,
}

impl FreshstatusAdapter {
  pub fn new(id: ProviderId, source: TimelineSource, transport: Arc<dyn Transport>) -> Self {
    Self {
      id,
      source,
      transport,
    }
  }

  async fn try_fetch(&self, now: DateTime<Utc>) -> Result<IncidentList, FetchError> {
    let response = self.transport.get(&self.source.url, &[]).await?;
    // Anything but a plain 200 is a failed fetch for this vendor.
    if response.status != 200 {
      return Err(FetchError::Http {
        status: response.status,
      });
    }
    let day = ReportingDay::new(now, self.source.reporting_tz);
    debug!(provider = %self.id, date = %day.date(), tz = %day.tz(), "reporting day");
    parse_results(&self.id, &response.body, &day)
  }
}

#[async_trait]
impl StatusAdapter for FreshstatusAdapter {
  fn id(&self) -> &ProviderId {
    &self.id
  }

  fn status_page(&self) -> Option<&str> {
    self.source.status_page.as_deref()
  }

  async fn fetch(&self, now: DateTime<Utc>) -> ProviderResult {
    debug!(provider = %self.id, url = %self.source.url, "fetching public incidents");
    match self.try_fetch(now).await {
      Ok(list) => {
        info!(provider = %self.id, incidents = list.incidents.len(), "incidents for today");
        ProviderResult::Incidents(list)
      }
      Err(e) => {
        warn!(provider = %self.id, error = %e, "public incident fetch failed");
        e.into()
      }
    }
  }
}

/// Parse a Freshstatus results page and keep incidents started today.
pub fn parse_results(
  provider: &ProviderId,
  body: &str,
  day: &ReportingDay,
) -> Result<IncidentList, FetchError> {
  let page: ResultsPage = serde_json::from_str(body)?;
  let incidents = page
    .results
    .into_iter()
    .filter_map(|record| normalize_record(provider, record, day))
    .collect();

  Ok(IncidentList {
    page: None,
    incidents,
  })
}

fn normalize_record(
  provider: &ProviderId,
  record: Map<String, Value>,
  day: &ReportingDay,
) -> Option<Incident> {
  let start_raw = string_field(&record, "start_time")?;
  let Some(started_at) = timefmt::parse_utc(start_raw) else {
    warn!(provider = %provider, start_time = %start_raw, "skipping incident with unparseable start_time");
    return None;
  };

  let title = normalize::text_or(string_field(&record, "title"), sentinel::INCIDENT_TITLE);
  let body = string_field(&record, "description")
    .or_else(|| string_field(&record, "title"))
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .unwrap_or("Incident started.")
    .to_string();

  let start = IncidentUpdate::new(started_at, body);
  let matched = filter::filter_timeline(&started_at, vec![start], day)?;

  let (status, raw_status_text) = match string_field(&record, "status") {
    Some(raw) => (
      normalize::timeline_status(provider, raw, string_field(&record, "impact")),
      raw.to_string(),
    ),
    None => (HealthStatus::Degraded, OPEN_STATUS.to_string()),
  };

  let id = match record.get("id") {
    Some(Value::String(s)) if !s.is_empty() => s.clone(),
    Some(Value::Number(n)) => n.to_string(),
    _ => normalize::stable_incident_id(provider, &started_at, &title),
  };

  let mut attributes: BTreeMap<String, Value> = record.into_iter().collect();
  attributes.insert(
    "start_time_eastern".to_string(),
    Value::String(timefmt::format_eastern(&started_at)),
  );

  Some(Incident::new(IncidentParts {
    id,
    provider: provider.clone(),
    status,
    raw_status_text,
    title,
    created_at: started_at,
    updated_at: None,
    started_at: Some(started_at),
    carried_over: matched.carried_over,
    updates: matched.updates,
    attributes,
  }))
}

fn string_field<'a>(record: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
  record.get(key).and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn fs() -> ProviderId {
    ProviderId::new("freshservice")
  }

  fn utc_day(now: DateTime<Utc>) -> ReportingDay {
    ReportingDay::new(now, chrono_tz::UTC)
  }

  const FIXTURE: &str = r#"{
    "count": 3,
    "results": [
      {
        "id": 88120,
        "title": "Delayed email notifications",
        "description": "Some customers are seeing delayed ticket notifications.",
        "start_time": "2025-08-01T14:00:00Z",
        "end_time": null,
        "affected_components": [{"component": 5521, "new_status": "PO"}]
      },
      {
        "id": 88001,
        "title": "Portal slowness",
        "start_time": "2025-07-31T22:00:00Z",
        "end_time": null
      },
      {"id": 88002, "title": "No start"},
      {"id": 88003, "title": "Bad start", "start_time": "sometime"}
    ]
  }"#;

  #[test]
  fn keeps_todays_incident_with_pass_through_fields() {
    let now = Utc.with_ymd_and_hms(2025, 8, 1, 18, 0, 0).unwrap();
    let list = parse_results(&fs(), FIXTURE, &utc_day(now)).unwrap();
    assert_eq!(list.incidents.len(), 1);

    let incident = &list.incidents[0];
    assert_eq!(incident.id, "88120");
    assert_eq!(incident.status, HealthStatus::Degraded);
    assert_eq!(incident.raw_status_text, OPEN_STATUS);
    assert_eq!(incident.title, "Delayed email notifications");
    assert_eq!(incident.updates.len(), 1);
    assert_eq!(
      incident.attributes["start_time_eastern"],
      "2025-08-01 10:00:00 AM EDT"
    );
    assert!(incident.attributes.contains_key("affected_components"));
  }

  #[test]
  fn utc_reporting_day_differs_from_eastern_near_midnight() {
    // 20:00 EDT on 2025-07-31 is already 2025-08-01 in UTC.
    let now = Utc.with_ymd_and_hms(2025, 8, 1, 0, 0, 0).unwrap();
    let list = parse_results(&fs(), FIXTURE, &utc_day(now)).unwrap();
    let ids: Vec<&str> = list.incidents.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, ["88120"]);

    let eastern = ReportingDay::new(now, timefmt::DISPLAY_TZ);
    let list = parse_results(&fs(), FIXTURE, &eastern).unwrap();
    let ids: Vec<&str> = list.incidents.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, ["88001"]);
  }

  #[test]
  fn explicit_status_uses_timeline_vocabulary() {
    let body = r#"{"results": [
      {"id": "a", "title": "Done", "status": "resolved", "start_time": "2025-08-01T09:00:00Z"}
    ]}"#;
    let now = Utc.with_ymd_and_hms(2025, 8, 1, 12, 0, 0).unwrap();
    let list = parse_results(&fs(), body, &utc_day(now)).unwrap();
    assert_eq!(list.incidents[0].status, HealthStatus::Healthy);
  }

  #[test]
  fn missing_results_is_empty() {
    let now = Utc.with_ymd_and_hms(2025, 8, 1, 12, 0, 0).unwrap();
    let list = parse_results(&fs(), r#"{"detail": "ok"}"#, &utc_day(now)).unwrap();
    assert!(list.incidents.is_empty());
  }
}
