//! Statuspage incident-timeline adapter (Cloudflare's `/api/v2/incidents.json`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
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
use crate::types::{Incident, IncidentList, IncidentParts, IncidentUpdate, ProviderId, ProviderResult};

// ---------------------------------------------------------------------------
// Wire shapes. Every field is optional; absence is handled after parsing.
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct IncidentsDocument {
  #[serde(default)]
  page: Option<serde_json::Value>,
  #[serde(default)]
  incidents: Vec<RawIncident>,
}

#[derive(Debug, Deserialize)]
struct RawIncident {
  #[serde(default)]
  id: Option<String>,
  #[serde(default)]
  name: Option<String>,
  #[serde(default)]
  status: Option<String>,
  #[serde(default)]
  impact: Option<String>,
  #[serde(default)]
  created_at: Option<String>,
  #[serde(default)]
  updated_at: Option<String>,
  #[serde(default)]
  started_at: Option<String>,
  #[serde(default)]
  shortlink: Option<String>,
  #[serde(default)]
  incident_updates: Vec<RawUpdate>,
}

#[derive(Debug, Deserialize)]
struct RawUpdate {
  #[serde(default)]
  created_at: Option<String>,
  #[serde(default)]
  body: Option<String>,
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

pub struct StatuspageAdapter {
  id: ProviderId,
  source: TimelineSource,
  transport: Arc<dyn Transport>,
}

impl StatuspageAdapter {
  pub fn new(id: ProviderId, source: TimelineSource, transport: Arc<dyn Transport>) -> Self {
    Self {
      id,
      source,
      transport,
    }
  }

  async fn try_fetch(&self, now: DateTime<Utc>) -> Result<IncidentList, FetchError> {
    let response = self.transport.get(&self.source.url, &[]).await?.require_success()?;
    let day = ReportingDay::new(now, self.source.reporting_tz);
    debug!(provider = %self.id, date = %day.date(), tz = %day.tz(), "reporting day");
    parse_incidents(&self.id, &response.body, &day)
  }
}

#[async_trait]
impl StatusAdapter for StatuspageAdapter {
  fn id(&self) -> &ProviderId {
    &self.id
  }

  fn status_page(&self) -> Option<&str> {
    self.source.status_page.as_deref()
  }

  async fn fetch(&self, now: DateTime<Utc>) -> ProviderResult {
    debug!(provider = %self.id, url = %self.source.url, "fetching incidents");
    match self.try_fetch(now).await {
      Ok(list) => {
        info!(provider = %self.id, incidents = list.incidents.len(), "incidents for today");
        ProviderResult::Incidents(list)
      }
      Err(e) => {
        warn!(provider = %self.id, error = %e, "incident fetch failed");
        e.into()
      }
    }
  }
}

/// Parse a Statuspage incidents document and keep only today's activity.
pub fn parse_incidents(
  provider: &ProviderId,
  body: &str,
  day: &ReportingDay,
) -> Result<IncidentList, FetchError> {
  let doc: IncidentsDocument = serde_json::from_str(body)?;

  let incidents = doc
    .incidents
    .into_iter()
    .filter_map(|raw| normalize_incident(provider, raw, day))
    .collect();

  Ok(IncidentList {
    page: doc.page,
    incidents,
  })
}

fn normalize_incident(provider: &ProviderId, raw: RawIncident, day: &ReportingDay) -> Option<Incident> {
  let created_raw = raw.created_at.as_deref()?;
  let Some(created_at) = timefmt::parse_utc(created_raw) else {
    warn!(provider = %provider, created_at = %created_raw, "skipping incident with unparseable created_at");
    return None;
  };

  let updates: Vec<IncidentUpdate> = raw
    .incident_updates
    .iter()
    .filter_map(|u| {
      let ts = timefmt::parse_utc(u.created_at.as_deref()?)?;
      Some(IncidentUpdate::new(ts, u.body.clone().unwrap_or_default()))
    })
    .collect();

  let matched = filter::filter_timeline(&created_at, updates, day)?;

  let raw_status = raw.status.unwrap_or_default();
  let status = normalize::timeline_status(provider, &raw_status, raw.impact.as_deref());
  let title = normalize::text_or(raw.name.as_deref(), sentinel::INCIDENT_TITLE);
  let id = match raw.id {
    Some(id) if !id.is_empty() => id,
    _ => normalize::stable_incident_id(provider, &created_at, &title),
  };

  let updated_at = raw.updated_at.as_deref().and_then(timefmt::parse_utc);
  let updated_at = match updated_at {
    Some(ts) if ts < created_at => {
      warn!(provider = %provider, incident = %id, "updated_at precedes created_at; dropping it");
      None
    }
    other => other,
  };

  let mut attributes = BTreeMap::new();
  if let Some(impact) = raw.impact {
    attributes.insert("impact".to_string(), serde_json::Value::String(impact));
  }
  if let Some(link) = raw.shortlink {
    attributes.insert("shortlink".to_string(), serde_json::Value::String(link));
  }

  Some(Incident::new(IncidentParts {
    id,
    provider: provider.clone(),
    status,
    raw_status_text: raw_status,
    title,
    created_at,
    updated_at,
    started_at: raw.started_at.as_deref().and_then(timefmt::parse_utc),
    carried_over: matched.carried_over,
    updates: matched.updates,
    attributes,
  }))
}
