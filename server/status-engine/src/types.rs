//! Canonical status model shared by every adapter and the report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{ErrorKind, FetchError};
use crate::timefmt;

// ---------------------------------------------------------------------------
// Provider identity
// ---------------------------------------------------------------------------

/// Stable identifier of one monitored provider (or one ping region).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(pub String);

impl ProviderId {
  pub fn new(id: impl Into<String>) -> Self {
    Self(id.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for ProviderId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

// ---------------------------------------------------------------------------
// Health status (normalized)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
  Healthy,
  Degraded,
  Outage,
  Unknown,
}

impl HealthStatus {
  /// `Degraded` and `Outage` are alert-worthy; `Unknown` is not.
  pub fn is_alert(self) -> bool {
    matches!(self, Self::Degraded | Self::Outage)
  }

  pub fn label(self) -> &'static str {
    match self {
      Self::Healthy => "healthy",
      Self::Degraded => "degraded",
      Self::Outage => "outage",
      Self::Unknown => "unknown",
    }
  }
}

impl fmt::Display for HealthStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

// ---------------------------------------------------------------------------
// Incident timeline
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncidentUpdate {
  #[serde(serialize_with = "timefmt::serialize_eastern")]
  pub timestamp: DateTime<Utc>,
  pub body: String,
}

impl IncidentUpdate {
  pub fn new(timestamp: DateTime<Utc>, body: impl Into<String>) -> Self {
    Self {
      timestamp,
      body: body.into(),
    }
  }
}

/// Everything an adapter knows about one incident before validation.
#[derive(Debug, Clone)]
pub struct IncidentParts {
  pub id: String,
  pub provider: ProviderId,
  pub status: HealthStatus,
  pub raw_status_text: String,
  pub title: String,
  pub created_at: DateTime<Utc>,
  pub updated_at: Option<DateTime<Utc>>,
  pub started_at: Option<DateTime<Utc>>,
  pub carried_over: bool,
  pub updates: Vec<IncidentUpdate>,
  pub attributes: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Incident {
  pub id: String,
  pub provider: ProviderId,
  pub status: HealthStatus,
  pub raw_status_text: String,
  pub title: String,
  #[serde(serialize_with = "timefmt::serialize_eastern")]
  pub created_at: DateTime<Utc>,
  #[serde(serialize_with = "timefmt::serialize_eastern_opt")]
  pub updated_at: Option<DateTime<Utc>>,
  #[serde(serialize_with = "timefmt::serialize_eastern_opt")]
  pub started_at: Option<DateTime<Utc>>,
  /// Opened before the current reporting day; surfaced by a same-day update.
  pub carried_over: bool,
  pub updates: Vec<IncidentUpdate>,
  #[serde(skip_serializing_if = "BTreeMap::is_empty")]
  pub attributes: BTreeMap<String, serde_json::Value>,
}

impl Incident {
  /// Build an incident from validated parts.
  ///
  /// # Panics
  /// If `updates` is not sorted by timestamp, or `updated_at` precedes
  /// `created_at`. Adapters sort and reconcile before calling this.
  pub fn new(parts: IncidentParts) -> Self {
    assert!(
      parts
        .updates
        .windows(2)
        .all(|w| w[0].timestamp <= w[1].timestamp),
      "incident {} updates must be ordered by timestamp",
      parts.id
    );
    if let Some(updated_at) = parts.updated_at {
      assert!(
        parts.created_at <= updated_at,
        "incident {} updated_at precedes created_at",
        parts.id
      );
    }

    Self {
      id: parts.id,
      provider: parts.provider,
      status: parts.status,
      raw_status_text: parts.raw_status_text,
      title: parts.title,
      created_at: parts.created_at,
      updated_at: parts.updated_at,
      started_at: parts.started_at,
      carried_over: parts.carried_over,
      updates: parts.updates,
      attributes: parts.attributes,
    }
  }

  pub fn latest_update(&self) -> Option<&IncidentUpdate> {
    self.updates.last()
  }
}

// ---------------------------------------------------------------------------
// Current-state service snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceSnapshot {
  pub provider: ProviderId,
  pub service: String,
  pub status: HealthStatus,
  pub raw_status_text: String,
  pub title: String,
  pub message: String,
  #[serde(serialize_with = "timefmt::serialize_eastern_opt")]
  pub last_updated: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Per-provider result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderError {
  pub kind: ErrorKind,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub http_status: Option<u16>,
}

impl ProviderError {
  pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
    Self {
      kind,
      message: message.into(),
      http_status: None,
    }
  }

  /// Failures worth a second attempt when retry is enabled.
  pub fn is_transient(&self) -> bool {
    match self.kind {
      ErrorKind::Network | ErrorKind::Timeout => true,
      ErrorKind::Http => self
        .http_status
        .is_some_and(|s| s == 429 || (500..600).contains(&s)),
      ErrorKind::Parse | ErrorKind::Internal => false,
    }
  }
}

impl From<FetchError> for ProviderError {
  fn from(e: FetchError) -> Self {
    Self {
      kind: e.kind(),
      http_status: e.http_status(),
      message: e.to_string(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncidentList {
  /// Vendor page metadata, passed through untouched.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub page: Option<serde_json::Value>,
  pub incidents: Vec<Incident>,
}

/// Exactly one outcome per provider per run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProviderResult {
  Incidents(IncidentList),
  Snapshots { services: Vec<ServiceSnapshot> },
  Failed(ProviderError),
}

impl ProviderResult {
  pub fn failed(kind: ErrorKind, message: impl Into<String>) -> Self {
    Self::Failed(ProviderError::new(kind, message))
  }

  /// True for failures and for any alert-worthy incident or service.
  pub fn is_alert(&self) -> bool {
    match self {
      Self::Failed(_) => true,
      Self::Incidents(list) => list.incidents.iter().any(|i| i.status.is_alert()),
      Self::Snapshots { services } => services.iter().any(|s| s.status.is_alert()),
    }
  }

  pub fn error(&self) -> Option<&ProviderError> {
    match self {
      Self::Failed(e) => Some(e),
      _ => None,
    }
  }
}

impl From<FetchError> for ProviderResult {
  fn from(e: FetchError) -> Self {
    Self::Failed(e.into())
  }
}
