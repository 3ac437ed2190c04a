//! Vendor vocabulary → canonical `HealthStatus`, plus shared field defaults.

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::types::{HealthStatus, ProviderId};

/// Placeholders used when a vendor omits a field.
pub mod sentinel {
  pub const SERVICE: &str = "Unknown Service";
  pub const STATUS: &str = "Unknown Status";
  pub const MESSAGE: &str = "No message available.";
  pub const TITLE: &str = "No title available.";
  pub const TIMESTAMP: &str = "Unknown timestamp.";
  pub const INCIDENT_TITLE: &str = "Untitled incident";
}

/// Incident-timeline vocabulary (Statuspage and Freshstatus).
///
/// Only the literal "resolved" is healthy. Every other state, including a
/// missing or unrecognized one, is alert-worthy: `Degraded`, escalated to
/// `Outage` by a major/critical impact.
pub fn timeline_status(provider: &ProviderId, raw: &str, impact: Option<&str>) -> HealthStatus {
  let status = raw.trim().to_ascii_lowercase();
  match status.as_str() {
    "resolved" => return HealthStatus::Healthy,
    "investigating" | "identified" | "monitoring" | "postmortem" | "scheduled"
    | "in_progress" | "verifying" | "open" => {}
    _ => warn!(provider = %provider, status = %raw, "unrecognized incident status"),
  }

  let severe = impact
    .map(|i| matches!(i.trim().to_ascii_lowercase().as_str(), "major" | "critical"))
    .unwrap_or(false);
  if severe {
    HealthStatus::Outage
  } else {
    HealthStatus::Degraded
  }
}

/// Flat service feed vocabulary: "operational" or not, nothing finer.
pub fn operational_status(raw: &str) -> HealthStatus {
  if raw.trim().eq_ignore_ascii_case("operational") {
    HealthStatus::Healthy
  } else {
    HealthStatus::Degraded
  }
}

/// Liveness body check: case-insensitive "healthy" anywhere in the body.
pub fn ping_status(body: &str) -> HealthStatus {
  if body.to_lowercase().contains("healthy") {
    HealthStatus::Healthy
  } else {
    HealthStatus::Degraded
  }
}

/// Non-empty trimmed text, or the sentinel.
pub fn text_or(value: Option<&str>, fallback: &str) -> String {
  match value.map(str::trim) {
    Some(v) if !v.is_empty() => v.to_string(),
    _ => fallback.to_string(),
  }
}

/// Stable incident id for vendors that do not supply one.
pub fn stable_incident_id(provider: &ProviderId, created_at: &DateTime<Utc>, title: &str) -> String {
  let mut hasher = blake3::Hasher::new();
  hasher.update(provider.as_str().as_bytes());
  hasher.update(b"|");
  hasher.update(created_at.to_rfc3339().as_bytes());
  hasher.update(b"|");
  hasher.update(title.as_bytes());
  let hex = hasher.finalize().to_hex();
  format!("inc-{}", &hex[..16])
}
