//! The per-run Report and its text rendering.
//!
//! A Report is assembled once by the engine and never mutated. Rendering is
//! a pure function over it; JSON comes straight from `Serialize`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write;

use crate::normalize::sentinel;
use crate::timefmt;
use crate::types::{Incident, ProviderError, ProviderId, ProviderResult, ServiceSnapshot};

const RULE: &str = "----------------------------------------";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderEntry {
  pub provider: ProviderId,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status_page: Option<String>,
  pub result: ProviderResult,
}

impl ProviderEntry {
  pub fn is_alert(&self) -> bool {
    self.result.is_alert()
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
  #[serde(serialize_with = "timefmt::serialize_eastern")]
  pub generated_at: DateTime<Utc>,
  pub any_alert: bool,
  /// Configuration order.
  pub results: Vec<ProviderEntry>,
}

/// One alert-worthy item, borrowed from the report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Issue<'a> {
  Failed {
    entry: &'a ProviderEntry,
    error: &'a ProviderError,
  },
  Incident {
    entry: &'a ProviderEntry,
    incident: &'a Incident,
  },
  Service {
    entry: &'a ProviderEntry,
    service: &'a ServiceSnapshot,
  },
}

impl Issue<'_> {
  pub fn provider(&self) -> &ProviderId {
    match self {
      Self::Failed { entry, .. } | Self::Incident { entry, .. } | Self::Service { entry, .. } => {
        &entry.provider
      }
    }
  }
}

impl Report {
  pub fn assemble(generated_at: DateTime<Utc>, results: Vec<ProviderEntry>) -> Self {
    let any_alert = results.iter().any(ProviderEntry::is_alert);
    Self {
      generated_at,
      any_alert,
      results,
    }
  }

  pub fn entry(&self, provider: &str) -> Option<&ProviderEntry> {
    self.results.iter().find(|e| e.provider.as_str() == provider)
  }

  /// Alert-worthy items in configuration order.
  pub fn issues(&self) -> Vec<Issue<'_>> {
    let mut issues = Vec::new();
    for entry in &self.results {
      match &entry.result {
        ProviderResult::Failed(error) => issues.push(Issue::Failed { entry, error }),
        ProviderResult::Incidents(list) => issues.extend(
          list
            .incidents
            .iter()
            .filter(|i| i.status.is_alert())
            .map(|incident| Issue::Incident { entry, incident }),
        ),
        ProviderResult::Snapshots { services } => issues.extend(
          services
            .iter()
            .filter(|s| s.status.is_alert())
            .map(|service| Issue::Service { entry, service }),
        ),
      }
    }
    issues
  }

  pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(self)
  }
}

// ---------------------------------------------------------------------------
// Text rendering
// ---------------------------------------------------------------------------

fn display_opt(ts: Option<&DateTime<Utc>>) -> String {
  ts.map(timefmt::format_eastern)
    .unwrap_or_else(|| sentinel::TIMESTAMP.to_string())
}

/// Issues first, then every provider in full.
pub fn render_text(report: &Report) -> String {
  let mut out = String::new();
  let _ = writeln!(
    out,
    "Vendor status report, {}",
    timefmt::format_eastern(&report.generated_at)
  );
  let _ = writeln!(out);

  let issues = report.issues();
  if issues.is_empty() {
    let _ = writeln!(out, "All providers appear operational.");
  } else {
    let _ = writeln!(out, "ALERT: {} issue(s) detected.", issues.len());
    let _ = writeln!(out);
    let _ = writeln!(out, "Issues");
    let _ = writeln!(out, "{RULE}");
    for issue in &issues {
      render_issue(&mut out, issue);
    }
  }

  let _ = writeln!(out);
  let _ = writeln!(out, "Full Report");
  let _ = writeln!(out, "{RULE}");
  for entry in &report.results {
    render_entry(&mut out, entry);
    let _ = writeln!(out, "{RULE}");
  }
  out
}

fn render_issue(out: &mut String, issue: &Issue<'_>) {
  let entry = match issue {
    Issue::Failed { entry, error } => {
      let _ = writeln!(
        out,
        "- {}: could not check status ({})",
        entry.provider,
        error.kind.label()
      );
      let _ = writeln!(out, "  Error: {}", error.message);
      entry
    }
    Issue::Incident { entry, incident } => {
      let _ = writeln!(
        out,
        "- {}: {} ({})",
        entry.provider, incident.raw_status_text, incident.status
      );
      let _ = writeln!(out, "  Incident: {}", incident.title);
      let _ = writeln!(out, "  Created: {}", timefmt::format_eastern(&incident.created_at));
      if let Some(update) = incident.latest_update() {
        let _ = writeln!(
          out,
          "  Latest update ({}): {}",
          timefmt::format_eastern(&update.timestamp),
          update.body
        );
      }
      entry
    }
    Issue::Service { entry, service } => {
      let _ = writeln!(
        out,
        "- {}: {}: {}",
        entry.provider, service.service, service.raw_status_text
      );
      let _ = writeln!(out, "  Title: {}", service.title);
      let _ = writeln!(out, "  Message: {}", service.message);
      let _ = writeln!(out, "  Last Updated: {}", display_opt(service.last_updated.as_ref()));
      entry
    }
  };
  if let Some(link) = &entry.status_page {
    let _ = writeln!(out, "  Status page: {link}");
  }
  let _ = writeln!(out);
}

fn render_entry(out: &mut String, entry: &ProviderEntry) {
  let verdict = if entry.is_alert() { "ISSUES" } else { "OK" };
  let _ = writeln!(out, "[{}] {}", entry.provider, verdict);

  match &entry.result {
    ProviderResult::Failed(error) => {
      let _ = writeln!(out, "  Error ({}): {}", error.kind.label(), error.message);
    }
    ProviderResult::Incidents(list) if list.incidents.is_empty() => {
      let _ = writeln!(out, "  No incidents or investigations reported today.");
    }
    ProviderResult::Incidents(list) => {
      for incident in &list.incidents {
        let _ = writeln!(out, "  Incident: {}", incident.title);
        let _ = writeln!(out, "  Status : {} ({})", incident.raw_status_text, incident.status);
        let _ = writeln!(out, "  Created: {}", timefmt::format_eastern(&incident.created_at));
        if incident.carried_over {
          let _ = writeln!(out, "  Opened before today; updated today.");
        }
        for update in &incident.updates {
          let _ = writeln!(
            out,
            "    {}  {}",
            timefmt::format_eastern(&update.timestamp),
            update.body
          );
        }
      }
    }
    ProviderResult::Snapshots { services } => {
      for service in services {
        let _ = writeln!(out, "  Service: {}", service.service);
        let _ = writeln!(out, "  Status : {}", service.raw_status_text);
        let _ = writeln!(out, "  Title  : {}", service.title);
        let _ = writeln!(out, "  Message: {}", service.message);
        let _ = writeln!(out, "  Last Updated: {}", display_opt(service.last_updated.as_ref()));
      }
    }
  }
}
