//! Microsoft 365 consumer status feed: one flat array of per-service states.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::StatusAdapter;
use crate::config::FeedSource;
use crate::error::FetchError;
use crate::normalize::{self, sentinel};
use crate::timefmt;
use crate::transport::Transport;
use crate::types::{ProviderId, ProviderResult, ServiceSnapshot};

/// The feed rejects some non-browser clients.
pub const USER_AGENT: &str = "Mozilla/5.0";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawService {
  #[serde(default)]
  service_display_name: Option<String>,
  #[serde(default)]
  status: Option<String>,
  #[serde(default)]
  message: Option<String>,
  #[serde(default)]
  title: Option<String>,
  #[serde(default)]
  last_updated_time: Option<String>,
}

pub struct M365Adapter {
  id: ProviderId,
  source: FeedSource,
  transport: Arc<dyn Transport>,
}

impl M365Adapter {
  pub fn new(id: ProviderId, source: FeedSource, transport: Arc<dyn Transport>) -> Self {
    Self {
      id,
      source,
      transport,
    }
  }

  async fn try_fetch(&self) -> Result<Vec<ServiceSnapshot>, FetchError> {
    let response = self
      .transport
      .get(&self.source.url, &[("User-Agent", USER_AGENT)])
      .await?
      .require_success()?;
    parse_services(&self.id, &response.body)
  }
}

#[async_trait]
impl StatusAdapter for M365Adapter {
  fn id(&self) -> &ProviderId {
    &self.id
  }

  fn status_page(&self) -> Option<&str> {
    self.source.status_page.as_deref()
  }

  // Current state only; `now` plays no part.
  async fn fetch(&self, _now: DateTime<Utc>) -> ProviderResult {
    debug!(provider = %self.id, url = %self.source.url, "fetching service status");
    match self.try_fetch().await {
      Ok(services) => {
        let issues = services.iter().filter(|s| s.status.is_alert()).count();
        info!(provider = %self.id, services = services.len(), issues, "service status");
        ProviderResult::Snapshots { services }
      }
      Err(e) => {
        warn!(provider = %self.id, error = %e, "service status fetch failed");
        e.into()
      }
    }
  }
}

/// Map every feed entry to a snapshot. Absent or null fields get sentinels;
/// present values, empty ones included, are kept as sent.
pub fn parse_services(provider: &ProviderId, body: &str) -> Result<Vec<ServiceSnapshot>, FetchError> {
  let raw: Vec<RawService> = serde_json::from_str(body)?;

  Ok(
    raw
      .into_iter()
      .map(|entry| {
        let raw_status = entry.status.unwrap_or_else(|| sentinel::STATUS.to_string());
        ServiceSnapshot {
          provider: provider.clone(),
          service: entry
            .service_display_name
            .unwrap_or_else(|| sentinel::SERVICE.to_string()),
          status: normalize::operational_status(&raw_status),
          raw_status_text: raw_status,
          title: entry.title.unwrap_or_else(|| sentinel::TITLE.to_string()),
          message: entry.message.unwrap_or_else(|| sentinel::MESSAGE.to_string()),
          last_updated: entry.last_updated_time.as_deref().and_then(timefmt::parse_utc),
        }
      })
      .collect(),
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::HealthStatus;

  fn m365() -> ProviderId {
    ProviderId::new("m365")
  }

  #[test]
  fn maps_each_service() {
    let body = r#"[
      {"ServiceDisplayName": "Outlook.com", "Status": "Operational", "Message": "", "Title": "", "LastUpdatedTime": "2025-07-17T14:02:11.8233333Z"},
      {"ServiceDisplayName": "OneDrive", "Status": "Degraded", "Message": "Users may see sync delays.", "Title": "Sync delays", "LastUpdatedTime": "2025-07-17T13:00:00Z"},
      {"ServiceDisplayName": "Teams", "Status": "operational"}
    ]"#;
    let services = parse_services(&m365(), body).unwrap();
    assert_eq!(services.len(), 3);

    assert_eq!(services[0].status, HealthStatus::Healthy);
    assert_eq!(services[0].message, "");
    assert_eq!(services[0].title, "");
    assert!(services[0].last_updated.is_some());

    assert_eq!(services[1].status, HealthStatus::Degraded);
    assert_eq!(services[1].raw_status_text, "Degraded");
    assert_eq!(services[1].title, "Sync delays");

    assert_eq!(services[2].status, HealthStatus::Healthy);
    assert_eq!(services[2].last_updated, None);
  }

  #[test]
  fn missing_fields_get_sentinels() {
    let services = parse_services(&m365(), "[{}]").unwrap();
    let s = &services[0];
    assert_eq!(s.service, sentinel::SERVICE);
    assert_eq!(s.raw_status_text, sentinel::STATUS);
    assert_eq!(s.status, HealthStatus::Degraded);
    assert_eq!(s.title, sentinel::TITLE);
    assert_eq!(s.message, sentinel::MESSAGE);
  }

  #[test]
  fn null_fields_get_sentinels_but_empty_strings_are_kept() {
    let body = r#"[{"ServiceDisplayName": "Outlook.com", "Status": "Operational", "Message": null, "Title": ""}]"#;
    let services = parse_services(&m365(), body).unwrap();
    assert_eq!(services[0].message, sentinel::MESSAGE);
    assert_eq!(services[0].title, "");
  }

  #[test]
  fn unparseable_timestamp_is_none() {
    let body = r#"[{"ServiceDisplayName": "Word", "Status": "Operational", "LastUpdatedTime": "n/a"}]"#;
    let services = parse_services(&m365(), body).unwrap();
    assert_eq!(services[0].last_updated, None);
  }

  #[test]
  fn non_array_body_is_parse_error() {
    let err = parse_services(&m365(), r#"{"error": "throttled"}"#).unwrap_err();
    assert_eq!(err.kind(), crate::error::ErrorKind::Parse);
  }
}
