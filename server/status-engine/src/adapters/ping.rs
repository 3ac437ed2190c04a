//! Liveness ping adapter (AWS WorkSpaces broker, one instance per region).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

use super::StatusAdapter;
use crate::config::WORKSPACES_STATUS_PAGE;
use crate::normalize;
use crate::transport::{HttpResponse, Transport};
use crate::types::{HealthStatus, ProviderId, ProviderResult, ServiceSnapshot};

pub const SERVICE_NAME: &str = "ws-broker-service";

pub struct PingAdapter {
  id: ProviderId,
  region: String,
  url: String,
  transport: Arc<dyn Transport>,
}

impl PingAdapter {
  /// Provider id is `aws-workspaces/<region>`, region taken from the URL host.
  pub fn new(url: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
    let url = url.into();
    let region = region_from_url(&url);
    Self {
      id: ProviderId::new(format!("aws-workspaces/{region}")),
      region,
      url,
      transport,
    }
  }
}

#[async_trait]
impl StatusAdapter for PingAdapter {
  fn id(&self) -> &ProviderId {
    &self.id
  }

  fn status_page(&self) -> Option<&str> {
    Some(WORKSPACES_STATUS_PAGE)
  }

  async fn fetch(&self, now: DateTime<Utc>) -> ProviderResult {
    debug!(provider = %self.id, url = %self.url, "pinging");
    match self.transport.get(&self.url, &[]).await {
      Ok(response) => ProviderResult::Snapshots {
        services: vec![classify(&self.id, &self.region, &response, now)],
      },
      Err(e) => {
        warn!(provider = %self.id, error = %e, "ping failed");
        e.into()
      }
    }
  }
}

/// The body decides health; the status code is only diagnostic.
pub fn classify(
  provider: &ProviderId,
  region: &str,
  response: &HttpResponse,
  now: DateTime<Utc>,
) -> ServiceSnapshot {
  let status = normalize::ping_status(&response.body);
  let message = match status {
    HealthStatus::Healthy => "Services are healthy.".to_string(),
    _ => format!(
      "Some services may have issues. Status Code: {}. Response Body: {}",
      response.status, response.body
    ),
  };

  ServiceSnapshot {
    provider: provider.clone(),
    service: SERVICE_NAME.to_string(),
    status,
    raw_status_text: response.status.to_string(),
    title: format!("{region} ping"),
    message,
    last_updated: Some(now),
  }
}

/// Second dot-separated label of the host, e.g. `us-east-1` from
/// `ws-broker-service.us-east-1.amazonaws.com`. Falls back to the whole host.
pub fn region_from_url(url: &str) -> String {
  let host = match reqwest::Url::parse(url) {
    Ok(parsed) => parsed.host_str().unwrap_or_default().to_string(),
    Err(_) => url.to_string(),
  };
  match host.split('.').nth(1) {
    Some(label) if !label.is_empty() => label.to_string(),
    _ => host,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 7, 29, 14, 0, 0).unwrap()
  }

  #[test]
  fn region_is_second_host_label() {
    assert_eq!(
      region_from_url("https://ws-broker-service.us-east-1.amazonaws.com/ping"),
      "us-east-1"
    );
    assert_eq!(region_from_url("https://localhost:8080/ping"), "localhost");
  }

  #[test]
  fn healthy_body_is_healthy() {
    let id = ProviderId::new("aws-workspaces/us-east-1");
    let snap = classify(&id, "us-east-1", &HttpResponse::new(200, "Healthy"), now());
    assert_eq!(snap.status, HealthStatus::Healthy);
    assert_eq!(snap.message, "Services are healthy.");
    assert_eq!(snap.last_updated, Some(now()));
  }

  #[test]
  fn body_decides_even_on_error_status() {
    let id = ProviderId::new("aws-workspaces/us-west-2");
    let snap = classify(&id, "us-west-2", &HttpResponse::new(503, "healthy"), now());
    assert_eq!(snap.status, HealthStatus::Healthy);
  }

  #[test]
  fn other_body_is_degraded_with_diagnostics() {
    let id = ProviderId::new("aws-workspaces/us-west-2");
    let body = "<html>Bad Gateway</html>";
    let snap = classify(&id, "us-west-2", &HttpResponse::new(502, body), now());
    assert_eq!(snap.status, HealthStatus::Degraded);
    assert!(snap.message.contains("502"));
    assert!(snap.message.contains(body));
  }

  #[test]
  fn empty_body_is_degraded() {
    let id = ProviderId::new("aws-workspaces/us-east-1");
    let snap = classify(&id, "us-east-1", &HttpResponse::new(200, ""), now());
    assert_eq!(snap.status, HealthStatus::Degraded);
  }
}
