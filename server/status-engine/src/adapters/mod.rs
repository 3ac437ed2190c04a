//! Provider adapters: one per vendor status mechanism.
//!
//! Every adapter turns its vendor's response into a canonical
//! `ProviderResult` and never fails past its own boundary.

pub mod freshstatus;
pub mod m365;
pub mod ping;
pub mod statuspage;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::config::Config;
use crate::transport::Transport;
use crate::types::{ProviderId, ProviderResult};

pub use freshstatus::FreshstatusAdapter;
pub use m365::M365Adapter;
pub use ping::PingAdapter;
pub use statuspage::StatuspageAdapter;

#[async_trait]
pub trait StatusAdapter: Send + Sync {
  fn id(&self) -> &ProviderId;

  /// Human follow-up link; not used programmatically.
  fn status_page(&self) -> Option<&str> {
    None
  }

  /// Fetch and normalize. Failures come back as `ProviderResult::Failed`.
  async fn fetch(&self, now: DateTime<Utc>) -> ProviderResult;
}

/// The standard provider set, in report order: one ping entry per region,
/// then Cloudflare, Freshservice, Microsoft 365.
pub fn default_adapters(config: &Config, transport: Arc<dyn Transport>) -> Vec<Arc<dyn StatusAdapter>> {
  let mut adapters: Vec<Arc<dyn StatusAdapter>> = Vec::new();

  for region in &config.ping_regions {
    adapters.push(Arc::new(PingAdapter::new(
      crate::config::workspaces_ping_url(region),
      Arc::clone(&transport),
    )));
  }
  adapters.push(Arc::new(StatuspageAdapter::new(
    ProviderId::new("cloudflare"),
    config.cloudflare.clone(),
    Arc::clone(&transport),
  )));
  adapters.push(Arc::new(FreshstatusAdapter::new(
    ProviderId::new("freshservice"),
    config.freshservice.clone(),
    Arc::clone(&transport),
  )));
  adapters.push(Arc::new(M365Adapter::new(
    ProviderId::new("m365"),
    config.m365.clone(),
    transport,
  )));

  adapters
}
