//! Engine configuration with sane defaults, optionally overlaid from the environment.

use chrono_tz::Tz;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::error::EngineError;
use crate::timefmt;

pub const CLOUDFLARE_INCIDENTS_URL: &str = "https://www.cloudflarestatus.com/api/v2/incidents.json";
pub const CLOUDFLARE_STATUS_PAGE: &str = "https://www.cloudflarestatus.com/";
pub const FRESHSTATUS_INCIDENTS_URL: &str = "https://public-api.freshstatus.io/v1/public-incidents/?account_id=3616&end_time__gte=2025-05-02T04:00:00Z&end_time__isempty=true";
pub const M365_STATUS_URL: &str = "https://status.cloud.microsoft/api/posts/m365Consumer";
pub const M365_STATUS_PAGE: &str = "https://status.cloud.microsoft/m365/referrer=serviceStatusRedirect";
pub const WORKSPACES_STATUS_PAGE: &str = "https://clients.amazonworkspaces.com/Health.html";

/// Regional WorkSpaces broker liveness endpoint.
pub fn workspaces_ping_url(region: &str) -> String {
  format!("https://ws-broker-service.{region}.amazonaws.com/ping")
}

/// Opt-in retry for transient failures. `max_attempts = 1` disables it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
  pub max_attempts: u32,
  pub initial_backoff: Duration,
  pub max_backoff: Duration,
}

impl RetryPolicy {
  pub fn disabled() -> Self {
    Self {
      max_attempts: 1,
      initial_backoff: Duration::from_millis(500),
      max_backoff: Duration::from_secs(5),
    }
  }

  /// Delay before attempt `attempt + 1`: doubles each time, capped.
  pub fn backoff_for(&self, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    self
      .initial_backoff
      .saturating_mul(factor)
      .min(self.max_backoff)
  }
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self::disabled()
  }
}

/// An incident-timeline source and the zone its reporting day is computed in.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineSource {
  pub url: String,
  pub status_page: Option<String>,
  pub reporting_tz: Tz,
}

/// A current-state source (ping endpoint or flat status feed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSource {
  pub url: String,
  pub status_page: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
  Text,
  Json,
  Both,
}

impl FromStr for ReportFormat {
  type Err = EngineError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "text" => Ok(Self::Text),
      "json" => Ok(Self::Json),
      "both" => Ok(Self::Both),
      other => Err(EngineError::config(format!(
        "report format {other:?}: expected text|json|both"
      ))),
    }
  }
}

/// Tunables for one aggregation run.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
  /// Ceiling for a single provider call (HTTP client and orchestrator).
  pub request_timeout: Duration,
  /// Max provider calls in flight at once.
  pub max_concurrency: usize,
  pub retry: RetryPolicy,
  /// WorkSpaces regions to ping; one provider entry each.
  pub ping_regions: Vec<String>,
  /// Statuspage timeline; reporting day in US Eastern.
  pub cloudflare: TimelineSource,
  /// Freshstatus timeline; reporting day in UTC.
  pub freshservice: TimelineSource,
  pub m365: FeedSource,
  pub report_format: ReportFormat,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      request_timeout: Duration::from_secs(10),
      max_concurrency: 8,
      retry: RetryPolicy::disabled(),
      ping_regions: vec!["us-east-1".into(), "us-west-2".into()],
      cloudflare: TimelineSource {
        url: CLOUDFLARE_INCIDENTS_URL.into(),
        status_page: Some(CLOUDFLARE_STATUS_PAGE.into()),
        reporting_tz: timefmt::DISPLAY_TZ,
      },
      freshservice: TimelineSource {
        url: FRESHSTATUS_INCIDENTS_URL.into(),
        status_page: None,
        reporting_tz: chrono_tz::UTC,
      },
      m365: FeedSource {
        url: M365_STATUS_URL.into(),
        status_page: Some(M365_STATUS_PAGE.into()),
      },
      report_format: ReportFormat::Both,
    }
  }
}

impl Config {
  /// Defaults overlaid with `STATUS_*` environment variables.
  pub fn from_env() -> Result<Self, EngineError> {
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  /// Defaults overlaid with whatever `lookup` returns for each known key.
  pub fn from_lookup<F>(lookup: F) -> Result<Self, EngineError>
  where
    F: Fn(&str) -> Option<String>,
  {
    let mut config = Self::default();

    if let Some(secs) = parse_var::<u64, _>(&lookup, "STATUS_TIMEOUT_SECS")? {
      config.request_timeout = Duration::from_secs(secs);
    }
    if let Some(n) = parse_var::<usize, _>(&lookup, "STATUS_MAX_CONCURRENCY")? {
      config.max_concurrency = n;
    }
    if let Some(n) = parse_var::<u32, _>(&lookup, "STATUS_RETRY_ATTEMPTS")? {
      config.retry.max_attempts = n;
    }
    if let Some(ms) = parse_var::<u64, _>(&lookup, "STATUS_RETRY_BACKOFF_MS")? {
      config.retry.initial_backoff = Duration::from_millis(ms);
    }
    if let Some(regions) = lookup("STATUS_PING_REGIONS") {
      config.ping_regions = regions
        .split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(String::from)
        .collect();
    }
    if let Some(tz) = parse_tz(&lookup, "STATUS_CLOUDFLARE_TZ")? {
      config.cloudflare.reporting_tz = tz;
    }
    if let Some(tz) = parse_tz(&lookup, "STATUS_FRESHSERVICE_TZ")? {
      config.freshservice.reporting_tz = tz;
    }
    if let Some(format) = lookup("STATUS_REPORT_FORMAT") {
      config.report_format = format.parse()?;
    }

    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<(), EngineError> {
    if self.request_timeout.is_zero() {
      return Err(EngineError::validation("request_timeout", "must be positive"));
    }
    if self.max_concurrency == 0 {
      return Err(EngineError::validation("max_concurrency", "must be at least 1"));
    }
    if self.max_concurrency > Semaphore::MAX_PERMITS {
      return Err(EngineError::validation(
        "max_concurrency",
        &format!("must be at most {}", Semaphore::MAX_PERMITS),
      ));
    }
    if self.retry.max_attempts == 0 {
      return Err(EngineError::validation("retry.max_attempts", "must be at least 1"));
    }
    Ok(())
  }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, EngineError>
where
  T: FromStr,
  T::Err: std::fmt::Display,
  F: Fn(&str) -> Option<String>,
{
  match lookup(key) {
    Some(raw) => raw
      .trim()
      .parse::<T>()
      .map(Some)
      .map_err(|e| EngineError::config(format!("{key}={raw:?}: {e}"))),
    None => Ok(None),
  }
}

fn parse_tz<F>(lookup: &F, key: &str) -> Result<Option<Tz>, EngineError>
where
  F: Fn(&str) -> Option<String>,
{
  match lookup(key) {
    Some(raw) => raw
      .trim()
      .parse::<Tz>()
      .map(Some)
      .map_err(|e| EngineError::config(format!("{key}={raw:?}: {e}"))),
    None => Ok(None),
  }
}
