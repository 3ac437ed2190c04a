//! Aggregation engine: fans out to every adapter, isolates failures, merges one Report.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::adapters::{self, StatusAdapter};
use crate::config::{Config, RetryPolicy};
use crate::error::{EngineError, ErrorKind};
use crate::report::{ProviderEntry, Report};
use crate::transport::{HttpTransport, Transport};
use crate::types::ProviderResult;

/// Runs a fixed, ordered set of adapters. Holds no state between runs.
pub struct Engine {
  config: Config,
  adapters: Vec<Arc<dyn StatusAdapter>>,
}

impl Engine {
  pub fn new(config: Config, adapters: Vec<Arc<dyn StatusAdapter>>) -> Result<Self, EngineError> {
    config.validate()?;

    let mut seen = HashSet::new();
    for adapter in &adapters {
      if !seen.insert(adapter.id().clone()) {
        return Err(EngineError::validation(
          "adapters",
          &format!("duplicate provider id {}", adapter.id()),
        ));
      }
    }

    Ok(Self { config, adapters })
  }

  /// The standard provider set over the given transport.
  pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Result<Self, EngineError> {
    let adapters = adapters::default_adapters(&config, transport);
    Self::new(config, adapters)
  }

  /// The standard provider set over real HTTP.
  pub fn with_defaults(config: Config) -> Result<Self, EngineError> {
    let transport = Arc::new(HttpTransport::new(config.request_timeout)?);
    Self::with_transport(config, transport)
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn adapters(&self) -> &[Arc<dyn StatusAdapter>] {
    &self.adapters
  }

  pub async fn run_now(&self) -> Report {
    self.run(Utc::now()).await
  }

  /// One snapshot across every provider.
  ///
  /// Always returns a complete Report: each adapter gets exactly one entry,
  /// in configuration order, whatever order the fetches finish in.
  pub async fn run(&self, now: DateTime<Utc>) -> Report {
    let permits = Arc::new(Semaphore::new(self.config.max_concurrency));
    info!(providers = self.adapters.len(), "starting status run");

    let handles: Vec<_> = self
      .adapters
      .iter()
      .map(|adapter| {
        let adapter = Arc::clone(adapter);
        let permits = Arc::clone(&permits);
        let timeout = self.config.request_timeout;
        let retry = self.config.retry.clone();
        tokio::spawn(async move {
          // The semaphore is never closed, so acquire cannot fail.
          let _permit = permits.acquire_owned().await.ok();
          fetch_with_policy(adapter.as_ref(), now, timeout, &retry).await
        })
      })
      .collect();

    let mut results = Vec::with_capacity(handles.len());
    for (adapter, handle) in self.adapters.iter().zip(handles) {
      let result = match handle.await {
        Ok(result) => result,
        Err(e) => {
          warn!(provider = %adapter.id(), error = %e, "adapter task aborted");
          ProviderResult::failed(ErrorKind::Internal, format!("adapter task failed: {e}"))
        }
      };
      results.push(ProviderEntry {
        provider: adapter.id().clone(),
        status_page: adapter.status_page().map(str::to_string),
        result,
      });
    }

    let report = Report::assemble(now, results);
    info!(
      any_alert = report.any_alert,
      issues = report.issues().len(),
      "status run complete"
    );
    report
  }
}

/// One adapter call under its own timeout, retried only for transient failures.
async fn fetch_with_policy(
  adapter: &dyn StatusAdapter,
  now: DateTime<Utc>,
  timeout: Duration,
  retry: &RetryPolicy,
) -> ProviderResult {
  let mut attempt = 1;
  loop {
    let result = match tokio::time::timeout(timeout, adapter.fetch(now)).await {
      Ok(result) => result,
      Err(_) => {
        warn!(provider = %adapter.id(), timeout_secs = timeout.as_secs_f64(), "adapter timed out");
        ProviderResult::failed(
          ErrorKind::Timeout,
          format!("no response within {:.1}s", timeout.as_secs_f64()),
        )
      }
    };

    let transient = result.error().is_some_and(|e| e.is_transient());
    if !transient || attempt >= retry.max_attempts {
      return result;
    }

    let delay = retry.backoff_for(attempt);
    debug!(provider = %adapter.id(), attempt, delay_ms = delay.as_millis() as u64, "retrying");
    tokio::time::sleep(delay).await;
    attempt += 1;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::{HealthStatus, ProviderId, ServiceSnapshot};
  use async_trait::async_trait;
  use chrono::TimeZone;
  use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

  /// Adapter with a scripted sequence of outcomes.
  struct Scripted {
    id: ProviderId,
    calls: AtomicU32,
    fail_first: u32,
    hang: bool,
    panics: bool,
    delay: Duration,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
  }

  impl Scripted {
    fn healthy(id: &str) -> Self {
      Self {
        id: ProviderId::new(id),
        calls: AtomicU32::new(0),
        fail_first: 0,
        hang: false,
        panics: false,
        delay: Duration::ZERO,
        in_flight: Arc::new(AtomicUsize::new(0)),
        peak: Arc::new(AtomicUsize::new(0)),
      }
    }
  }

  #[async_trait]
  impl StatusAdapter for Scripted {
    fn id(&self) -> &ProviderId {
      &self.id
    }

    async fn fetch(&self, now: DateTime<Utc>) -> ProviderResult {
      let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
      if self.panics {
        panic!("adapter {} blew up", self.id);
      }
      if self.hang {
        std::future::pending::<()>().await;
      }
      let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
      self.peak.fetch_max(running, Ordering::SeqCst);
      tokio::time::sleep(self.delay).await;
      self.in_flight.fetch_sub(1, Ordering::SeqCst);
      if call <= self.fail_first {
        return ProviderResult::failed(ErrorKind::Network, "connection reset");
      }
      ProviderResult::Snapshots {
        services: vec![ServiceSnapshot {
          provider: self.id.clone(),
          service: "svc".into(),
          status: HealthStatus::Healthy,
          raw_status_text: "operational".into(),
          title: String::new(),
          message: String::new(),
          last_updated: Some(now),
        }],
      }
    }
  }

  fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 7, 14, 16, 0, 0).unwrap()
  }

  fn fast_config() -> Config {
    Config {
      request_timeout: Duration::from_millis(200),
      ..Config::default()
    }
  }

  #[test]
  fn duplicate_ids_are_rejected() {
    let adapters: Vec<Arc<dyn StatusAdapter>> = vec![
      Arc::new(Scripted::healthy("m365")),
      Arc::new(Scripted::healthy("m365")),
    ];
    let err = Engine::new(Config::default(), adapters).err().unwrap();
    assert!(err.to_string().contains("duplicate provider id m365"));
  }

  #[test]
  fn default_set_is_in_configuration_order() {
    let transport = Arc::new(HttpTransport::new(Duration::from_secs(1)).unwrap());
    let engine = Engine::with_transport(Config::default(), transport).unwrap();
    let ids: Vec<&str> = engine.adapters().iter().map(|a| a.id().as_str()).collect();
    assert_eq!(
      ids,
      [
        "aws-workspaces/us-east-1",
        "aws-workspaces/us-west-2",
        "cloudflare",
        "freshservice",
        "m365"
      ]
    );
  }

  #[tokio::test]
  async fn order_follows_configuration_not_completion() {
    let mut slow = Scripted::healthy("slow");
    slow.delay = Duration::from_millis(50);
    let adapters: Vec<Arc<dyn StatusAdapter>> = vec![Arc::new(slow), Arc::new(Scripted::healthy("fast"))];
    let engine = Engine::new(fast_config(), adapters).unwrap();

    let report = engine.run(now()).await;
    let ids: Vec<&str> = report.results.iter().map(|e| e.provider.as_str()).collect();
    assert_eq!(ids, ["slow", "fast"]);
    assert!(!report.any_alert);
  }

  #[tokio::test]
  async fn hung_adapter_becomes_timeout() {
    let mut hung = Scripted::healthy("hung");
    hung.hang = true;
    let adapters: Vec<Arc<dyn StatusAdapter>> = vec![Arc::new(Scripted::healthy("ok")), Arc::new(hung)];
    let engine = Engine::new(fast_config(), adapters).unwrap();

    let report = engine.run(now()).await;
    assert!(report.any_alert);
    assert!(!report.results[0].is_alert());
    let err = report.results[1].result.error().unwrap();
    assert_eq!(err.kind, ErrorKind::Timeout);
  }

  #[tokio::test]
  async fn no_retry_by_default() {
    let mut flaky = Scripted::healthy("flaky");
    flaky.fail_first = 1;
    let flaky = Arc::new(flaky);
    let engine = Engine::new(fast_config(), vec![flaky.clone() as Arc<dyn StatusAdapter>]).unwrap();

    let report = engine.run(now()).await;
    assert!(report.any_alert);
    assert_eq!(flaky.calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn opt_in_retry_recovers_transient_failure() {
    let mut flaky = Scripted::healthy("flaky");
    flaky.fail_first = 2;
    let flaky = Arc::new(flaky);
    let config = Config {
      retry: RetryPolicy {
        max_attempts: 3,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(5),
      },
      ..fast_config()
    };
    let engine = Engine::new(config, vec![flaky.clone() as Arc<dyn StatusAdapter>]).unwrap();

    let report = engine.run(now()).await;
    assert!(!report.any_alert);
    assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn panicking_adapter_becomes_internal_failure() {
    let mut broken = Scripted::healthy("broken");
    broken.panics = true;
    let adapters: Vec<Arc<dyn StatusAdapter>> = vec![
      Arc::new(Scripted::healthy("first")),
      Arc::new(broken),
      Arc::new(Scripted::healthy("last")),
    ];
    let engine = Engine::new(fast_config(), adapters).unwrap();

    let report = engine.run(now()).await;
    let ids: Vec<&str> = report.results.iter().map(|e| e.provider.as_str()).collect();
    assert_eq!(ids, ["first", "broken", "last"]);
    assert_eq!(report.results[1].result.error().unwrap().kind, ErrorKind::Internal);
    assert!(!report.results[0].is_alert());
    assert!(!report.results[2].is_alert());
    assert!(report.any_alert);
  }

  fn shared_counters(n: usize, delay: Duration) -> (Vec<Arc<dyn StatusAdapter>>, Arc<AtomicUsize>) {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let adapters = (0..n)
      .map(|i| {
        let mut adapter = Scripted::healthy(&format!("p{i}"));
        adapter.delay = delay;
        adapter.in_flight = Arc::clone(&in_flight);
        adapter.peak = Arc::clone(&peak);
        Arc::new(adapter) as Arc<dyn StatusAdapter>
      })
      .collect();
    (adapters, peak)
  }

  #[tokio::test]
  async fn concurrency_limit_bounds_fetches_in_flight() {
    let (adapters, peak) = shared_counters(4, Duration::from_millis(20));
    let config = Config {
      max_concurrency: 1,
      ..fast_config()
    };
    let engine = Engine::new(config, adapters).unwrap();
    let report = engine.run(now()).await;
    assert_eq!(report.results.len(), 4);
    assert!(!report.any_alert);
    assert_eq!(peak.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn concurrency_limit_of_two_is_respected() {
    let (adapters, peak) = shared_counters(6, Duration::from_millis(20));
    let config = Config {
      max_concurrency: 2,
      ..fast_config()
    };
    let engine = Engine::new(config, adapters).unwrap();
    let report = engine.run(now()).await;
    assert_eq!(report.results.len(), 6);
    assert!(peak.load(Ordering::SeqCst) <= 2);
  }

  #[test]
  fn oversized_concurrency_is_rejected_at_construction() {
    let config = Config {
      max_concurrency: usize::MAX,
      ..Config::default()
    };
    let err = Engine::new(config, vec![]).err().unwrap();
    assert!(err.to_string().contains("max_concurrency"));
  }
}
