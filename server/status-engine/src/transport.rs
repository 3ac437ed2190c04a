//! Read-only HTTP GET seam shared by every adapter.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::{EngineError, FetchError};

/// Status code plus decoded body. Non-2xx is not an error at this layer;
/// each adapter decides what a failed status means for its vendor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
  pub status: u16,
  pub body: String,
}

impl HttpResponse {
  pub fn new(status: u16, body: impl Into<String>) -> Self {
    Self {
      status,
      body: body.into(),
    }
  }

  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }

  /// Reject non-2xx, keeping the status code.
  pub fn require_success(self) -> Result<Self, FetchError> {
    if self.is_success() {
      Ok(self)
    } else {
      Err(FetchError::Http {
        status: self.status,
      })
    }
  }
}

#[async_trait]
pub trait Transport: Send + Sync {
  async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse, FetchError>;
}

/// Production transport: one pooled `reqwest` client with a request ceiling.
#[derive(Debug, Clone)]
pub struct HttpTransport {
  client: reqwest::Client,
  timeout: Duration,
}

impl HttpTransport {
  pub fn new(timeout: Duration) -> Result<Self, EngineError> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| EngineError::config(format!("http client: {e}")))?;
    Ok(Self { client, timeout })
  }

  fn classify(&self, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
      FetchError::Timeout(self.timeout.as_secs())
    } else {
      FetchError::Network(e.to_string())
    }
  }
}

#[async_trait]
impl Transport for HttpTransport {
  async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<HttpResponse, FetchError> {
    let mut request = self.client.get(url);
    for (name, value) in headers {
      request = request.header(*name, *value);
    }

    let response = request.send().await.map_err(|e| self.classify(e))?;
    let status = response.status().as_u16();
    let body = response.text().await.map_err(|e| self.classify(e))?;
    Ok(HttpResponse { status, body })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn require_success_keeps_status_code() {
    assert!(HttpResponse::new(204, "").require_success().is_ok());
    let err = HttpResponse::new(503, "unavailable").require_success().unwrap_err();
    assert_eq!(err.http_status(), Some(503));
  }
}
