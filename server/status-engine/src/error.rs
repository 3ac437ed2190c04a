//! Structured error types for the status engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Construction/configuration errors. Never produced by a provider fetch.
#[derive(Debug, Error)]
pub enum EngineError {
  #[error("validation: {field}: {reason}")]
  Validation { field: String, reason: String },

  #[error("config: {0}")]
  Config(String),
}

impl EngineError {
  pub fn validation(field: &str, reason: &str) -> Self {
    Self::Validation {
      field: field.to_string(),
      reason: reason.to_string(),
    }
  }

  pub fn config(msg: impl Into<String>) -> Self {
    Self::Config(msg.into())
  }
}

/// Coarse failure category carried into the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
  Network,
  Timeout,
  Http,
  Parse,
  Internal,
}

impl ErrorKind {
  pub fn label(self) -> &'static str {
    match self {
      Self::Network => "network error",
      Self::Timeout => "timeout",
      Self::Http => "http error",
      Self::Parse => "parse error",
      Self::Internal => "internal error",
    }
  }
}

/// Adapter-internal failure. Converted to a `ProviderError` at the adapter boundary.
#[derive(Debug, Error)]
pub enum FetchError {
  #[error("request failed: {0}")]
  Network(String),

  #[error("request timed out after {0}s")]
  Timeout(u64),

  #[error("unexpected HTTP status {status}")]
  Http { status: u16 },

  #[error("malformed response: {0}")]
  Parse(String),
}

impl FetchError {
  pub fn parse(msg: impl Into<String>) -> Self {
    Self::Parse(msg.into())
  }

  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::Network(_) => ErrorKind::Network,
      Self::Timeout(_) => ErrorKind::Timeout,
      Self::Http { .. } => ErrorKind::Http,
      Self::Parse(_) => ErrorKind::Parse,
    }
  }

  pub fn http_status(&self) -> Option<u16> {
    match self {
      Self::Http { status } => Some(*status),
      _ => None,
    }
  }
}

impl From<serde_json::Error> for FetchError {
  fn from(e: serde_json::Error) -> Self {
    Self::Parse(e.to_string())
  }
}
