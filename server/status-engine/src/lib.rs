//! Vendor status aggregation engine.
//!
//! Polls each vendor's own status mechanism, normalizes every response shape
//! into one canonical incident/health model, keeps only today's activity per
//! adapter reporting timezone, and merges everything into a single Report.
//!
//! One point-in-time snapshot per run; no DB, no daemon, no cross-run state.

pub mod adapters;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod normalize;
pub mod report;
pub mod timefmt;
pub mod transport;
pub mod types;

pub use adapters::StatusAdapter;
pub use config::Config;
pub use engine::Engine;
pub use error::{EngineError, ErrorKind, FetchError};
pub use report::{render_text, Report};
pub use transport::{HttpResponse, HttpTransport, Transport};
pub use types::{HealthStatus, Incident, ProviderId, ProviderResult, ServiceSnapshot};
