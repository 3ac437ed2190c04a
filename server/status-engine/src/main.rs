//! Binary entrypoint: run every provider once and print the report to stdout.
//!
//! Logs go to stderr (filter with `RUST_LOG`). Exit code is 1 when the report
//! carries any alert, 2 when configuration is invalid, 0 otherwise.

use std::io::{self, Write};
use tracing_subscriber::EnvFilter;

use status_engine::config::ReportFormat;
use status_engine::{render_text, Config, Engine};

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_target(false)
    .with_writer(io::stderr)
    .with_env_filter(EnvFilter::from_default_env())
    .init();

  let config = match Config::from_env() {
    Ok(c) => c,
    Err(e) => {
      let _ = writeln!(io::stderr(), "status-engine: {}", e);
      std::process::exit(2);
    }
  };
  let engine = match Engine::with_defaults(config) {
    Ok(e) => e,
    Err(e) => {
      let _ = writeln!(io::stderr(), "status-engine: {}", e);
      std::process::exit(2);
    }
  };

  let format = engine.config().report_format;
  let report = engine.run_now().await;

  let stdout = io::stdout();
  let mut out = io::BufWriter::new(stdout.lock());
  if matches!(format, ReportFormat::Text | ReportFormat::Both) {
    let _ = write!(out, "{}", render_text(&report));
  }
  if matches!(format, ReportFormat::Json | ReportFormat::Both) {
    match report.to_json_pretty() {
      Ok(json) => {
        let _ = writeln!(out, "{}", json);
      }
      Err(e) => {
        let _ = writeln!(io::stderr(), "status-engine: json: {}", e);
      }
    }
  }
  let _ = out.flush();
  drop(out);

  std::process::exit(if report.any_alert { 1 } else { 0 });
}
