//! Core types for the watchdog (provider snapshots, alerts, HTTP contracts).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Provider snapshots (rebuilt every scan cycle)
// ---------------------------------------------------------------------------

/// Deployment status reported for a crashed service.
pub const STATUS_CRASHED: &str = "CRASHED";

/// One service of the project together with its latest deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSnapshot {
  pub id: String,
  pub name: String,
  pub latest_deployment_id: String,
  pub deployment_status: String,
}

impl ServiceSnapshot {
  pub fn is_crashed(&self) -> bool {
    self.deployment_status == STATUS_CRASHED
  }

  /// True when this service is the watchdog itself (ASCII case-insensitive name match).
  pub fn is_self(&self, self_name: &str) -> bool {
    self.name.eq_ignore_ascii_case(self_name)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
  Error,
  Other,
}

impl Severity {
  /// Only `error` counts; every other level (and a missing one) is `Other`.
  pub fn from_wire(s: Option<&str>) -> Self {
    match s {
      Some(level) if level.eq_ignore_ascii_case("error") => Self::Error,
      _ => Self::Other,
    }
  }
}

/// One log line of a deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
  pub message: String,
  pub timestamp: Option<String>,
  pub severity: Severity,
}

// ---------------------------------------------------------------------------
// Fingerprint
// ---------------------------------------------------------------------------

/// Short hex digest identifying a normalized (service, message) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(pub String);

impl std::fmt::Display for Fingerprint {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

/// An error line whose fingerprint had not been seen before.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewError {
  pub service: String,
  pub message: String,
  pub timestamp: Option<String>,
}

// ---------------------------------------------------------------------------
// Alerts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
  Error,
  Warning,
  Info,
}

impl AlertKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Error => "error",
      Self::Warning => "warning",
      Self::Info => "info",
    }
  }
}

/// A formatted message ready to hand to an alert sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
  pub kind: AlertKind,
  pub message: String,
}

/// Wire body posted to the war-room endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct AlertPayload<'a> {
  pub bot: &'a str,
  pub alert_type: AlertKind,
  pub message: &'a str,
}

// ---------------------------------------------------------------------------
// Scan results
// ---------------------------------------------------------------------------

/// Outcome of one completed scan cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
  pub services: usize,
  pub new_errors: usize,
  pub crashed: usize,
  pub checked_at: DateTime<Utc>,
}

/// Read-only view of the dedup store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupSnapshot {
  pub errors_tracked: usize,
  pub error_counts: BTreeMap<String, u64>,
}

// ---------------------------------------------------------------------------
// Control surface responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
  pub status: String,
  pub watchdog_running: bool,
  pub last_check: Option<String>,
  pub errors_tracked: usize,
  pub error_counts_by_service: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStatus {
  pub name: String,
  pub status: String,
  pub errors_seen: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
  pub project_id: String,
  pub services_monitored: usize,
  pub services: Vec<ServiceStatus>,
  pub check_interval_seconds: u64,
  pub last_check: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckNowResponse {
  pub status: String,
  pub last_check: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearSeenResponse {
  pub status: String,
  pub errors_cleared: usize,
}

/// Structured error body for failed control requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorOutput {
  pub error: String,
}

impl ErrorOutput {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      error: message.into(),
    }
  }
}

/// Render an optional timestamp the way the control surface reports it.
pub fn format_timestamp(ts: Option<DateTime<Utc>>) -> Option<String> {
  ts.map(|t| t.to_rfc3339())
}
