//! Structured error types for the watchdog.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatchdogError {
  /// Service list could not be fetched; the whole cycle is abandoned.
  #[error("upstream inventory: {0}")]
  UpstreamInventory(String),

  /// Logs of one deployment could not be fetched; only that service is skipped.
  #[error("upstream logs: {deployment_id}: {reason}")]
  UpstreamLog {
    deployment_id: String,
    reason: String,
  },

  #[error("notification: {0}")]
  Notification(String),

  /// A scan task ended without producing a result (panic or runtime shutdown).
  #[error("internal: {0}")]
  Internal(String),

  #[error("config: {var}: {reason}")]
  Config { var: String, reason: String },
}

impl WatchdogError {
  pub fn inventory(msg: impl Into<String>) -> Self {
    Self::UpstreamInventory(msg.into())
  }

  pub fn logs(deployment_id: &str, reason: impl Into<String>) -> Self {
    Self::UpstreamLog {
      deployment_id: deployment_id.to_string(),
      reason: reason.into(),
    }
  }

  pub fn notification(msg: impl Into<String>) -> Self {
    Self::Notification(msg.into())
  }

  pub fn internal(msg: impl Into<String>) -> Self {
    Self::Internal(msg.into())
  }

  pub fn config(var: &str, reason: impl Into<String>) -> Self {
    Self::Config {
      var: var.to_string(),
      reason: reason.into(),
    }
  }
}
