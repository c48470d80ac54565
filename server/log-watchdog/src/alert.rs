//! Alert formatting and delivery to the war-room chat endpoint.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use crate::config::AlertPolicy;
use crate::error::WatchdogError;
use crate::types::{Alert, AlertKind, AlertPayload, NewError};

/// Destination for formatted alerts.
#[async_trait]
pub trait AlertSink: Send + Sync {
  async fn send(&self, message: &str, kind: AlertKind) -> Result<(), WatchdogError>;
}

/// Posts alerts to `<base>/api/war-room/alert`.
#[derive(Clone)]
pub struct WarRoomSink {
  client: Client,
  endpoint: String,
  bot: String,
}

impl WarRoomSink {
  pub fn new(
    base_url: &str,
    bot: impl Into<String>,
    timeout: Duration,
  ) -> Result<Self, WatchdogError> {
    let client = Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| WatchdogError::notification(format!("http client: {}", e)))?;
    Ok(Self {
      client,
      endpoint: format!("{}/api/war-room/alert", base_url.trim_end_matches('/')),
      bot: bot.into(),
    })
  }
}

#[async_trait]
impl AlertSink for WarRoomSink {
  async fn send(&self, message: &str, kind: AlertKind) -> Result<(), WatchdogError> {
    let payload = AlertPayload {
      bot: &self.bot,
      alert_type: kind,
      message,
    };
    let response = self
      .client
      .post(&self.endpoint)
      .json(&payload)
      .send()
      .await
      .map_err(|e| WatchdogError::notification(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
      return Err(WatchdogError::notification(format!(
        "war room post failed: HTTP {}",
        status
      )));
    }
    Ok(())
  }
}

// ---------------------------------------------------------------------------
// Formatting policy
// ---------------------------------------------------------------------------

/// Cut `text` to at most `max_chars` characters, never splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
  match text.char_indices().nth(max_chars) {
    Some((idx, _)) => text[..idx].to_string(),
    None => text.to_string(),
  }
}

pub fn crash_alert(service: &str) -> Alert {
  Alert {
    kind: AlertKind::Error,
    message: format!("🔴 **{}** is CRASHED and needs attention!", service),
  }
}

/// New errors of one service, as grouped for a summary alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceErrorGroup {
  pub service: String,
  pub samples: Vec<String>,
}

/// Group errors by service in order of first appearance.
pub fn group_by_service(errors: &[NewError], sample_max_chars: usize) -> Vec<ServiceErrorGroup> {
  let mut groups: Vec<ServiceErrorGroup> = Vec::new();
  for err in errors {
    let sample = truncate_chars(&err.message, sample_max_chars);
    match groups.iter_mut().find(|g| g.service == err.service) {
      Some(group) => group.samples.push(sample),
      None => groups.push(ServiceErrorGroup {
        service: err.service.clone(),
        samples: vec![sample],
      }),
    }
  }
  groups
}

/// Decide which warnings a cycle's new errors turn into.
///
/// Up to `batch_threshold` errors are reported one by one; above it a single
/// summary lists the number of new errors per service.
pub fn plan_error_alerts(errors: &[NewError], policy: &AlertPolicy) -> Vec<Alert> {
  if errors.is_empty() {
    return Vec::new();
  }

  if errors.len() <= policy.batch_threshold {
    return errors
      .iter()
      .map(|err| Alert {
        kind: AlertKind::Warning,
        message: format!(
          "⚠️ **{}** error:\n```{}```",
          err.service,
          truncate_chars(&err.message, policy.alert_message_max_chars)
        ),
      })
      .collect();
  }

  let mut summary = format!("⚠️ **{} new errors detected:**\n", errors.len());
  for group in group_by_service(errors, policy.summary_sample_max_chars) {
    debug!(service = %group.service, samples = ?group.samples, "Summarized new errors");
    summary.push_str(&format!(
      "\n• **{}**: {} errors",
      group.service,
      group.samples.len()
    ));
  }
  vec![Alert {
    kind: AlertKind::Warning,
    message: summary,
  }]
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Sends alerts best-effort: failures are logged and dropped, never retried.
#[derive(Clone)]
pub struct AlertDispatcher {
  sink: Arc<dyn AlertSink>,
  policy: AlertPolicy,
}

impl AlertDispatcher {
  pub fn new(sink: Arc<dyn AlertSink>, policy: AlertPolicy) -> Self {
    Self { sink, policy }
  }

  pub fn policy(&self) -> &AlertPolicy {
    &self.policy
  }

  /// Deliver one alert; returns whether the sink accepted it.
  pub async fn deliver(&self, alert: &Alert) -> bool {
    match self.sink.send(&alert.message, alert.kind).await {
      Ok(()) => true,
      Err(e) => {
        warn!(kind = alert.kind.as_str(), error = %e, "Failed to post to war room");
        false
      }
    }
  }

  pub async fn dispatch_crashes(&self, services: &[String]) {
    for service in services {
      let _ = self.deliver(&crash_alert(service)).await;
    }
  }

  pub async fn dispatch_new_errors(&self, errors: &[NewError]) {
    for alert in plan_error_alerts(errors, &self.policy) {
      let _ = self.deliver(&alert).await;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn err(service: &str, message: &str) -> NewError {
    NewError {
      service: service.into(),
      message: message.into(),
      timestamp: None,
    }
  }

  #[test]
  fn truncate_respects_char_boundaries() {
    assert_eq!(truncate_chars("héllo", 2), "hé");
    assert_eq!(truncate_chars("short", 500), "short");
    assert_eq!(truncate_chars("", 3), "");
  }

  #[test]
  fn crash_alert_is_error_kind() {
    let alert = crash_alert("api");
    assert_eq!(alert.kind, AlertKind::Error);
    assert_eq!(alert.message, "🔴 **api** is CRASHED and needs attention!");
  }

  #[test]
  fn no_errors_no_alerts() {
    assert!(plan_error_alerts(&[], &AlertPolicy::default()).is_empty());
  }

  #[test]
  fn three_errors_are_individual() {
    let errors = vec![err("api", "a"), err("api", "b"), err("worker", "c")];
    let alerts = plan_error_alerts(&errors, &AlertPolicy::default());
    assert_eq!(alerts.len(), 3);
    assert!(alerts.iter().all(|a| a.kind == AlertKind::Warning));
    assert_eq!(alerts[2].message, "⚠️ **worker** error:\n```c```");
  }

  #[test]
  fn four_errors_are_summarized() {
    let errors = vec![
      err("worker", "a"),
      err("api", "b"),
      err("worker", "c"),
      err("worker", "d"),
    ];
    let alerts = plan_error_alerts(&errors, &AlertPolicy::default());
    assert_eq!(alerts.len(), 1);
    assert_eq!(
      alerts[0].message,
      "⚠️ **4 new errors detected:**\n\n• **worker**: 3 errors\n• **api**: 1 errors"
    );
  }

  #[test]
  fn individual_message_is_capped() {
    let policy = AlertPolicy {
      alert_message_max_chars: 5,
      ..AlertPolicy::default()
    };
    let alerts = plan_error_alerts(&[err("api", "0123456789")], &policy);
    assert_eq!(alerts[0].message, "⚠️ **api** error:\n```01234```");
  }

  #[test]
  fn threshold_is_configurable() {
    let policy = AlertPolicy {
      batch_threshold: 1,
      ..AlertPolicy::default()
    };
    let alerts = plan_error_alerts(&[err("api", "a"), err("api", "b")], &policy);
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].message.contains("2 new errors"));
  }

  #[test]
  fn groups_keep_first_appearance_order_and_cap_samples() {
    let long = "x".repeat(300);
    let groups = group_by_service(&[err("b", &long), err("a", "y"), err("b", "z")], 100);
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].service, "b");
    assert_eq!(groups[0].samples.len(), 2);
    assert_eq!(groups[0].samples[0].chars().count(), 100);
    assert_eq!(groups[1].service, "a");
  }
}
