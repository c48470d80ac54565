//! One scan cycle: inventory, crash detection, log triage, alerting.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::alert::{truncate_chars, AlertDispatcher};
use crate::error::WatchdogError;
use crate::fingerprint;
use crate::inventory::Inventory;
use crate::state::WatchState;
use crate::types::{CycleReport, NewError, Severity};

/// Per-cycle knobs that do not belong to alert formatting.
#[derive(Debug, Clone)]
pub struct ScanSettings {
  /// Service name of the watchdog itself; skipped entirely.
  pub self_name: String,
  pub log_fetch_limit: u32,
}

/// Runs scan cycles against shared state. Cheap to clone.
#[derive(Clone)]
pub struct Scanner {
  inventory: Arc<dyn Inventory>,
  dispatcher: AlertDispatcher,
  state: Arc<WatchState>,
  settings: ScanSettings,
}

impl Scanner {
  pub fn new(
    inventory: Arc<dyn Inventory>,
    dispatcher: AlertDispatcher,
    state: Arc<WatchState>,
    settings: ScanSettings,
  ) -> Self {
    Self {
      inventory,
      dispatcher,
      state,
      settings,
    }
  }

  pub fn state(&self) -> &Arc<WatchState> {
    &self.state
  }

  /// Run one full pass over the project.
  ///
  /// Cycles never overlap: a caller arriving while another cycle runs waits for it.
  /// Fails when the service list cannot be fetched (neither the dedup store nor
  /// `last_check` is touched) or when the pass itself panics.
  ///
  /// The pass runs on its own task and completes even if the returned future is
  /// dropped, so a recorded fingerprint is always followed by its alert.
  pub async fn run_cycle(&self) -> Result<CycleReport, WatchdogError> {
    let this = self.clone();
    tokio::spawn(async move { this.scan().await })
      .await
      .map_err(|e| {
        error!(error = %e, "Check task aborted");
        WatchdogError::internal(format!("check task aborted: {}", e))
      })?
  }

  async fn scan(&self) -> Result<CycleReport, WatchdogError> {
    let _guard = self.state.lock_cycle().await;

    let services = match self.inventory.list_services().await {
      Ok(services) => services,
      Err(e) => {
        error!(error = %e, "Check failed");
        return Err(e);
      }
    };

    let monitored: Vec<_> = services
      .iter()
      .filter(|s| !s.is_self(&self.settings.self_name))
      .collect();

    let crashed: Vec<String> = monitored
      .iter()
      .filter(|s| s.is_crashed())
      .map(|s| s.name.clone())
      .collect();

    let max_chars = self.dispatcher.policy().alert_message_max_chars;
    let mut new_errors: Vec<NewError> = Vec::new();
    for service in &monitored {
      let logs = match self
        .inventory
        .fetch_recent_logs(&service.latest_deployment_id, self.settings.log_fetch_limit)
        .await
      {
        Ok(logs) => logs,
        Err(e) => {
          warn!(service = %service.name, error = %e, "Failed to get logs");
          continue;
        }
      };

      for log in logs.into_iter().filter(|l| l.severity == Severity::Error) {
        let fp = fingerprint::compute(&service.name, &log.message);
        if self.state.dedup.record_if_new(fp, &service.name).await {
          new_errors.push(NewError {
            service: service.name.clone(),
            message: truncate_chars(&log.message, max_chars),
            timestamp: log.timestamp,
          });
        }
      }
    }

    self.dispatcher.dispatch_crashes(&crashed).await;
    self.dispatcher.dispatch_new_errors(&new_errors).await;

    let checked_at = Utc::now();
    self.state.set_last_check(checked_at).await;

    info!(
      services = services.len(),
      new_errors = new_errors.len(),
      crashed = crashed.len(),
      "Check complete"
    );

    Ok(CycleReport {
      services: services.len(),
      new_errors: new_errors.len(),
      crashed: crashed.len(),
      checked_at,
    })
  }
}
