//! Shared watchdog state and the handle given to HTTP handlers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, MutexGuard, RwLock};

use crate::dedup::DedupStore;
use crate::inventory::Inventory;
use crate::scan::Scanner;

/// State shared by the scan cycle, the scheduler and the control surface.
#[derive(Debug, Default)]
pub struct WatchState {
  pub dedup: DedupStore,
  last_check: RwLock<Option<DateTime<Utc>>>,
  scheduler_active: AtomicBool,
  cycle_lock: Mutex<()>,
}

impl WatchState {
  pub fn new() -> Self {
    Self::default()
  }

  pub async fn last_check(&self) -> Option<DateTime<Utc>> {
    *self.last_check.read().await
  }

  pub async fn set_last_check(&self, ts: DateTime<Utc>) {
    *self.last_check.write().await = Some(ts);
  }

  pub fn scheduler_active(&self) -> bool {
    self.scheduler_active.load(Ordering::SeqCst)
  }

  pub fn set_scheduler_active(&self, active: bool) {
    self.scheduler_active.store(active, Ordering::SeqCst);
  }

  /// Held for the whole duration of a scan cycle; later callers queue behind it.
  pub async fn lock_cycle(&self) -> MutexGuard<'_, ()> {
    self.cycle_lock.lock().await
  }
}

/// Everything the control endpoints need.
#[derive(Clone)]
pub struct AppState {
  pub watch: Arc<WatchState>,
  pub scanner: Scanner,
  pub inventory: Arc<dyn Inventory>,
  pub project_id: String,
  pub check_interval: Duration,
}
