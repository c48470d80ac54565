//! Fixed-interval driver for the scan cycle.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::info;

use crate::scan::Scanner;

/// Runs a scan cycle, sleeps `interval`, repeats until stopped.
///
/// Stopping is cooperative: the flag is read between iterations and a cycle
/// already in flight always runs to completion.
#[derive(Clone)]
pub struct Scheduler {
  scanner: Scanner,
  interval: Duration,
  wake: Arc<Notify>,
}

impl Scheduler {
  pub fn new(scanner: Scanner, interval: Duration) -> Self {
    Self {
      scanner,
      interval,
      wake: Arc::new(Notify::new()),
    }
  }

  /// Mark the scheduler active and spawn its loop.
  pub fn start(&self) -> JoinHandle<()> {
    self.scanner.state().set_scheduler_active(true);
    let this = self.clone();
    tokio::spawn(async move { this.run().await })
  }

  /// Clear the active flag and cut the current sleep short.
  pub fn stop(&self) {
    self.scanner.state().set_scheduler_active(false);
    self.wake.notify_one();
  }

  async fn run(&self) {
    info!(interval_secs = self.interval.as_secs(), "Watchdog started");
    let state = Arc::clone(self.scanner.state());

    while state.scheduler_active() {
      // Failures, panics included, are logged by the scanner.
      let _ = self.scanner.run_cycle().await;

      if !state.scheduler_active() {
        break;
      }
      tokio::select! {
        _ = tokio::time::sleep(self.interval) => {}
        _ = self.wake.notified() => {}
      }
    }
    info!("Watchdog stopped");
  }
}
