//! Binary entrypoint: start the scan loop and serve the control surface.

use std::sync::Arc;

use tokio::signal;
use tracing::{info, warn};

use log_watchdog::{
  logging, router, AlertDispatcher, AppState, Config, RailwayClient, ScanSettings, Scanner,
  Scheduler, WarRoomSink, WatchState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  logging::init();
  let config = Config::from_env()?;

  let inventory = Arc::new(RailwayClient::new(
    config.api_url.clone(),
    config.api_token.clone(),
    config.project_id.clone(),
    config.upstream_timeout,
  )?);
  let sink = Arc::new(WarRoomSink::new(
    &config.sink_url,
    config.bot_name.clone(),
    config.alert_timeout,
  )?);

  let watch = Arc::new(WatchState::new());
  let scanner = Scanner::new(
    inventory.clone(),
    AlertDispatcher::new(sink, config.alert.clone()),
    Arc::clone(&watch),
    ScanSettings {
      self_name: config.self_name.clone(),
      log_fetch_limit: config.log_fetch_limit,
    },
  );

  let scheduler = Scheduler::new(scanner.clone(), config.check_interval);
  let loop_handle = scheduler.start();

  let app = router(AppState {
    watch,
    scanner,
    inventory,
    project_id: config.project_id.clone(),
    check_interval: config.check_interval,
  });

  let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
  info!(addr = %config.bind_addr(), project_id = %config.project_id, "log-watchdog listening");

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;

  scheduler.stop();
  if let Err(e) = loop_handle.await {
    warn!(error = %e, "Watchdog loop ended abnormally");
  }
  Ok(())
}

async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(e) = signal::ctrl_c().await {
      warn!(error = %e, "Failed to listen for ctrl-c");
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
      Ok(mut sigterm) => {
        sigterm.recv().await;
      }
      Err(e) => {
        warn!(error = %e, "Failed to listen for SIGTERM");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => {},
    _ = terminate => {},
  }
  info!("Shutdown requested");
}
