//! HTTP control surface for the watchdog.

use axum::{
  extract::State,
  http::StatusCode,
  response::{IntoResponse, Response},
  routing::{get, post},
  Json, Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::error::WatchdogError;
use crate::state::AppState;
use crate::types::*;

/// Error response for control requests.
#[derive(Debug)]
pub struct ApiError(pub WatchdogError);

impl From<WatchdogError> for ApiError {
  fn from(err: WatchdogError) -> Self {
    ApiError(err)
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self.0 {
      WatchdogError::UpstreamInventory(_) => StatusCode::BAD_GATEWAY,
      _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorOutput::new(self.0.to_string()))).into_response()
  }
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
  let snapshot = state.watch.dedup.snapshot().await;
  Json(HealthResponse {
    status: "healthy".into(),
    watchdog_running: state.watch.scheduler_active(),
    last_check: format_timestamp(state.watch.last_check().await),
    errors_tracked: snapshot.errors_tracked,
    error_counts_by_service: snapshot.error_counts,
  })
}

pub async fn status(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
  let services = state.inventory.list_services().await.map_err(|e| {
    error!(error = %e, "status: inventory lookup failed");
    e
  })?;

  let mut rows = Vec::with_capacity(services.len());
  for service in &services {
    rows.push(ServiceStatus {
      name: service.name.clone(),
      status: service.deployment_status.clone(),
      errors_seen: state.watch.dedup.count_for(&service.name).await,
    });
  }

  Ok(Json(StatusResponse {
    project_id: state.project_id.clone(),
    services_monitored: services.len(),
    services: rows,
    check_interval_seconds: state.check_interval.as_secs(),
    last_check: format_timestamp(state.watch.last_check().await),
  }))
}

pub async fn check_now(State(state): State<AppState>) -> Result<Json<CheckNowResponse>, ApiError> {
  let report = state.scanner.run_cycle().await?;
  Ok(Json(CheckNowResponse {
    status: "check completed".into(),
    last_check: format_timestamp(Some(report.checked_at)),
  }))
}

pub async fn clear_seen(State(state): State<AppState>) -> Json<ClearSeenResponse> {
  let errors_cleared = state.watch.dedup.clear().await;
  Json(ClearSeenResponse {
    status: "cleared".into(),
    errors_cleared,
  })
}

/// Build the control router.
pub fn router(state: AppState) -> Router {
  Router::new()
    .route("/health", get(health))
    .route("/status", get(status))
    .route("/check-now", post(check_now))
    .route("/clear-seen", post(clear_seen))
    .layer(TraceLayer::new_for_http())
    .layer(CorsLayer::permissive())
    .with_state(state)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn inventory_errors_map_to_bad_gateway() {
    let response = ApiError(WatchdogError::inventory("down")).into_response();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
  }

  #[test]
  fn config_errors_map_to_internal_error() {
    let response = ApiError(WatchdogError::config("PORT", "bad")).into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
  }

  #[test]
  fn aborted_check_maps_to_internal_error() {
    let response = ApiError(WatchdogError::internal("check task aborted")).into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
  }
}
