//! Service inventory and deployment log retrieval (Railway GraphQL API).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::WatchdogError;
use crate::types::{LogRecord, ServiceSnapshot, Severity};

/// Query interface consumed by the scan cycle and the status endpoint.
#[async_trait]
pub trait Inventory: Send + Sync {
  /// Every service of the project that has at least one deployment.
  async fn list_services(&self) -> Result<Vec<ServiceSnapshot>, WatchdogError>;

  /// Most recent `limit` log lines of one deployment.
  async fn fetch_recent_logs(
    &self,
    deployment_id: &str,
    limit: u32,
  ) -> Result<Vec<LogRecord>, WatchdogError>;
}

const SERVICES_QUERY: &str = r#"
query GetServices($projectId: String!) {
  project(id: $projectId) {
    name
    services {
      edges {
        node {
          id
          name
          deployments(first: 1) {
            edges {
              node {
                id
                status
              }
            }
          }
        }
      }
    }
  }
}
"#;

const LOGS_QUERY: &str = r#"
query GetLogs($deploymentId: String!, $limit: Int!) {
  deploymentLogs(deploymentId: $deploymentId, limit: $limit) {
    message
    timestamp
    severity
  }
}
"#;

// ---------------------------------------------------------------------------
// Wire types (GraphQL payloads)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
  data: Option<T>,
  #[serde(default)]
  errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
  message: String,
}

#[derive(Debug, Deserialize)]
struct Connection<T> {
  #[serde(default = "Vec::new")]
  edges: Vec<Edge<T>>,
}

#[derive(Debug, Deserialize)]
struct Edge<T> {
  node: T,
}

#[derive(Debug, Deserialize)]
struct ProjectData {
  project: Option<ProjectNode>,
}

#[derive(Debug, Deserialize)]
struct ProjectNode {
  services: Connection<ServiceNode>,
}

#[derive(Debug, Deserialize)]
struct ServiceNode {
  id: String,
  name: String,
  #[serde(default)]
  deployments: Option<Connection<DeploymentNode>>,
}

#[derive(Debug, Deserialize)]
struct DeploymentNode {
  id: String,
  status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogsData {
  deployment_logs: Option<Vec<WireLog>>,
}

#[derive(Debug, Deserialize)]
struct WireLog {
  #[serde(default)]
  message: Option<String>,
  #[serde(default)]
  timestamp: Option<String>,
  #[serde(default)]
  severity: Option<String>,
}

/// Flatten the project payload; services without a deployment are dropped.
fn services_from(project: ProjectNode) -> Vec<ServiceSnapshot> {
  project
    .services
    .edges
    .into_iter()
    .filter_map(|edge| {
      let service = edge.node;
      let deployment = service
        .deployments
        .and_then(|d| d.edges.into_iter().next())
        .map(|e| e.node)?;
      Some(ServiceSnapshot {
        id: service.id,
        name: service.name,
        latest_deployment_id: deployment.id,
        deployment_status: deployment.status,
      })
    })
    .collect()
}

fn logs_from(data: LogsData) -> Vec<LogRecord> {
  data
    .deployment_logs
    .unwrap_or_default()
    .into_iter()
    .map(|log| LogRecord {
      severity: Severity::from_wire(log.severity.as_deref()),
      message: log.message.unwrap_or_default(),
      timestamp: log.timestamp,
    })
    .collect()
}

// ---------------------------------------------------------------------------
// Railway client
// ---------------------------------------------------------------------------

/// GraphQL client for one Railway project.
#[derive(Clone)]
pub struct RailwayClient {
  client: Client,
  api_url: String,
  token: Option<String>,
  project_id: String,
}

impl RailwayClient {
  pub fn new(
    api_url: impl Into<String>,
    token: Option<String>,
    project_id: impl Into<String>,
    timeout: Duration,
  ) -> Result<Self, WatchdogError> {
    let client = Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| WatchdogError::inventory(format!("http client: {}", e)))?;
    Ok(Self {
      client,
      api_url: api_url.into(),
      token,
      project_id: project_id.into(),
    })
  }

  /// Run one query and return its `data` member.
  async fn graphql<T: DeserializeOwned>(&self, query: &str, variables: Value) -> Result<T, String> {
    let mut request = self
      .client
      .post(&self.api_url)
      .json(&json!({ "query": query, "variables": variables }));
    if let Some(token) = &self.token {
      request = request.bearer_auth(token);
    }

    let response = request.send().await.map_err(|e| e.to_string())?;
    let status = response.status();
    if !status.is_success() {
      return Err(format!("HTTP {}", status));
    }

    let body: GraphQlResponse<T> = response
      .json()
      .await
      .map_err(|e| format!("malformed payload: {}", e))?;

    if let Some(errors) = body.errors.filter(|e| !e.is_empty()) {
      let joined = errors
        .into_iter()
        .map(|e| e.message)
        .collect::<Vec<_>>()
        .join("; ");
      return Err(format!("graphql: {}", joined));
    }
    body.data.ok_or_else(|| "response has no data".to_string())
  }
}

#[async_trait]
impl Inventory for RailwayClient {
  async fn list_services(&self) -> Result<Vec<ServiceSnapshot>, WatchdogError> {
    let data: ProjectData = self
      .graphql(SERVICES_QUERY, json!({ "projectId": self.project_id }))
      .await
      .map_err(WatchdogError::inventory)?;

    let project = data
      .project
      .ok_or_else(|| WatchdogError::inventory(format!("project {} not found", self.project_id)))?;
    let services = services_from(project);
    debug!(count = services.len(), "Fetched service inventory");
    Ok(services)
  }

  async fn fetch_recent_logs(
    &self,
    deployment_id: &str,
    limit: u32,
  ) -> Result<Vec<LogRecord>, WatchdogError> {
    let data: LogsData = self
      .graphql(
        LOGS_QUERY,
        json!({ "deploymentId": deployment_id, "limit": limit }),
      )
      .await
      .map_err(|reason| WatchdogError::logs(deployment_id, reason))?;
    Ok(logs_from(data))
  }
}
