//! Watchdog configuration with sane defaults, overridable from the environment.

use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::error::WatchdogError;

pub const DEFAULT_PROJECT_ID: &str = "e785854e-d4d6-4975-a025-812b63fe8961";
pub const DEFAULT_API_URL: &str = "https://backboard.railway.app/graphql/v2";
pub const DEFAULT_SINK_URL: &str = "https://juggernaut-v3-production.up.railway.app";

/// Formatting limits for outgoing alerts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertPolicy {
  /// Up to this many new errors per cycle are alerted one by one; more are summarized.
  pub batch_threshold: usize,
  /// Max characters of an error message in an individual alert.
  pub alert_message_max_chars: usize,
  /// Max characters kept per sample when grouping errors for a summary.
  pub summary_sample_max_chars: usize,
}

impl Default for AlertPolicy {
  fn default() -> Self {
    Self {
      batch_threshold: 3,
      alert_message_max_chars: 500,
      summary_sample_max_chars: 100,
    }
  }
}

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
  /// Railway API token. Requests go out unauthenticated when absent.
  pub api_token: Option<String>,
  pub project_id: String,
  /// GraphQL endpoint of the inventory provider.
  pub api_url: String,
  /// Base URL of the chat bot exposing `/api/war-room/alert`.
  pub sink_url: String,
  /// `bot` field of every alert payload.
  pub bot_name: String,
  pub check_interval: Duration,
  /// Name of this service in the project; never scanned.
  pub self_name: String,
  /// Log lines requested per deployment and cycle.
  pub log_fetch_limit: u32,
  pub alert: AlertPolicy,
  /// Timeout applied to every inventory/log request.
  pub upstream_timeout: Duration,
  /// Timeout applied to every alert post.
  pub alert_timeout: Duration,
  pub host: String,
  pub port: u16,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      api_token: None,
      project_id: DEFAULT_PROJECT_ID.into(),
      api_url: DEFAULT_API_URL.into(),
      sink_url: DEFAULT_SINK_URL.into(),
      bot_name: "juggernaut".into(),
      check_interval: Duration::from_secs(60),
      self_name: "railway-watchdog".into(),
      log_fetch_limit: 50,
      alert: AlertPolicy::default(),
      upstream_timeout: Duration::from_secs(30),
      alert_timeout: Duration::from_secs(10),
      host: "0.0.0.0".into(),
      port: 8080,
    }
  }
}

impl Config {
  /// Load from process environment variables.
  pub fn from_env() -> Result<Self, WatchdogError> {
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  /// Load using an arbitrary variable lookup; unset variables keep their defaults.
  pub fn from_lookup<F>(lookup: F) -> Result<Self, WatchdogError>
  where
    F: Fn(&str) -> Option<String>,
  {
    let defaults = Self::default();
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    let check_interval = parse_secs(&get, "CHECK_INTERVAL_SECONDS", defaults.check_interval)?;

    let api_token = get("RAILWAY_API_TOKEN");
    if api_token.is_none() {
      warn!("RAILWAY_API_TOKEN is not set; inventory requests will be unauthenticated");
    }

    Ok(Self {
      api_token,
      project_id: get("RAILWAY_PROJECT_ID").unwrap_or(defaults.project_id),
      api_url: get("RAILWAY_API_URL").unwrap_or(defaults.api_url),
      sink_url: get("JUGGERNAUT_URL").unwrap_or(defaults.sink_url),
      bot_name: get("ALERT_BOT_NAME").unwrap_or(defaults.bot_name),
      check_interval,
      self_name: get("WATCHDOG_SERVICE_NAME").unwrap_or(defaults.self_name),
      log_fetch_limit: parse_or(&get, "LOG_FETCH_LIMIT", defaults.log_fetch_limit)?,
      alert: AlertPolicy {
        batch_threshold: parse_or(&get, "ALERT_BATCH_THRESHOLD", defaults.alert.batch_threshold)?,
        alert_message_max_chars: parse_or(
          &get,
          "ALERT_MESSAGE_MAX_CHARS",
          defaults.alert.alert_message_max_chars,
        )?,
        summary_sample_max_chars: parse_or(
          &get,
          "SUMMARY_SAMPLE_MAX_CHARS",
          defaults.alert.summary_sample_max_chars,
        )?,
      },
      upstream_timeout: parse_secs(&get, "UPSTREAM_TIMEOUT_SECONDS", defaults.upstream_timeout)?,
      alert_timeout: parse_secs(&get, "ALERT_TIMEOUT_SECONDS", defaults.alert_timeout)?,
      host: get("HOST").unwrap_or(defaults.host),
      port: parse_or(&get, "PORT", defaults.port)?,
    })
  }

  pub fn bind_addr(&self) -> String {
    format!("{}:{}", self.host, self.port)
  }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, WatchdogError>
where
  T: FromStr,
  T::Err: std::fmt::Display,
  G: Fn(&str) -> Option<String>,
{
  match get(key) {
    Some(raw) => raw
      .trim()
      .parse()
      .map_err(|e| WatchdogError::config(key, format!("invalid value {:?}: {}", raw, e))),
    None => Ok(default),
  }
}

/// Whole seconds; zero is rejected.
fn parse_secs<G>(get: &G, key: &str, default: Duration) -> Result<Duration, WatchdogError>
where
  G: Fn(&str) -> Option<String>,
{
  let secs: u64 = parse_or(get, key, default.as_secs())?;
  if secs == 0 {
    return Err(WatchdogError::config(key, "must be greater than zero"));
  }
  Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
      .iter()
      .map(|(k, v)| (k.to_string(), v.to_string()))
      .collect();
    move |key| map.get(key).cloned()
  }

  #[test]
  fn empty_environment_uses_defaults() {
    let config = Config::from_lookup(lookup(&[])).unwrap();
    assert_eq!(config.project_id, DEFAULT_PROJECT_ID);
    assert_eq!(config.sink_url, DEFAULT_SINK_URL);
    assert_eq!(config.check_interval, Duration::from_secs(60));
    assert_eq!(config.alert, AlertPolicy::default());
    assert_eq!(config.port, 8080);
    assert!(config.api_token.is_none());
  }

  #[test]
  fn overrides_are_applied() {
    let config = Config::from_lookup(lookup(&[
      ("RAILWAY_API_TOKEN", "tok"),
      ("RAILWAY_PROJECT_ID", "proj"),
      ("JUGGERNAUT_URL", "http://sink"),
      ("CHECK_INTERVAL_SECONDS", "15"),
      ("ALERT_MESSAGE_MAX_CHARS", "200"),
      ("PORT", "9000"),
    ]))
    .unwrap();
    assert_eq!(config.api_token.as_deref(), Some("tok"));
    assert_eq!(config.project_id, "proj");
    assert_eq!(config.sink_url, "http://sink");
    assert_eq!(config.check_interval, Duration::from_secs(15));
    assert_eq!(config.alert.alert_message_max_chars, 200);
    assert_eq!(config.bind_addr(), "0.0.0.0:9000");
  }

  #[test]
  fn unparsable_number_is_rejected() {
    let err = Config::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
    assert!(err.to_string().contains("PORT"));
  }

  #[test]
  fn zero_interval_is_rejected() {
    let err = Config::from_lookup(lookup(&[("CHECK_INTERVAL_SECONDS", "0")])).unwrap_err();
    assert!(err.to_string().contains("CHECK_INTERVAL_SECONDS"));
  }

  #[test]
  fn zero_timeouts_are_rejected() {
    for key in ["UPSTREAM_TIMEOUT_SECONDS", "ALERT_TIMEOUT_SECONDS"] {
      let err = Config::from_lookup(lookup(&[(key, "0")])).unwrap_err();
      assert!(err.to_string().contains(key));
    }
  }

  #[test]
  fn lookup_defaults_match_default_impl() {
    let loaded = Config::from_lookup(lookup(&[])).unwrap();
    let defaults = Config::default();
    assert_eq!(loaded.check_interval, defaults.check_interval);
    assert_eq!(loaded.upstream_timeout, defaults.upstream_timeout);
    assert_eq!(loaded.alert_timeout, defaults.alert_timeout);
    assert_eq!(loaded.log_fetch_limit, defaults.log_fetch_limit);
  }

  #[test]
  fn blank_values_fall_back_to_defaults() {
    let config = Config::from_lookup(lookup(&[("RAILWAY_PROJECT_ID", "  ")])).unwrap();
    assert_eq!(config.project_id, DEFAULT_PROJECT_ID);
  }
}
