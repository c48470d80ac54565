//! Tracing subscriber setup.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a console subscriber filtered by `RUST_LOG` (default `info`).
///
/// Calling it twice is harmless; the second installation is ignored.
pub fn init() {
  let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

  let _ = tracing_subscriber::registry()
    .with(env_filter)
    .with(fmt::layer().with_target(false))
    .try_init();
}
