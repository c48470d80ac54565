//! Railway Log Watchdog — crash and error-log monitor for a Railway project.
//!
//! Polls every service on a fixed interval, fingerprints error-severity log
//! lines, alerts the war room once per new fingerprint, and reports crashed
//! deployments. A small HTTP surface exposes health, status, an on-demand
//! check and a reset of the seen-error set.
//!
//! No persistence: dedup state lives for the lifetime of the process.

pub mod alert;
pub mod config;
pub mod dedup;
pub mod error;
pub mod fingerprint;
pub mod handlers;
pub mod inventory;
pub mod logging;
pub mod scan;
pub mod scheduler;
pub mod state;
pub mod types;

pub use alert::{AlertDispatcher, AlertSink, WarRoomSink};
pub use config::{AlertPolicy, Config};
pub use error::WatchdogError;
pub use handlers::router;
pub use inventory::{Inventory, RailwayClient};
pub use scan::{ScanSettings, Scanner};
pub use scheduler::Scheduler;
pub use state::{AppState, WatchState};
