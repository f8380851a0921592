// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod client;
pub mod config;
pub mod detect;
pub mod model;
pub mod monitor;
pub mod notify;
pub mod state;

// ---- Re-exports for stable public API ----
pub use crate::config::{Credentials, MonitorConfig, MonitorTarget, MonitorsConfig};
pub use crate::model::{PostRecord, ThreadRecord};
pub use crate::monitor::{run, Connector, HttpConnector, RunReport};
pub use crate::state::CursorStore;
