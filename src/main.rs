//! Threadwatch — Binary Entrypoint
//! One monitoring pass over every configured forum section and thread,
//! intended to run from cron or a similar external scheduler. Overlapping
//! runs against the same state file are not supported.

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use threadwatch::config::{Credentials, MonitorsConfig};
use threadwatch::monitor::{self, HttpConnector};
use threadwatch::state::CursorStore;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).compact().init();
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    // Missing credentials or an unreadable config are the only fatal
    // startup errors; everything past this point degrades per monitor.
    let creds = match Credentials::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("{e:#}");
            return ExitCode::FAILURE;
        }
    };
    let cfg = match MonitorsConfig::load_default() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("{e:#}");
            return ExitCode::FAILURE;
        }
    };

    let mut store = CursorStore::load_default();
    let connector = HttpConnector::new(creds);

    let report = monitor::run(&cfg, &mut store, &connector).await;
    tracing::info!(
        monitors = report.monitors_processed,
        notifications = report.notifications_sent,
        state_saved = report.state_saved,
        "monitor run finished"
    );
    for (id, line) in store.summary() {
        tracing::debug!(monitor = %id, "{line}");
    }

    ExitCode::SUCCESS
}
