// src/monitor.rs
// One run over all configured monitors, strictly sequential. Each monitor
// walks authenticate -> fetch -> detect -> notify -> commit; any failure is
// absorbed at the monitor boundary and contributes zero notifications
// without stopping the remaining monitors. The cursor store is persisted
// once at the end of the run.

use anyhow::Result;

use crate::client::{ForumClient, HttpForumClient};
use crate::config::{Credentials, MonitorConfig, MonitorTarget, MonitorsConfig};
use crate::detect;
use crate::notify::discord::DiscordNotifier;
use crate::notify::Notifier;
use crate::state::CursorStore;

/// Builds the per-monitor collaborators. The HTTP implementation is the
/// production path; tests plug in stubs.
pub trait Connector: Send + Sync {
    fn forum_client(&self, base_url: &str) -> Result<Box<dyn ForumClient>>;
    fn notifier(&self, webhook_url: &str) -> Box<dyn Notifier>;
}

pub struct HttpConnector {
    creds: Credentials,
}

impl HttpConnector {
    pub fn new(creds: Credentials) -> Self {
        Self { creds }
    }
}

impl Connector for HttpConnector {
    fn forum_client(&self, base_url: &str) -> Result<Box<dyn ForumClient>> {
        let client = HttpForumClient::new(base_url, &self.creds.username, &self.creds.password)?;
        Ok(Box::new(client))
    }

    fn notifier(&self, webhook_url: &str) -> Box<dyn Notifier> {
        Box::new(DiscordNotifier::new(webhook_url.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub notifications_sent: usize,
    pub monitors_processed: usize,
    pub state_saved: bool,
}

/// Process every enabled monitor, then persist the cursor store. A save
/// failure is reported, not fatal: notifications already went out.
pub async fn run(cfg: &MonitorsConfig, store: &mut CursorStore, connector: &dyn Connector) -> RunReport {
    let mut sent = 0;
    let mut processed = 0;

    for monitor in cfg.enabled_monitors() {
        tracing::info!(monitor = %monitor.id, name = %monitor.name, "processing monitor");
        sent += process_monitor(monitor, store, connector).await;
        processed += 1;
    }

    let state_saved = store.save();
    if !state_saved {
        tracing::error!("cursor state could not be persisted; next run may re-notify");
    }

    RunReport {
        notifications_sent: sent,
        monitors_processed: processed,
        state_saved,
    }
}

async fn process_monitor(
    monitor: &MonitorConfig,
    store: &mut CursorStore,
    connector: &dyn Connector,
) -> usize {
    let webhook = match std::env::var(&monitor.webhook_env) {
        Ok(url) if !url.is_empty() => url,
        _ => {
            tracing::error!(
                monitor = %monitor.id,
                env = %monitor.webhook_env,
                "webhook environment variable not set, skipping monitor"
            );
            return 0;
        }
    };

    let client = match connector.forum_client(&monitor.forum_url) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(monitor = %monitor.id, error = %e, "forum client setup failed, skipping monitor");
            return 0;
        }
    };
    let notifier = connector.notifier(&webhook);

    if !client.login().await {
        let msg = format!("Failed to authenticate to forum: {}", monitor.forum_url);
        tracing::error!(monitor = %monitor.id, "{msg}");
        report_error(notifier.as_ref(), &msg, &monitor.name).await;
        return 0;
    }

    match &monitor.target {
        MonitorTarget::Forum { section_url } => {
            process_forum(monitor, section_url, store, client.as_ref(), notifier.as_ref()).await
        }
        MonitorTarget::Thread { thread_url } => {
            process_thread(monitor, thread_url, store, client.as_ref(), notifier.as_ref()).await
        }
    }
}

async fn process_forum(
    monitor: &MonitorConfig,
    section_url: &str,
    store: &mut CursorStore,
    client: &dyn ForumClient,
    notifier: &dyn Notifier,
) -> usize {
    let all_threads = client.section_threads(section_url).await;
    if all_threads.is_empty() {
        // Indistinguishable from a fetch failure; leave the cursor alone.
        tracing::warn!(monitor = %monitor.id, url = section_url, "no threads in section, skipping");
        return 0;
    }

    let new_threads = detect::new_threads(store.forum_cursor(&monitor.id), &all_threads);

    // Commit the full observed set regardless of whether anything was new.
    store.update_forum_state(&monitor.id, all_threads.iter().map(|t| t.id.clone()));

    if new_threads.is_empty() {
        tracing::info!(monitor = %monitor.id, "no new threads");
        return 0;
    }

    tracing::info!(monitor = %monitor.id, count = new_threads.len(), "new threads found");
    notifier.notify_threads_batch(&new_threads, &monitor.name).await
}

async fn process_thread(
    monitor: &MonitorConfig,
    thread_url: &str,
    store: &mut CursorStore,
    client: &dyn ForumClient,
    notifier: &dyn Notifier,
) -> usize {
    let all_posts = client.thread_posts(thread_url).await;
    let Some(latest) = all_posts.last() else {
        tracing::warn!(monitor = %monitor.id, url = thread_url, "no posts in thread, skipping");
        return 0;
    };

    let delta = detect::new_posts(store.last_post_id(&monitor.id), &all_posts);
    if delta.rebaselined {
        tracing::warn!(
            monitor = %monitor.id,
            "stored last post not found in thread, re-baselining to the latest post"
        );
    }

    let sent = if delta.posts.is_empty() {
        tracing::info!(monitor = %monitor.id, "no new posts");
        0
    } else {
        tracing::info!(monitor = %monitor.id, count = delta.posts.len(), "new posts found");
        notifier.notify_posts_batch(&delta.posts, &monitor.name).await
    };

    // Commit even when nothing was new or sends failed: the fetch succeeded
    // and notification attempts for its delta have been made.
    store.update_thread_state(&monitor.id, &latest.id, all_posts.len());

    sent
}

/// Attempt an error notification, log the outcome, never propagate. A
/// failure to report a failure must not mask the original problem.
async fn report_error(notifier: &dyn Notifier, message: &str, context: &str) {
    if !notifier.notify_error(message, context).await {
        tracing::warn!(context, "error notification could not be delivered");
    }
}
